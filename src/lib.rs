//! packrat - sort a directory into per-category containers
//!
//! This library classifies files by extension, reconciles copy-named
//! duplicates, packs files into category folders or zip archives, and
//! unpacks those containers again with content-hash verification. Settings,
//! listing filters and the category table come from a TOML configuration
//! file.

pub mod category;
pub mod cli;
pub mod config;
pub mod container;
pub mod dry_run;
pub mod duplicates;
pub mod error;
pub mod file_organizer;
pub mod hashing;
pub mod logging;
pub mod output;
pub mod reconcile;
pub mod scan;
pub mod unpack;

pub use category::{CategoryIndex, Classification, UnknownExtensions, classify};
pub use config::{CompiledFilters, Config, ConfigError, Settings};
pub use container::{Container, ContainerKind, ContainerManager};
pub use duplicates::{DuplicateMatcher, DuplicateReport};
pub use error::{OrganizeError, OrganizeResult};
pub use file_organizer::{FileOrganizer, PackMode, PackReport};
pub use reconcile::{ReconcileReport, reconcile};
pub use unpack::{ExtractionRecord, UnpackReport, Unpacker};

pub use cli::{Cli, OrganizeSummary, RunOptions, organize_directory, run_cli};
