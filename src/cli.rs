//! Command-line interface module for packrat.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing and validation
//! - Loading configuration and resolving the target directory
//! - Running the unpack, dedupe and pack phases in order
//! - Dry-run planning

use crate::category::{UnknownExtensions, classify};
use crate::config::{CompiledFilters, Config, Settings};
use crate::container::ContainerManager;
use crate::dry_run;
use crate::duplicates::DuplicateMatcher;
use crate::error::{OrganizeError, OrganizeResult};
use crate::file_organizer::{FileOrganizer, PackMode, PackReport};
use crate::output::OutputFormatter;
use crate::reconcile::{ReconcileReport, reconcile};
use crate::scan;
use crate::unpack::{UnpackReport, Unpacker};
use clap::Parser;
use std::path::PathBuf;

/// Sort a directory into category folders or zip archives.
#[derive(Parser, Debug, Default)]
#[command(name = "packrat", version, about, long_about = None)]
pub struct Cli {
    /// Directory to organize [default: settings.target_directory, then ~/Downloads]
    #[arg(short, long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Configuration file to use instead of the default search
    #[arg(short, long, value_name = "CONFIG")]
    pub config: Option<PathBuf>,

    /// Store files in per-category zip archives
    #[arg(short, long)]
    pub archive: bool,

    /// Move files into per-category folders
    #[arg(short = 'm', long = "move")]
    pub move_files: bool,

    /// Delete duplicates and rename orphaned copies, as the settings allow
    #[arg(short = 'd', long = "rm-duplicates")]
    pub rm_duplicates: bool,

    /// Unpack previously created folders and archives; all of them when no names are given
    #[arg(short, long, value_name = "NAMES", num_args = 0..)]
    pub unpack: Option<Vec<String>>,

    /// Show what would happen without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Returns the requested pack mode, rejecting archive and move together.
    pub fn pack_mode(&self) -> OrganizeResult<Option<PackMode>> {
        match (self.archive, self.move_files) {
            (true, true) => Err(OrganizeError::ConflictingModes),
            (true, false) => Ok(Some(PackMode::Archive)),
            (false, true) => Ok(Some(PackMode::Move)),
            (false, false) => Ok(None),
        }
    }

    pub fn run_options(&self) -> OrganizeResult<RunOptions> {
        Ok(RunOptions {
            unpack: self.unpack.clone(),
            remove_duplicates: self.rm_duplicates,
            mode: self.pack_mode()?,
        })
    }
}

/// Phases to run, independent of how they were requested.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Names to unpack; an empty list means every owned container.
    pub unpack: Option<Vec<String>>,
    pub remove_duplicates: bool,
    pub mode: Option<PackMode>,
}

/// Reports of the phases that ran.
#[derive(Debug, Default)]
pub struct OrganizeSummary {
    pub unpack: Option<UnpackReport>,
    pub reconcile: Option<ReconcileReport>,
    pub pack: Option<PackReport>,
    pub unknown_extensions: Vec<String>,
}

impl OrganizeSummary {
    pub fn unpack_succeeded(&self) -> bool {
        self.unpack.as_ref().is_none_or(UnpackReport::all_succeeded)
    }

    pub fn reconcile_succeeded(&self) -> bool {
        self.reconcile
            .as_ref()
            .is_none_or(ReconcileReport::all_succeeded)
    }

    pub fn pack_succeeded(&self) -> bool {
        self.pack.as_ref().is_none_or(PackReport::all_succeeded)
    }

    /// True when every phase that ran succeeded.
    pub fn all(&self) -> bool {
        self.unpack_succeeded() && self.reconcile_succeeded() && self.pack_succeeded()
    }
}

/// Runs the requested phases against the directory `containers` manages.
///
/// Unpack comes first, then duplicate handling, then a fresh listing is
/// classified and packed. A failing phase does not stop the later ones.
///
/// # Errors
///
/// Returns an error only when a phase cannot start, e.g. the target
/// directory cannot be listed.
///
/// # Examples
///
/// ```no_run
/// use packrat::cli::{organize_directory, RunOptions};
/// use packrat::config::Config;
/// use packrat::container::ContainerManager;
/// use packrat::file_organizer::PackMode;
///
/// let config = Config::default();
/// let containers = ContainerManager::new("/path/to/directory", config.category_index().unwrap());
/// let options = RunOptions { mode: Some(PackMode::Move), ..Default::default() };
/// let summary = organize_directory(
///     &containers,
///     &config.compile_filters().unwrap(),
///     &config.settings,
///     &options,
/// )
/// .unwrap();
/// println!("all succeeded: {}", summary.all());
/// ```
pub fn organize_directory(
    containers: &ContainerManager,
    filters: &CompiledFilters,
    settings: &Settings,
    options: &RunOptions,
) -> OrganizeResult<OrganizeSummary> {
    let mut summary = OrganizeSummary::default();
    let target = containers.target();

    if let Some(names) = &options.unpack {
        let requested = (!names.is_empty()).then_some(names.as_slice());
        let report = match Unpacker::new(containers.clone()).unpack(requested) {
            Ok(report) => report,
            Err(e @ OrganizeError::NoUnpackTargets { .. }) => {
                tracing::error!(error = %e, "nothing to unpack");
                UnpackReport {
                    missing_targets: names.clone(),
                    ..Default::default()
                }
            }
            Err(e) => return Err(e),
        };
        summary.unpack = Some(report);
    }

    if options.remove_duplicates {
        let listing = scan::list_files(target, containers, filters)?;
        let findings = DuplicateMatcher::new().find_duplicates(&listing);
        summary.reconcile = Some(reconcile(&findings, settings));
    }

    if let Some(mode) = options.mode {
        let listing = scan::list_files(target, containers, filters)?;
        let mut unknown = UnknownExtensions::new();
        let classification = classify(&listing, containers.index(), &mut unknown);
        if !unknown.is_empty() {
            tracing::info!(
                extensions = ?unknown.iter().collect::<Vec<_>>(),
                "files with unrecognized extensions go to unknowns"
            );
        }
        summary.unknown_extensions = unknown.iter().map(str::to_string).collect();
        summary.pack = Some(FileOrganizer::new(containers.clone()).pack(&classification, mode));
    }

    Ok(summary)
}

/// Runs the CLI application with parsed arguments.
///
/// Returns `Ok(true)` when every phase succeeded, `Ok(false)` when some
/// file or container could not be handled, and `Err` for problems that
/// stop the run before anything changes.
pub fn run_cli(cli: &Cli) -> Result<bool, String> {
    let options = cli.run_options().map_err(|e| e.to_string())?;

    let config = Config::load(cli.config.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let index = config
        .category_index()
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;
    let target = config
        .settings
        .resolve_target_directory(cli.target.as_deref())
        .map_err(|e| e.to_string())?;

    let containers = ContainerManager::new(&target, index);

    if cli.dry_run {
        let plan = dry_run::plan(&containers, &filters, &config.settings, &options)
            .map_err(|e| e.to_string())?;
        OutputFormatter::dry_run_plan(&plan, &target);
        return Ok(true);
    }

    if options.unpack.is_none() && !options.remove_duplicates && options.mode.is_none() {
        OutputFormatter::warning("Nothing to do. Pass --archive, --move, --rm-duplicates or --unpack.");
        return Ok(true);
    }

    tracing::info!(target = %target.display(), "starting");
    let summary = organize_directory(&containers, &filters, &config.settings, &options)
        .map_err(|e| e.to_string())?;
    OutputFormatter::run_summary(&summary);
    Ok(summary.all())
}
