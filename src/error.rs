//! Errors that stop a phase before it can start.
//!
//! Problems with a single file never end up here. Those are collected in the
//! per-phase reports so that one bad file cannot abort a whole batch.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while organizing or unpacking a directory.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The target directory is missing or is not a directory.
    #[error("Invalid target directory {}: {reason}", path.display())]
    InvalidTargetDirectory { path: PathBuf, reason: String },

    /// The target directory could not be listed.
    #[error("Failed to read directory {}: {source}", path.display())]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A container could not be created or opened.
    #[error("Container error at {}: {source}", path.display())]
    Container {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A zip archive could not be read or written.
    #[error("Archive error at {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    /// None of the requested unpack targets exist.
    #[error("No valid unpack targets found in {}", path.display())]
    NoUnpackTargets { path: PathBuf },

    /// Archive and move were both requested.
    #[error("Cannot archive and move at the same time, choose one")]
    ConflictingModes,
}

impl OrganizeError {
    pub(crate) fn container(path: &Path, source: std::io::Error) -> Self {
        Self::Container {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn archive(path: &Path, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for organize and unpack phases.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
