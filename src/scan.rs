//! Listing the files a run should consider.

use crate::config::CompiledFilters;
use crate::container::ContainerManager;
use crate::error::{OrganizeError, OrganizeResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Returns the regular files directly inside `target`, sorted by path.
///
/// Subdirectories, the program's own archives and anything the listing
/// filters reject are left out. Entries whose metadata cannot be read are
/// skipped with a warning.
pub fn list_files(
    target: &Path,
    containers: &ContainerManager,
    filters: &CompiledFilters,
) -> OrganizeResult<Vec<PathBuf>> {
    let entries = fs::read_dir(target).map_err(|e| OrganizeError::ReadDirectory {
        path: target.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_ok_and(|t| t.is_file()) {
            continue;
        }

        let path = entry.path();
        let name = entry.file_name();
        if containers.is_container_file(&path) {
            continue;
        }
        if !filters.should_include(&name.to_string_lossy()) {
            tracing::debug!(path = %path.display(), "excluded by filters");
            continue;
        }
        files.push(path);
    }

    files.sort();
    tracing::debug!(count = files.len(), target = %target.display(), "listed files");
    Ok(files)
}
