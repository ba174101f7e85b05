//! Acting on duplicate findings: deleting copies and renaming orphans.

use crate::config::Settings;
use crate::duplicates::DuplicateReport;
use std::fs;
use std::path::PathBuf;

/// Outcome of a reconcile pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Duplicates that were deleted.
    pub duplicates_removed: Vec<PathBuf>,
    /// Orphans renamed, as (old path, new path).
    pub orphans_renamed: Vec<(PathBuf, PathBuf)>,
    /// Files left alone because they were gone or not regular files anymore.
    pub skipped: Vec<(PathBuf, String)>,
    pub failures: Vec<(PathBuf, String)>,
    /// Findings were present but both settings were off.
    pub no_action_enabled: bool,
}

impl ReconcileReport {
    /// Returns true if nothing failed and an action was allowed.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && !self.no_action_enabled
    }
}

/// Applies `settings` to the duplicates and orphans in `report`.
///
/// Orphans are renamed before duplicates are deleted. An orphan is never
/// deleted, and a rename never replaces an existing file. Every mutation is
/// checked on disk afterwards before it is counted.
pub fn reconcile(report: &DuplicateReport, settings: &Settings) -> ReconcileReport {
    let mut outcome = ReconcileReport::default();

    if report.is_empty() {
        tracing::info!("no duplicate files found");
        return outcome;
    }

    if !settings.delete_duplicate_files && !settings.rename_orphaned_duplicates {
        tracing::info!(
            duplicates = report.duplicates.len(),
            orphans = report.orphans.len(),
            "duplicate files found"
        );
        tracing::error!(
            "no action taken, enable rename_orphaned_duplicates or delete_duplicate_files in the configuration"
        );
        outcome.no_action_enabled = true;
        return outcome;
    }

    if settings.rename_orphaned_duplicates && !report.orphans.is_empty() {
        tracing::info!(count = report.orphans.len(), "renaming orphaned duplicates");
        for orphan in &report.orphans {
            if !orphan.path.is_file() {
                outcome
                    .skipped
                    .push((orphan.path.clone(), "no longer a regular file".to_string()));
                continue;
            }
            if orphan.stripped.exists() {
                tracing::warn!(
                    from = %orphan.path.display(),
                    to = %orphan.stripped.display(),
                    "rename target already exists"
                );
                outcome.failures.push((
                    orphan.path.clone(),
                    format!("{} already exists", orphan.stripped.display()),
                ));
                continue;
            }

            tracing::debug!(
                from = %orphan.path.display(),
                to = %orphan.stripped.display(),
                pattern = %orphan.pattern,
                "renaming"
            );
            match fs::rename(&orphan.path, &orphan.stripped) {
                Ok(()) if orphan.stripped.exists() => outcome
                    .orphans_renamed
                    .push((orphan.path.clone(), orphan.stripped.clone())),
                Ok(()) => outcome.failures.push((
                    orphan.path.clone(),
                    "renamed file is missing afterwards".to_string(),
                )),
                Err(e) => {
                    tracing::error!(path = %orphan.path.display(), error = %e, "failed to rename");
                    outcome.failures.push((orphan.path.clone(), e.to_string()));
                }
            }
        }
        tracing::info!(count = outcome.orphans_renamed.len(), "files renamed");
    }

    if settings.delete_duplicate_files && !report.duplicates.is_empty() {
        tracing::info!(count = report.duplicates.len(), "removing duplicate files");
        for duplicate in &report.duplicates {
            if !duplicate.path.is_file() {
                outcome
                    .skipped
                    .push((duplicate.path.clone(), "no longer a regular file".to_string()));
                continue;
            }

            tracing::debug!(
                path = %duplicate.path.display(),
                original = %duplicate.original.display(),
                "removing"
            );
            match fs::remove_file(&duplicate.path) {
                Ok(()) if !duplicate.path.exists() => {
                    outcome.duplicates_removed.push(duplicate.path.clone())
                }
                Ok(()) => outcome.failures.push((
                    duplicate.path.clone(),
                    "file still present after removal".to_string(),
                )),
                Err(e) => {
                    tracing::error!(path = %duplicate.path.display(), error = %e, "failed to remove");
                    outcome.failures.push((duplicate.path.clone(), e.to_string()));
                }
            }
        }
        tracing::info!(count = outcome.duplicates_removed.len(), "files removed");
    }

    outcome
}
