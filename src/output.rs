//! Terminal output for the end of a run.
//!
//! Progress and per-file detail go through `tracing`; this module prints
//! the human-facing summaries with consistent styling.

use crate::cli::OrganizeSummary;
use crate::dry_run::DryRunPlan;
use colored::*;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Summary tables for a finished run or a dry-run plan
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use packrat::output::OutputFormatter;
    /// OutputFormatter::success("Finished.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints counts per phase, then every failure with its reason.
    pub fn run_summary(summary: &OrganizeSummary) {
        Self::header("SUMMARY");

        let mut rows: Vec<(&str, usize)> = Vec::new();
        if let Some(unpack) = &summary.unpack {
            rows.push(("Extracted", unpack.extracted.len()));
            rows.push(("Moved out", unpack.moved.len()));
            rows.push(("Containers removed", unpack.removed_containers.len()));
        }
        if let Some(reconcile) = &summary.reconcile {
            rows.push(("Duplicates removed", reconcile.duplicates_removed.len()));
            rows.push(("Orphans renamed", reconcile.orphans_renamed.len()));
        }
        if let Some(pack) = &summary.pack {
            rows.push(("Packed", pack.packed.len()));
            rows.push(("Skipped", pack.skipped.len()));
        }
        Self::table(&rows);

        let mut problems: Vec<(&Path, &str)> = Vec::new();
        if let Some(unpack) = &summary.unpack {
            problems.extend(unpack.failures.iter().map(|(p, r)| (p.as_path(), r.as_str())));
            problems.extend(
                unpack
                    .kept_containers
                    .iter()
                    .map(|(p, r)| (p.as_path(), r.as_str())),
            );
        }
        if let Some(reconcile) = &summary.reconcile {
            problems.extend(reconcile.failures.iter().map(|(p, r)| (p.as_path(), r.as_str())));
        }
        if let Some(pack) = &summary.pack {
            problems.extend(pack.failed.iter().map(|(p, r)| (p.as_path(), r.as_str())));
        }
        for (path, reason) in problems {
            Self::error(&format!("{}: {}", path.display(), reason));
        }

        if summary.reconcile.as_ref().is_some_and(|r| r.no_action_enabled) {
            Self::warning(
                "Duplicates found but no action taken. Enable rename_orphaned_duplicates or delete_duplicate_files.",
            );
        }
        if !summary.unknown_extensions.is_empty() {
            Self::warning(&format!(
                "Unrecognized extensions: {}",
                summary.unknown_extensions.join(", ")
            ));
        }

        if summary.all() {
            Self::success("Finished.");
        } else {
            Self::error("Finished with errors.");
        }
    }

    /// Prints what a run would do.
    pub fn dry_run_plan(plan: &DryRunPlan, target: &Path) {
        Self::dry_run_notice(&format!("Analyzing contents of: {}", target.display()));
        if plan.is_empty() {
            println!("Nothing would change.");
        }

        for path in &plan.unpack_targets {
            println!("  unpack  {}", path.display());
        }
        for name in &plan.missing_targets {
            Self::warning(&format!("{} does not exist in {}", name, target.display()));
        }
        for (from, to) in &plan.renames {
            println!("  rename  {} → {}", display_name(from), display_name(to));
        }
        for path in &plan.deletions {
            println!("  delete  {}", display_name(path));
        }
        if plan.duplicates_unhandled {
            Self::warning("Duplicates found but no action would be taken.");
        }
        for path in &plan.containers_created {
            println!("  create  {}", display_name(path));
        }
        for placement in &plan.placements {
            println!(
                "  pack    {} → {}",
                display_name(&placement.source),
                display_name(&placement.container)
            );
        }
        for (path, reason) in &plan.skipped {
            println!("  {}    {} ({})", "skip".yellow(), display_name(path), reason);
        }

        Self::table(&[
            ("Unpacked", plan.unpack_targets.len()),
            ("Renamed", plan.renames.len()),
            ("Deleted", plan.deletions.len()),
            ("Containers created", plan.containers_created.len()),
            ("Packed", plan.placements.len()),
            ("Skipped", plan.skipped.len()),
        ]);

        if !plan.unknown_extensions.is_empty() {
            Self::warning(&format!(
                "Unrecognized extensions: {}",
                plan.unknown_extensions.join(", ")
            ));
        }
        Self::dry_run_notice("Dry run complete. No files were modified.");
    }

    fn table(rows: &[(&str, usize)]) {
        let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
        for (label, count) in rows {
            let count = if *count == 0 {
                count.to_string().dimmed()
            } else {
                count.to_string().green()
            };
            println!("{:<width$} | {}", label, count, width = width);
        }
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
