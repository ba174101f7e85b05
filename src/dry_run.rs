//! Planning a run without touching the filesystem.
//!
//! The plan replays duplicate handling on an in-memory listing, so files a
//! real run would rename or delete show up in the pack phase under their
//! final names.

use crate::category::{UnknownExtensions, classify};
use crate::cli::RunOptions;
use crate::config::{CompiledFilters, Settings};
use crate::container::{ContainerManager, archive_member_names};
use crate::duplicates::DuplicateMatcher;
use crate::error::OrganizeResult;
use crate::file_organizer::PackMode;
use crate::scan;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// A file the pack phase would place into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPlacement {
    pub source: PathBuf,
    pub category: String,
    pub container: PathBuf,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DryRunPlan {
    /// Existing containers an unpack would process.
    pub unpack_targets: Vec<PathBuf>,
    /// Requested unpack names that do not exist.
    pub missing_targets: Vec<String>,
    /// Orphans that would be renamed, as (old path, new path).
    pub renames: Vec<(PathBuf, PathBuf)>,
    /// Duplicates that would be deleted.
    pub deletions: Vec<PathBuf>,
    /// Duplicates were found but no handling is enabled.
    pub duplicates_unhandled: bool,
    pub containers_created: Vec<PathBuf>,
    pub placements: Vec<PlannedPlacement>,
    /// Files a real run would leave alone, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    pub unknown_extensions: Vec<String>,
}

impl DryRunPlan {
    pub fn is_empty(&self) -> bool {
        self.unpack_targets.is_empty()
            && self.renames.is_empty()
            && self.deletions.is_empty()
            && self.placements.is_empty()
    }
}

/// Works out what a run with `options` would do in the managed directory.
///
/// Only reads: the listing, container existence and archive member names.
/// Unpacking is planned but its results are not fed into the later phases.
pub fn plan(
    containers: &ContainerManager,
    filters: &CompiledFilters,
    settings: &Settings,
    options: &RunOptions,
) -> OrganizeResult<DryRunPlan> {
    let mut plan = DryRunPlan::default();

    if let Some(names) = &options.unpack {
        if names.is_empty() {
            plan.unpack_targets = containers
                .list_existing_containers()?
                .into_vec()
                .into_iter()
                .map(|c| c.path)
                .collect();
        } else {
            for name in names {
                match containers.resolve(name) {
                    Some(container) => plan.unpack_targets.push(container.path),
                    None => plan.missing_targets.push(name.clone()),
                }
            }
        }
    }

    let mut listing = scan::list_files(containers.target(), containers, filters)?;

    if options.remove_duplicates {
        let report = DuplicateMatcher::new().find_duplicates(&listing);
        if !report.is_empty() {
            if !settings.delete_duplicate_files && !settings.rename_orphaned_duplicates {
                plan.duplicates_unhandled = true;
            }
            if settings.rename_orphaned_duplicates {
                let mut claimed: HashSet<PathBuf> = HashSet::new();
                for orphan in &report.orphans {
                    if orphan.stripped.exists() || claimed.contains(&orphan.stripped) {
                        plan.skipped.push((
                            orphan.path.clone(),
                            format!("{} already exists", orphan.stripped.display()),
                        ));
                    } else {
                        claimed.insert(orphan.stripped.clone());
                        plan.renames.push((orphan.path.clone(), orphan.stripped.clone()));
                    }
                }
            }
            if settings.delete_duplicate_files {
                plan.deletions
                    .extend(report.duplicates.iter().map(|d| d.path.clone()));
            }
        }

        let deleted: HashSet<&PathBuf> = plan.deletions.iter().collect();
        let renamed: HashMap<&PathBuf, &PathBuf> =
            plan.renames.iter().map(|(from, to)| (from, to)).collect();
        listing = listing
            .into_iter()
            .filter(|path| !deleted.contains(path))
            .map(|path| match renamed.get(&path) {
                Some(to) => (*to).clone(),
                None => path,
            })
            .collect();
        listing.sort();
    }

    let Some(mode) = options.mode else {
        return Ok(plan);
    };

    let mut unknown = UnknownExtensions::new();
    let classification = classify(&listing, containers.index(), &mut unknown);
    plan.unknown_extensions = unknown.iter().map(str::to_string).collect();

    for (category, files) in classification.iter() {
        let container = match mode {
            PackMode::Move => containers.locate_folder(category),
            PackMode::Archive => containers.locate_archive(category),
        };
        if !container.exists {
            plan.containers_created.push(container.path.clone());
        }

        let members: HashSet<String> = match mode {
            PackMode::Archive if container.exists => {
                match archive_member_names(&container.path) {
                    Ok(names) => names,
                    Err(e) => {
                        plan.skipped
                            .extend(files.iter().map(|f| (f.clone(), e.to_string())));
                        continue;
                    }
                }
            }
            _ => HashSet::new(),
        };

        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let taken = match mode {
                PackMode::Move => container.path.join(&name).exists(),
                PackMode::Archive => members.contains(&name),
            };
            if taken {
                plan.skipped.push((
                    file.clone(),
                    format!("already in {}", container.path.display()),
                ));
                continue;
            }
            plan.placements.push(PlannedPlacement {
                source: file.clone(),
                category: category.to_string(),
                container: container.path.clone(),
            });
        }
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryIndex;
    use crate::config::Config;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn snapshot(dir: &Path) -> Vec<PathBuf> {
        let mut entries: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        entries.sort();
        entries
    }

    fn run_plan(dir: &Path, settings: &Settings, options: &RunOptions) -> DryRunPlan {
        let containers = ContainerManager::new(dir, CategoryIndex::default());
        let filters = Config::default().compile_filters().unwrap();
        plan(&containers, &filters, settings, options).unwrap()
    }

    #[test]
    fn test_plan_move_changes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::write(temp_dir.path().join("b.png"), "b").unwrap();
        let before = snapshot(temp_dir.path());

        let plan = run_plan(
            temp_dir.path(),
            &Settings::default(),
            &RunOptions {
                mode: Some(PackMode::Move),
                ..Default::default()
            },
        );

        assert_eq!(snapshot(temp_dir.path()), before);
        assert_eq!(plan.placements.len(), 2);
        assert_eq!(plan.containers_created.len(), 2);
    }

    #[test]
    fn test_plan_uses_names_after_dedupe() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a.txt"), "a").unwrap();
        fs::write(temp_dir.path().join("a (1).txt"), "a").unwrap();
        fs::write(temp_dir.path().join("b (copy).txt"), "b").unwrap();
        let settings = Settings {
            delete_duplicate_files: true,
            rename_orphaned_duplicates: true,
            ..Default::default()
        };

        let plan = run_plan(
            temp_dir.path(),
            &settings,
            &RunOptions {
                remove_duplicates: true,
                mode: Some(PackMode::Archive),
                ..Default::default()
            },
        );

        assert_eq!(plan.deletions, vec![temp_dir.path().join("a (1).txt")]);
        assert_eq!(plan.renames.len(), 1);
        let sources: Vec<_> = plan.placements.iter().map(|p| p.source.clone()).collect();
        assert_eq!(
            sources,
            vec![temp_dir.path().join("a.txt"), temp_dir.path().join("b.txt")]
        );
        assert!(temp_dir.path().join("a (1).txt").exists());
    }

    #[test]
    fn test_plan_renames_each_name_once() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a(1).txt"), "one").unwrap();
        fs::write(temp_dir.path().join("a(2).txt"), "two").unwrap();
        let settings = Settings {
            rename_orphaned_duplicates: true,
            ..Default::default()
        };

        let plan = run_plan(
            temp_dir.path(),
            &settings,
            &RunOptions {
                remove_duplicates: true,
                ..Default::default()
            },
        );

        assert_eq!(
            plan.renames,
            vec![(
                temp_dir.path().join("a(1).txt"),
                temp_dir.path().join("a.txt")
            )]
        );
        assert_eq!(plan.skipped.len(), 1);
        assert_eq!(plan.skipped[0].0, temp_dir.path().join("a(2).txt"));
    }

    #[test]
    fn test_plan_reports_unhandled_duplicates() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::write(temp_dir.path().join("a (copy).txt"), "a").unwrap();

        let plan = run_plan(
            temp_dir.path(),
            &Settings::default(),
            &RunOptions {
                remove_duplicates: true,
                ..Default::default()
            },
        );

        assert!(plan.duplicates_unhandled);
        assert!(plan.renames.is_empty());
    }

    #[test]
    fn test_plan_unpack_targets() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("images")).unwrap();

        let plan = run_plan(
            temp_dir.path(),
            &Settings::default(),
            &RunOptions {
                unpack: Some(vec!["images".to_string(), "nope".to_string()]),
                ..Default::default()
            },
        );

        assert_eq!(plan.unpack_targets, vec![temp_dir.path().join("images")]);
        assert_eq!(plan.missing_targets, vec!["nope".to_string()]);
        assert!(temp_dir.path().join("images").exists());
    }
}
