//! Unpacking containers back into the target directory.
//!
//! This reverses a pack run: archives are extracted and folders emptied
//! into the target directory. Every extracted file is re-hashed from disk
//! before its archive may be deleted, and a folder is removed only once it
//! is empty. Existing files are never overwritten.

use crate::container::{Container, ContainerKind, ContainerManager};
use crate::error::{OrganizeError, OrganizeResult};
use crate::hashing::{self, ContentHash};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use zip::ZipArchive;

/// One archive member written (or found) on disk, with the hash it must have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub member_name: String,
    pub container: PathBuf,
    pub destination: PathBuf,
    pub expected_hash: ContentHash,
}

impl ExtractionRecord {
    /// Re-hashes the destination and compares it with the member's hash.
    pub fn verify(&self) -> io::Result<bool> {
        Ok(hashing::hash_file(&self.destination)? == self.expected_hash)
    }
}

/// Outcome of an unpack run.
#[derive(Debug, Default)]
pub struct UnpackReport {
    /// Files written out of archives.
    pub extracted: Vec<PathBuf>,
    /// Files moved out of folders.
    pub moved: Vec<PathBuf>,
    /// Containers deleted after a successful unpack.
    pub removed_containers: Vec<PathBuf>,
    /// Containers left on disk, with the reason.
    pub kept_containers: Vec<(PathBuf, String)>,
    /// Members or files that could not be unpacked.
    pub failures: Vec<(PathBuf, String)>,
    /// Requested names that did not resolve to a container.
    pub missing_targets: Vec<String>,
}

impl UnpackReport {
    /// Returns true if every requested container was unpacked and removed.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && self.kept_containers.is_empty() && self.missing_targets.is_empty()
    }
}

/// A container after the extraction phase, waiting for cleanup.
struct Unpacked {
    container: Container,
    records: Vec<ExtractionRecord>,
    complete: bool,
}

/// Restores files from program-owned containers.
pub struct Unpacker {
    containers: ContainerManager,
}

impl Unpacker {
    pub fn new(containers: ContainerManager) -> Self {
        Self { containers }
    }

    /// Unpacks the named containers, or every owned container when `targets`
    /// is `None`.
    ///
    /// Names are resolved relative to the target directory. Unknown names
    /// are reported in `missing_targets`; if none resolve, nothing happens
    /// and [`OrganizeError::NoUnpackTargets`] is returned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use packrat::category::CategoryIndex;
    /// use packrat::container::ContainerManager;
    /// use packrat::unpack::Unpacker;
    ///
    /// let unpacker = Unpacker::new(ContainerManager::new("/path/to/base", CategoryIndex::default()));
    /// match unpacker.unpack(Some(&["images.zip".to_string()][..])) {
    ///     Ok(report) => println!("{} files extracted", report.extracted.len()),
    ///     Err(e) => eprintln!("Unpack failed: {}", e),
    /// }
    /// ```
    pub fn unpack(&self, targets: Option<&[String]>) -> OrganizeResult<UnpackReport> {
        let mut report = UnpackReport::default();
        let containers = self.resolve_targets(targets, &mut report)?;

        tracing::info!(count = containers.len(), "unpacking containers");
        let unpacked: Vec<Unpacked> = containers
            .into_iter()
            .map(|container| match container.kind {
                ContainerKind::Archive => self.extract_archive(container, &mut report),
                ContainerKind::Folder => self.empty_folder(container, &mut report),
            })
            .collect();

        if !unpacked.is_empty() {
            tracing::info!("running cleanup");
            for entry in unpacked {
                Self::cleanup(entry, &mut report);
            }
            tracing::debug!("cleanup complete");
        }

        Ok(report)
    }

    fn resolve_targets(
        &self,
        targets: Option<&[String]>,
        report: &mut UnpackReport,
    ) -> OrganizeResult<Vec<Container>> {
        let Some(names) = targets else {
            return Ok(self.containers.list_existing_containers()?.into_vec());
        };

        let mut resolved = Vec::new();
        for name in names {
            match self.containers.resolve(name) {
                Some(container) => resolved.push(container),
                None => {
                    tracing::warn!(
                        name = %name,
                        target = %self.containers.target().display(),
                        "no such folder or archive"
                    );
                    report.missing_targets.push(name.clone());
                }
            }
        }

        if resolved.is_empty() {
            return Err(OrganizeError::NoUnpackTargets {
                path: self.containers.target().to_path_buf(),
            });
        }
        Ok(resolved)
    }

    fn extract_archive(&self, container: Container, report: &mut UnpackReport) -> Unpacked {
        let mut unpacked = Unpacked {
            container,
            records: Vec::new(),
            complete: true,
        };
        let archive_path = unpacked.container.path.clone();

        let mut archive = match File::open(&archive_path)
            .map_err(|e| e.to_string())
            .and_then(|file| ZipArchive::new(file).map_err(|e| e.to_string()))
        {
            Ok(archive) => archive,
            Err(reason) => {
                tracing::error!(archive = %archive_path.display(), error = %reason, "cannot open archive");
                report.failures.push((archive_path, reason));
                unpacked.complete = false;
                return unpacked;
            }
        };

        tracing::debug!(
            archive = %archive_path.display(),
            members = archive.len(),
            "extracting"
        );
        for i in 0..archive.len() {
            let mut entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(e) => {
                    report
                        .failures
                        .push((archive_path.clone(), format!("member {i}: {e}")));
                    unpacked.complete = false;
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }

            let member_name = entry.name().to_string();
            let Some(relative) = entry.enclosed_name() else {
                tracing::error!(member = %member_name, "member name escapes the target directory");
                report.failures.push((
                    archive_path.clone(),
                    format!("unsafe member name {member_name}"),
                ));
                unpacked.complete = false;
                continue;
            };
            let destination = self.containers.target().join(relative);

            match Self::write_member(&mut entry, &destination) {
                Ok((expected_hash, written)) => {
                    if written {
                        tracing::debug!(path = %destination.display(), "extracted");
                        report.extracted.push(destination.clone());
                    } else {
                        tracing::warn!(
                            path = %destination.display(),
                            "file already exists, not overwriting"
                        );
                    }
                    unpacked.records.push(ExtractionRecord {
                        member_name,
                        container: archive_path.clone(),
                        destination,
                        expected_hash,
                    });
                }
                Err(e) => {
                    tracing::error!(member = %member_name, error = %e, "extraction failed");
                    report.failures.push((destination, e.to_string()));
                    unpacked.complete = false;
                }
            }
        }

        unpacked
    }

    /// Streams a member to `destination` and returns its hash and whether
    /// anything was written. An existing destination is only hashed against.
    fn write_member<R: io::Read>(
        entry: &mut R,
        destination: &Path,
    ) -> io::Result<(ContentHash, bool)> {
        if destination.exists() {
            return Ok((hashing::hash_reader(entry)?, false));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(destination)?;
        match hashing::copy_and_hash(entry, &mut out) {
            Ok(hash) => Ok((hash, true)),
            Err(e) => {
                drop(out);
                if let Err(cleanup) = fs::remove_file(destination) {
                    tracing::warn!(path = %destination.display(), error = %cleanup, "could not remove partial file");
                }
                Err(e)
            }
        }
    }

    fn empty_folder(&self, container: Container, report: &mut UnpackReport) -> Unpacked {
        let mut unpacked = Unpacked {
            container,
            records: Vec::new(),
            complete: true,
        };
        let folder = unpacked.container.path.clone();

        let entries = match fs::read_dir(&folder) {
            Ok(entries) => entries,
            Err(e) => {
                report.failures.push((folder, e.to_string()));
                unpacked.complete = false;
                return unpacked;
            }
        };

        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| t.is_file()) {
                continue;
            }
            let source = entry.path();
            let destination = self.containers.target().join(entry.file_name());
            if destination.exists() {
                tracing::warn!(
                    path = %source.display(),
                    "a file with this name already exists in the target, leaving it"
                );
                continue;
            }
            match fs::rename(&source, &destination) {
                Ok(()) => {
                    tracing::debug!(path = %destination.display(), "moved out of folder");
                    report.moved.push(destination);
                }
                Err(e) => {
                    tracing::error!(path = %source.display(), error = %e, "move failed");
                    report.failures.push((source, e.to_string()));
                }
            }
        }

        unpacked
    }

    fn cleanup(unpacked: Unpacked, report: &mut UnpackReport) {
        let path = unpacked.container.path;
        match unpacked.container.kind {
            ContainerKind::Archive => {
                if !unpacked.complete {
                    report
                        .kept_containers
                        .push((path, "not every member could be extracted".to_string()));
                    return;
                }
                let mismatched: Vec<&str> = unpacked
                    .records
                    .iter()
                    .filter(|record| !record.verify().unwrap_or(false))
                    .map(|record| record.member_name.as_str())
                    .collect();
                if !mismatched.is_empty() {
                    tracing::error!(
                        archive = %path.display(),
                        members = ?mismatched,
                        "extracted files do not match the archive, keeping it"
                    );
                    let reason = format!("verification failed for {}", mismatched.join(", "));
                    report.kept_containers.push((path, reason));
                    return;
                }
                tracing::debug!(archive = %path.display(), "deleting");
                match fs::remove_file(&path) {
                    Ok(()) => report.removed_containers.push(path),
                    Err(e) => report.kept_containers.push((path, e.to_string())),
                }
            }
            ContainerKind::Folder => {
                let is_empty = fs::read_dir(&path)
                    .map(|mut entries| entries.next().is_none())
                    .unwrap_or(false);
                if !is_empty {
                    tracing::debug!(folder = %path.display(), "not empty, skipping");
                    report.kept_containers.push((path, "not empty".to_string()));
                    return;
                }
                tracing::debug!(folder = %path.display(), "deleting");
                match fs::remove_dir(&path) {
                    Ok(()) => report.removed_containers.push(path),
                    Err(e) => report.kept_containers.push((path, e.to_string())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::CategoryIndex;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, content) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    fn unpacker(temp_dir: &TempDir) -> Unpacker {
        Unpacker::new(ContainerManager::new(
            temp_dir.path(),
            CategoryIndex::default(),
        ))
    }

    #[test]
    fn test_unpack_archive_and_delete() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let archive = temp_dir.path().join("documents.zip");
        write_zip(&archive, &[("a.txt", "alpha"), ("b.pdf", "beta")]);

        let report = unpacker(&temp_dir).unpack(None).unwrap();

        assert!(report.all_succeeded());
        assert_eq!(report.extracted.len(), 2);
        assert_eq!(report.removed_containers, vec![archive.clone()]);
        assert!(!archive.exists());
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(),
            "alpha"
        );
    }

    #[test]
    fn test_differing_existing_file_keeps_archive() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let archive = temp_dir.path().join("documents.zip");
        write_zip(&archive, &[("a.txt", "alpha")]);
        fs::write(temp_dir.path().join("a.txt"), "tampered").unwrap();

        let report = unpacker(&temp_dir).unpack(None).unwrap();

        assert!(!report.all_succeeded());
        assert!(archive.exists());
        assert_eq!(report.kept_containers.len(), 1);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("a.txt")).unwrap(),
            "tampered"
        );
    }

    #[test]
    fn test_identical_existing_file_still_allows_delete() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let archive = temp_dir.path().join("documents.zip");
        write_zip(&archive, &[("a.txt", "alpha")]);
        fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();

        let report = unpacker(&temp_dir).unpack(None).unwrap();

        assert!(report.all_succeeded());
        assert!(report.extracted.is_empty());
        assert!(!archive.exists());
    }

    #[test]
    fn test_unpack_folder_and_remove_when_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path().join("images");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("a.png"), "png").unwrap();

        let report = unpacker(&temp_dir).unpack(None).unwrap();

        assert!(report.all_succeeded());
        assert_eq!(report.moved, vec![temp_dir.path().join("a.png")]);
        assert!(!folder.exists());
    }

    #[test]
    fn test_folder_with_collision_is_kept() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let folder = temp_dir.path().join("images");
        fs::create_dir(&folder).unwrap();
        fs::write(folder.join("a.png"), "inside").unwrap();
        fs::write(folder.join("b.png"), "inside").unwrap();
        fs::write(temp_dir.path().join("a.png"), "outside").unwrap();

        let report = unpacker(&temp_dir).unpack(None).unwrap();

        assert!(folder.join("a.png").exists());
        assert!(temp_dir.path().join("b.png").exists());
        assert_eq!(report.kept_containers.len(), 1);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("a.png")).unwrap(),
            "outside"
        );
    }

    #[test]
    fn test_explicit_targets_only() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        write_zip(&temp_dir.path().join("documents.zip"), &[("a.txt", "alpha")]);
        write_zip(&temp_dir.path().join("images.zip"), &[("b.png", "beta")]);

        let targets = vec!["images.zip".to_string(), "missing.zip".to_string()];
        let report = unpacker(&temp_dir).unpack(Some(targets.as_slice())).unwrap();

        assert_eq!(report.missing_targets, vec!["missing.zip".to_string()]);
        assert!(temp_dir.path().join("b.png").exists());
        assert!(!temp_dir.path().join("a.txt").exists());
        assert!(temp_dir.path().join("documents.zip").exists());
    }

    #[test]
    fn test_no_valid_targets_is_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let targets = vec!["nothing".to_string()];

        let result = unpacker(&temp_dir).unpack(Some(targets.as_slice()));
        assert!(matches!(result, Err(OrganizeError::NoUnpackTargets { .. })));
    }

    #[test]
    fn test_parent_directory_is_not_a_target() {
        let outer = TempDir::new().expect("Failed to create temp directory");
        let target = outer.path().join("downloads");
        fs::create_dir(&target).unwrap();
        fs::write(outer.path().join("sibling.txt"), "outside").unwrap();
        let unpacker = Unpacker::new(ContainerManager::new(&target, CategoryIndex::default()));

        let targets = vec!["..".to_string()];
        let result = unpacker.unpack(Some(targets.as_slice()));

        assert!(matches!(result, Err(OrganizeError::NoUnpackTargets { .. })));
        assert!(outer.path().join("sibling.txt").exists());
        assert!(!target.join("sibling.txt").exists());
    }

    #[test]
    fn test_no_containers_is_empty_success() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let report = unpacker(&temp_dir).unpack(None).unwrap();
        assert!(report.all_succeeded());
        assert!(report.removed_containers.is_empty());
    }

    #[test]
    fn test_record_verify_detects_change() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let destination = temp_dir.path().join("a.txt");
        fs::write(&destination, "alpha").unwrap();
        let mut record = ExtractionRecord {
            member_name: "a.txt".to_string(),
            container: temp_dir.path().join("documents.zip"),
            destination: destination.clone(),
            expected_hash: hashing::hash_file(&destination).unwrap(),
        };

        assert!(record.verify().unwrap());
        record.expected_hash = "0".repeat(64);
        assert!(!record.verify().unwrap());
    }
}
