//! Packing classified files into category containers.
//!
//! Files are either moved into `<category>/` folders or stored in
//! `<category>.zip` archives inside the target directory. A problem with one
//! file is recorded in the [`PackReport`] and the rest of the batch goes on.

use crate::category::Classification;
use crate::container::{Container, ContainerManager, archive_member_names};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files at or above this size are written with zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// How files are placed into their category containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackMode {
    /// Move into `<category>/` folders.
    Move,
    /// Store in `<category>.zip` archives.
    Archive,
}

/// Report of a pack run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackReport {
    /// Files now inside a container, as (original path, container path).
    pub packed: Vec<(PathBuf, PathBuf)>,
    /// Files left in place on purpose, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
    /// Files that could not be packed, with the error.
    pub failed: Vec<(PathBuf, String)>,
}

impl PackReport {
    /// Returns the total number of files processed.
    pub fn total_processed(&self) -> usize {
        self.packed.len() + self.skipped.len() + self.failed.len()
    }

    /// Returns true if no file failed. Skipped files do not count as failures.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    fn fail_all(&mut self, files: &[PathBuf], reason: &str) {
        self.failed
            .extend(files.iter().map(|f| (f.clone(), reason.to_string())));
    }
}

/// Moves or archives classified files into their category containers.
pub struct FileOrganizer {
    containers: ContainerManager,
}

impl FileOrganizer {
    pub fn new(containers: ContainerManager) -> Self {
        Self { containers }
    }

    pub fn pack(&self, classification: &Classification, mode: PackMode) -> PackReport {
        match mode {
            PackMode::Move => self.move_to_folders(classification),
            PackMode::Archive => self.archive_to_zips(classification),
        }
    }

    /// Moves every file into its category folder.
    ///
    /// Folders are created as needed. A file whose name is already taken in
    /// the folder is skipped and stays where it is.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use packrat::category::{classify, CategoryIndex, UnknownExtensions};
    /// use packrat::container::ContainerManager;
    /// use packrat::file_organizer::FileOrganizer;
    /// use std::path::PathBuf;
    ///
    /// let index = CategoryIndex::default();
    /// let files = vec![PathBuf::from("/path/to/base/image.png")];
    /// let classification = classify(&files, &index, &mut UnknownExtensions::new());
    ///
    /// let organizer = FileOrganizer::new(ContainerManager::new("/path/to/base", index));
    /// let report = organizer.move_to_folders(&classification);
    /// println!("{} moved, {} failed", report.packed.len(), report.failed.len());
    /// ```
    pub fn move_to_folders(&self, classification: &Classification) -> PackReport {
        let mut report = PackReport::default();
        tracing::info!(files = classification.file_count(), "moving files");

        for (category, files) in classification.iter() {
            let folder = match self.containers.ensure_folder(category) {
                Ok(folder) => folder,
                Err(e) => {
                    tracing::error!(category, error = %e, "cannot create folder");
                    report.fail_all(files, &e.to_string());
                    continue;
                }
            };

            tracing::debug!(category, count = files.len(), "moving files to folder");
            for file in files {
                Self::move_one(file, &folder, &mut report);
            }
        }

        tracing::info!(count = report.packed.len(), "files moved");
        report
    }

    fn move_one(file: &Path, folder: &Container, report: &mut PackReport) {
        if !file.is_file() {
            tracing::error!(path = %file.display(), "file does not exist, skipping");
            report
                .failed
                .push((file.to_path_buf(), "file does not exist".to_string()));
            return;
        }
        let Some(file_name) = file.file_name() else {
            report
                .failed
                .push((file.to_path_buf(), "file has no name component".to_string()));
            return;
        };

        let destination = folder.path.join(file_name);
        if destination.exists() {
            tracing::warn!(
                path = %file.display(),
                folder = %folder.path.display(),
                "name already taken in folder, leaving file in place"
            );
            report.skipped.push((
                file.to_path_buf(),
                format!("already exists in {}", folder.path.display()),
            ));
            return;
        }

        match fs::rename(file, &destination) {
            Ok(()) => {
                tracing::debug!(path = %file.display(), to = %destination.display(), "moved");
                report.packed.push((file.to_path_buf(), folder.path.clone()));
            }
            Err(e) => {
                tracing::error!(path = %file.display(), error = %e, "move failed");
                report.failed.push((file.to_path_buf(), e.to_string()));
            }
        }
    }

    /// Stores every file in its category archive and removes the source.
    ///
    /// Members are named by the file's base name. A member that is already
    /// in the archive is skipped and its source kept. Sources are deleted
    /// only after the archive has been closed, reopened and found to list
    /// their member.
    pub fn archive_to_zips(&self, classification: &Classification) -> PackReport {
        let mut report = PackReport::default();
        tracing::info!(files = classification.file_count(), "archiving files");

        for (category, files) in classification.iter() {
            let archive = match self.containers.ensure_archive(category) {
                Ok(archive) => archive,
                Err(e) => {
                    tracing::error!(category, error = %e, "cannot create archive");
                    report.fail_all(files, &e.to_string());
                    continue;
                }
            };

            tracing::debug!(
                category,
                count = files.len(),
                archive = %archive.path.display(),
                "archiving files"
            );
            if let Err(reason) = Self::archive_category(&archive, files, &mut report) {
                tracing::error!(archive = %archive.path.display(), error = %reason, "archive failed");
            }
        }

        tracing::info!(count = report.packed.len(), "files archived");
        report
    }

    /// Adds `files` to `archive` through one append handle, then removes
    /// the sources whose members are confirmed.
    ///
    /// Returns `Err` when the archive itself failed; the affected files
    /// have already been recorded as failed.
    fn archive_category(
        archive: &Container,
        files: &[PathBuf],
        report: &mut PackReport,
    ) -> Result<(), String> {
        let mut present = match archive_member_names(&archive.path) {
            Ok(names) => names,
            Err(e) => {
                report.fail_all(files, &e.to_string());
                return Err(e.to_string());
            }
        };

        let handle = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&archive.path)
            .map_err(|e| e.to_string())
            .and_then(|file| ZipWriter::new_append(file).map_err(|e| e.to_string()));
        let mut writer = match handle {
            Ok(writer) => writer,
            Err(reason) => {
                report.fail_all(files, &reason);
                return Err(reason);
            }
        };

        let mut written: Vec<(PathBuf, String)> = Vec::new();
        for file in files {
            if !file.is_file() {
                tracing::error!(path = %file.display(), "file does not exist, skipping");
                report
                    .failed
                    .push((file.clone(), "file does not exist".to_string()));
                continue;
            }
            let Some(member) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                report
                    .failed
                    .push((file.clone(), "file has no name component".to_string()));
                continue;
            };
            if present.contains(&member) {
                tracing::info!(
                    member = %member,
                    archive = %archive.path.display(),
                    "already in archive, skipping"
                );
                report.skipped.push((
                    file.clone(),
                    format!("already in {}", archive.path.display()),
                ));
                continue;
            }

            match Self::write_member(&mut writer, file, &member) {
                Ok(()) => {
                    tracing::debug!(member = %member, "added to archive");
                    present.insert(member.clone());
                    written.push((file.clone(), member));
                }
                Err(e) => {
                    tracing::error!(path = %file.display(), error = %e, "failed to add to archive");
                    if let Err(abort) = writer.abort_file() {
                        tracing::warn!(error = %abort, "could not discard partial member");
                    }
                    report.failed.push((file.clone(), e.to_string()));
                }
            }
        }

        if let Err(e) = writer.finish() {
            let reason = format!("failed to finish archive: {e}");
            for (file, _) in written {
                report.failed.push((file, reason.clone()));
            }
            return Err(reason);
        }

        Self::remove_confirmed(archive, written, report);
        Ok(())
    }

    fn write_member(
        writer: &mut ZipWriter<File>,
        file: &Path,
        member: &str,
    ) -> Result<(), zip::result::ZipError> {
        let mut source = File::open(file)?;
        let size = source.metadata()?.len();
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(size >= ZIP64_THRESHOLD);

        writer.start_file(member, options)?;
        io::copy(&mut source, writer)?;
        Ok(())
    }

    /// Deletes each source whose member the reopened archive lists.
    fn remove_confirmed(
        archive: &Container,
        written: Vec<(PathBuf, String)>,
        report: &mut PackReport,
    ) {
        let listed: HashSet<String> = match archive_member_names(&archive.path) {
            Ok(names) => names,
            Err(e) => {
                for (file, _) in written {
                    report
                        .failed
                        .push((file, format!("could not confirm archive contents: {e}")));
                }
                return;
            }
        };

        for (file, member) in written {
            if !listed.contains(&member) {
                tracing::error!(member = %member, "member missing after write, keeping source");
                report
                    .failed
                    .push((file, "member missing from archive after write".to_string()));
                continue;
            }
            match fs::remove_file(&file) {
                Ok(()) => report.packed.push((file, archive.path.clone())),
                Err(e) => {
                    tracing::error!(path = %file.display(), error = %e, "archived but source not removed");
                    report
                        .failed
                        .push((file, format!("archived but source not removed: {e}")));
                }
            }
        }
    }
}
