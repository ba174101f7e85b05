//! Category folders and zip archives inside the target directory.
//!
//! A container is owned by the program when its base name is a configured
//! category or [`UNKNOWN_CATEGORY`](crate::category::UNKNOWN_CATEGORY).
//! Folders are `<category>/`, archives are `<category>.zip`.

use crate::category::CategoryIndex;
use crate::error::{OrganizeError, OrganizeResult};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use zip::{ZipArchive, ZipWriter};

/// File extension used for archive containers.
pub const ARCHIVE_EXTENSION: &str = "zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Folder,
    Archive,
}

/// A folder or archive that holds the files of one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub category: String,
    pub kind: ContainerKind,
    pub path: PathBuf,
    /// Whether the container was on disk when this value was produced.
    pub exists: bool,
}

/// Program-owned containers found in the target directory, sorted by path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExistingContainers {
    pub archives: Vec<Container>,
    pub folders: Vec<Container>,
}

impl ExistingContainers {
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty() && self.folders.is_empty()
    }

    /// Archives first, then folders.
    pub fn into_vec(self) -> Vec<Container> {
        let mut all = self.archives;
        all.extend(self.folders);
        all
    }
}

/// Creates and finds containers in one target directory.
#[derive(Debug, Clone)]
pub struct ContainerManager {
    target: PathBuf,
    index: CategoryIndex,
}

impl ContainerManager {
    pub fn new(target: impl Into<PathBuf>, index: CategoryIndex) -> Self {
        Self {
            target: target.into(),
            index,
        }
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn index(&self) -> &CategoryIndex {
        &self.index
    }

    /// Returns the folder for `category`, creating it if needed.
    ///
    /// Calling this again for the same category is a no-op.
    pub fn ensure_folder(&self, category: &str) -> OrganizeResult<Container> {
        let container = self.locate_folder(category);
        if container.exists {
            return Ok(container);
        }
        if container.path.exists() {
            return Err(OrganizeError::container(
                &container.path,
                io::Error::new(io::ErrorKind::AlreadyExists, "path exists but is not a directory"),
            ));
        }

        fs::create_dir(&container.path).map_err(|e| OrganizeError::container(&container.path, e))?;
        tracing::info!(path = %container.path.display(), "created folder");
        Ok(Container {
            exists: true,
            ..container
        })
    }

    /// Returns the archive for `category`, creating an empty one if needed.
    ///
    /// An existing archive is left untouched.
    pub fn ensure_archive(&self, category: &str) -> OrganizeResult<Container> {
        let container = self.locate_archive(category);
        if container.exists {
            return Ok(container);
        }
        if container.path.exists() {
            return Err(OrganizeError::container(
                &container.path,
                io::Error::new(io::ErrorKind::AlreadyExists, "path exists but is not a file"),
            ));
        }

        let file =
            File::create(&container.path).map_err(|e| OrganizeError::container(&container.path, e))?;
        ZipWriter::new(file)
            .finish()
            .map_err(|e| OrganizeError::archive(&container.path, e))?;
        tracing::info!(path = %container.path.display(), "created archive");
        Ok(Container {
            exists: true,
            ..container
        })
    }

    /// Describes the folder for `category` without creating it.
    pub fn locate_folder(&self, category: &str) -> Container {
        let path = self.target.join(category);
        Container {
            category: category.to_string(),
            kind: ContainerKind::Folder,
            exists: path.is_dir(),
            path,
        }
    }

    /// Describes the archive for `category` without creating it.
    pub fn locate_archive(&self, category: &str) -> Container {
        let path = self
            .target
            .join(format!("{category}.{ARCHIVE_EXTENSION}"));
        Container {
            category: category.to_string(),
            kind: ContainerKind::Archive,
            exists: path.is_file(),
            path,
        }
    }

    /// Lists the program-owned folders and archives directly in the target.
    pub fn list_existing_containers(&self) -> OrganizeResult<ExistingContainers> {
        let entries = fs::read_dir(&self.target).map_err(|e| OrganizeError::ReadDirectory {
            path: self.target.clone(),
            source: e,
        })?;

        let mut found = ExistingContainers::default();
        for entry in entries.flatten() {
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();

            if file_type.is_dir() && self.index.owns_container_name(&name) {
                found.folders.push(self.locate_folder(&name));
            } else if file_type.is_file()
                && let Some(category) = self.archive_category(&name)
            {
                found.archives.push(self.locate_archive(category));
            }
        }

        found.archives.sort_by(|a, b| a.path.cmp(&b.path));
        found.folders.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::debug!(
            archives = found.archives.len(),
            folders = found.folders.len(),
            "listed existing containers"
        );
        Ok(found)
    }

    /// Resolves a user-supplied name such as `images` or `images.zip`.
    ///
    /// Any existing folder or `.zip` file directly in the target qualifies,
    /// owned or not. Names with separators, `.`, `..` or a root are refused,
    /// so nothing outside the target resolves. Returns `None` otherwise.
    pub fn resolve(&self, name: &str) -> Option<Container> {
        if !is_plain_name(name) {
            tracing::warn!(name = %name, "not a plain name inside the target, ignoring");
            return None;
        }
        let path = self.target.join(name);
        let stem = |p: &Path| {
            p.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };

        if path.is_dir() {
            let category = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Some(Container {
                category,
                kind: ContainerKind::Folder,
                path,
                exists: true,
            })
        } else if path.is_file() && is_zip_name(&path) {
            Some(Container {
                category: stem(&path),
                kind: ContainerKind::Archive,
                path,
                exists: true,
            })
        } else {
            None
        }
    }

    /// Returns true if `path` names a program-owned archive.
    ///
    /// Used to keep the program's own zips out of the file listing.
    pub fn is_container_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| self.archive_category(name))
            .is_some()
    }

    fn archive_category<'n>(&self, file_name: &'n str) -> Option<&'n str> {
        file_name
            .strip_suffix(ARCHIVE_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|stem| self.index.owns_container_name(stem))
    }
}

/// Names of the members stored in the archive at `path`.
pub fn archive_member_names(path: &Path) -> OrganizeResult<HashSet<String>> {
    let file = File::open(path).map_err(|e| OrganizeError::container(path, e))?;
    let archive = ZipArchive::new(file).map_err(|e| OrganizeError::archive(path, e))?;
    Ok(archive.file_names().map(str::to_string).collect())
}

/// True when `name` is exactly one normal path component.
pub(crate) fn is_plain_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(first)), None) if first == name
    )
}

fn is_zip_name(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION))
}
