//! Extension-based categorization of files.
//!
//! A [`CategoryIndex`] maps category names to the extensions they own, in a
//! fixed order. [`classify`] uses it to split a listing into per-category
//! buckets, with everything unrecognized landing in [`UNKNOWN_CATEGORY`].
//!
//! # Examples
//!
//! ```
//! use packrat::category::{CategoryIndex, UNKNOWN_CATEGORY};
//!
//! let index = CategoryIndex::default();
//! assert_eq!(index.category_for("holiday.JPG"), Some("images"));
//! assert_eq!(index.category_for("notes"), None);
//! assert_eq!(UNKNOWN_CATEGORY, "unknowns");
//! ```

use crate::config::ConfigError;
use indexmap::{IndexMap, IndexSet};
use std::path::{Path, PathBuf};

/// Bucket for files that match no configured category.
pub const UNKNOWN_CATEGORY: &str = "unknowns";

/// Recorded in [`UnknownExtensions`] for files without an extension.
pub const NO_EXTENSION: &str = "<none>";

/// Built-in category table, used when the configuration has no `[categories]`.
const DEFAULT_CATEGORIES: &[(&str, &[&str])] = &[
    (
        "images",
        &[
            "jpg", "jpeg", "png", "gif", "bmp", "svg", "tiff", "psd", "heic", "heif", "webp",
            "ico", "raw",
        ],
    ),
    (
        "audio",
        &["aac", "flac", "m4a", "m4b", "mp3", "ogg", "oga", "opus", "wav", "wma"],
    ),
    (
        "videos",
        &[
            "3g2", "3gp", "avi", "flv", "m4v", "mkv", "mov", "mp4", "mpg", "mpeg", "webm", "wmv",
        ],
    ),
    (
        "documents",
        &[
            "doc", "docx", "odt", "pdf", "rtf", "tex", "txt", "md", "epub", "ppt", "pptx", "odp",
            "xls", "xlsx", "ods",
        ],
    ),
    (
        "archives",
        &["7z", "rar", "zip", "tar", "tar.gz", "tgz", "tar.xz", "tar.bz2", "gz", "xz"],
    ),
    ("disc_images", &["dmg", "iso", "img", "vcd"]),
    ("data", &["csv", "db", "sqlite", "json", "xml", "yaml", "yml", "sql", "log"]),
    (
        "code",
        &[
            "c", "cpp", "h", "hpp", "cs", "java", "js", "ts", "py", "rs", "go", "rb", "sh", "html",
            "css",
        ],
    ),
    (
        "executables",
        &["apk", "appimage", "bat", "deb", "exe", "jar", "msi", "rpm", "cmd", "ps1"],
    ),
    ("fonts", &["ttf", "otf", "woff", "woff2"]),
    ("models", &["3mf", "blend", "fbx", "gltf", "glb", "obj", "stl", "ply"]),
    ("torrents", &["torrent"]),
];

/// Immutable, ordered mapping from category name to extensions.
///
/// Extensions are compared case-insensitively. The same extension may appear
/// under several categories; the one declared first wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryIndex {
    categories: Vec<(String, Vec<String>)>,
}

impl CategoryIndex {
    /// Builds an index from configuration order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCategory`] for a name that is empty,
    /// collides with [`UNKNOWN_CATEGORY`], or cannot be a single folder or
    /// archive name in the target directory.
    pub fn new(mapping: IndexMap<String, Vec<String>>) -> Result<Self, ConfigError> {
        let mut categories = Vec::with_capacity(mapping.len());
        for (name, extensions) in mapping {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ConfigError::InvalidCategory {
                    name,
                    reason: "category name is empty".to_string(),
                });
            }
            if name == UNKNOWN_CATEGORY {
                return Err(ConfigError::InvalidCategory {
                    name,
                    reason: format!("'{}' is reserved", UNKNOWN_CATEGORY),
                });
            }
            if let Some(reason) = container_name_problem(&name) {
                return Err(ConfigError::InvalidCategory {
                    name,
                    reason: reason.to_string(),
                });
            }
            let extensions = extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect();
            categories.push((name, extensions));
        }
        Ok(Self { categories })
    }

    /// Returns the category that owns `file_name`, if any.
    ///
    /// A file matches when its lower-cased name ends with `.` followed by
    /// one of the category's extensions, so `tar.gz` works as well as `gz`.
    pub fn category_for(&self, file_name: &str) -> Option<&str> {
        let lower = file_name.to_lowercase();
        self.categories
            .iter()
            .find(|(_, extensions)| {
                extensions.iter().any(|ext| {
                    lower
                        .strip_suffix(ext.as_str())
                        .and_then(|rest| rest.strip_suffix('.'))
                        .is_some_and(|stem| !stem.is_empty())
                })
            })
            .map(|(name, _)| name.as_str())
    }

    /// Returns true if `name` is a configured category or [`UNKNOWN_CATEGORY`].
    pub fn owns_container_name(&self, name: &str) -> bool {
        name == UNKNOWN_CATEGORY || self.categories.iter().any(|(c, _)| c == name)
    }

    /// Category names in configuration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Why `name` cannot name a container directly in the target, if it can't.
fn container_name_problem(name: &str) -> Option<&'static str> {
    if name == "." || name == ".." {
        return Some("must not be '.' or '..'");
    }
    if name.contains(['/', '\\']) {
        return Some("must not contain a path separator");
    }
    if name.to_lowercase().ends_with(".zip") {
        return Some("must not end in .zip");
    }
    None
}

impl Default for CategoryIndex {
    fn default() -> Self {
        Self {
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, exts)| {
                    (
                        name.to_string(),
                        exts.iter().map(|ext| ext.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

/// Extensions seen during classification that no category claims.
///
/// Kept by the caller across calls so the set can be offered as a hint for
/// extending the configuration.
#[derive(Debug, Default, Clone)]
pub struct UnknownExtensions {
    seen: IndexSet<String>,
}

impl UnknownExtensions {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, path: &Path) {
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| NO_EXTENSION.to_string());
        self.seen.insert(ext);
    }

    pub fn contains(&self, ext: &str) -> bool {
        self.seen.contains(ext)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.seen.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Files grouped by category.
///
/// Buckets follow configuration order with [`UNKNOWN_CATEGORY`] last. Only
/// populated buckets are present, and every input path is in exactly one.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Classification {
    buckets: IndexMap<String, Vec<PathBuf>>,
}

impl Classification {
    pub fn get(&self, category: &str) -> Option<&[PathBuf]> {
        self.buckets.get(category).map(Vec::as_slice)
    }

    /// Iterates `(category, files)` in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.buckets
            .iter()
            .map(|(name, files)| (name.as_str(), files.as_slice()))
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.buckets.keys().map(String::as_str)
    }

    /// Total number of classified files.
    pub fn file_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Groups `paths` by category.
///
/// Total over any input: a path with no extension, or one no category
/// claims, goes to [`UNKNOWN_CATEGORY`] and its extension is recorded in
/// `unknown`. Nothing else is touched.
///
/// # Examples
///
/// ```
/// use packrat::category::{classify, CategoryIndex, UnknownExtensions};
/// use std::path::PathBuf;
///
/// let index = CategoryIndex::default();
/// let mut unknown = UnknownExtensions::new();
/// let paths = vec![PathBuf::from("/tmp/a.png"), PathBuf::from("/tmp/b.xyz")];
/// let result = classify(&paths, &index, &mut unknown);
///
/// assert_eq!(result.get("images").unwrap().len(), 1);
/// assert_eq!(result.get("unknowns").unwrap().len(), 1);
/// assert!(unknown.contains("xyz"));
/// ```
pub fn classify(
    paths: &[PathBuf],
    index: &CategoryIndex,
    unknown: &mut UnknownExtensions,
) -> Classification {
    let mut by_category: IndexMap<&str, Vec<PathBuf>> =
        index.names().map(|name| (name, Vec::new())).collect();
    let mut unknowns = Vec::new();

    for path in paths {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        match index
            .category_for(&file_name)
            .and_then(|category| by_category.get_mut(category))
        {
            Some(bucket) => bucket.push(path.clone()),
            None => {
                unknown.record(path);
                unknowns.push(path.clone());
            }
        }
    }

    let mut buckets: IndexMap<String, Vec<PathBuf>> = by_category
        .into_iter()
        .filter(|(_, files)| !files.is_empty())
        .map(|(name, files)| (name.to_string(), files))
        .collect();
    if !unknowns.is_empty() {
        buckets.insert(UNKNOWN_CATEGORY.to_string(), unknowns);
    }

    tracing::debug!(
        categories = buckets.len(),
        files = paths.len(),
        "classified listing"
    );
    Classification { buckets }
}
