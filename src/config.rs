//! Configuration: duplicate-handling settings, listing filters and the
//! category table, loaded from TOML.
//!
//! # Configuration File Format
//!
//! ```toml
//! [settings]
//! target_directory = "/home/me/Downloads"
//! delete_duplicate_files = false
//! rename_orphaned_duplicates = true
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db", ".DS_Store"]
//! patterns = ["*.part", "*.crdownload"]
//!
//! [filters.include]
//! patterns = []
//!
//! [categories]
//! images = ["jpg", "png"]
//! documents = ["pdf", "txt"]
//! ```
//!
//! Category order in the file is the tie-break order for extensions
//! declared more than once. Without a `[categories]` table the built-in
//! one from [`CategoryIndex::default`] is used.

use crate::category::CategoryIndex;
use crate::error::{OrganizeError, OrganizeResult};
use glob::Pattern;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".packrat.toml";

/// Errors that can occur while loading configuration.
///
/// All of these are fatal and are raised before anything on disk changes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Invalid glob pattern in the listing filters.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    /// A category that cannot be used as a container name.
    #[error("Invalid category '{name}': {reason}")]
    InvalidCategory { name: String, reason: String },
}

/// Duplicate handling and the default target directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Directory to organize when none is given on the command line.
    #[serde(default)]
    pub target_directory: Option<PathBuf>,

    /// Delete copies whose original sits next to them.
    #[serde(default)]
    pub delete_duplicate_files: bool,

    /// Strip the copy tag from copies that have no original.
    #[serde(default)]
    pub rename_orphaned_duplicates: bool,
}

impl Settings {
    /// Picks the directory to work on and checks that it exists.
    ///
    /// The command-line override wins, then `target_directory`, then
    /// `$HOME/Downloads`. The result is canonicalized.
    pub fn resolve_target_directory(&self, cli_target: Option<&Path>) -> OrganizeResult<PathBuf> {
        let candidate = match (cli_target, &self.target_directory) {
            (Some(path), _) => path.to_path_buf(),
            (None, Some(path)) => path.clone(),
            (None, None) => std::env::var("HOME")
                .map(|home| PathBuf::from(home).join("Downloads"))
                .map_err(|_| OrganizeError::InvalidTargetDirectory {
                    path: PathBuf::from("~/Downloads"),
                    reason: "no target given and HOME is not set".to_string(),
                })?,
        };

        if !candidate.is_dir() {
            return Err(OrganizeError::InvalidTargetDirectory {
                path: candidate,
                reason: "not an existing directory".to_string(),
            });
        }

        fs::canonicalize(&candidate).map_err(|e| OrganizeError::InvalidTargetDirectory {
            path: candidate,
            reason: e.to_string(),
        })
    }
}

/// Rules deciding which files of the target directory are considered.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Include rules override exclude rules and the hidden-file filter.
    #[serde(default)]
    pub include: IncludeRules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact filenames to leave alone (e.g., "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the file name (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub filters: FilterRules,

    /// Category name to extensions, in file order.
    #[serde(default)]
    pub categories: Option<IndexMap<String, Vec<String>>>,
}

impl Config {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.packrat.toml` in the current directory
    /// 3. Look for `~/.config/packrat/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any file found is not valid.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("packrat")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        tracing::debug!(path = %path.display(), "loading configuration");
        Self::from_toml(&content)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Builds the category index, falling back to the built-in table.
    pub fn category_index(&self) -> Result<CategoryIndex, ConfigError> {
        match &self.categories {
            Some(mapping) => CategoryIndex::new(mapping.clone()),
            None => Ok(CategoryIndex::default()),
        }
    }

    /// Compile the listing filters for matching.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob pattern is invalid.
    pub fn compile_filters(&self) -> Result<CompiledFilters, ConfigError> {
        CompiledFilters::new(&self.filters)
    }
}

/// Listing filters with their glob patterns parsed once.
#[derive(Debug, Clone, Default)]
pub struct CompiledFilters {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    fn new(rules: &FilterRules) -> Result<Self, ConfigError> {
        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_patterns: compile_patterns(&rules.exclude.patterns)?,
            include_patterns: compile_patterns(&rules.include.patterns)?,
        })
    }

    /// Check if a file should be part of the listing.
    ///
    /// Include patterns win; then hidden files, exact names and exclude
    /// patterns are rejected in that order.
    pub fn should_include(&self, file_name: &str) -> bool {
        if self.include_patterns.iter().any(|p| p.matches(file_name)) {
            return true;
        }
        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }
        if self.exclude_filenames.contains(file_name) {
            return false;
        }
        !self.exclude_patterns.iter().any(|p| p.matches(file_name))
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                pattern: pattern.clone(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}
