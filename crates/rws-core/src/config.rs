//! Configuration structures for regex working sets.
//!
//! This module provides configuration types for all components:
//!
//! - [`WorkspaceConfig`] - Where the workspace lives and how it is traversed
//! - [`WatchConfig`] - File watcher settings (debouncing, recursion)
//! - [`GroupConfig`] - One rule-defined group to maintain
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] and deserialize with
//! `#[serde(default)]`, so a configuration file only needs the fields it
//! changes.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the per-project metadata file whose change triggers a re-match.
pub const DEFAULT_METADATA_FILE_NAME: &str = ".project";

/// Configuration for the workspace being classified.
///
/// # Examples
///
/// ```
/// use rws_core::WorkspaceConfig;
///
/// let config = WorkspaceConfig::default();
/// assert_eq!(config.metadata_file_name, ".project");
/// assert!(!config.follow_links);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root directory of the workspace. Resource paths are relative to it.
    pub root: Utf8PathBuf,

    /// File name that marks a project description change.
    pub metadata_file_name: String,

    /// Whether to follow symbolic links while traversing.
    pub follow_links: bool,

    /// Directory names that are never traversed or reported.
    pub skip_dirs: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            metadata_file_name: DEFAULT_METADATA_FILE_NAME.to_owned(),
            follow_links: false,
            skip_dirs: vec![".git".to_owned()],
        }
    }
}

impl WorkspaceConfig {
    /// Checks that the root exists and is a directory.
    pub fn ensure_root(&self) -> Result<(), ConfigError> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(ConfigError::MissingDirectory(self.root.clone()))
        }
    }
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use rws_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// All changes inside one window are delivered as one batch.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
        }
    }
}

/// One rule-defined group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Display label for the group.
    pub label: String,

    /// Newline-separated rule text (`-` excludes, `#` comments).
    pub rules: String,
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use rws_core::Config;
///
/// let config = Config::from_json_str(r#"{"groups": [{"label": "txt", "rules": "\\.txt$"}]}"#)?;
/// assert_eq!(config.groups.len(), 1);
/// assert_eq!(config.watch.debounce_ms, 100);
/// # Ok::<(), rws_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace configuration.
    pub workspace: WorkspaceConfig,

    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Groups to maintain.
    pub groups: Vec<GroupConfig>,
}

impl Config {
    /// Parses a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads and validates a configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values no component can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workspace.root.as_str().is_empty() {
            return Err(ConfigError::invalid_option(
                "workspace.root",
                "must not be empty",
            ));
        }
        if self.workspace.metadata_file_name.is_empty() {
            return Err(ConfigError::invalid_option(
                "workspace.metadata_file_name",
                "must not be empty",
            ));
        }
        if self.watch.debounce_ms == 0 {
            return Err(ConfigError::invalid_option(
                "watch.debounce_ms",
                "must be positive",
            ));
        }
        Ok(())
    }
}
