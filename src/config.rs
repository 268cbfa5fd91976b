//! Scan and organize settings.
//!
//! Settings are read from an optional TOML file. They provide the default
//! extension list, the reserved directory filters applied during traversal,
//! and the name collision policy used when organizing.
//!
//! # Configuration File Format
//!
//! ```toml
//! [scan]
//! extensions = ["pdf", "png", "rar"]
//! skip_prefixes = ["$"]
//! skip_tokens = ["windows"]
//! skip_hidden = false
//!
//! [scan.exclude]
//! patterns = ["**/node_modules"]
//! regex = []
//!
//! [organize]
//! on_conflict = "rename"
//! ```

use crate::extensions::ExtensionSet;
use crate::file_organizer::ConflictPolicy;
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-directory settings file.
pub const LOCAL_CONFIG_FILE: &str = ".extsortrc.toml";

/// Errors that can occur during configuration loading and compilation.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    ConfigNotFound(PathBuf),
    /// Invalid TOML syntax or structure.
    ConfigInvalid(String),
    /// Invalid glob pattern provided.
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    InvalidRegexPattern {
        /// The regex pattern that failed to compile.
        pattern: String,
        /// The reason why the pattern is invalid.
        reason: String,
    },
    /// IO error while reading configuration.
    IoError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ConfigNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ConfigInvalid(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::InvalidGlobPattern(pattern) => {
                write!(f, "Invalid glob pattern '{}'", pattern)
            }
            ConfigError::InvalidRegexPattern { pattern, reason } => {
                write!(f, "Invalid regex pattern '{}': {}", pattern, reason)
            }
            ConfigError::IoError(msg) => write!(f, "IO error reading configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Top-level settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub scan: ScanSettings,
    #[serde(default)]
    pub organize: OrganizeSettings,
}

/// Settings that shape a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Extensions used when none are given on the command line.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directories whose name starts with one of these are pruned.
    #[serde(default = "default_skip_prefixes")]
    pub skip_prefixes: Vec<String>,

    /// Directories whose name contains one of these (case-insensitive) are pruned.
    #[serde(default = "default_skip_tokens")]
    pub skip_tokens: Vec<String>,

    /// Whether dot-directories are pruned. Defaults to false.
    #[serde(default)]
    pub skip_hidden: bool,

    #[serde(default)]
    pub exclude: ExcludeRules,
}

fn default_extensions() -> Vec<String> {
    vec!["pdf".to_string(), "png".to_string(), "rar".to_string()]
}

fn default_skip_prefixes() -> Vec<String> {
    vec!["$".to_string()]
}

fn default_skip_tokens() -> Vec<String> {
    vec!["windows".to_string()]
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            skip_prefixes: default_skip_prefixes(),
            skip_tokens: default_skip_tokens(),
            skip_hidden: false,
            exclude: ExcludeRules::default(),
        }
    }
}

/// Extra directory exclusion rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Glob patterns matched against directory paths (e.g. "**/node_modules").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regex patterns matched against directory names.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Settings that shape an organize run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizeSettings {
    #[serde(default)]
    pub on_conflict: ConflictPolicy,
}

impl Settings {
    /// Load settings from a file, with fallback to defaults.
    ///
    /// Attempts to load settings in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.extsortrc.toml` in the current directory
    /// 3. Look for `~/.config/extsort/config.toml` in home directory
    /// 4. Fall back to default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read,
    /// or if any discovered file fails to parse.
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
                .join("extsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        log::info!("loaded settings from {}", path.display());

        Self::from_toml(&content)
    }

    /// Parses settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The extension set used when the caller gives none.
    pub fn default_extensions(&self) -> ExtensionSet {
        self.scan.extensions.iter().collect()
    }

    /// Compile the scan rules into a directory filter.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn directory_filter(&self) -> Result<DirectoryFilter, ConfigError> {
        DirectoryFilter::new(&self.scan)
    }
}

/// Compiled rules deciding which directories the scanner prunes.
///
/// A pruned directory is never descended into, so none of its descendants
/// appear in scan results.
#[derive(Debug, Clone)]
pub struct DirectoryFilter {
    skip_prefixes: Vec<String>,
    skip_tokens: Vec<String>,
    skip_hidden: bool,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
}

impl Default for DirectoryFilter {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
            skip_tokens: default_skip_tokens(),
            skip_hidden: false,
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
        }
    }
}

impl DirectoryFilter {
    fn new(settings: &ScanSettings) -> Result<Self, ConfigError> {
        let exclude_patterns = settings
            .exclude
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let exclude_regexes = settings
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            skip_prefixes: settings
                .skip_prefixes
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
            skip_tokens: settings
                .skip_tokens
                .iter()
                .filter(|t| !t.is_empty())
                .map(|t| t.to_lowercase())
                .collect(),
            skip_hidden: settings.skip_hidden,
            exclude_patterns,
            exclude_regexes,
        })
    }

    /// Returns the reason a directory is pruned, or `None` if it is visited.
    ///
    /// Checks, in order: reserved prefix, reserved token, hidden directory,
    /// glob pattern against the full path, regex against the name.
    pub fn exclusion_reason(&self, dir_path: &Path) -> Option<String> {
        let name = dir_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if let Some(prefix) = self.skip_prefixes.iter().find(|p| name.starts_with(p.as_str())) {
            return Some(format!("reserved prefix '{}'", prefix));
        }

        let lower = name.to_lowercase();
        if let Some(token) = self.skip_tokens.iter().find(|t| lower.contains(t.as_str())) {
            return Some(format!("reserved token '{}'", token));
        }

        if self.skip_hidden && name.starts_with('.') {
            return Some("hidden directory".to_string());
        }

        if let Some(pattern) = self
            .exclude_patterns
            .iter()
            .find(|pattern| pattern.matches_path(dir_path))
        {
            return Some(format!("pattern '{}'", pattern.as_str()));
        }

        self.exclude_regexes
            .iter()
            .find(|regex| regex.is_match(&name))
            .map(|regex| format!("regex '{}'", regex.as_str()))
    }

    pub fn is_excluded(&self, dir_path: &Path) -> bool {
        self.exclusion_reason(dir_path).is_some()
    }
}
