//! Settings for the switcher itself
//!
//! Not to be confused with the router document it edits. Loaded in order of
//! precedence:
//! 1. Command-line flags (highest priority)
//! 2. Environment variables
//! 3. Settings file (~/.config/ccs/config.toml)
//! 4. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Submodules
// ─────────────────────────────────────────────────────────────────────────────

mod logging;

#[cfg(test)]
mod tests;

pub use logging::{FileLogging, LogFile, LogRotation, LoggingConfig};

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the router document path
pub const ENV_CONFIG: &str = "CCS_CONFIG";
/// Overrides the probe timeout (seconds)
pub const ENV_PROBE_TIMEOUT: &str = "CCS_PROBE_TIMEOUT";

/// Per-request bound for endpoint probes and catalog fetches
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Endpoint probe settings
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileProbe {
    pub timeout_secs: Option<u64>,
}

/// Router service restart hook, run after a router assignment changes
#[derive(Debug, Clone, PartialEq)]
pub struct RestartConfig {
    pub enabled: bool,
    /// Program followed by its arguments
    pub command: Vec<String>,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: vec!["ccr".to_string(), "stop".to_string()],
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileRestart {
    pub enabled: Option<bool>,
    pub command: Option<Vec<String>>,
}

impl RestartConfig {
    pub fn from_file(file: Option<FileRestart>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();

        Self {
            enabled: file.enabled.unwrap_or(defaults.enabled),
            // An empty command list would leave nothing to run
            command: file
                .command
                .filter(|c| !c.is_empty())
                .unwrap_or(defaults.command),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Resolved settings
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Router document to edit
    pub document_path: PathBuf,
    pub probe: ProbeConfig,
    pub restart: RestartConfig,
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
            probe: ProbeConfig::default(),
            restart: RestartConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Settings file structure
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub document_path: Option<String>,

    /// Optional [probe] section
    pub probe: Option<FileProbe>,

    /// Optional [restart] section
    pub restart: Option<FileRestart>,

    /// Optional [logging] section
    pub logging: Option<FileLogging>,
}

/// claude-code-router's own location: ~/.claude-code-router/config.json
pub fn default_document_path() -> PathBuf {
    dirs::home_dir()
        .map(|p| p.join(".claude-code-router").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

/// Expand a leading `~/` against the home directory
pub(crate) fn expand_home(raw: &str) -> PathBuf {
    match (raw.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(raw),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration Loading
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Get the settings file path: ~/.config/ccs/config.toml
    pub fn settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("ccs").join("config.toml"))
    }

    /// Read the settings file. A missing file means defaults; a file that
    /// exists but does not parse is an error rather than a silent fallback.
    fn load_file_config(path: &Path) -> Result<FileConfig> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse settings file {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
            Err(e) => Err(e)
                .with_context(|| format!("Cannot read settings file {}", path.display())),
        }
    }

    /// Load settings: flag > env > file > defaults
    pub fn load(document_override: Option<PathBuf>) -> Result<Self> {
        let file = match Self::settings_path() {
            Some(path) => Self::load_file_config(&path)?,
            None => FileConfig::default(),
        };
        let mut config = Self::from_parts(file, |key| std::env::var(key).ok());
        if let Some(path) = document_override {
            config.document_path = path;
        }
        Ok(config)
    }

    /// Merge a parsed settings file with an environment lookup
    pub(crate) fn from_parts(file: FileConfig, env: impl Fn(&str) -> Option<String>) -> Self {
        // Document path: env > file > default
        let document_path = env(ENV_CONFIG)
            .filter(|v| !v.is_empty())
            .or(file.document_path)
            .map(|p| expand_home(&p))
            .unwrap_or_else(default_document_path);

        // Probe timeout: env > file > default; zero would disable the bound
        let file_probe = file.probe.unwrap_or_default();
        let timeout_secs = env(ENV_PROBE_TIMEOUT)
            .and_then(|v| v.parse().ok())
            .or(file_probe.timeout_secs)
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS);

        Self {
            document_path,
            probe: ProbeConfig { timeout_secs },
            restart: RestartConfig::from_file(file.restart),
            logging: LoggingConfig::from_file(file.logging),
        }
    }
}
