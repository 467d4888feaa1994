//! `[logging]` settings: level and an optional JSON log file

use serde::Deserialize;
use std::path::PathBuf;
use tracing_appender::rolling::Rotation;

/// How often the log file rolls over
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    Hourly,
    #[default]
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

/// Rotating JSON log output
#[derive(Debug, Clone, PartialEq)]
pub struct LogFile {
    pub dir: PathBuf,
    pub rotation: LogRotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Level for the `ccs` target: trace, debug, info, warn, error
    pub level: String,
    /// None keeps logs on stderr only
    pub file: Option<LogFile>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileLogging {
    pub level: Option<String>,
    /// Setting a directory turns file logging on
    pub file_dir: Option<String>,
    pub file_rotation: Option<LogRotation>,
}

impl LoggingConfig {
    pub fn from_file(file: Option<FileLogging>) -> Self {
        let FileLogging {
            level,
            file_dir,
            file_rotation,
        } = file.unwrap_or_default();

        Self {
            level: level.unwrap_or_else(|| Self::default().level),
            file: file_dir.map(|dir| LogFile {
                dir: super::expand_home(&dir),
                rotation: file_rotation.unwrap_or_default(),
            }),
        }
    }
}
