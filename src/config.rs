use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Settings consumed by the logging engine.
///
/// The engine never mutates these after initialization. `max_bytes` and
/// `backup_count` are carried for compatibility with host configuration but
/// rotation is purely date-driven.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable the console sink
    #[serde(default = "default_true")]
    pub console: bool,
    /// Apply ANSI colors to console lines
    #[serde(default = "default_true")]
    pub color: bool,
    /// Minimum level written to the console (e.g., "INFO")
    #[serde(default = "default_console_level")]
    pub console_level: String,
    /// Minimum level written to file sinks (e.g., "DEBUG")
    #[serde(default = "default_file_level")]
    pub file_level: String,
    /// Root directory holding the per-category subdirectories
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Seconds between date-boundary checks
    #[serde(default = "default_rotation_check_interval")]
    pub rotation_check_interval_secs: u64,
    /// Reserved, not enforced
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Reserved, not enforced
    #[serde(default = "default_backup_count")]
    pub backup_count: usize,
}

impl Settings {
    /// Create settings with defaults
    pub fn new() -> Self {
        Self {
            console: true,
            color: true,
            console_level: default_console_level(),
            file_level: default_file_level(),
            log_dir: default_log_dir(),
            rotation_check_interval_secs: default_rotation_check_interval(),
            max_bytes: default_max_bytes(),
            backup_count: default_backup_count(),
        }
    }

    /// Read settings from the process environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::new();

        if let Some(level) = lookup("CONSOLE_LOG_LEVEL").filter(|v| !v.is_empty()) {
            settings.console_level = level;
        }
        if let Some(level) = lookup("FILE_LOG_LEVEL").filter(|v| !v.is_empty()) {
            settings.file_level = level;
        }
        if let Some(dir) = lookup("LOG_DIR").filter(|v| !v.is_empty()) {
            settings.log_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("LOG_ROTATION_TIMEOUT") {
            settings.rotation_check_interval_secs = parse_number("LOG_ROTATION_TIMEOUT", &raw)?;
        }
        if let Some(raw) = lookup("LOG_MAX_BYTES") {
            settings.max_bytes = parse_number("LOG_MAX_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("LOG_BACKUP_COUNT") {
            settings.backup_count = parse_number("LOG_BACKUP_COUNT", &raw)?;
        }

        Ok(settings)
    }

    /// Enable or disable the console sink
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Enable or disable console colors
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Set the console level
    pub fn with_console_level(mut self, level: impl Into<String>) -> Self {
        self.console_level = level.into();
        self
    }

    /// Set the file level
    pub fn with_file_level(mut self, level: impl Into<String>) -> Self {
        self.file_level = level.into();
        self
    }

    /// Set the log root directory
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Set the rotation check interval in seconds
    pub fn with_rotation_check_interval(mut self, secs: u64) -> Self {
        self.rotation_check_interval_secs = secs;
        self
    }

    /// Check the settings before any sink is opened.
    pub fn validate(&self) -> Result<()> {
        if self.rotation_check_interval_secs == 0 {
            return Err(Error::Config(
                "rotation_check_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.log_dir.as_os_str().is_empty() {
            return Err(Error::Config("log_dir must not be empty".to_string()));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} is not a valid number: {:?}", key, raw)))
}

fn default_true() -> bool {
    true
}

fn default_console_level() -> String {
    "INFO".to_string()
}

fn default_file_level() -> String {
    "DEBUG".to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_rotation_check_interval() -> u64 {
    300
}

fn default_max_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_backup_count() -> usize {
    5
}
