//! Fluent setup for a [`LoggerRegistry`].
//!
//! # Example
//!
//! ```rust,no_run
//! use dailylog::Attributes;
//!
//! let registry = dailylog::builder()
//!     .with_log_dir("/var/log/myapp")
//!     .with_console_level("warning")
//!     .init()
//!     .expect("Failed to initialize logging");
//!
//! registry
//!     .app_logger("myapp.http")
//!     .expect("logger")
//!     .info("listening", Attributes::new().with("port", 8080));
//! ```

use std::path::PathBuf;

use crate::clock::Clock;
use crate::sink::ConsoleTarget;
use crate::{global, LoggerRegistry, Result, Settings};

/// Collects settings plus the clock and console target before building a
/// registry.
#[derive(Debug, Clone, Default)]
pub struct LogBuilder {
    settings: Settings,
    clock: Clock,
    console_target: ConsoleTarget,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Start from [`Settings::from_env`].
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_settings(Settings::from_env()?))
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.settings = self.settings.with_console(enabled);
        self
    }

    pub fn with_color(mut self, enabled: bool) -> Self {
        self.settings = self.settings.with_color(enabled);
        self
    }

    pub fn with_console_level(mut self, level: impl Into<String>) -> Self {
        self.settings = self.settings.with_console_level(level);
        self
    }

    pub fn with_file_level(mut self, level: impl Into<String>) -> Self {
        self.settings = self.settings.with_file_level(level);
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings = self.settings.with_log_dir(dir);
        self
    }

    /// Seconds between background rotation checks.
    pub fn with_rotation_check_interval(mut self, secs: u64) -> Self {
        self.settings = self.settings.with_rotation_check_interval(secs);
        self
    }

    /// Use a clock other than the system clock, typically a manual one in
    /// tests.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_console_target(mut self, target: ConsoleTarget) -> Self {
        self.console_target = target;
        self
    }

    /// The settings collected so far.
    pub fn build(self) -> Settings {
        self.settings
    }

    /// Build a standalone registry without touching the global one.
    pub fn build_registry(self) -> Result<LoggerRegistry> {
        LoggerRegistry::with_parts(self.settings, self.clock, self.console_target)
    }

    /// Build and install the global registry.
    ///
    /// If a global registry is already installed it is returned unchanged
    /// and this builder is discarded.
    pub fn init(self) -> Result<LoggerRegistry> {
        global::initialize_with(|| self.build_registry())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn test_builder_defaults_match_settings() {
        assert_eq!(LogBuilder::new().build(), Settings::default());
    }

    #[test]
    fn test_builder_chaining() {
        let settings = LogBuilder::new()
            .with_console(false)
            .with_color(false)
            .with_console_level("ERROR")
            .with_file_level("INFO")
            .with_log_dir("/tmp/dailylog")
            .with_rotation_check_interval(30)
            .build();

        assert!(!settings.console);
        assert!(!settings.color);
        assert_eq!(settings.console_level, "ERROR");
        assert_eq!(settings.file_level, "INFO");
        assert_eq!(settings.log_dir, PathBuf::from("/tmp/dailylog"));
        assert_eq!(settings.rotation_check_interval_secs, 30);
    }

    #[test]
    fn test_builder_from_settings() {
        let original = Settings::new().with_file_level("WARNING");
        let settings = LogBuilder::from_settings(original.clone()).build();
        assert_eq!(settings, original);
    }

    #[test]
    fn test_build_registry_uses_clock() {
        let dir = tempfile::tempdir().unwrap();
        let (clock, _) = Clock::manual(datetime!(2030-06-15 08:00 UTC));
        let registry = LogBuilder::new()
            .with_log_dir(dir.path())
            .with_console(false)
            .with_clock(clock)
            .build_registry()
            .unwrap();

        assert_eq!(
            registry.rotator().state().current_date,
            datetime!(2030-06-15 00:00 UTC).date()
        );
        registry.shutdown();
    }

    #[test]
    fn test_build_registry_rejects_invalid_settings() {
        let result = LogBuilder::new()
            .with_rotation_check_interval(0)
            .build_registry();
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }
}
