//! The logging context: sinks, rotator, scheduler and category bookkeeping.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::render::FieldOrderingRenderer;
use crate::rotation::{DailyRotator, RotationScheduler};
use crate::sink::{Category, ConsoleSink, ConsoleTarget, SinkBinding, SinkSet};
use crate::{Attributes, Error, Level, LogEvent, Result, Settings, StructuredLogger};

/// Logger name on records the engine writes about itself.
const OWN_LOGGER: &str = env!("CARGO_PKG_NAME");

/// Subdirectories created at startup. `security/` is created on first use.
const STARTUP_DIRECTORIES: [&str; 3] = ["error", "app", "debug"];

pub(crate) struct Shared {
    pub(crate) settings: Settings,
    pub(crate) file_level: Level,
    pub(crate) clock: Clock,
    pub(crate) sinks: Arc<SinkSet>,
    pub(crate) rotator: Arc<DailyRotator>,
    pub(crate) renderer: FieldOrderingRenderer,
    scheduler: Mutex<Option<RotationScheduler>>,
    used: Mutex<BTreeSet<String>>,
}

/// Hands out loggers bound to one set of sinks.
///
/// Cloning is cheap and every clone shares the same state. The background
/// rotation scheduler runs until [`LoggerRegistry::shutdown`] is called or
/// the last handle (including loggers) is dropped.
#[derive(Clone)]
pub struct LoggerRegistry {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("log_dir", &self.shared.settings.log_dir)
            .field("file_level", &self.shared.file_level)
            .finish_non_exhaustive()
    }
}

impl LoggerRegistry {
    /// Set up sinks under `settings.log_dir` with the system clock and a
    /// stdout console.
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_parts(settings, Clock::System, ConsoleTarget::Stdout)
    }

    /// Set up sinks with an explicit clock and console target.
    ///
    /// Fails if the settings are invalid or the log directories or startup
    /// files cannot be created.
    pub fn with_parts(settings: Settings, clock: Clock, console: ConsoleTarget) -> Result<Self> {
        settings.validate()?;

        for dir in STARTUP_DIRECTORIES {
            let path = settings.log_dir.join(dir);
            std::fs::create_dir_all(&path).map_err(|e| startup_error(&path, e))?;
        }

        let console_level = Level::from_name(&settings.console_level);
        let file_level = Level::from_name(&settings.file_level);

        let console = settings
            .console
            .then(|| ConsoleSink::new(console, console_level, settings.color));
        let sinks = Arc::new(SinkSet::new(console));
        for binding in [
            SinkBinding::app(&settings.log_dir, file_level),
            SinkBinding::error(&settings.log_dir),
            SinkBinding::debug(&settings.log_dir, file_level),
        ] {
            let path = binding.path.clone();
            sinks.bind(binding).map_err(|e| match e {
                Error::Io(io) => startup_error(&path, io),
                other => other,
            })?;
        }

        let interval = Duration::from_secs(settings.rotation_check_interval_secs);
        let rotator = Arc::new(DailyRotator::new(sinks.clone(), clock.clone(), interval));
        let scheduler = RotationScheduler::start(rotator.clone(), interval)
            .map_err(|e| Error::Init(format!("cannot start rotation scheduler: {}", e)))?;

        let summary = LogEvent::new(
            clock.now(),
            Level::Info,
            OWN_LOGGER,
            "logging system initialized",
            Attributes::new()
                .with("console_level", console_level.as_str())
                .with("file_level", file_level.as_str())
                .with_display("log_dir", settings.log_dir.display()),
        );
        if let Err(error) = sinks.write_console(&summary) {
            tracing::warn!(%error, "cannot write startup summary");
        }
        tracing::debug!(
            console_level = %console_level,
            file_level = %file_level,
            log_dir = %settings.log_dir.display(),
            "logging system initialized"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                settings,
                file_level,
                clock,
                sinks,
                rotator,
                renderer: FieldOrderingRenderer,
                scheduler: Mutex::new(Some(scheduler)),
                used: Mutex::new(BTreeSet::new()),
            }),
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn sinks(&self) -> &SinkSet {
        &self.shared.sinks
    }

    pub fn rotator(&self) -> &DailyRotator {
        &self.shared.rotator
    }

    /// A logger for `name` in `category`, optionally tagged with a debug
    /// sub-channel.
    ///
    /// Requesting the security category binds `security/security.log` on
    /// first use. A sub-channel (either `sublog` or a
    /// [`Category::DebugChannel`]) binds `debug/<sublog>.log` on first use;
    /// later requests for the same name share that file.
    pub fn get_logger(
        &self,
        name: &str,
        category: Category,
        sublog: Option<&str>,
    ) -> Result<StructuredLogger> {
        let (category, channel) = match category {
            Category::DebugChannel(channel) => (Category::Debug, Some(channel)),
            other => (other, sublog.map(str::to_string)),
        };

        if category == Category::Security {
            self.shared
                .sinks
                .bind(SinkBinding::security(&self.shared.settings.log_dir, self.shared.file_level))?;
        }
        if let Some(channel) = &channel {
            validate_channel_name(channel)?;
            self.shared.sinks.bind(SinkBinding::channel(
                &self.shared.settings.log_dir,
                channel,
                self.shared.file_level,
            ))?;
        }

        {
            let mut used = self.shared.used.lock().unwrap_or_else(PoisonError::into_inner);
            used.insert(category.to_string());
            if let Some(channel) = &channel {
                used.insert(Category::DebugChannel(channel.clone()).to_string());
            }
        }

        Ok(StructuredLogger::new(self.clone(), name, category, channel))
    }

    pub fn app_logger(&self, name: &str) -> Result<StructuredLogger> {
        self.get_logger(name, Category::App, None)
    }

    pub fn error_logger(&self, name: &str) -> Result<StructuredLogger> {
        self.get_logger(name, Category::Error, None)
    }

    pub fn debug_logger(&self, name: &str, sublog: Option<&str>) -> Result<StructuredLogger> {
        self.get_logger(name, Category::Debug, sublog)
    }

    pub fn security_logger(&self, name: &str) -> Result<StructuredLogger> {
        self.get_logger(name, Category::Security, None)
    }

    /// A logger for records arriving from other logging frameworks. Does not
    /// count as category usage.
    pub(crate) fn foreign_logger(&self, name: &str) -> StructuredLogger {
        StructuredLogger::new(self.clone(), name, Category::App, None)
    }

    /// Evaluate the date now and rotate if it changed. Returns whether a
    /// rotation happened.
    pub fn force_rotation_check(&self) -> bool {
        self.shared.rotator.force().rotated()
    }

    /// Categories requested through [`LoggerRegistry::get_logger`] so far.
    pub fn used_categories(&self) -> BTreeSet<String> {
        self.shared
            .used
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stop the background scheduler. Loggers keep working; rotation then
    /// only happens from emit-path and forced checks.
    pub fn shutdown(&self) {
        let scheduler = self
            .shared
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut scheduler) = scheduler {
            scheduler.stop();
        }
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.shared
            .scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(RotationScheduler::is_running)
    }
}

fn startup_error(path: &Path, error: std::io::Error) -> Error {
    Error::Init(format!("cannot create {}: {}", path.display(), error))
}

/// Sub-channel names become `debug/<name>.log`. They may not collide with
/// the main debug file or look like an archive of it.
fn validate_channel_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !name.eq_ignore_ascii_case(Category::Debug.directory())
        && !name.to_ascii_lowercase().ends_with(".hist");
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid sub-channel name: {:?}", name)))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn registry(dir: &Path) -> LoggerRegistry {
        let settings = Settings::new()
            .with_log_dir(dir)
            .with_console(false)
            .with_file_level("DEBUG");
        let (clock, _) = Clock::manual(datetime!(2025-01-01 12:00 UTC));
        LoggerRegistry::with_parts(settings, clock, ConsoleTarget::Stderr).unwrap()
    }

    #[test]
    fn test_startup_layout() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());
        for file in ["app/app.log", "error/error.log", "debug/debug.log"] {
            assert!(dir.path().join(file).exists(), "{} missing", file);
        }
        assert!(!dir.path().join("security").exists());
        assert_eq!(reg.sinks().files().len(), 3);
        assert!(reg.used_categories().is_empty());
    }

    #[test]
    fn test_invalid_settings_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::new()
            .with_log_dir(dir.path())
            .with_rotation_check_interval(0);
        assert!(matches!(LoggerRegistry::new(settings), Err(Error::Config(_))));
    }

    #[test]
    fn test_uncreatable_log_dir_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let settings = Settings::new().with_log_dir(&blocker).with_console(false);
        assert!(matches!(LoggerRegistry::new(settings), Err(Error::Init(_))));
    }

    #[test]
    fn test_security_sink_is_lazy() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());
        reg.app_logger("svc").unwrap();
        assert!(!reg.sinks().is_bound(&Category::Security));

        reg.security_logger("auth.security").unwrap();
        reg.security_logger("auth.security").unwrap();
        assert!(dir.path().join("security/security.log").exists());
        assert_eq!(reg.sinks().files().len(), 4);
    }

    #[test]
    fn test_sublog_binds_once() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());
        let a = reg.get_logger("svc", Category::App, Some("api")).unwrap();
        let b = reg.get_logger("svc", Category::App, Some("api")).unwrap();
        let c = reg
            .get_logger("svc", Category::DebugChannel("api".into()), None)
            .unwrap();
        assert_eq!(a.channel(), Some("api"));
        assert_eq!(c.channel(), Some("api"));
        assert_eq!(c.category(), &Category::Debug);
        assert_eq!(reg.sinks().files().len(), 4);

        a.info("one", Default::default());
        b.info("two", Default::default());
        let content = std::fs::read_to_string(dir.path().join("debug/api.log")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_invalid_sublog_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());
        for name in [
            "",
            "../escape",
            "a/b",
            ".hidden",
            "debug",
            "DEBUG",
            "debug-2025-01-01.hist",
            "api.hist",
        ] {
            assert!(
                matches!(reg.debug_logger("svc", Some(name)), Err(Error::Config(_))),
                "{:?} accepted",
                name
            );
        }
        assert!(!reg.sinks().is_bound(&Category::DebugChannel("debug".into())));
        assert!(reg.used_categories().is_empty());

        reg.debug_logger("svc", Some("debugger")).unwrap();
        reg.debug_logger("svc", Some("api.v2")).unwrap();
    }

    #[test]
    fn test_startup_summary_reaches_console() {
        let dir = tempfile::tempdir().unwrap();
        let (console, buffer) = ConsoleTarget::memory();
        let settings = Settings::new()
            .with_log_dir(dir.path())
            .with_color(false)
            .with_console_level("INFO")
            .with_file_level("WARNING");
        let (clock, _) = Clock::manual(datetime!(2025-01-01 12:00 UTC));
        let reg = LoggerRegistry::with_parts(settings, clock, console).unwrap();

        let output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert_eq!(
            output,
            format!(
                "2025-01-01 12:00:00 | INFO     | dailylog | logging system initialized \
                 console_level=INFO file_level=WARNING log_dir={}\n",
                dir.path().display()
            )
        );
        assert!(std::fs::read_to_string(dir.path().join("app/app.log")).unwrap().is_empty());
        reg.shutdown();
    }

    #[test]
    fn test_used_categories() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());
        reg.app_logger("a").unwrap();
        reg.debug_logger("b", Some("db")).unwrap();
        reg.security_logger("security").unwrap();
        let used: Vec<String> = reg.used_categories().into_iter().collect();
        assert_eq!(used, vec!["app", "debug", "debug:db", "security"]);
    }

    #[test]
    fn test_shutdown_stops_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(dir.path());
        assert!(reg.is_scheduler_running());
        reg.shutdown();
        assert!(!reg.is_scheduler_running());
        reg.shutdown();
    }
}
