//! # Dailylog
//!
//! Structured logging to a fixed set of category files, with ordered JSON
//! lines and archival at every UTC date boundary.
//!
//! ## Layout
//!
//! Under the configured log directory:
//!
//! - `app/app.log`: everything at or above the file level and below ERROR
//! - `error/error.log`: ERROR and CRITICAL
//! - `debug/debug.log`: everything at or above the file level
//! - `debug/<sublog>.log`: records from loggers bound to that sub-channel
//! - `security/security.log`: records from loggers whose name contains
//!   "security", created on first use of the security category
//!
//! Every file line is a JSON object beginning with `timestamp`, `level` and
//! `logger`. When the date changes, non-empty files are copied to
//! `<stem>-<previous date>.hist.log` and truncated in place.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dailylog::{Attributes, LoggerRegistry, Settings};
//!
//! let registry = LoggerRegistry::new(Settings::new().with_log_dir("logs"))?;
//! let logger = registry.app_logger("svc")?;
//! logger.info("started", Attributes::new().with("version", "1.0"));
//! # Ok::<(), dailylog::Error>(())
//! ```

pub mod builder;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod global;
pub mod level;
pub mod logger;
pub mod registry;
pub mod render;
pub mod rotation;
pub mod sink;
pub mod writer;

#[cfg(feature = "tracing-bridge")]
pub mod bridge;

pub use builder::LogBuilder;
pub use clock::{Clock, ManualClock};
pub use config::Settings;
pub use error::{Error, Result};
pub use event::{Attributes, LogEvent};
pub use level::{Level, severity_of};
pub use logger::StructuredLogger;
pub use registry::LoggerRegistry;
pub use render::FieldOrderingRenderer;
pub use rotation::{CheckOutcome, DailyRotator};
pub use sink::{Category, ConsoleTarget, Delivery, SinkBinding, SinkSet};

#[cfg(feature = "tracing-bridge")]
pub use bridge::{StructuredLayer, init_tracing_bridge};

/// Start configuring a registry.
pub fn builder() -> LogBuilder {
    LogBuilder::new()
}
