use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt::Write as _;
use std::io::Write as _;

use crate::sink::{Category, Delivery};
use crate::{Attributes, Level, LogEvent, LoggerRegistry, Result};

/// Attribute carrying an error's message and source chain.
pub const EXCEPTION_KEY: &str = "exception";
/// Attribute carrying a captured backtrace, when one is available.
pub const BACKTRACE_KEY: &str = "backtrace";

/// A named front door for emitting records.
///
/// Loggers are cheap to clone and may be shared across threads. Every emit
/// first gives the rotator a chance to run, then renders one record and
/// hands it to every accepting sink.
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    registry: LoggerRegistry,
    name: String,
    category: Category,
    channel: Option<String>,
}

impl StructuredLogger {
    pub(crate) fn new(
        registry: LoggerRegistry,
        name: &str,
        category: Category,
        channel: Option<String>,
    ) -> Self {
        Self {
            registry,
            name: name.to_string(),
            category,
            channel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }

    pub fn debug(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Debug, message, attributes);
    }

    pub fn info(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Info, message, attributes);
    }

    pub fn warning(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Warning, message, attributes);
    }

    pub fn error(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Error, message, attributes);
    }

    pub fn critical(&self, message: impl Into<String>, attributes: Attributes) {
        self.log(Level::Critical, message, attributes);
    }

    /// Log at ERROR with the error's message chain under `exception`, and a
    /// backtrace under `backtrace` when `RUST_BACKTRACE` enables capture.
    pub fn exception(
        &self,
        message: impl Into<String>,
        error: &(dyn StdError + 'static),
        attributes: Attributes,
    ) {
        let mut attributes = attributes;
        attributes.insert(EXCEPTION_KEY, error_chain(error));
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            attributes.insert(BACKTRACE_KEY, backtrace.to_string());
        }
        self.log(Level::Error, message, attributes);
    }

    /// Emit a record, reporting write failures on stderr instead of
    /// returning them.
    pub fn log(&self, level: Level, message: impl Into<String>, attributes: Attributes) {
        let outcome = self.try_log(level, message, attributes);
        for line in self.fallback_lines(&outcome) {
            fallback(&line);
        }
    }

    /// Lines reported on stderr for an emit outcome. Empty when every sink
    /// took the record.
    fn fallback_lines(&self, outcome: &Result<Delivery>) -> Vec<String> {
        match outcome {
            Ok(delivery) => delivery
                .failures
                .iter()
                .map(|failure| {
                    format!(
                        "sink {} rejected record from {}: {}",
                        failure.sink, self.name, failure.error
                    )
                })
                .collect(),
            Err(e) => vec![format!("cannot emit record from {}: {}", self.name, e)],
        }
    }

    /// Emit a record and report which sinks took it.
    ///
    /// Fails only when the record cannot be rendered; per-sink write
    /// failures are collected in the returned [`Delivery`].
    pub fn try_log(
        &self,
        level: Level,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Result<Delivery> {
        let shared = &self.registry.shared;
        shared.rotator.try_check();

        let event = LogEvent::new(shared.clock.now(), level, &self.name, message, attributes)
            .with_channel(self.channel.clone());
        let line = shared.renderer.render(&event)?;
        Ok(shared.sinks.dispatch(&event, &line))
    }
}

/// `outer: middle: root`, following `source()` links.
fn error_chain(error: &(dyn StdError + 'static)) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let _ = write!(chain, ": {}", cause);
        source = cause.source();
    }
    chain
}

fn fallback(message: &str) {
    let _ = writeln!(std::io::stderr(), "dailylog: {}", message);
}
