//! Routes `tracing` events from other crates into a [`LoggerRegistry`].
//!
//! Events are filtered by `RUST_LOG` when set, otherwise by the registry's
//! file level, and land in the sinks under a logger named after the event
//! target. This crate's own diagnostics (rotation, sink binding) are
//! printed to stderr through a plain `fmt` layer instead, so they never end up
//! inside the files they describe.

use std::fmt::Write as _;

use serde_json::Value;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::{Attributes, Error, Level, LoggerRegistry, Result, Settings};

const OWN_TARGET: &str = env!("CARGO_PKG_NAME");

/// A tracing layer that re-emits events through a registry's loggers.
#[derive(Debug, Clone)]
pub struct StructuredLayer {
    registry: LoggerRegistry,
}

impl StructuredLayer {
    pub fn new(registry: LoggerRegistry) -> Self {
        Self { registry }
    }
}

impl<S: Subscriber> Layer<S> for StructuredLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let target = metadata.target();
        if is_own_target(target) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.registry.foreign_logger(target).log(
            map_level(metadata.level()),
            visitor.message.unwrap_or_default(),
            visitor.attributes,
        );
    }
}

fn is_own_target(target: &str) -> bool {
    target == OWN_TARGET
        || target
            .strip_prefix(OWN_TARGET)
            .is_some_and(|rest| rest.starts_with("::"))
}

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE | tracing::Level::DEBUG => Level::Debug,
        tracing::Level::INFO => Level::Info,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::ERROR => Level::Error,
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    attributes: Attributes,
}

impl FieldVisitor {
    fn record_value(&mut self, field: &Field, value: Value) {
        self.attributes.insert(field.name(), value);
    }
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let mut buf = String::new();
        let _ = write!(buf, "{:?}", value);
        if field.name() == "message" {
            self.message = Some(buf);
        } else {
            self.record_value(field, Value::String(buf));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.record_value(field, Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_value(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_value(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_value(field, Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_value(field, Value::from(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.record_value(field, Value::String(value.to_string()));
    }
}

/// Filter directive for bridged events: `RUST_LOG` when set and non-empty,
/// otherwise the file level.
fn effective_filter_directive(settings: &Settings) -> String {
    if let Ok(rust_log) = std::env::var("RUST_LOG")
        && !rust_log.is_empty()
    {
        return rust_log;
    }

    match Level::from_name(&settings.file_level) {
        Level::Debug => "debug",
        Level::Info => "info",
        Level::Warning => "warn",
        Level::Error | Level::Critical => "error",
    }
    .to_string()
}

/// Install a global tracing subscriber that feeds `registry`.
///
/// Fails if the filter directive is invalid or a global subscriber is
/// already set.
pub fn init_tracing_bridge(registry: &LoggerRegistry) -> Result<()> {
    let directive = effective_filter_directive(registry.settings());
    let bridge_filter = EnvFilter::try_new(&directive).map_err(|e| Error::Init(e.to_string()))?;
    let own_filter = EnvFilter::try_new(format!("{}=info", OWN_TARGET))
        .map_err(|e| Error::Init(e.to_string()))?;

    let diagnostics = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_filter(own_filter);

    tracing_subscriber::registry()
        .with(StructuredLayer::new(registry.clone()).with_filter(bridge_filter))
        .with(diagnostics)
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    Ok(())
}
