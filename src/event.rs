//! Log records and their attributes.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::{Level, Result};

/// Key holding the event text.
pub const MESSAGE_KEY: &str = "event";
/// Key holding the record timestamp.
pub const TIMESTAMP_KEY: &str = "timestamp";
/// Key holding the uppercase level name.
pub const LEVEL_KEY: &str = "level";
/// Key holding the logger identity.
pub const LOGGER_KEY: &str = "logger";

const ISO_UTC: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]+00:00"
);

/// Format a timestamp as ISO-8601 UTC with an explicit `+00:00` offset.
pub fn format_timestamp(at: OffsetDateTime) -> Result<String> {
    Ok(at.to_offset(time::UtcOffset::UTC).format(ISO_UTC)?)
}

/// Ordered key/value attributes attached to a record.
///
/// Insertion order is preserved; inserting an existing key replaces its
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    fields: Map<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a JSON-representable value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Add a value rendered through its `Display` implementation.
    pub fn with_display(self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.with(key, value.to_string())
    }

    /// Add any serializable value; values that fail to serialize are
    /// stored as their `Debug` text.
    pub fn with_serialize<T: Serialize + fmt::Debug>(
        self,
        key: impl Into<String>,
        value: &T,
    ) -> Self {
        let value = serde_json::to_value(value)
            .unwrap_or_else(|_| Value::String(format!("{:?}", value)));
        self.with(key, value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attributes::new();
        for (k, v) in iter {
            attrs.insert(k, v);
        }
        attrs
    }
}

impl From<Map<String, Value>> for Attributes {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// A single record, built per emit call and discarded after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp: OffsetDateTime,
    pub level: Level,
    pub logger: String,
    pub message: String,
    pub attributes: Attributes,
    /// Debug sub-channel the emitting logger is bound to, if any.
    pub channel: Option<String>,
}

impl LogEvent {
    pub fn new(
        timestamp: OffsetDateTime,
        level: Level,
        logger: impl Into<String>,
        message: impl Into<String>,
        attributes: Attributes,
    ) -> Self {
        Self {
            timestamp,
            level,
            logger: logger.into(),
            message: message.into(),
            attributes,
            channel: None,
        }
    }

    pub fn with_channel(mut self, channel: Option<String>) -> Self {
        self.channel = channel;
        self
    }

    /// The flat field map handed to the renderer.
    ///
    /// The event text comes first, then caller attributes; timestamp, level
    /// and logger identity always overwrite caller keys of the same name.
    pub fn to_fields(&self) -> Result<Map<String, Value>> {
        let mut fields = Map::with_capacity(self.attributes.len() + 4);
        fields.insert(MESSAGE_KEY.to_string(), Value::String(self.message.clone()));
        for (key, value) in self.attributes.iter() {
            if key == MESSAGE_KEY {
                continue;
            }
            fields.insert(key.clone(), value.clone());
        }
        fields.insert(LOGGER_KEY.to_string(), Value::String(self.logger.clone()));
        fields.insert(LEVEL_KEY.to_string(), Value::String(self.level.as_str().to_string()));
        fields.insert(
            TIMESTAMP_KEY.to_string(),
            Value::String(format_timestamp(self.timestamp)?),
        );
        Ok(fields)
    }
}
