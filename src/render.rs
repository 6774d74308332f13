//! Record rendering: ordered JSON lines for files, colored text for the console.

use std::fmt::Write as _;

use colored::Color;
use serde_json::{Map, Value};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::{Level, LogEvent, Result};

/// Candidate names for the timestamp field, first match wins.
pub const TIMESTAMP_CANDIDATES: [&str; 3] = ["timestamp", "time", "@timestamp"];
/// Candidate names for the level field, first match wins.
pub const LEVEL_CANDIDATES: [&str; 3] = ["level", "log_level", "severity"];
/// Candidate names for the logger identity field, first match wins.
pub const LOGGER_CANDIDATES: [&str; 3] = ["logger", "name", "logger_name"];

const CONSOLE_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Reorder a field map so that timestamp, level and logger identity lead, in
/// that order, followed by every other field in its existing order.
///
/// Structural fields that are absent are simply omitted.
pub fn order_fields(fields: Map<String, Value>) -> Map<String, Value> {
    let leading: Vec<&'static str> = [TIMESTAMP_CANDIDATES, LEVEL_CANDIDATES, LOGGER_CANDIDATES]
        .iter()
        .filter_map(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|key| fields.contains_key(*key))
        })
        .collect();

    let mut ordered = Map::with_capacity(fields.len());
    for key in &leading {
        if let Some(value) = fields.get(*key) {
            ordered.insert((*key).to_string(), value.clone());
        }
    }
    for (key, value) in fields {
        if leading.iter().any(|lead| *lead == key) {
            continue;
        }
        ordered.insert(key, value);
    }
    ordered
}

/// Renders records as single-line JSON objects with a fixed leading field
/// order: `timestamp`, `level`, `logger`, then everything else.
///
/// Output format:
///
/// ```json
/// {"timestamp":"2025-01-01T12:00:00.000000+00:00","level":"INFO","logger":"svc","event":"started","version":"1.0"}
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldOrderingRenderer;

impl FieldOrderingRenderer {
    /// Render a record without a line terminator. Non-ASCII text is written
    /// as-is; embedded newlines are escaped by JSON string encoding.
    pub fn render(&self, event: &LogEvent) -> Result<String> {
        self.render_fields(event.to_fields()?)
    }

    /// Render an arbitrary field map with the same ordering rule.
    pub fn render_fields(&self, fields: Map<String, Value>) -> Result<String> {
        Ok(serde_json::to_string(&Value::Object(order_fields(fields)))?)
    }
}

/// Human-readable console line:
/// `<timestamp> | <LEVEL padded to 8> | <logger> | <message> key=value...`
///
/// With color on, the timestamp and level take the level's color and the
/// logger name is cyan. Escape codes are written directly from
/// [`colored::Color`] values, so whether they appear depends only on the
/// `color` flag and not on `colored`'s process-wide terminal detection.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleFormat {
    color: bool,
}

impl ConsoleFormat {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn is_colored(&self) -> bool {
        self.color
    }

    pub fn format(&self, event: &LogEvent) -> Result<String> {
        let timestamp = event.timestamp.format(CONSOLE_TIME)?;
        let level = format!("{:<8}", event.level);
        let (fg, bg) = level_colors(event.level);

        let mut line = format!(
            "{} | {} | {} | {}",
            self.paint(&timestamp, fg, bg),
            self.paint(&level, fg, bg),
            self.paint(&event.logger, Color::Cyan, None),
            event.message,
        );
        for (key, value) in event.attributes.iter() {
            match value {
                Value::String(s) => {
                    let _ = write!(line, " {}={}", key, s);
                }
                other => {
                    let _ = write!(line, " {}={}", key, other);
                }
            }
        }
        Ok(line)
    }

    fn paint(&self, text: &str, fg: Color, bg: Option<Color>) -> String {
        if !self.color {
            return text.to_string();
        }
        let codes = match bg {
            Some(bg) => format!("{};{}", bg.to_bg_str(), fg.to_fg_str()),
            None => fg.to_fg_str().into_owned(),
        };
        format!("\x1b[{}m{}\x1b[0m", codes, text)
    }
}

/// Foreground and optional background color for a level.
fn level_colors(level: Level) -> (Color, Option<Color>) {
    match level {
        Level::Debug => (Color::Cyan, None),
        Level::Info => (Color::Green, None),
        Level::Warning => (Color::Yellow, None),
        Level::Error => (Color::Red, None),
        Level::Critical => (Color::Red, Some(Color::White)),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::Attributes;

    fn keys(line: &str) -> Vec<String> {
        let parsed: Map<String, Value> = serde_json::from_str(line).unwrap();
        parsed.keys().cloned().collect()
    }

    fn sample_event() -> LogEvent {
        LogEvent::new(
            datetime!(2025-01-01 12:00 UTC),
            Level::Info,
            "svc",
            "started",
            Attributes::new().with("version", "1.0"),
        )
    }

    #[test]
    fn test_render_event_field_order() {
        let line = FieldOrderingRenderer.render(&sample_event()).unwrap();
        assert_eq!(keys(&line), vec!["timestamp", "level", "logger", "event", "version"]);
        assert!(line.starts_with(r#"{"timestamp":"2025-01-01T12:00:00.000000+00:00","level":"INFO","logger":"svc""#));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_order_is_independent_of_input_order() {
        let inputs = [
            vec!["user", "logger", "z", "level", "timestamp"],
            vec!["timestamp", "level", "logger", "user", "z"],
            vec!["level", "user", "timestamp", "z", "logger"],
        ];
        for input in inputs {
            let mut fields = Map::new();
            for key in &input {
                fields.insert(key.to_string(), Value::from(*key));
            }
            let ordered: Vec<String> = order_fields(fields).keys().cloned().collect();
            assert_eq!(&ordered[..3], ["timestamp", "level", "logger"]);
            assert_eq!(ordered.len(), 5);
        }
    }

    #[test]
    fn test_remaining_fields_keep_their_order() {
        let mut fields = Map::new();
        fields.insert("b".into(), Value::from(1));
        fields.insert("logger".into(), Value::from("x"));
        fields.insert("a".into(), Value::from(2));
        fields.insert("c".into(), Value::from(3));
        let ordered: Vec<String> = order_fields(fields).keys().cloned().collect();
        assert_eq!(ordered, vec!["logger", "b", "a", "c"]);
    }

    #[test]
    fn test_alternate_candidate_names() {
        let mut fields = Map::new();
        fields.insert("msg".into(), Value::from("m"));
        fields.insert("name".into(), Value::from("n"));
        fields.insert("severity".into(), Value::from("s"));
        fields.insert("@timestamp".into(), Value::from("t"));
        let ordered: Vec<String> = order_fields(fields).keys().cloned().collect();
        assert_eq!(ordered, vec!["@timestamp", "severity", "name", "msg"]);
    }

    #[test]
    fn test_first_candidate_wins() {
        let mut fields = Map::new();
        fields.insert("time".into(), Value::from("later"));
        fields.insert("timestamp".into(), Value::from("first"));
        let ordered: Vec<String> = order_fields(fields).keys().cloned().collect();
        assert_eq!(ordered, vec!["timestamp", "time"]);
    }

    #[test]
    fn test_absent_structural_fields_are_omitted() {
        let mut fields = Map::new();
        fields.insert("only".into(), Value::from(true));
        let line = FieldOrderingRenderer.render_fields(fields).unwrap();
        assert_eq!(line, r#"{"only":true}"#);
    }

    #[test]
    fn test_round_trip_recovers_attribute_values() {
        let attrs = Attributes::new()
            .with("count", 3)
            .with("ratio", 0.5)
            .with("ok", false)
            .with("tags", serde_json::json!(["a", "b"]))
            .with("nested", serde_json::json!({"k": null}));
        let event = LogEvent::new(
            datetime!(2025-01-01 00:00 UTC),
            Level::Debug,
            "svc",
            "m",
            attrs.clone(),
        );
        let line = FieldOrderingRenderer.render(&event).unwrap();
        let parsed: Map<String, Value> = serde_json::from_str(&line).unwrap();
        for (key, value) in attrs.iter() {
            assert_eq!(&parsed[key.as_str()], value);
        }
    }

    #[test]
    fn test_non_ascii_is_not_escaped() {
        let event = LogEvent::new(
            datetime!(2025-01-01 00:00 UTC),
            Level::Info,
            "svc",
            "héllo wörld ✓",
            Attributes::new(),
        );
        let line = FieldOrderingRenderer.render(&event).unwrap();
        assert!(line.contains("héllo wörld ✓"));
    }

    #[test]
    fn test_console_line_plain() {
        let line = ConsoleFormat::new(false).format(&sample_event()).unwrap();
        assert_eq!(
            line,
            "2025-01-01 12:00:00 | INFO     | svc | started version=1.0"
        );
    }

    #[test]
    fn test_console_line_non_string_attributes() {
        let event = LogEvent::new(
            datetime!(2025-01-01 12:00 UTC),
            Level::Error,
            "svc",
            "boom",
            Attributes::new().with("code", 500).with("retry", false),
        );
        let line = ConsoleFormat::new(false).format(&event).unwrap();
        assert!(line.ends_with("| ERROR    | svc | boom code=500 retry=false"));
    }

    #[test]
    fn test_console_line_colors_per_level() {
        let cases = [
            (Level::Debug, "36"),
            (Level::Info, "32"),
            (Level::Warning, "33"),
            (Level::Error, "31"),
            (Level::Critical, "47;31"),
        ];
        for (level, codes) in cases {
            let event = LogEvent::new(
                datetime!(2025-01-01 12:00 UTC),
                level,
                "svc",
                "down",
                Attributes::new(),
            );
            let line = ConsoleFormat::new(true).format(&event).unwrap();
            assert_eq!(
                line,
                format!(
                    "\x1b[{c}m2025-01-01 12:00:00\x1b[0m | \x1b[{c}m{:<8}\x1b[0m | \x1b[36msvc\x1b[0m | down",
                    level,
                    c = codes
                )
            );
        }
    }
}
