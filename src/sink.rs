//! Output destinations and the routing policy between them.

use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::render::ConsoleFormat;
use crate::writer::LogFile;
use crate::{Error, Level, LogEvent, Result};

/// Logical grouping of log destinations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    App,
    Error,
    Debug,
    Security,
    /// A named debug sub-channel with its own file under `debug/`.
    DebugChannel(String),
}

impl Category {
    /// Subdirectory of the log root holding this category's files.
    pub fn directory(&self) -> &'static str {
        match self {
            Category::App => "app",
            Category::Error => "error",
            Category::Debug | Category::DebugChannel(_) => "debug",
            Category::Security => "security",
        }
    }

    /// File name of this category's live log.
    pub fn file_name(&self) -> String {
        match self {
            Category::DebugChannel(name) => format!("{}.log", name),
            other => format!("{}.log", other.directory()),
        }
    }

    /// Live log path under `log_dir`.
    pub fn path_in(&self, log_dir: &Path) -> PathBuf {
        log_dir.join(self.directory()).join(self.file_name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::DebugChannel(name) => write!(f, "debug:{}", name),
            other => f.write_str(other.directory()),
        }
    }
}

/// Extra acceptance rule applied after the level threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkFilter {
    /// Accept everything at or above the threshold.
    All,
    /// Accept only records below ERROR; errors belong to the error sink.
    BelowError,
    /// Accept only records whose logger name contains the needle,
    /// case-insensitively. Any logger whose name happens to contain the
    /// needle matches, whatever category it was requested under.
    LoggerContains(String),
    /// Accept only records emitted through the named debug sub-channel.
    Channel(String),
}

impl SinkFilter {
    pub fn accepts(&self, event: &LogEvent) -> bool {
        match self {
            SinkFilter::All => true,
            SinkFilter::BelowError => event.level < Level::Error,
            SinkFilter::LoggerContains(needle) => event
                .logger
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            SinkFilter::Channel(name) => event.channel.as_deref() == Some(name.as_str()),
        }
    }
}

/// A file destination: category, path, threshold and filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkBinding {
    pub category: Category,
    pub path: PathBuf,
    pub min_level: Level,
    pub filter: SinkFilter,
}

impl SinkBinding {
    /// `app/app.log`: file threshold, errors excluded.
    pub fn app(log_dir: &Path, file_level: Level) -> Self {
        Self::new(log_dir, Category::App, file_level, SinkFilter::BelowError)
    }

    /// `error/error.log`: ERROR and CRITICAL, whatever the file threshold.
    pub fn error(log_dir: &Path) -> Self {
        Self::new(log_dir, Category::Error, Level::Error, SinkFilter::All)
    }

    /// `debug/debug.log`: everything at or above the file threshold.
    pub fn debug(log_dir: &Path, file_level: Level) -> Self {
        Self::new(log_dir, Category::Debug, file_level, SinkFilter::All)
    }

    /// `security/security.log`: loggers whose name mentions "security".
    pub fn security(log_dir: &Path, file_level: Level) -> Self {
        Self::new(
            log_dir,
            Category::Security,
            file_level,
            SinkFilter::LoggerContains("security".to_string()),
        )
    }

    /// `debug/<name>.log`: records tagged with the sub-channel only.
    pub fn channel(log_dir: &Path, name: &str, file_level: Level) -> Self {
        Self::new(
            log_dir,
            Category::DebugChannel(name.to_string()),
            file_level,
            SinkFilter::Channel(name.to_string()),
        )
    }

    fn new(log_dir: &Path, category: Category, min_level: Level, filter: SinkFilter) -> Self {
        Self {
            path: category.path_in(log_dir),
            category,
            min_level,
            filter,
        }
    }

    pub fn accepts(&self, event: &LogEvent) -> bool {
        event.level >= self.min_level && self.filter.accepts(event)
    }
}

/// A bound file sink.
#[derive(Debug)]
pub struct FileSink {
    binding: SinkBinding,
    file: LogFile,
}

impl FileSink {
    pub fn binding(&self) -> &SinkBinding {
        &self.binding
    }

    pub fn file(&self) -> &LogFile {
        &self.file
    }
}

/// Where console lines go.
#[derive(Debug, Clone, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
    /// In-memory capture, mostly for tests.
    Memory(Arc<Mutex<Vec<u8>>>),
}

impl ConsoleTarget {
    /// A fresh in-memory target and the buffer it writes to.
    pub fn memory() -> (ConsoleTarget, Arc<Mutex<Vec<u8>>>) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        (ConsoleTarget::Memory(buf.clone()), buf)
    }

    /// Whether escape codes can reach a terminal through this target.
    /// Captured output keeps whatever the settings ask for.
    pub fn supports_color(&self) -> bool {
        match self {
            ConsoleTarget::Stdout => io::stdout().is_terminal(),
            ConsoleTarget::Stderr => io::stderr().is_terminal(),
            ConsoleTarget::Memory(_) => true,
        }
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        match self {
            ConsoleTarget::Stdout => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", line)
            }
            ConsoleTarget::Stderr => {
                let mut out = io::stderr().lock();
                writeln!(out, "{}", line)
            }
            ConsoleTarget::Memory(buf) => {
                let mut buf = buf.lock().unwrap_or_else(PoisonError::into_inner);
                writeln!(buf, "{}", line)
            }
        }
    }
}

/// Human-readable console destination.
#[derive(Debug, Clone)]
pub struct ConsoleSink {
    target: ConsoleTarget,
    min_level: Level,
    format: ConsoleFormat,
}

impl ConsoleSink {
    /// Colors are applied when `color` is set and the target stream is a
    /// terminal (or an in-memory capture).
    pub fn new(target: ConsoleTarget, min_level: Level, color: bool) -> Self {
        let color = color && target.supports_color();
        Self {
            target,
            min_level,
            format: ConsoleFormat::new(color),
        }
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn is_colored(&self) -> bool {
        self.format.is_colored()
    }

    /// Write the record if it meets the threshold. Returns whether it was
    /// written.
    pub fn write(&self, event: &LogEvent) -> Result<bool> {
        if event.level < self.min_level {
            return Ok(false);
        }
        let line = self.format.format(event)?;
        self.target.write_line(&line)?;
        Ok(true)
    }
}

/// One sink that failed to take a record.
#[derive(Debug)]
pub struct SinkFailure {
    pub sink: String,
    pub error: Error,
}

/// Outcome of dispatching a single record.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Sinks that received the record, in dispatch order.
    pub written: Vec<String>,
    pub failures: Vec<SinkFailure>,
}

impl Delivery {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn wrote_to(&self, sink: &str) -> bool {
        self.written.iter().any(|s| s == sink)
    }
}

/// The console sink plus every bound file sink.
///
/// File sinks are only ever appended. Binding is exactly-once per
/// destination path: a second binding for a path that is already open
/// returns the existing sink.
#[derive(Debug)]
pub struct SinkSet {
    console: Option<ConsoleSink>,
    files: RwLock<Vec<Arc<FileSink>>>,
}

impl SinkSet {
    pub fn new(console: Option<ConsoleSink>) -> Self {
        Self {
            console,
            files: RwLock::new(Vec::new()),
        }
    }

    /// Bind a file sink, opening its file (and parent directory) on first
    /// use of the destination.
    pub fn bind(&self, binding: SinkBinding) -> Result<Arc<FileSink>> {
        let mut files = self.files.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = files.iter().find(|s| s.binding.path == binding.path) {
            return Ok(existing.clone());
        }

        let file = LogFile::open(&binding.path)?;
        tracing::debug!(
            category = %binding.category,
            path = %binding.path.display(),
            "bound file sink"
        );
        let sink = Arc::new(FileSink { binding, file });
        files.push(sink.clone());
        Ok(sink)
    }

    /// Put a prebuilt sink ahead of the bound ones.
    #[cfg(test)]
    pub(crate) fn attach(&self, binding: SinkBinding, file: LogFile) -> Arc<FileSink> {
        let sink = Arc::new(FileSink { binding, file });
        self.files
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(0, sink.clone());
        sink
    }

    /// Snapshot of the bound file sinks.
    pub fn files(&self) -> Vec<Arc<FileSink>> {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_bound(&self, category: &Category) -> bool {
        self.files
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|s| &s.binding.category == category)
    }

    /// Write `event` to the console sink only. Returns whether a line was
    /// written.
    pub fn write_console(&self, event: &LogEvent) -> Result<bool> {
        match &self.console {
            Some(console) => console.write(event),
            None => Ok(false),
        }
    }

    /// Write `rendered_line` to every accepting file sink and the human form
    /// of `event` to the console. A failing sink never stops the others.
    pub fn dispatch(&self, event: &LogEvent, rendered_line: &str) -> Delivery {
        let mut delivery = Delivery::default();

        if let Some(console) = &self.console {
            match console.write(event) {
                Ok(true) => delivery.written.push("console".to_string()),
                Ok(false) => {}
                Err(error) => delivery.failures.push(SinkFailure {
                    sink: "console".to_string(),
                    error,
                }),
            }
        }

        for sink in self.files() {
            if !sink.binding.accepts(event) {
                continue;
            }
            match sink.file.write_line(rendered_line) {
                Ok(()) => delivery.written.push(sink.binding.category.to_string()),
                Err(error) => delivery.failures.push(SinkFailure {
                    sink: sink.binding.category.to_string(),
                    error: error.into(),
                }),
            }
        }

        delivery
    }
}
