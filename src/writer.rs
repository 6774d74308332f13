use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// State of an open log file.
#[derive(Debug)]
struct FileState {
    /// The open append-mode handle. Never reopened for the life of the sink.
    file: File,
    /// Bytes written through this handle since the last truncation.
    written: u64,
}

/// An append-only log file shared by every writer of one destination.
///
/// Each line is written under the file's own lock, so lines in one file are
/// totally ordered and never interleave. Archiving copies the current
/// contents aside and truncates the same handle in place; writers keep using
/// it afterwards.
#[derive(Debug)]
pub struct LogFile {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl LogFile {
    /// Open (or create) the file for appending, creating parent directories
    /// as needed.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(FileState { file, written: 0 }),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_file(path: &Path, file: File) -> Self {
        Self {
            path: path.to_path_buf(),
            state: Mutex::new(FileState { file, written: 0 }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line, adding the terminator.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut state = self.lock();
        state.file.write_all(&buf)?;
        state.written += buf.len() as u64;
        Ok(())
    }

    /// Path of the archive for `date`: `<stem>-<date>.hist.log` beside the
    /// live file.
    pub fn archive_path(&self, date: &str) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.path.with_file_name(format!("{}-{}.hist.log", stem, date))
    }

    /// Copy the current contents to the archive for `date` and truncate the
    /// live file in place.
    ///
    /// Returns `Ok(None)` when the file is empty and nothing was archived.
    /// Contents are appended to an existing archive of the same name rather
    /// than replacing it.
    pub fn archive(&self, date: &str) -> io::Result<Option<PathBuf>> {
        let mut state = self.lock();

        let size = state.file.metadata()?.len();
        if size == 0 {
            return Ok(None);
        }

        let archive_path = self.archive_path(date);
        let mut source = File::open(&self.path)?;
        let mut archive = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&archive_path)?;
        io::copy(&mut source, &mut archive)?;
        archive.flush()?;

        state.file.set_len(0)?;
        state.written = 0;

        Ok(Some(archive_path))
    }

    /// Current size on disk.
    pub fn len(&self) -> io::Result<u64> {
        Ok(self.lock().file.metadata()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Bytes written through this handle since it was opened or last
    /// truncated.
    pub fn written(&self) -> u64 {
        self.lock().written
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FileState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
