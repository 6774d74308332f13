//! Date-driven archival of the live log files.
//!
//! A [`DailyRotator`] remembers the UTC date its files belong to. When a
//! check observes a later date, every non-empty bound file is copied to
//! `<stem>-<old date>.hist.log` and truncated in place. Checks come from three
//! places, all serialized by one lock:
//!
//! - [`DailyRotator::check`]: the background scheduler. Debounced by the
//!   check interval.
//! - [`DailyRotator::try_check`]: the emit path. Debounced, and skipped
//!   outright while another thread holds the lock so that emitters never wait
//!   on a whole rotation.
//! - [`DailyRotator::force`]: explicit request. Always evaluates the date,
//!   ignoring the interval.
//!
//! The date only moves forward. A check that sees an earlier date than the
//! current one (clock stepped back) records the check time and leaves the
//! files alone.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::JoinHandle;

use crossbeam_channel::{RecvTimeoutError, Sender};
use time::{Date, Duration, OffsetDateTime};

use crate::clock::Clock;
use crate::sink::SinkSet;

/// Mutable rotation bookkeeping, only touched under the rotator's lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationState {
    /// UTC date the live files belong to.
    pub current_date: Date,
    /// Time of the last evaluated check. Never decreases.
    pub last_check: OffsetDateTime,
    pub check_interval: Duration,
    /// Earlier date last reported at WARN. Repeat sightings log at DEBUG.
    pub clock_behind_reported: Option<Date>,
}

/// Files handled by one rotation.
#[derive(Debug)]
pub struct RotationReport {
    pub from: Date,
    pub to: Date,
    /// Archives written, one per non-empty live file.
    pub archived: Vec<PathBuf>,
    /// Live files whose archival failed. The rotation still completed.
    pub failures: Vec<(PathBuf, io::Error)>,
}

/// Result of one check.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Less than the check interval elapsed since the last check.
    Debounced,
    /// Another thread is checking or rotating right now.
    Busy,
    /// The date has not changed.
    SameDate,
    /// The clock reports an earlier date than the current one.
    ClockBehind,
    Rotated(RotationReport),
}

impl CheckOutcome {
    pub fn rotated(&self) -> bool {
        matches!(self, CheckOutcome::Rotated(_))
    }
}

/// Archives and truncates bound log files when the UTC date changes.
#[derive(Debug)]
pub struct DailyRotator {
    sinks: Arc<SinkSet>,
    clock: Clock,
    state: Mutex<RotationState>,
}

impl DailyRotator {
    pub fn new(sinks: Arc<SinkSet>, clock: Clock, check_interval: std::time::Duration) -> Self {
        let now = clock.now();
        let check_interval = Duration::try_from(check_interval).unwrap_or(Duration::MAX);
        Self {
            sinks,
            clock,
            state: Mutex::new(RotationState {
                current_date: now.date(),
                last_check: now,
                check_interval,
                clock_behind_reported: None,
            }),
        }
    }

    pub fn state(&self) -> RotationState {
        *self.lock()
    }

    /// Debounced check, waiting for the lock.
    pub fn check(&self) -> CheckOutcome {
        let mut state = self.lock();
        self.evaluate(&mut state, true)
    }

    /// Debounced check that gives up immediately if the lock is held.
    pub fn try_check(&self) -> CheckOutcome {
        let mut state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return CheckOutcome::Busy,
        };
        self.evaluate(&mut state, true)
    }

    /// Evaluate the date now, regardless of when the last check ran.
    pub fn force(&self) -> CheckOutcome {
        let mut state = self.lock();
        self.evaluate(&mut state, false)
    }

    fn evaluate(&self, state: &mut RotationState, debounce: bool) -> CheckOutcome {
        let now = self.clock.now();

        if debounce && now - state.last_check < state.check_interval {
            return CheckOutcome::Debounced;
        }
        state.last_check = state.last_check.max(now);

        let today = now.date();
        if today == state.current_date {
            return CheckOutcome::SameDate;
        }
        if today < state.current_date {
            if state.clock_behind_reported == Some(today) {
                tracing::debug!(
                    current = %state.current_date,
                    observed = %today,
                    "clock still reports an earlier date"
                );
            } else {
                tracing::warn!(
                    current = %state.current_date,
                    observed = %today,
                    "clock reports an earlier date; keeping current log date"
                );
                state.clock_behind_reported = Some(today);
            }
            return CheckOutcome::ClockBehind;
        }

        let report = self.rotate(state.current_date, today);
        state.current_date = today;
        CheckOutcome::Rotated(report)
    }

    fn rotate(&self, from: Date, to: Date) -> RotationReport {
        let mut report = RotationReport {
            from,
            to,
            archived: Vec::new(),
            failures: Vec::new(),
        };
        let date = from.to_string();

        for sink in self.sinks.files() {
            let file = sink.file();
            match file.archive(&date) {
                Ok(Some(archive)) => {
                    tracing::debug!(
                        category = %sink.binding().category,
                        archive = %archive.display(),
                        "archived log file"
                    );
                    report.archived.push(archive);
                }
                Ok(None) => {}
                Err(error) => {
                    tracing::warn!(
                        path = %file.path().display(),
                        %error,
                        "failed to archive log file"
                    );
                    report.failures.push((file.path().to_path_buf(), error));
                }
            }
        }

        tracing::info!(
            from = %from,
            to = %to,
            archived = report.archived.len(),
            failed = report.failures.len(),
            "log files rotated to new date"
        );
        report
    }

    fn lock(&self) -> MutexGuard<'_, RotationState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Background thread running [`DailyRotator::check`] once per interval.
///
/// Stopping is cooperative: [`RotationScheduler::stop`] (or drop) wakes the
/// thread and joins it. The thread never keeps the process alive.
#[derive(Debug)]
pub struct RotationScheduler {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RotationScheduler {
    pub fn start(rotator: Arc<DailyRotator>, interval: std::time::Duration) -> io::Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name("dailylog-rotation".to_string())
            .spawn(move || {
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            let outcome = rotator.check();
                            tracing::trace!(?outcome, "scheduled rotation check");
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Signal the thread and wait for it to exit. Idempotent.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("rotation scheduler thread panicked");
        }
    }
}

impl Drop for RotationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
