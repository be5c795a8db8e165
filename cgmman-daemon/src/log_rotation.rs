//! Date-based log rotation.
//!
//! One log file per calendar day: `<prefix>.<YYYY-MM-DD>.log`. Before every
//! write the writer compares today's date with the date of its current file.
//! On a change it closes the sink and moves to the new date; the next write
//! opens the new file. At most one sink is open at any time.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate};

use crate::paths::log_file_path;

/// Source of the current calendar date.
pub trait Clock: Send + 'static {
    fn today(&self) -> NaiveDate;
}

/// Local wall-clock date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Appends to today's log file, switching files when the date changes.
#[derive(Debug)]
pub struct DailyRotatingWriter<C: Clock = SystemClock> {
    dir: PathBuf,
    prefix: String,
    clock: C,
    current_date: NaiveDate,
    sink: Option<File>,
}

impl DailyRotatingWriter<SystemClock> {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> io::Result<Self> {
        Self::with_clock(dir, prefix, SystemClock)
    }
}

impl<C: Clock> DailyRotatingWriter<C> {
    /// Create the log directory if needed. No file is opened until the
    /// first write.
    pub fn with_clock(dir: impl Into<PathBuf>, prefix: &str, clock: C) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let current_date = clock.today();
        Ok(Self {
            dir,
            prefix: prefix.to_string(),
            clock,
            current_date,
            sink: None,
        })
    }

    /// True iff today differs from the date of the current file.
    pub fn should_rollover(&self) -> bool {
        self.clock.today() != self.current_date
    }

    /// Close the sink (if open) and move to today's file name.
    pub fn do_rollover(&mut self) {
        if let Some(mut file) = self.sink.take() {
            let _ = file.flush();
        }
        self.current_date = self.clock.today();
    }

    pub fn current_date(&self) -> NaiveDate {
        self.current_date
    }

    pub fn current_path(&self) -> PathBuf {
        log_file_path(&self.dir, &self.prefix, self.current_date)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_open(&self) -> bool {
        self.sink.is_some()
    }

    fn sink(&mut self) -> io::Result<&mut File> {
        if self.sink.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.current_path())?;
            self.sink = Some(file);
        }
        self.sink
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "log file unavailable"))
    }
}

impl<C: Clock> Write for DailyRotatingWriter<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.should_rollover() {
            self.do_rollover();
        }
        self.sink()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if let Some(file) = self.sink.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Cloneable handle that plugs a [`DailyRotatingWriter`] into
/// `tracing_subscriber::fmt`.
#[derive(Debug)]
pub struct SharedDailyWriter<C: Clock = SystemClock> {
    inner: Arc<Mutex<DailyRotatingWriter<C>>>,
}

impl<C: Clock> Clone for SharedDailyWriter<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl SharedDailyWriter<SystemClock> {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> io::Result<Self> {
        Ok(Self::from_writer(DailyRotatingWriter::new(dir, prefix)?))
    }
}

impl<C: Clock> SharedDailyWriter<C> {
    pub fn from_writer(writer: DailyRotatingWriter<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    /// Path the next line will be written to.
    pub fn current_path(&self) -> Option<PathBuf> {
        let guard = self.inner.lock().ok()?;
        Some(if guard.should_rollover() {
            log_file_path(guard.dir(), &guard.prefix, guard.clock.today())
        } else {
            guard.current_path()
        })
    }
}

pub struct SharedDailyWriterGuard<C: Clock> {
    inner: Arc<Mutex<DailyRotatingWriter<C>>>,
}

impl<'a, C: Clock> tracing_subscriber::fmt::MakeWriter<'a> for SharedDailyWriter<C> {
    type Writer = SharedDailyWriterGuard<C>;

    fn make_writer(&'a self) -> Self::Writer {
        SharedDailyWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock> Write for SharedDailyWriterGuard<C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log writer lock poisoned"))?;
        guard.flush()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
