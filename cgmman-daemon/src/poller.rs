//! Directory poller.
//!
//! Each cycle lists the watched directory, translates every `.cgm` file it
//! finds, then sleeps. A `stop` file in the working directory ends the loop
//! between cycles.

use std::any::Any;
use std::fs;
use std::io::ErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;

use cgmman_convert::{
    names, translate_all, ConverterRunner, ExtensionResult, TrackedFile, TranslateOutcome,
};
use cgmman_core::{ManagerSettings, TranslatorRegistry};

use crate::error::{io_err, DaemonError};
use crate::paths::stop_sentinel_path;

/// Directories and cadence driving the poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub source_dir: PathBuf,
    pub work_dir: PathBuf,
    pub interval: Duration,
    pub stop_sentinel: PathBuf,
}

impl PollerConfig {
    pub fn from_settings(settings: &ManagerSettings) -> Self {
        Self {
            source_dir: settings.source_dir.clone(),
            work_dir: settings.work_dir.clone(),
            interval: settings.poll_interval(),
            stop_sentinel: stop_sentinel_path(&settings.work_dir),
        }
    }
}

/// Counts for one scan, or accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub scans: usize,
    pub files: usize,
    pub translated: usize,
    pub already_done: usize,
    pub failed: usize,
}

impl ScanSummary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            scans: 1,
            ..Self::default()
        };
        for report in reports {
            summary.record(&report.results);
        }
        summary
    }

    fn record(&mut self, results: &[ExtensionResult]) {
        self.files += 1;
        for r in results {
            match &r.result {
                Ok(TranslateOutcome::Translated { .. }) => self.translated += 1,
                Ok(TranslateOutcome::AlreadyDone) => self.already_done += 1,
                Err(_) => self.failed += 1,
            }
        }
    }

    fn absorb(&mut self, other: ScanSummary) {
        self.scans += other.scans;
        self.files += other.files;
        self.translated += other.translated;
        self.already_done += other.already_done;
        self.failed += other.failed;
    }
}

/// One source file and what happened to each of its target extensions.
#[derive(Debug)]
pub struct FileReport {
    pub source: PathBuf,
    pub results: Vec<ExtensionResult>,
}

/// List the watched directory once and translate every managed file.
///
/// Entries that cannot be tracked (wrong extension, not a regular file,
/// vanished mid-scan) are skipped without logging. Only a failure to list
/// the directory itself is returned.
pub fn scan_files(
    config: &PollerConfig,
    registry: &TranslatorRegistry,
    runner: &dyn ConverterRunner,
) -> Result<Vec<FileReport>, DaemonError> {
    let entries = fs::read_dir(&config.source_dir).map_err(|source| DaemonError::DirectoryList {
        path: config.source_dir.clone(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| names::has_source_extension(p))
        .collect();
    candidates.sort();

    let mut reports = Vec::with_capacity(candidates.len());
    for path in candidates {
        let Ok(mut tracked) = TrackedFile::new(&path, &config.work_dir, registry) else {
            continue;
        };
        let results = translate_all(&mut tracked, runner);
        tracked.cleanup();
        reports.push(FileReport {
            source: path,
            results,
        });
    }
    Ok(reports)
}

/// [`scan_files`], reduced to counts.
pub fn scan_once(
    config: &PollerConfig,
    registry: &TranslatorRegistry,
    runner: &dyn ConverterRunner,
) -> Result<ScanSummary, DaemonError> {
    scan_files(config, registry, runner).map(|reports| ScanSummary::from_reports(&reports))
}

/// Poll until the stop sentinel appears, then remove it.
///
/// The sentinel is checked before every scan and again before sleeping, never
/// during a scan. Directory listing failures are logged and retried next
/// cycle; any other error or a panic is logged and ends the loop.
pub fn run(
    config: &PollerConfig,
    registry: &TranslatorRegistry,
    runner: &dyn ConverterRunner,
) -> Result<ScanSummary, DaemonError> {
    tracing::info!(
        source_dir = %config.source_dir.display(),
        work_dir = %config.work_dir.display(),
        interval_secs = config.interval.as_secs(),
        translators = registry.len(),
        "poller started",
    );

    let mut totals = ScanSummary::default();
    while !stop_requested(&config.stop_sentinel) {
        let started = Instant::now();
        let scanned = panic::catch_unwind(AssertUnwindSafe(|| scan_once(config, registry, runner)));
        let scanned = match scanned {
            Ok(result) => result,
            Err(payload) => {
                tracing::error!(
                    panic = panic_message(payload.as_ref()),
                    "unexpected failure during scan, shutting down",
                );
                panic::resume_unwind(payload);
            }
        };

        match scanned {
            Ok(summary) => {
                log_scan(&summary, started.elapsed());
                totals.absorb(summary);
            }
            Err(err @ DaemonError::DirectoryList { .. }) => {
                tracing::error!(error = %err, "scan aborted, retrying next cycle");
            }
            Err(err) => {
                tracing::error!(error = %err, "unexpected poller error, shutting down");
                return Err(err);
            }
        }

        if stop_requested(&config.stop_sentinel) {
            break;
        }
        thread::sleep(config.interval);
    }

    clear_stop(&config.stop_sentinel)?;
    tracing::info!(
        scans = totals.scans,
        translated = totals.translated,
        failed = totals.failed,
        "stop requested, poller shut down",
    );
    Ok(totals)
}

/// Ask a running poller to exit after its current scan.
pub fn request_stop(sentinel: &Path) -> Result<(), DaemonError> {
    fs::write(sentinel, b"").map_err(|e| io_err(sentinel, e))
}

fn stop_requested(sentinel: &Path) -> bool {
    sentinel.is_file()
}

fn clear_stop(sentinel: &Path) -> Result<(), DaemonError> {
    match fs::remove_file(sentinel) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(sentinel, err)),
    }
}

fn log_scan(summary: &ScanSummary, elapsed: Duration) {
    if summary.translated > 0 || summary.failed > 0 {
        tracing::info!(
            files = summary.files,
            translated = summary.translated,
            already_done = summary.already_done,
            failed = summary.failed,
            duration_ms = elapsed.as_millis() as u64,
            "scan completed",
        );
    } else {
        tracing::debug!(files = summary.files, "scan completed, nothing to do");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io;

    use cgmman_core::ConcreteCommand;
    use tempfile::TempDir;

    /// Writes the last argument as output; creates the stop sentinel on its
    /// first call so the loop ends after the in-flight scan.
    struct StoppingRunner {
        sentinel: PathBuf,
        calls: Cell<usize>,
    }

    impl ConverterRunner for StoppingRunner {
        fn run(&self, command: &ConcreteCommand, work_dir: &Path) -> io::Result<Option<i32>> {
            self.calls.set(self.calls.get() + 1);
            fs::write(&self.sentinel, b"")?;
            let output = command.args.last().expect("output arg");
            fs::write(work_dir.join(output), b"out")?;
            Ok(Some(0))
        }
    }

    fn registry() -> TranslatorRegistry {
        let mut reg = TranslatorRegistry::new();
        reg.register(".out", 0, vec!["fake".into(), "{file}".into(), "{name}.out".into()])
            .unwrap();
        reg
    }

    fn config(source: &TempDir, work: &TempDir) -> PollerConfig {
        PollerConfig {
            source_dir: source.path().to_path_buf(),
            work_dir: work.path().to_path_buf(),
            interval: Duration::ZERO,
            stop_sentinel: work.path().join("stop"),
        }
    }

    #[test]
    fn sentinel_created_mid_scan_finishes_the_scan_then_stops() {
        let source = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        fs::write(source.path().join("a.cgm"), b"1").unwrap();
        fs::write(source.path().join("b.cgm"), b"2").unwrap();
        let cfg = config(&source, &work);
        let runner = StoppingRunner {
            sentinel: cfg.stop_sentinel.clone(),
            calls: Cell::new(0),
        };

        let totals = run(&cfg, &registry(), &runner).unwrap();

        assert_eq!(totals.scans, 1);
        assert_eq!(totals.translated, 2, "in-flight scan must complete");
        assert_eq!(runner.calls.get(), 2);
        assert!(!cfg.stop_sentinel.exists(), "sentinel removed on exit");
    }

    #[test]
    fn sentinel_present_before_start_runs_no_scan() {
        let source = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        fs::write(source.path().join("a.cgm"), b"1").unwrap();
        let cfg = config(&source, &work);
        request_stop(&cfg.stop_sentinel).unwrap();
        let runner = StoppingRunner {
            sentinel: cfg.stop_sentinel.clone(),
            calls: Cell::new(0),
        };

        let totals = run(&cfg, &registry(), &runner).unwrap();
        assert_eq!(totals, ScanSummary::default());
        assert_eq!(runner.calls.get(), 0);
        assert!(!cfg.stop_sentinel.exists());
    }

    #[test]
    fn missing_source_dir_is_a_directory_list_error() {
        let work = TempDir::new().unwrap();
        let cfg = PollerConfig {
            source_dir: work.path().join("absent"),
            work_dir: work.path().to_path_buf(),
            interval: Duration::ZERO,
            stop_sentinel: work.path().join("stop"),
        };
        let runner = StoppingRunner {
            sentinel: cfg.stop_sentinel.clone(),
            calls: Cell::new(0),
        };
        let err = scan_once(&cfg, &registry(), &runner).unwrap_err();
        assert!(matches!(err, DaemonError::DirectoryList { .. }));
    }

    #[test]
    fn from_settings_puts_sentinel_in_work_dir() {
        let settings = ManagerSettings {
            source_dir: PathBuf::from("/cgm"),
            work_dir: PathBuf::from("/work"),
            log_dir: PathBuf::from("/work"),
            log_prefix: "cgmman".into(),
            poll_interval_secs: 7,
            log_level: cgmman_core::LogLevel::Info,
            converter_timeout_secs: None,
        };
        let cfg = PollerConfig::from_settings(&settings);
        assert_eq!(cfg.stop_sentinel, PathBuf::from("/work/stop"));
        assert_eq!(cfg.interval, Duration::from_secs(7));
    }
}
