//! `cgmman run`, `cgmman stop` and `cgmman logs`: poller lifecycle.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;

use cgmman_convert::ProcessRunner;
use cgmman_core::ManagerSettings;
use cgmman_daemon::paths::log_file_path;
use cgmman_daemon::{
    init_logging, request_stop, run as poll, scan_once, Clock, PollerConfig, SystemClock,
};

use super::{ensure_work_dir, ConfigPaths};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Scan once and exit instead of polling.
    #[arg(long)]
    pub once: bool,
}

impl RunArgs {
    pub fn run(self, paths: &ConfigPaths) -> Result<()> {
        let settings = paths.load_settings()?;
        let _log_writer = init_logging(&settings).context("failed to initialize logging")?;

        let result = self.serve(paths, &settings);
        if let Err(err) = &result {
            tracing::error!("fatal error, exiting: {err:#}");
        }
        result
    }

    fn serve(&self, paths: &ConfigPaths, settings: &ManagerSettings) -> Result<()> {
        let registry = paths.load_registry()?;
        if registry.is_empty() {
            tracing::warn!(
                path = %paths.translators.display(),
                "no translators configured, nothing will be converted",
            );
        }
        ensure_work_dir(settings)?;

        let runner = ProcessRunner::with_timeout(settings.converter_timeout());
        let config = PollerConfig::from_settings(settings);

        if self.once {
            let summary = scan_once(&config, &registry, &runner).context("scan failed")?;
            tracing::info!(
                files = summary.files,
                translated = summary.translated,
                failed = summary.failed,
                "single scan finished",
            );
        } else {
            poll(&config, &registry, &runner).context("poller exited with error")?;
        }
        Ok(())
    }
}

pub fn stop(paths: &ConfigPaths) -> Result<()> {
    let settings = paths.load_settings()?;
    let sentinel = settings.stop_sentinel();
    if sentinel.exists() {
        println!("stop already requested: {}", sentinel.display());
        return Ok(());
    }
    ensure_work_dir(&settings)?;
    request_stop(&sentinel).context("failed to request stop")?;
    println!("stop requested: {}", sentinel.display());
    Ok(())
}

#[derive(Args, Debug)]
pub struct LogsArgs {
    /// Number of trailing lines to show.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,

    /// Day to show instead of today.
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

impl LogsArgs {
    pub fn run(self, paths: &ConfigPaths) -> Result<()> {
        let settings = paths.load_settings()?;
        let date = self.date.unwrap_or_else(|| SystemClock.today());
        let path = log_file_path(&settings.log_dir, &settings.log_prefix, date);
        print_tail(&path, self.lines).context("failed to read log file")
    }
}

fn print_tail(path: &Path, lines: usize) -> Result<()> {
    if !path.exists() {
        println!("log file not found: {}", path.display());
        return Ok(());
    }

    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut tail = VecDeque::<String>::with_capacity(lines);
    for line in reader.lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        if lines == 0 {
            continue;
        }
        if tail.len() == lines {
            tail.pop_front();
        }
        tail.push_back(line);
    }

    println!("==> {} <==", path.display());
    for line in tail {
        println!("{line}");
    }
    Ok(())
}
