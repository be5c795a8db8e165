//! File locations the daemon and CLI agree on.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

pub use cgmman_core::STOP_SENTINEL;

pub const LOG_EXTENSION: &str = "log";

/// `<prefix>.<YYYY-MM-DD>.log`
pub fn log_file_name(prefix: &str, date: NaiveDate) -> String {
    format!("{prefix}.{}.{LOG_EXTENSION}", date.format("%Y-%m-%d"))
}

pub fn log_file_path(dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    dir.join(log_file_name(prefix, date))
}

pub fn stop_sentinel_path(work_dir: &Path) -> PathBuf {
    work_dir.join(STOP_SENTINEL)
}
