//! Domain types for cgmman.
//!
//! All path fields use `PathBuf`; extensions go through [`Extension`] so that
//! every map keyed by target format agrees on case and leading dot.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use tracing::level_filters::LevelFilter;

use crate::error::RegistryError;

/// Extension of the files the manager watches and converts.
pub const SOURCE_EXTENSION: &str = ".cgm";

/// Marker prepended to a file name by the staging convention. `drawing.cgm`
/// and `trasp_drawing.cgm` name the same logical file.
pub const STAGING_PREFIX: &str = "trasp_";

/// File whose presence in the working directory stops the poller.
pub const STOP_SENTINEL: &str = "stop";

/// Log files are named `<prefix>.<YYYY-MM-DD>.log`.
pub const DEFAULT_LOG_PREFIX: &str = "cgmman";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A target file extension, normalized to lowercase with one leading dot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Extension(String);

impl Extension {
    /// Normalize `raw` (`"TIF"`, `".tif"`, `"..Tif"`) into `".tif"`.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let trimmed = raw.trim().trim_start_matches('.');
        if trimmed.is_empty() || trimmed.contains(['/', '\\']) {
            return Err(RegistryError::InvalidExtension {
                raw: raw.to_owned(),
            });
        }
        Ok(Self(format!(".{}", trimmed.to_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Extension {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Extension {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Translator rules
// ---------------------------------------------------------------------------

/// A registered converter: expected success code plus command template.
///
/// The first template token is the converter program. Tokens may contain
/// `{file}` (staged file name) and `{name}` (logical name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslatorRule {
    pub extension: Extension,
    pub expected_exit_code: i32,
    pub command_template: Vec<String>,
}

/// A command with every placeholder resolved, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConcreteCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl fmt::Display for ConcreteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words =
            std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        match shlex::try_join(words) {
            Ok(line) => f.write_str(&line),
            Err(_) => write!(f, "{} {}", self.program, self.args.join(" ")),
        }
    }
}

/// A rule bound to one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundRule {
    pub expected_exit_code: i32,
    pub command: ConcreteCommand,
}

// ---------------------------------------------------------------------------
// Log level
// ---------------------------------------------------------------------------

/// Configured verbosity. Accepts the symbolic names used in the settings file
/// or a numeric level on the 0–50 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn from_numeric(level: u32) -> Self {
        match level {
            0..=9 => LogLevel::Trace,
            10..=19 => LogLevel::Debug,
            20..=29 => LogLevel::Info,
            30..=39 => LogLevel::Warning,
            40..=49 => LogLevel::Error,
            _ => LogLevel::Critical,
        }
    }

    /// `tracing` has no level above ERROR, so CRITICAL shares it.
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(level) = s.parse::<u32>() {
            return Ok(Self::from_numeric(level));
        }
        match s.to_ascii_uppercase().as_str() {
            "TRACE" | "NOTSET" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARNING" | "WARN" => Ok(LogLevel::Warning),
            "ERROR" => Ok(LogLevel::Error),
            "CRITICAL" | "FATAL" => Ok(LogLevel::Critical),
            other => Err(format!(
                "unknown log level '{other}'; expected DEBUG, INFO, WARNING, ERROR, CRITICAL or a number"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Manager settings
// ---------------------------------------------------------------------------

/// The `[manager]` group of the settings file, with paths made absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerSettings {
    /// Watched directory holding the source files and receiving outputs.
    pub source_dir: PathBuf,
    /// Scratch area where sources are staged before conversion.
    pub work_dir: PathBuf,
    /// Directory receiving the daily log files.
    pub log_dir: PathBuf,
    pub log_prefix: String,
    pub poll_interval_secs: u64,
    pub log_level: LogLevel,
    /// Kill converters that run longer than this. `None` waits forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub converter_timeout_secs: Option<u64>,
}

impl ManagerSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn converter_timeout(&self) -> Option<Duration> {
        self.converter_timeout_secs.map(Duration::from_secs)
    }

    /// Path of the stop sentinel inside the working directory.
    pub fn stop_sentinel(&self) -> PathBuf {
        self.work_dir.join(STOP_SENTINEL)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_normalizes_case_and_dot() {
        assert_eq!(Extension::parse("TIF").unwrap().as_str(), ".tif");
        assert_eq!(Extension::parse(".Tif").unwrap().as_str(), ".tif");
        assert_eq!(Extension::parse(" ..png ").unwrap().as_str(), ".png");
    }

    #[test]
    fn extension_rejects_empty_and_paths() {
        assert!(Extension::parse("").is_err());
        assert!(Extension::parse("...").is_err());
        assert!(Extension::parse("a/b").is_err());
    }

    #[test]
    fn concrete_command_display_quotes_spaces() {
        let cmd = ConcreteCommand {
            program: "/opt/conv".into(),
            args: vec!["my file.cgm".into(), "out".into()],
        };
        let line = cmd.to_string();
        let words = shlex::split(&line).expect("display output re-splits");
        assert_eq!(words, vec!["/opt/conv", "my file.cgm", "out"]);
    }

    #[test]
    fn critical_shares_error_filter() {
        assert_eq!(LogLevel::Critical.to_level_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Warning.to_level_filter(), LevelFilter::WARN);
    }

    #[test]
    fn stop_sentinel_lives_in_work_dir() {
        let settings = ManagerSettings {
            source_dir: PathBuf::from("/data/cgm"),
            work_dir: PathBuf::from("/data/work"),
            log_dir: PathBuf::from("/data/work"),
            log_prefix: DEFAULT_LOG_PREFIX.into(),
            poll_interval_secs: 5,
            log_level: LogLevel::Info,
            converter_timeout_secs: None,
        };
        assert_eq!(settings.stop_sentinel(), PathBuf::from("/data/work/stop"));
        assert_eq!(settings.poll_interval(), Duration::from_secs(5));
        assert_eq!(settings.converter_timeout(), None);
    }
}
