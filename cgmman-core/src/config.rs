//! INI configuration loaders.
//!
//! # Settings file (`cgmman.ini`)
//!
//! ```text
//! [manager]
//! source_dir = /data/cgm
//! work_dir = /data/work
//! sleep_seconds = 30
//! log_level = INFO
//! log_dir = /var/log/cgmman
//! log_prefix = cgmman
//! converter_timeout = 600
//! ```
//!
//! `log_level` takes a name or a numeric level. `log_dir` defaults to
//! `work_dir`; `log_prefix` and `converter_timeout` are optional.
//!
//! # Translators file (`translators.ini`)
//!
//! ```text
//! [.tif]
//! converter = /opt/cgm/cgm2tif
//! arguments = {file} {name}.tif
//! success_code = 0
//! ```
//!
//! Relative paths resolve against the directory holding the settings file.

use std::path::{Path, PathBuf};

use ini::{Ini, ParseOption, Properties};

use crate::error::ConfigError;
use crate::registry::TranslatorRegistry;
use crate::types::{LogLevel, ManagerSettings, DEFAULT_LOG_PREFIX};

pub const SETTINGS_FILE: &str = "cgmman.ini";
pub const TRANSLATORS_FILE: &str = "translators.ini";
pub const MANAGER_SECTION: &str = "manager";

// ---------------------------------------------------------------------------
// 1. Manager settings
// ---------------------------------------------------------------------------

/// Load the `[manager]` section from `path`.
pub fn load_manager_settings(path: &Path) -> Result<ManagerSettings, ConfigError> {
    let contents = read(path)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manager_settings(&contents, path, base)
}

/// Parse settings text. `origin` is only used in error messages; relative
/// paths are joined onto `base`.
pub fn parse_manager_settings(
    contents: &str,
    origin: &Path,
    base: &Path,
) -> Result<ManagerSettings, ConfigError> {
    let ini = parse(contents, origin)?;
    let section = ini
        .section(Some(MANAGER_SECTION))
        .ok_or_else(|| ConfigError::MissingSection {
            path: origin.to_path_buf(),
            section: MANAGER_SECTION.into(),
        })?;
    let keys = SectionReader {
        origin,
        name: MANAGER_SECTION,
        props: section,
    };

    let source_dir = base.join(keys.required("source_dir")?);
    let work_dir = base.join(keys.required("work_dir")?);
    if work_dir == source_dir {
        // Staged files are deleted after each cycle; sharing the directory
        // would delete sources and outputs.
        return Err(keys.invalid("work_dir", "must differ from source_dir".into()));
    }
    let log_dir = keys
        .optional("log_dir")
        .map(|dir| base.join(dir))
        .unwrap_or_else(|| work_dir.clone());
    let poll_interval_secs = keys.parse_required::<u64>("sleep_seconds")?;
    let log_level = match keys.optional("log_level") {
        Some(raw) => raw
            .parse::<LogLevel>()
            .map_err(|reason| keys.invalid("log_level", reason))?,
        None => LogLevel::default(),
    };
    let log_prefix = keys
        .optional("log_prefix")
        .unwrap_or(DEFAULT_LOG_PREFIX)
        .to_string();
    let converter_timeout_secs = keys.parse_optional::<u64>("converter_timeout")?;

    Ok(ManagerSettings {
        source_dir,
        work_dir,
        log_dir,
        log_prefix,
        poll_interval_secs,
        log_level,
        converter_timeout_secs,
    })
}

// ---------------------------------------------------------------------------
// 2. Translator table
// ---------------------------------------------------------------------------

/// Load every translator section from `path` into a fresh registry.
pub fn load_translators(path: &Path) -> Result<TranslatorRegistry, ConfigError> {
    let contents = read(path)?;
    parse_translators(&contents, path)
}

/// Parse translator text. Sections are target extensions; keys outside any
/// section are ignored.
pub fn parse_translators(contents: &str, origin: &Path) -> Result<TranslatorRegistry, ConfigError> {
    let ini = parse(contents, origin)?;
    let mut registry = TranslatorRegistry::new();

    for (name, props) in ini.iter() {
        let Some(name) = name else { continue };
        let keys = SectionReader {
            origin,
            name,
            props,
        };
        let converter = keys.required("converter")?;
        let arguments = keys.optional("arguments").unwrap_or("");
        let mut template = vec![converter.to_string()];
        let args = shlex::split(arguments)
            .ok_or_else(|| keys.invalid("arguments", "unbalanced quotes".into()))?;
        template.extend(args);
        let success_code = keys.parse_optional::<i32>("success_code")?.unwrap_or(0);

        let replaced = registry
            .register(name, success_code, template)
            .map_err(|source| ConfigError::Translator {
                path: origin.to_path_buf(),
                section: name.to_string(),
                source,
            })?;
        if replaced.is_some() {
            tracing::warn!(section = name, "duplicate translator section overrides earlier one");
        }
    }

    Ok(registry)
}

// ---------------------------------------------------------------------------
// 3. Helpers
// ---------------------------------------------------------------------------

/// Default config location: next to the running executable.
pub fn default_config_path(file_name: &str) -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(file_name)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(contents: &str, origin: &Path) -> Result<Ini, ConfigError> {
    // Values reach shlex untouched: Windows converter paths carry
    // backslashes and argument quoting belongs to the tokenizer.
    let opt = ParseOption {
        enabled_escape: false,
        enabled_quote: false,
        ..ParseOption::default()
    };
    Ini::load_from_str_opt(contents, opt).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        message: e.to_string(),
    })
}

struct SectionReader<'a> {
    origin: &'a Path,
    name: &'a str,
    props: &'a Properties,
}

impl<'a> SectionReader<'a> {
    fn optional(&self, key: &str) -> Option<&'a str> {
        self.props
            .get(key)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn required(&self, key: &str) -> Result<&'a str, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::MissingKey {
            path: self.origin.to_path_buf(),
            section: self.name.to_string(),
            key: key.to_string(),
        })
    }

    fn parse_required<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.required(key)?;
        raw.parse::<T>()
            .map_err(|e| self.invalid(key, format!("'{raw}': {e}")))
    }

    fn parse_optional<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(_) => self.parse_required(key).map(Some),
            None => Ok(None),
        }
    }

    fn invalid(&self, key: &str, reason: String) -> ConfigError {
        ConfigError::InvalidValue {
            path: self.origin.to_path_buf(),
            section: self.name.to_string(),
            key: key.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_config_dir() {
        let text = "[manager]\nsource_dir = cgm\nwork_dir = /abs/work\nsleep_seconds = 3\n";
        let settings =
            parse_manager_settings(text, Path::new("/etc/cgmman.ini"), Path::new("/etc")).unwrap();
        assert_eq!(settings.source_dir, PathBuf::from("/etc/cgm"));
        assert_eq!(settings.work_dir, PathBuf::from("/abs/work"));
        assert_eq!(settings.log_dir, PathBuf::from("/abs/work"));
        assert_eq!(settings.log_prefix, DEFAULT_LOG_PREFIX);
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn work_dir_must_differ_from_source_dir() {
        let text = "[manager]\nsource_dir = d\nwork_dir = d\nsleep_seconds = 3\n";
        let err = parse_manager_settings(text, Path::new("c.ini"), Path::new("/x")).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }), "got: {err}");
    }

    #[test]
    fn backslashes_survive_parsing() {
        let text = "[.tif]\nconverter = C:\\tools\\cgm2tif.exe\narguments = {file}\n";
        let reg = parse_translators(text, Path::new("translators.ini")).unwrap();
        let cmd = reg.bind(".tif", "a", "a.cgm").unwrap();
        assert_eq!(cmd.program, "C:\\tools\\cgm2tif.exe");
    }
}
