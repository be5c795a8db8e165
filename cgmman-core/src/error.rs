//! Error types for cgmman-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the translator registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// No rule is registered for the requested target extension.
    #[error("no translator registered for extension '{extension}'")]
    UnknownExtension { extension: String },

    /// The extension is empty or consists only of dots.
    #[error("invalid extension '{raw}'")]
    InvalidExtension { raw: String },

    /// A command template needs at least the converter program.
    #[error("empty command template for extension '{extension}'")]
    EmptyTemplate { extension: String },
}

/// Startup configuration failures. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("failed to parse configuration {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A required section is absent.
    #[error("{path}: missing section [{section}]")]
    MissingSection { path: PathBuf, section: String },

    /// A required key is absent from its section.
    #[error("{path}: missing key '{key}' in section [{section}]")]
    MissingKey {
        path: PathBuf,
        section: String,
        key: String,
    },

    /// A key is present but its value cannot be used.
    #[error("{path}: invalid value for '{key}' in section [{section}]: {reason}")]
    InvalidValue {
        path: PathBuf,
        section: String,
        key: String,
        reason: String,
    },

    /// A translator section produced an invalid rule.
    #[error("{path}: translator [{section}]: {source}")]
    Translator {
        path: PathBuf,
        section: String,
        #[source]
        source: RegistryError,
    },
}
