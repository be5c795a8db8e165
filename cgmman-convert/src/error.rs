//! Error types for cgmman-convert.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while tracking or translating a source file.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// The path is not a regular file carrying the managed extension.
    #[error("not a managed source file: {path}")]
    InvalidSourceFile { path: PathBuf },

    /// No rule is bound for the requested extension.
    #[error("no translator bound for extension '{extension}'")]
    UnknownExtension { extension: String },

    /// Inspecting or preparing a directory failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying into or out of the working directory failed.
    #[error("staging I/O error copying {from} to {to}: {source}")]
    StagingIo {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter could not be started or waited on.
    #[error("failed to run converter `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter exited with something other than the expected code.
    #[error("converter for '{extension}' exited with {} (expected {expected})", display_code(.actual))]
    ConverterFailure {
        extension: String,
        expected: i32,
        actual: Option<i32>,
    },

    /// The converter reported success but its output is not in the working directory.
    #[error("converter for '{extension}' succeeded but produced no {expected_output}")]
    MissingOutput {
        extension: String,
        expected_output: PathBuf,
    },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "no exit code".to_string(),
    }
}

/// Convenience constructor for [`TranslateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TranslateError {
    TranslateError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`TranslateError::StagingIo`].
pub(crate) fn staging_err(
    from: impl Into<PathBuf>,
    to: impl Into<PathBuf>,
    source: std::io::Error,
) -> TranslateError {
    TranslateError::StagingIo {
        from: from.into(),
        to: to.into(),
        source,
    }
}
