//! # cgmman-convert
//!
//! Tracked source files and the translation workflow.
//!
//! Build a [`TrackedFile`] for each source file found in the watched
//! directory, then call [`translate_all`] to run every bound converter. The
//! tracked file removes whatever it staged in the working directory when it
//! is dropped.

pub mod error;
pub mod names;
pub mod runner;
pub mod tracked;
pub mod workflow;

pub use error::TranslateError;
pub use runner::{ConverterRunner, ProcessRunner};
pub use tracked::{StagedArtifacts, TrackedFile};
pub use workflow::{should_translate, translate, translate_all, ExtensionResult, TranslateOutcome};
