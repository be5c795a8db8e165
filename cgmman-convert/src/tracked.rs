//! Tracked source files.
//!
//! A [`TrackedFile`] lives for one poll cycle. It owns a resolved copy of the
//! translator rules and a [`StagedArtifacts`] guard that deletes everything
//! staged in the working directory when the file is dropped, whichever way
//! its processing ended.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use cgmman_core::{
    registry::resolve, BoundRule, Extension, RegistryError, TranslatorRegistry, TranslatorRule,
};

use crate::error::TranslateError;
use crate::names;

// ---------------------------------------------------------------------------
// Staged artifacts
// ---------------------------------------------------------------------------

/// Append-only set of file names created in the working directory.
#[derive(Debug)]
pub struct StagedArtifacts {
    work_dir: PathBuf,
    names: Vec<String>,
}

impl StagedArtifacts {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            names: Vec::new(),
        }
    }

    /// Record `name`. Returns `false` if it was already recorded.
    pub fn record(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        self.names.push(name.to_string());
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Delete every recorded file. Safe to call more than once.
    pub fn release(&mut self) {
        for name in self.names.drain(..) {
            let path = self.work_dir.join(&name);
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!("removed staged {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("cannot remove staged {}: {e}", path.display()),
            }
        }
    }
}

impl Drop for StagedArtifacts {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Tracked file
// ---------------------------------------------------------------------------

/// One managed source file, for the duration of one poll cycle.
#[derive(Debug)]
pub struct TrackedFile {
    source_path: PathBuf,
    directory: PathBuf,
    raw_filename: String,
    logical_name: String,
    bound_rules: BTreeMap<Extension, BoundRule>,
    staged: StagedArtifacts,
}

impl TrackedFile {
    /// Track `path`, staging into `work_dir` and binding every rule in
    /// `registry`.
    ///
    /// Fails with [`TranslateError::InvalidSourceFile`] unless `path` is an
    /// existing regular file with the managed extension and a non-empty
    /// logical name.
    pub fn new(
        path: &Path,
        work_dir: &Path,
        registry: &TranslatorRegistry,
    ) -> Result<Self, TranslateError> {
        let invalid = || TranslateError::InvalidSourceFile {
            path: path.to_path_buf(),
        };
        if !names::has_source_extension(path) {
            return Err(invalid());
        }
        let source_path = std::fs::canonicalize(path).map_err(|_| invalid())?;
        if !source_path.is_file() {
            return Err(invalid());
        }
        let directory = source_path.parent().ok_or_else(invalid)?.to_path_buf();
        let raw_filename = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(invalid)?
            .to_string();
        let logical_name = names::logical_name(&raw_filename).to_string();
        if logical_name.is_empty() {
            return Err(invalid());
        }
        let bound_rules = registry.bind_all(&logical_name, &raw_filename);

        Ok(Self {
            source_path,
            directory,
            raw_filename,
            logical_name,
            bound_rules,
            staged: StagedArtifacts::new(work_dir),
        })
    }

    /// Install or replace a rule for this file only.
    pub fn bind_rule(
        &mut self,
        extension: &str,
        expected_exit_code: i32,
        command_template: Vec<String>,
    ) -> Result<(), RegistryError> {
        let extension = Extension::parse(extension)?;
        if command_template.is_empty() {
            return Err(RegistryError::EmptyTemplate {
                extension: extension.to_string(),
            });
        }
        let rule = TranslatorRule {
            extension: extension.clone(),
            expected_exit_code,
            command_template,
        };
        let bound = BoundRule {
            expected_exit_code,
            command: resolve(&rule, &self.logical_name, &self.raw_filename),
        };
        self.bound_rules.insert(extension, bound);
        Ok(())
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn raw_filename(&self) -> &str {
        &self.raw_filename
    }

    pub fn logical_name(&self) -> &str {
        &self.logical_name
    }

    pub fn bound_rules(&self) -> &BTreeMap<Extension, BoundRule> {
        &self.bound_rules
    }

    pub fn rule(&self, extension: &Extension) -> Option<&BoundRule> {
        self.bound_rules.get(extension)
    }

    pub fn staged(&self) -> &StagedArtifacts {
        &self.staged
    }

    pub(crate) fn staged_mut(&mut self) -> &mut StagedArtifacts {
        &mut self.staged
    }

    pub fn work_dir(&self) -> &Path {
        self.staged.work_dir()
    }

    /// Remove staged files now instead of waiting for drop.
    pub fn cleanup(&mut self) {
        self.staged.release();
    }
}
