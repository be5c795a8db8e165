//! Translation workflow.
//!
//! ## `translate`: per (file, extension)
//!
//! 1. Skip if the output (or its `trasp_` variant) already exists next to the source.
//! 2. Copy the source into the working directory under its raw name, once per file.
//! 3. Run the bound converter inside the working directory.
//! 4. Compare the exit code with the rule's expected code, then find the output
//!    in the working directory, ignoring case and the `trasp_` prefix.
//! 5. Copy the output to `<output>.cgmman.tmp` beside the source.
//! 6. Rename to the final name (atomic on POSIX).
//!
//! Nothing is persisted between calls: step 1 re-derives state from the
//! directory contents every time, so a failed conversion is simply retried on
//! the next poll cycle.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cgmman_core::Extension;

use crate::error::{io_err, staging_err, TranslateError};
use crate::names;
use crate::runner::ConverterRunner;
use crate::tracked::TrackedFile;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of a translation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslateOutcome {
    /// The output was already present; the converter was not run.
    AlreadyDone,
    /// The converter ran and its output was moved beside the source.
    Translated { output: PathBuf },
}

/// Outcome for one extension of a [`translate_all`] fan-out.
#[derive(Debug)]
pub struct ExtensionResult {
    pub extension: Extension,
    pub result: Result<TranslateOutcome, TranslateError>,
}

// ---------------------------------------------------------------------------
// should_translate
// ---------------------------------------------------------------------------

/// `false` when `directory` already holds the output for `logical_name` and
/// `extension`, in either prefixed or plain form, in any letter case.
pub fn should_translate(
    directory: &Path,
    logical_name: &str,
    extension: &Extension,
) -> io::Result<bool> {
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            continue;
        };
        if names::names_match_output(file_name, logical_name, extension) {
            return Ok(false);
        }
    }
    Ok(true)
}

// ---------------------------------------------------------------------------
// translate
// ---------------------------------------------------------------------------

/// Convert `tracked` to `extension` unless the output already exists.
pub fn translate(
    tracked: &mut TrackedFile,
    extension: &Extension,
    runner: &dyn ConverterRunner,
) -> Result<TranslateOutcome, TranslateError> {
    let rule = tracked
        .rule(extension)
        .cloned()
        .ok_or_else(|| TranslateError::UnknownExtension {
            extension: extension.to_string(),
        })?;

    let directory = tracked.directory().to_path_buf();
    let needed = should_translate(&directory, tracked.logical_name(), extension)
        .map_err(|e| io_err(&directory, e))?;
    if !needed {
        tracing::debug!(
            "already translated: {} -> {extension}",
            tracked.source_path().display()
        );
        return Ok(TranslateOutcome::AlreadyDone);
    }

    stage_in(tracked)?;

    let output_name = names::output_filename(tracked.logical_name(), extension);
    tracked.staged_mut().record(&output_name);
    remove_stale(tracked, extension)?;

    tracing::info!("translating {} -> {extension}", tracked.source_path().display());
    tracing::debug!("running: {}", rule.command);
    let code = runner
        .run(&rule.command, tracked.work_dir())
        .map_err(|source| TranslateError::Spawn {
            command: rule.command.to_string(),
            source,
        })?;

    // Whatever the converter left behind belongs to this file's cleanup,
    // whether or not it succeeded.
    let work_dir = tracked.work_dir().to_path_buf();
    let produced = output_candidates(tracked, extension).map_err(|e| io_err(&work_dir, e))?;
    for name in &produced {
        tracked.staged_mut().record(name);
    }

    if code != Some(rule.expected_exit_code) {
        return Err(TranslateError::ConverterFailure {
            extension: extension.to_string(),
            expected: rule.expected_exit_code,
            actual: code,
        });
    }

    let Some(produced) = pick_output(produced, &output_name) else {
        return Err(TranslateError::MissingOutput {
            extension: extension.to_string(),
            expected_output: work_dir.join(&output_name),
        });
    };

    let destination = directory.join(&produced);
    relocate(&work_dir.join(&produced), &destination)?;

    tracing::info!("wrote: {}", destination.display());
    Ok(TranslateOutcome::Translated {
        output: destination,
    })
}

/// Run every bound extension. A failure on one extension is logged and does
/// not stop the others.
pub fn translate_all(
    tracked: &mut TrackedFile,
    runner: &dyn ConverterRunner,
) -> Vec<ExtensionResult> {
    let extensions: Vec<Extension> = tracked.bound_rules().keys().cloned().collect();
    extensions
        .into_iter()
        .map(|extension| {
            let result = translate(tracked, &extension, runner);
            if let Err(err) = &result {
                log_failure(tracked, err);
            }
            ExtensionResult { extension, result }
        })
        .collect()
}

fn log_failure(tracked: &TrackedFile, err: &TranslateError) {
    let source = tracked.source_path().display();
    match err {
        TranslateError::UnknownExtension { .. } => {
            tracing::error!("{source}: {err}; translation abandoned")
        }
        TranslateError::StagingIo { .. } => {
            tracing::error!("{source}: staging failed: {err}")
        }
        _ => tracing::error!("{source}: {err}"),
    }
}

// ---------------------------------------------------------------------------
// Staging helpers
// ---------------------------------------------------------------------------

/// Copy the source into the working directory under its raw file name.
fn stage_in(tracked: &mut TrackedFile) -> Result<(), TranslateError> {
    let raw = tracked.raw_filename().to_string();
    let staged = tracked.staged().path_of(&raw);
    if tracked.staged().contains(&raw) && staged.is_file() {
        return Ok(());
    }

    // Record first so a partial copy is still cleaned up.
    tracked.staged_mut().record(&raw);
    fs::copy(tracked.source_path(), &staged)
        .map_err(|e| staging_err(tracked.source_path(), &staged, e))?;
    tracing::debug!("staged {} as {}", tracked.source_path().display(), staged.display());
    Ok(())
}

/// Work-dir entries naming this file's output for `extension`, in any case
/// and with or without the staging prefix. The staged source is excluded.
fn output_candidates(tracked: &TrackedFile, extension: &Extension) -> io::Result<Vec<String>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(tracked.work_dir())? {
        let entry = entry?;
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name != tracked.raw_filename()
            && names::names_match_output(&name, tracked.logical_name(), extension)
            && entry.path().is_file()
        {
            found.push(name);
        }
    }
    found.sort();
    Ok(found)
}

/// The converter's output, preferring the exact expected name.
fn pick_output(candidates: Vec<String>, expected: &str) -> Option<String> {
    if candidates.iter().any(|name| name == expected) {
        return Some(expected.to_string());
    }
    candidates.into_iter().next()
}

/// A leftover from an interrupted run must not pass for fresh output.
fn remove_stale(tracked: &TrackedFile, extension: &Extension) -> Result<(), TranslateError> {
    let work_dir = tracked.work_dir();
    let stale = output_candidates(tracked, extension).map_err(|e| io_err(work_dir, e))?;
    for name in stale {
        let path = work_dir.join(&name);
        match fs::remove_file(&path) {
            Ok(()) => tracing::warn!("removed stale output {}", path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(&path, e)),
        }
    }
    Ok(())
}

/// Copy `from` beside the destination, then rename into place so the
/// destination only ever appears complete.
fn relocate(from: &Path, to: &Path) -> Result<(), TranslateError> {
    let tmp = PathBuf::from(format!("{}.cgmman.tmp", to.display()));
    if let Err(e) = fs::copy(from, &tmp) {
        let _ = fs::remove_file(&tmp);
        return Err(staging_err(from, &tmp, e));
    }
    if let Err(e) = fs::rename(&tmp, to) {
        let _ = fs::remove_file(&tmp);
        return Err(staging_err(&tmp, to, e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn should_translate_sees_plain_and_prefixed_outputs() {
        let dir = TempDir::new().unwrap();
        let tif = Extension::parse(".tif").unwrap();
        assert!(should_translate(dir.path(), "drawing", &tif).unwrap());

        fs::write(dir.path().join("TRASP_DRAWING.TIF"), b"x").unwrap();
        assert!(!should_translate(dir.path(), "drawing", &tif).unwrap());
        assert!(should_translate(dir.path(), "other", &tif).unwrap());
    }

    #[test]
    fn relocate_leaves_no_tmp_behind() {
        let work = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let from = work.path().join("a.tif");
        fs::write(&from, b"image").unwrap();
        let to = dest.path().join("a.tif");

        relocate(&from, &to).unwrap();
        assert_eq!(fs::read(&to).unwrap(), b"image");
        assert!(!dest.path().join("a.tif.cgmman.tmp").exists());
    }

    #[test]
    fn relocate_failure_writes_no_destination() {
        let work = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        let to = dest.path().join("a.tif");

        let err = relocate(&work.path().join("missing.tif"), &to).unwrap_err();
        assert!(matches!(err, TranslateError::StagingIo { .. }));
        assert!(!to.exists());
        assert!(!dest.path().join("a.tif.cgmman.tmp").exists());
    }
}
