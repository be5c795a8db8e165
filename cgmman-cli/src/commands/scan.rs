//! `cgmman scan`: one pass over the watched directory, reported per file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use cgmman_convert::{ProcessRunner, TranslateOutcome};
use cgmman_daemon::{scan_files, FileReport, PollerConfig, ScanSummary};

use super::{ensure_work_dir, ConfigPaths};

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ScanReportJson {
    summary: ScanSummary,
    results: Vec<ResultJson>,
}

#[derive(Serialize)]
struct ResultJson {
    source: PathBuf,
    extension: String,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ScanArgs {
    pub fn run(self, paths: &ConfigPaths) -> Result<()> {
        let settings = paths.load_settings()?;
        let registry = paths.load_registry()?;
        ensure_work_dir(&settings)?;

        let runner = ProcessRunner::with_timeout(settings.converter_timeout());
        let config = PollerConfig::from_settings(&settings);
        let reports = scan_files(&config, &registry, &runner).context("scan failed")?;
        let summary = ScanSummary::from_reports(&reports);

        if self.json {
            print_json(summary, &reports)?;
        } else {
            print_reports(&config.source_dir, summary, &reports);
        }

        if summary.failed > 0 {
            bail!("{} translation(s) failed", summary.failed);
        }
        Ok(())
    }
}

fn print_json(summary: ScanSummary, reports: &[FileReport]) -> Result<()> {
    let results = reports
        .iter()
        .flat_map(|report| {
            report.results.iter().map(|r| {
                let (status, output, error) = match &r.result {
                    Ok(TranslateOutcome::Translated { output }) => {
                        ("translated", Some(output.clone()), None)
                    }
                    Ok(TranslateOutcome::AlreadyDone) => ("already_done", None, None),
                    Err(err) => ("failed", None, Some(err.to_string())),
                };
                ResultJson {
                    source: report.source.clone(),
                    extension: r.extension.to_string(),
                    status,
                    output,
                    error,
                }
            })
        })
        .collect();
    let payload = ScanReportJson { summary, results };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize scan JSON")?
    );
    Ok(())
}

fn print_reports(source_dir: &Path, summary: ScanSummary, reports: &[FileReport]) {
    if reports.is_empty() {
        println!("No CGM files in {}", source_dir.display());
        return;
    }

    for report in reports {
        let name = report
            .source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| report.source.display().to_string());
        println!("{}", name.bold());
        for r in &report.results {
            match &r.result {
                Ok(TranslateOutcome::Translated { output }) => println!(
                    "  {}  {} -> {}",
                    "✓".green().bold(),
                    r.extension,
                    output.display()
                ),
                Ok(TranslateOutcome::AlreadyDone) => println!(
                    "  {}  {} already done",
                    "·".bright_black(),
                    r.extension
                ),
                Err(err) => println!("  {}  {}: {err}", "✗".red().bold(), r.extension),
            }
        }
    }

    println!(
        "{} files | {} translated | {} already done | {} failed",
        summary.files, summary.translated, summary.already_done, summary.failed,
    );
}
