//! `cgmman translators`: show the translator table.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use tabled::{settings::Style, Table, Tabled};

use cgmman_core::{TranslatorRegistry, TranslatorRule};

use super::ConfigPaths;

#[derive(Args, Debug)]
pub struct TranslatorsArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct TranslatorRow {
    #[tabled(rename = "extension")]
    extension: String,
    #[tabled(rename = "converter")]
    converter: String,
    #[tabled(rename = "arguments")]
    arguments: String,
    #[tabled(rename = "success code")]
    success_code: i32,
}

impl From<&TranslatorRule> for TranslatorRow {
    fn from(rule: &TranslatorRule) -> Self {
        let (converter, arguments) = match rule.command_template.split_first() {
            Some((program, rest)) => (program.clone(), rest.join(" ")),
            None => (String::new(), String::new()),
        };
        Self {
            extension: rule.extension.to_string(),
            converter,
            arguments,
            success_code: rule.expected_exit_code,
        }
    }
}

impl TranslatorsArgs {
    pub fn run(self, paths: &ConfigPaths) -> Result<()> {
        let registry = paths.load_registry()?;
        if self.json {
            let rules: Vec<&TranslatorRule> = registry.iter().collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&rules)
                    .context("failed to serialize translators JSON")?
            );
            return Ok(());
        }
        print_table(paths, &registry);
        Ok(())
    }
}

fn print_table(paths: &ConfigPaths, registry: &TranslatorRegistry) {
    println!(
        "cgmman v{} | {} translators | {}",
        env!("CARGO_PKG_VERSION"),
        registry.len(),
        paths.translators.display(),
    );
    if registry.is_empty() {
        println!("{}", "No translators configured.".yellow());
        return;
    }
    let rows: Vec<TranslatorRow> = registry.iter().map(TranslatorRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}
