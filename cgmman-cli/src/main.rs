//! cgmman: converts CGM drawings into other formats by running external
//! converters over a watched directory.
//!
//! # Usage
//!
//! ```text
//! cgmman [--config <ini>] [--translators <ini>] run [--once]
//! cgmman scan [--json]
//! cgmman stop
//! cgmman translators [--json]
//! cgmman logs [--lines N] [--date YYYY-MM-DD]
//! ```
//!
//! Both config files default to `cgmman.ini` and `translators.ini` next to
//! the executable.

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    daemon::{LogsArgs, RunArgs},
    scan::ScanArgs,
    translators::TranslatorsArgs,
    ConfigPaths,
};

#[derive(Parser, Debug)]
#[command(
    name = "cgmman",
    version,
    about = "Watch a directory of CGM files and convert them with external tools",
    long_about = None,
)]
struct Cli {
    /// Manager settings file.
    #[arg(long, global = true, value_name = "INI")]
    config: Option<PathBuf>,

    /// Translator table.
    #[arg(long, global = true, value_name = "INI")]
    translators: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the watched directory until a stop is requested.
    Run(RunArgs),

    /// Translate everything pending once and report per file.
    Scan(ScanArgs),

    /// Ask a running poller to exit after its current scan.
    Stop,

    /// List the configured translators.
    Translators(TranslatorsArgs),

    /// Print the tail of a daily log file.
    Logs(LogsArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = ConfigPaths::resolve(cli.config, cli.translators);
    match cli.command {
        Commands::Run(args) => args.run(&paths),
        Commands::Scan(args) => args.run(&paths),
        Commands::Stop => commands::daemon::stop(&paths),
        Commands::Translators(args) => args.run(&paths),
        Commands::Logs(args) => args.run(&paths),
    }
}
