use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::commands::index::{IndexFormat, IndexOptions};
use crate::commands::sync::SyncOptions;
use crate::commands::{self, CommandReport};
use crate::logging;

pub const EXIT_CHANGES: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NO_CHANGES: i32 = 3;

#[derive(Debug, Parser)]
#[command(
    name = "timetable-archive",
    version,
    about = "Mirror a published timetable listing into a revisioned local archive"
)]
struct Cli {
    /// Print the command report as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch the listing and archive every selected document.
    Sync {
        /// Report what would change without writing anything.
        #[arg(long)]
        dry_run: bool,
        /// Leave the index file alone even when documents changed.
        #[arg(long)]
        skip_index: bool,
    },
    /// Rebuild the revision index from the archive directory.
    Index {
        #[arg(long, value_enum, default_value_t = FormatArg::Markdown)]
        format: FormatArg,
        /// Write here instead of the configured index file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show resolved paths, configuration and archive state.
    Status,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Markdown,
    Json,
}

impl From<FormatArg> for IndexFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Markdown => IndexFormat::Markdown,
            FormatArg::Json => IndexFormat::Json,
        }
    }
}

fn print_report(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let state = if report.ok { "ok" } else { "failed" };
    println!("{}: {state}", report.command);
    for detail in &report.details {
        println!("  {detail}");
    }
    for issue in &report.issues {
        println!("  ! {issue}");
    }
    Ok(())
}

pub fn exit_code(report: &CommandReport) -> i32 {
    if !report.ok {
        return EXIT_FAILURE;
    }
    match report.changed {
        Some(false) => EXIT_NO_CHANGES,
        _ => EXIT_CHANGES,
    }
}

pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let report = match cli.command {
        Command::Sync {
            dry_run,
            skip_index,
        } => commands::sync::run(SyncOptions {
            dry_run,
            skip_index,
        })?,
        Command::Index { format, output } => commands::index::run(&IndexOptions {
            format: format.into(),
            output,
        })?,
        Command::Status => commands::status::run()?,
    };

    print_report(&report, cli.json)?;
    Ok(exit_code(&report))
}
