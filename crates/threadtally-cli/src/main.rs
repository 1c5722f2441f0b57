mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{InputFormat, ReportArgs};
use config::Overrides;

#[derive(Parser)]
#[command(name = "threadtally")]
#[command(author, version, about = "Weekly per-thread activity reports for group chats")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable debug logging on stderr")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Summarise thread activity over the trailing window")]
    Report {
        #[arg(short, long, help = "Message history file to read")]
        input: PathBuf,
        #[arg(long, value_enum, help = "Input format (default: by file extension)")]
        format: Option<InputFormat>,
        #[arg(long, help = "Config file (default: <config dir>/threadtally/config.toml)")]
        config: Option<PathBuf>,
        #[arg(long, help = "Target group identifier")]
        group: Option<String>,
        #[arg(long, help = "IANA timezone used for day boundaries")]
        timezone: Option<String>,
        #[arg(long, help = "Window length in local calendar days")]
        days: Option<u32>,
        #[arg(short, long, help = "Write the report to this file")]
        output: Option<PathBuf>,
        #[arg(long, help = "Print the report JSON to stdout instead of writing a file")]
        stdout: bool,
        #[arg(long, conflicts_with = "stdout", help = "Also print a table summary")]
        light: bool,
        #[arg(long, help = "Pin the current time (RFC 3339)")]
        now: Option<String>,
        #[arg(long, help = "Show processing time")]
        benchmark: bool,
    },
    #[command(about = "List accepted timezone identifiers")]
    Timezones {
        #[arg(help = "Only show identifiers containing this text")]
        filter: Option<String>,
    },
}

fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match cli.command {
        Commands::Report {
            input,
            format,
            config,
            group,
            timezone,
            days,
            output,
            stdout,
            light,
            now,
            benchmark,
        } => commands::run_report(ReportArgs {
            input,
            format,
            config,
            overrides: Overrides {
                group,
                timezone,
                window_days: days,
                output,
            },
            now,
            stdout,
            light,
            benchmark,
        }),
        Commands::Timezones { filter } => commands::run_timezones(filter.as_deref()),
    }
}
