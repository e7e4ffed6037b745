use anyhow::Context;
use clap::{Parser, Subcommand};
use flexi_logger::{LevelFilter, LogSpecification, Logger};

mod analyze;
use analyze::Analyze;

mod fixture;

/// Minimal demonstrator for the five-stage matcher (spec.md §1 keeps
/// real APK parsing, reporting, and a production frontend out of
/// scope). This CLI loads a rule directory and a JSON call-graph
/// fixture, runs the matcher, and prints a confidence table.
#[derive(Parser)]
#[command(name = "quark")]
struct Cli {
    /// `-l`, `--log-level`: 0 = warn, 1 = info, 2 = debug, 3 = trace.
    #[arg(short = 'l', long, default_value_t = 0)]
    log_level: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every rule in a directory against a JSON call-graph fixture.
    Analyze(Analyze),
}

fn configure_logger(log_level: u8) -> anyhow::Result<flexi_logger::LoggerHandle> {
    let lvl = match log_level {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let spec = LogSpecification::builder().module("quark_core", lvl).build();
    Logger::with(spec).start().context("starting logger")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_handle = configure_logger(cli.log_level)?;

    match cli.command {
        Commands::Analyze(c) => c.run(),
    }
}
