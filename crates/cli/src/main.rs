use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
use commands::{check::CheckArgs, report::ReportArgs};

#[derive(Parser)]
#[command(name = "safecheck")]
#[command(about = "LLM-backed security checks for source code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Quick prose checks: runtime errors and leaked secrets
    Check(CheckArgs),

    /// Full JSON vulnerability report with line-anchored diagnostics
    Report(ReportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Check(args) => runtime.block_on(commands::check::execute(args)),
        Commands::Report(args) => runtime.block_on(commands::report::execute(args)),
    }
}
