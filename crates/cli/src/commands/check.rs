//! Text-mode check command
//!
//! Runs the fixed prose prompts (runtime errors, leaked secrets) against a
//! single file and prints the model's answers as a readable report.

use anyhow::Result;
use clap::Args;
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use super::{read_source, ConnectionArgs};

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

pub async fn execute(args: CheckArgs) -> Result<()> {
    let start = Instant::now();
    let source = read_source(&args.input)?;
    let pipeline = args.connection.build_pipeline()?;

    println!(
        "{} {}",
        "Checking".bright_blue().bold(),
        args.input.display()
    );

    let report = pipeline.check_text(&source).await?;

    println!("\n{}", "════════════════════════════════════════".bright_blue());
    println!("{}", "     CODE CHECK".bright_blue().bold());
    println!("{}", "════════════════════════════════════════".bright_blue());
    println!("\n{}", report.trim_end());

    println!(
        "\n{} {:.2}s",
        "Done in".green(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
