//! Report-mode command
//!
//! Requests one comprehensive JSON vulnerability report for a file, maps it
//! to line-anchored diagnostics, and renders the result as colored console
//! output, JSON, or Markdown.

use anyhow::Result;
use clap::Args;
use colored::*;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Instant;

use safecheck_checker::{DiagnosticSeverity, ReportSummary, RunReport, Vulnerability};

use super::{read_source, ConnectionArgs};

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    #[arg(short, long, default_value = "console")]
    pub format: OutputFormat,

    /// Write the rendered report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" | "text" => Ok(OutputFormat::Console),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

pub async fn execute(args: ReportArgs) -> Result<()> {
    let start = Instant::now();
    let source = read_source(&args.input)?;
    let pipeline = args.connection.build_pipeline()?;
    let document_id = args.input.display().to_string();

    let run = pipeline.analyze_document(&document_id, &source).await?;

    let rendered = match args.format {
        OutputFormat::Console => render_console(&run, &args),
        OutputFormat::Json => render_json(&run)?,
        OutputFormat::Markdown => render_markdown(&run, &args),
    };

    if let Some(output_path) = &args.output {
        std::fs::write(output_path, rendered)?;
        println!("Report written to {}", output_path.display());
    } else {
        println!("{}", rendered);
    }

    if let Some(notification) = &run.notification {
        eprintln!(
            "\n{} {} ({:.2}s)",
            "Summary:".bold(),
            notification,
            start.elapsed().as_secs_f64()
        );
    }

    Ok(())
}

fn severity_label(severity: DiagnosticSeverity) -> ColoredString {
    match severity {
        DiagnosticSeverity::Error => "ERROR".red().bold(),
        DiagnosticSeverity::Warning => "WARNING".yellow(),
        DiagnosticSeverity::Information => "INFO".bright_blue(),
        DiagnosticSeverity::Hint => "HINT".bright_black(),
    }
}

fn render_console(run: &RunReport, args: &ReportArgs) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "\n{}", "════════════════════════════════════════".bright_blue());
    let _ = writeln!(output, "{}", "     SECURITY REPORT".bright_blue().bold());
    let _ = writeln!(output, "{}", "════════════════════════════════════════".bright_blue());
    let _ = writeln!(output, "File: {}", args.input.display());

    if !run.parsed.is_structured() {
        let _ = writeln!(
            output,
            "\n{}",
            "Model did not return structured JSON, raw report follows:".yellow()
        );
        let _ = writeln!(output, "\n{}", run.raw_text.trim());
        return output;
    }

    if run.diagnostics.is_empty() {
        let _ = writeln!(output, "\n{}", "No vulnerabilities found".green());
        return output;
    }

    for severity in [
        DiagnosticSeverity::Error,
        DiagnosticSeverity::Warning,
        DiagnosticSeverity::Information,
        DiagnosticSeverity::Hint,
    ] {
        let group: Vec<&Vulnerability> = run
            .diagnostics
            .iter()
            .filter(|v| v.severity == severity)
            .collect();
        if group.is_empty() {
            continue;
        }

        let _ = writeln!(
            output,
            "\n{} {} ({})",
            "▶".bright_white(),
            severity_label(severity),
            group.len()
        );
        let _ = writeln!(output, "{}", "─".repeat(40).bright_black());

        for vuln in group {
            let _ = writeln!(
                output,
                "\n  {} line {}: {}",
                "•".bright_white(),
                vuln.line + 1,
                vuln.message.bright_white()
            );
            if let Some(code) = &vuln.code {
                let _ = writeln!(output, "    Reference: {}", code.bright_cyan());
            }
            if let Some(recommendation) = &vuln.recommendation {
                let _ = writeln!(output, "    Fix: {}", recommendation.bright_black());
            }
        }
    }

    output
}

fn render_json(run: &RunReport) -> Result<String> {
    #[derive(serde::Serialize)]
    struct JsonReport<'a> {
        structured: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<&'a ReportSummary>,
        diagnostics: &'a [Vulnerability],
        #[serde(skip_serializing_if = "Option::is_none")]
        raw_report: Option<&'a str>,
    }

    let report = JsonReport {
        structured: run.parsed.is_structured(),
        summary: run.summary.as_ref(),
        diagnostics: &run.diagnostics,
        raw_report: if run.parsed.is_structured() {
            None
        } else {
            Some(&run.raw_text)
        },
    };

    Ok(serde_json::to_string_pretty(&report)?)
}

fn render_markdown(run: &RunReport, args: &ReportArgs) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Security Report");
    let _ = writeln!(output, "\n**File:** `{}`", args.input.display());
    let _ = writeln!(
        output,
        "**Date:** {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );

    if !run.parsed.is_structured() {
        let _ = writeln!(output, "\n## Model Report\n");
        let _ = writeln!(output, "{}", run.raw_text.trim());
        return output;
    }

    if let Some(summary) = &run.summary {
        let _ = writeln!(output, "\n## Summary");
        let _ = writeln!(output, "\n| Severity | Count |");
        let _ = writeln!(output, "|----------|-------|");
        for (label, count) in [
            ("Critical", summary.critical_count),
            ("High", summary.high_count),
            ("Medium", summary.medium_count),
            ("Low", summary.low_count),
        ] {
            if count > 0 {
                let _ = writeln!(output, "| {} | {} |", label, count);
            }
        }
        let _ = writeln!(output, "\n**Total:** {}", summary.total_vulnerabilities);
    }

    let _ = writeln!(output, "\n## Findings");
    if run.diagnostics.is_empty() {
        let _ = writeln!(output, "\nNo vulnerabilities found.");
    }

    for (i, vuln) in run.diagnostics.iter().enumerate() {
        let _ = writeln!(
            output,
            "\n### {}. {} (line {})",
            i + 1,
            vuln.message,
            vuln.line + 1
        );
        let _ = writeln!(output, "\n**Severity:** {}", vuln.severity);
        if let Some(code) = &vuln.code {
            let _ = writeln!(output, "**Reference:** {}", code);
        }
        if let Some(recommendation) = &vuln.recommendation {
            let _ = writeln!(output, "\n**Recommendation:**\n{}", recommendation);
        }
    }

    output
}
