//! Safecheck Checker - LLM-Backed Security Analysis
//!
//! This crate runs source code through a local language model and turns the
//! model's answers into structured, line-anchored diagnostics. It covers the
//! whole path: prompt composition, streaming inference against an
//! Ollama-compatible endpoint, JSON extraction from prose-wrapped output,
//! report parsing with an unstructured fallback, and severity/line mapping.

pub mod config;
pub mod diagnostics;
pub mod mapper;
pub mod mock;
pub mod ollama;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod report;

pub use config::{AnalysisMode, CheckerConfig};
pub use diagnostics::{derive_summary, summary_notification, DiagnosticStore};
pub use mapper::{map_severity, map_vulnerabilities, DiagnosticSeverity, Vulnerability};
pub use ollama::{OllamaClient, DEFAULT_ENDPOINT};
pub use pipeline::{AnalysisPipeline, RunReport};
pub use prompts::{PromptBuilder, TEXT_REPORT_SEPARATOR};
pub use provider::{InferenceError, InferenceProvider, InferenceRequest, SamplingOptions};
pub use report::{
    extract_json_span, parse_report, AnalysisReport, ParsedReport, RawVulnerability, ReportSummary,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
