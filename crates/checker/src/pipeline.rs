use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::CheckerConfig;
use crate::diagnostics::{derive_summary, summary_notification, DiagnosticStore};
use crate::mapper::{map_vulnerabilities, Vulnerability};
use crate::prompts::{PromptBuilder, REPORT_TEMPLATE, TEXT_REPORT_SEPARATOR};
use crate::provider::{InferenceProvider, InferenceRequest};
use crate::report::{parse_report, ParsedReport, ReportSummary};

/// Everything one report-mode run produced: the raw model text, the parse
/// outcome, and (for structured reports) the published diagnostics plus the
/// user-facing summary line.
#[derive(Debug)]
pub struct RunReport {
    pub raw_text: String,
    pub parsed: ParsedReport,
    pub diagnostics: Vec<Vulnerability>,
    pub summary: Option<ReportSummary>,
    pub notification: Option<String>,
}

/// Orchestrates one analysis run end to end: prompt composition, inference,
/// extraction, parsing, mapping, and diagnostic publication.
///
/// Runs are mutually exclusive: a new run is rejected while one is in flight
/// rather than interleaving two writers over the same document's diagnostics.
pub struct AnalysisPipeline {
    provider: Arc<dyn InferenceProvider>,
    prompts: PromptBuilder,
    config: CheckerConfig,
    diagnostics: Mutex<DiagnosticStore>,
    run_lock: tokio::sync::Mutex<()>,
}

impl AnalysisPipeline {
    pub fn new(provider: Arc<dyn InferenceProvider>, config: CheckerConfig) -> Self {
        Self {
            provider,
            prompts: PromptBuilder::new(),
            config,
            diagnostics: Mutex::new(DiagnosticStore::new()),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    fn request(&self, prompt: String) -> InferenceRequest {
        InferenceRequest::new(self.config.model.clone(), prompt)
            .with_options(self.config.sampling.clone())
            .with_stream(self.config.stream)
    }

    /// Text mode: one inference call per fixed prompt, issued sequentially,
    /// prose answers joined with a visible separator.
    pub async fn check_text(&self, code: &str) -> Result<String> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| anyhow::anyhow!("An analysis run is already in progress"))?;

        let start = Instant::now();
        let prompts = self.prompts.compose_text_mode(code)?;
        let mut combined = String::new();

        for prompt in prompts {
            debug!(
                "Dispatching text-mode prompt (~{} tokens)",
                self.provider.estimate_tokens(&prompt)
            );
            let answer = self
                .provider
                .generate(self.request(prompt))
                .await
                .context("Inference request failed")?;

            combined.push_str(&answer);
            combined.push_str(TEXT_REPORT_SEPARATOR);
        }

        info!("Text-mode analysis completed in {:?}", start.elapsed());
        Ok(combined)
    }

    /// JSON-report mode: one comprehensive prompt, one structured report.
    ///
    /// A structured report replaces the document's diagnostic set wholesale.
    /// The unstructured fallback still returns the raw text to show, but
    /// generates no diagnostics and leaves any existing set untouched.
    pub async fn analyze_document(&self, document_id: &str, code: &str) -> Result<RunReport> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| anyhow::anyhow!("An analysis run is already in progress"))?;

        let start = Instant::now();
        let prompt = self.prompts.compose(REPORT_TEMPLATE, code)?;
        debug!(
            "Dispatching report prompt (~{} tokens)",
            self.provider.estimate_tokens(&prompt)
        );

        let raw_text = self
            .provider
            .generate(self.request(prompt))
            .await
            .context("Inference request failed")?;

        debug!("Raw model output: {} chars", raw_text.len());

        let parsed = parse_report(&raw_text);
        let document_line_count = code.lines().count();

        let run = match &parsed {
            ParsedReport::Structured(report) => {
                let diagnostics = map_vulnerabilities(&report.vulnerabilities, document_line_count);
                let summary = derive_summary(report);
                let notification = summary_notification(&summary);

                self.diagnostics
                    .lock()
                    .publish(document_id, diagnostics.clone());

                info!(
                    "Published {} diagnostics for {}: {}",
                    diagnostics.len(),
                    document_id,
                    notification
                );

                RunReport {
                    raw_text,
                    parsed,
                    diagnostics,
                    summary: Some(summary),
                    notification: Some(notification),
                }
            }
            ParsedReport::Unstructured(_) => {
                warn!("Report was unstructured, no diagnostics generated for {}", document_id);
                RunReport {
                    raw_text,
                    parsed,
                    diagnostics: Vec::new(),
                    summary: None,
                    notification: None,
                }
            }
        };

        info!("Report-mode analysis completed in {:?}", start.elapsed());
        Ok(run)
    }

    /// Current diagnostic set for a document.
    pub fn diagnostics_for(&self, document_id: &str) -> Vec<Vulnerability> {
        self.diagnostics.lock().get(document_id).to_vec()
    }

    pub fn clear_document(&self, document_id: &str) {
        self.diagnostics.lock().clear(document_id);
    }

    pub fn clear_all(&self) {
        self.diagnostics.lock().clear_all();
    }
}
