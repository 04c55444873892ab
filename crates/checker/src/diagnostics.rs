use std::collections::HashMap;
use tracing::debug;

use crate::mapper::Vulnerability;
use crate::report::{AnalysisReport, ReportSummary};

/// Process-wide diagnostic store: one replaceable annotation layer per
/// document. The store is the single writer of diagnostic state; each publish
/// replaces a document's set wholesale, so observers never see a partial
/// update and re-publishing the same list is idempotent.
#[derive(Debug, Default)]
pub struct DiagnosticStore {
    documents: HashMap<String, Vec<Vulnerability>>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, document_id: impl Into<String>, vulnerabilities: Vec<Vulnerability>) {
        let document_id = document_id.into();
        debug!(
            "Publishing {} diagnostics for {}",
            vulnerabilities.len(),
            document_id
        );
        self.documents.insert(document_id, vulnerabilities);
    }

    pub fn clear(&mut self, document_id: &str) {
        self.documents.remove(document_id);
    }

    pub fn clear_all(&mut self) {
        self.documents.clear();
    }

    pub fn get(&self, document_id: &str) -> &[Vulnerability] {
        self.documents
            .get(document_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }
}

/// Summary used for the user-facing notification. Explicit counts from the
/// report win; a report without a summary falls back to the vulnerability
/// count as total with a zero breakdown.
pub fn derive_summary(report: &AnalysisReport) -> ReportSummary {
    match &report.summary {
        Some(summary) => summary.clone(),
        None => ReportSummary {
            total_vulnerabilities: report.vulnerabilities.len() as u32,
            ..Default::default()
        },
    }
}

pub fn summary_notification(summary: &ReportSummary) -> String {
    format!(
        "{} vulnerabilities ({} critical, {} high)",
        summary.total_vulnerabilities, summary.critical_count, summary.high_count
    )
}
