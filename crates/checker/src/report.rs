use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Per-severity counts as emitted by the model. Every field is optional on
/// the wire; missing counts deserialize to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSummary {
    #[serde(default)]
    pub total_vulnerabilities: u32,

    #[serde(default)]
    pub critical_count: u32,

    #[serde(default)]
    pub high_count: u32,

    #[serde(default)]
    pub medium_count: u32,

    #[serde(default)]
    pub low_count: u32,
}

/// One vulnerability entry exactly as the model wrote it. Nothing is trusted
/// at this stage: every field is optional and free-form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawVulnerability {
    #[serde(rename = "type")]
    pub vuln_type: Option<String>,

    pub description: Option<String>,

    /// Free-form location string: "line 5", "5", "5-10", "file.py:5", or absent.
    pub location: Option<String>,

    pub severity: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owasp_category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub summary: Option<ReportSummary>,

    #[serde(default)]
    pub vulnerabilities: Vec<RawVulnerability>,
}

impl AnalysisReport {
    /// Schema handed to the comprehensive prompt so the model knows the exact
    /// shape to emit.
    pub fn schema_definition() -> &'static str {
        r#"
{
  "summary": {
    "total_vulnerabilities": "number",
    "critical_count": "number",
    "high_count": "number",
    "medium_count": "number",
    "low_count": "number"
  },
  "vulnerabilities": [
    {
      "type": "string (e.g., 'Secret Exposure', 'Runtime Error')",
      "description": "string",
      "location": "string (e.g., 'line 5')",
      "severity": "critical|high|medium|low",
      "cwe_id": "string (optional, e.g., 'CWE-798')",
      "owasp_category": "string (optional)",
      "recommendation": "string (optional)"
    }
  ]
}
"#
    }
}

/// Outcome of trying to read structure out of the model's raw text. Every
/// downstream stage branches on this tag; the original text is never lost.
#[derive(Debug, Clone)]
pub enum ParsedReport {
    Structured(AnalysisReport),
    Unstructured(String),
}

impl ParsedReport {
    pub fn is_structured(&self) -> bool {
        matches!(self, ParsedReport::Structured(_))
    }
}

/// Isolate the JSON object embedded in unstructured model text: the inclusive
/// span from the first `{` to the last `}`. Returns the input unchanged when
/// no such span exists.
///
/// Deliberately naive. It does not balance braces, so prose containing a
/// stray `}` after a valid object, or multiple top-level objects, corrupts
/// the span. Known limitation, pinned by tests.
pub fn extract_json_span(text: &str) -> &str {
    let start = text.find('{');
    let end = text.rfind('}');

    match (start, end) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => {
            debug!("No JSON object found in model output, keeping raw text");
            text
        }
    }
}

/// Parse the extracted span into a typed report, falling back to opaque text
/// when the span is not the expected shape.
pub fn parse_report(text: &str) -> ParsedReport {
    let span = extract_json_span(text);

    match serde_json::from_str::<AnalysisReport>(span) {
        Ok(report) => {
            debug!(
                "Parsed structured report with {} vulnerabilities",
                report.vulnerabilities.len()
            );
            ParsedReport::Structured(report)
        }
        Err(e) => {
            warn!("Model output is not a structured report ({}), using unstructured fallback", e);
            ParsedReport::Unstructured(text.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extraction_round_trip() {
        let text = r#"noise {"a":1,"nested":{"b":2}} trailing"#;
        let span = extract_json_span(text);
        assert_eq!(span, r#"{"a":1,"nested":{"b":2}}"#);
        assert!(serde_json::from_str::<serde_json::Value>(span).is_ok());
    }

    #[test]
    fn test_extraction_without_braces_returns_input() {
        let text = "the model refused to answer";
        assert_eq!(extract_json_span(text), text);
    }

    #[test]
    fn test_extraction_with_reversed_delimiters_returns_input() {
        let text = "} backwards {";
        assert_eq!(extract_json_span(text), text);
    }

    #[test]
    fn test_parse_structured_report() {
        let text = r#"Here is my analysis:
{"summary":{"total_vulnerabilities":1,"critical_count":1},
 "vulnerabilities":[{"type":"Secret Exposure","description":"hardcoded key",
 "location":"line 7","severity":"critical","cwe_id":"CWE-798"}]}"#;

        let parsed = parse_report(text);
        let ParsedReport::Structured(report) = parsed else {
            panic!("expected structured report");
        };

        assert_eq!(report.summary.unwrap().total_vulnerabilities, 1);
        assert_eq!(report.vulnerabilities.len(), 1);
        assert_eq!(
            report.vulnerabilities[0].cwe_id.as_deref(),
            Some("CWE-798")
        );
    }

    #[test]
    fn test_parse_falls_back_to_unstructured() {
        let text = "I could not find any issues in this code.";
        let parsed = parse_report(text);
        let ParsedReport::Unstructured(raw) = parsed else {
            panic!("expected unstructured fallback");
        };
        assert_eq!(raw, text);
    }

    #[test]
    fn test_parse_report_with_missing_fields() {
        let parsed = parse_report(r#"{"vulnerabilities":[{}]}"#);
        let ParsedReport::Structured(report) = parsed else {
            panic!("expected structured report");
        };
        assert!(report.summary.is_none());
        assert!(report.vulnerabilities[0].vuln_type.is_none());
    }

    #[test]
    fn test_missing_counts_default_to_zero() {
        let summary: ReportSummary =
            serde_json::from_str(r#"{"total_vulnerabilities":3}"#).unwrap();
        assert_eq!(summary.total_vulnerabilities, 3);
        assert_eq!(summary.critical_count, 0);
        assert_eq!(summary.high_count, 0);
    }
}
