use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::report::RawVulnerability;

/// Canonical presentation severity for inline annotation, as opposed to the
/// free-form severity strings the model emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "Error"),
            Self::Warning => write!(f, "Warning"),
            Self::Information => write!(f, "Information"),
            Self::Hint => write!(f, "Hint"),
        }
    }
}

/// One normalized vulnerability ready for inline annotation. `line` is always
/// a valid zero-based index into the target document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Vulnerability {
    pub message: String,

    pub line: usize,

    pub severity: DiagnosticSeverity,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
}

/// Map a free-form severity string to a canonical level.
///
/// Critical and high both collapse to Error: inline annotation has fewer
/// levels than the wire format, and the summary counts preserve the
/// distinction. Anything unrecognized (including absent) is a Hint.
pub fn map_severity(severity: Option<&str>) -> DiagnosticSeverity {
    match severity.unwrap_or_default().to_lowercase().as_str() {
        "critical" | "high" => DiagnosticSeverity::Error,
        "medium" => DiagnosticSeverity::Warning,
        "low" => DiagnosticSeverity::Information,
        _ => DiagnosticSeverity::Hint,
    }
}

/// Recover a best-guess zero-based line from an arbitrary location string.
///
/// The first run of decimal digits is read as a 1-based line number; ranges
/// ("5-10") therefore yield their start and filenames with embedded numbers
/// are misread, by accepted trade-off. No digits defaults to the start of the
/// file. The result is clamped into `[0, document_line_count - 1]`.
pub fn resolve_line(location: Option<&str>, document_line_count: usize) -> usize {
    let digits: String = location
        .unwrap_or_default()
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    let one_based: usize = digits.parse().unwrap_or(1);
    let zero_based = one_based.saturating_sub(1);

    zero_based.min(document_line_count.saturating_sub(1))
}

/// Normalize one raw entry. Fails only when the target document has no lines
/// to attach a diagnostic to.
pub fn map_vulnerability(
    raw: &RawVulnerability,
    document_line_count: usize,
) -> Result<Vulnerability> {
    anyhow::ensure!(
        document_line_count > 0,
        "cannot map vulnerability into an empty document"
    );

    let vuln_type = raw.vuln_type.as_deref().unwrap_or("Security Issue");
    let description = raw.description.as_deref().unwrap_or("No description");

    Ok(Vulnerability {
        message: format!("{vuln_type}: {description}"),
        line: resolve_line(raw.location.as_deref(), document_line_count),
        severity: map_severity(raw.severity.as_deref()),
        code: raw.cwe_id.clone().or_else(|| raw.owasp_category.clone()),
        recommendation: raw.recommendation.clone(),
    })
}

/// Normalize a whole batch. A mapping failure for one entry is logged and
/// that entry skipped; the remaining entries still produce diagnostics.
pub fn map_vulnerabilities(
    raw: &[RawVulnerability],
    document_line_count: usize,
) -> Vec<Vulnerability> {
    let mut mapped = Vec::with_capacity(raw.len());

    for (idx, entry) in raw.iter().enumerate() {
        match map_vulnerability(entry, document_line_count) {
            Ok(vulnerability) => mapped.push(vulnerability),
            Err(e) => warn!("Skipping vulnerability entry {}: {}", idx, e),
        }
    }

    mapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(location: Option<&str>, severity: Option<&str>) -> RawVulnerability {
        RawVulnerability {
            location: location.map(str::to_string),
            severity: severity.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_severity_mapping_is_total_and_case_insensitive() {
        assert_eq!(map_severity(Some("CRITICAL")), DiagnosticSeverity::Error);
        assert_eq!(map_severity(Some("critical")), DiagnosticSeverity::Error);
        assert_eq!(map_severity(Some("High")), DiagnosticSeverity::Error);
        assert_eq!(map_severity(Some("medium")), DiagnosticSeverity::Warning);
        assert_eq!(map_severity(Some("low")), DiagnosticSeverity::Information);
        assert_eq!(map_severity(Some("")), DiagnosticSeverity::Hint);
        assert_eq!(map_severity(Some("bogus")), DiagnosticSeverity::Hint);
        assert_eq!(map_severity(None), DiagnosticSeverity::Hint);
    }

    #[test]
    fn test_line_resolution_variants() {
        assert_eq!(resolve_line(Some("line 5"), 20), 4);
        assert_eq!(resolve_line(Some("5"), 20), 4);
        assert_eq!(resolve_line(Some("5-10"), 20), 4);
        assert_eq!(resolve_line(Some("file.py:5"), 20), 4);
        assert_eq!(resolve_line(None, 20), 0);
        assert_eq!(resolve_line(Some("no digits here"), 20), 0);
    }

    #[test]
    fn test_line_resolution_clamps_out_of_range() {
        assert_eq!(resolve_line(Some("line 999"), 20), 19);
        assert_eq!(resolve_line(Some("line 0"), 20), 0);
        assert_eq!(resolve_line(Some("line 1"), 1), 0);
    }

    #[test]
    fn test_mapped_line_always_in_bounds() {
        for location in [None, Some("line 0"), Some("line 7"), Some("line 10000"), Some("x")] {
            let entry = raw(location, Some("high"));
            let mapped = map_vulnerability(&entry, 20).unwrap();
            assert!(mapped.line < 20, "line {} out of bounds for {:?}", mapped.line, location);
        }
    }

    #[test]
    fn test_message_composition_defaults() {
        let mapped = map_vulnerability(&RawVulnerability::default(), 10).unwrap();
        assert_eq!(mapped.message, "Security Issue: No description");
        assert_eq!(mapped.severity, DiagnosticSeverity::Hint);
        assert_eq!(mapped.line, 0);
        assert!(mapped.code.is_none());
    }

    #[test]
    fn test_code_prefers_cwe_over_owasp() {
        let entry = RawVulnerability {
            cwe_id: Some("CWE-798".to_string()),
            owasp_category: Some("A07".to_string()),
            ..Default::default()
        };
        assert_eq!(
            map_vulnerability(&entry, 10).unwrap().code.as_deref(),
            Some("CWE-798")
        );

        let entry = RawVulnerability {
            owasp_category: Some("A07".to_string()),
            ..Default::default()
        };
        assert_eq!(
            map_vulnerability(&entry, 10).unwrap().code.as_deref(),
            Some("A07")
        );
    }

    #[test]
    fn test_batch_skips_unmappable_entries() {
        let entries = vec![raw(Some("line 3"), Some("high")), raw(None, None)];
        // An empty document makes every entry unmappable.
        assert!(map_vulnerabilities(&entries, 0).is_empty());
        assert_eq!(map_vulnerabilities(&entries, 5).len(), 2);
    }

    #[test]
    fn test_end_to_end_mapping_scenario() {
        let entry = RawVulnerability {
            vuln_type: Some("Secret Exposure".to_string()),
            description: Some("hardcoded key".to_string()),
            location: Some("line 7".to_string()),
            severity: Some("critical".to_string()),
            cwe_id: Some("CWE-798".to_string()),
            ..Default::default()
        };

        let mapped = map_vulnerability(&entry, 20).unwrap();
        assert_eq!(mapped.line, 6);
        assert_eq!(mapped.severity, DiagnosticSeverity::Error);
        assert_eq!(mapped.code.as_deref(), Some("CWE-798"));
        assert_eq!(mapped.message, "Secret Exposure: hardcoded key");
    }
}
