use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::report::AnalysisReport;

/// Visible separator between the per-prompt sections of text-mode output.
pub const TEXT_REPORT_SEPARATOR: &str = "\n\n-----------------------\n\n";

/// Template names composed in text mode, in issue order.
pub const TEXT_MODE_TEMPLATES: &[&str] = &["runtime_error", "secret_leakage"];

/// Template name used in JSON-report mode.
pub const REPORT_TEMPLATE: &str = "comprehensive_report";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    pub name: String,
    pub template: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }
}

pub struct PromptBuilder {
    templates: HashMap<String, PromptTemplate>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut builder = Self {
            templates: HashMap::new(),
        };

        builder.add_template(PromptTemplate::new("runtime_error", RUNTIME_ERROR_TEMPLATE));
        builder.add_template(PromptTemplate::new("secret_leakage", SECRET_LEAKAGE_TEMPLATE));
        builder.add_template(PromptTemplate::new(REPORT_TEMPLATE, COMPREHENSIVE_REPORT_TEMPLATE));

        builder
    }

    pub fn add_template(&mut self, template: PromptTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Compose the final prompt for one template. The submitted code is
    /// opaque text; no escaping or sanitization is performed.
    pub fn compose(&self, template_name: &str, code: &str) -> Result<String> {
        let template = self
            .templates
            .get(template_name)
            .ok_or_else(|| anyhow::anyhow!("Template '{}' not found", template_name))?;

        let mut variables = HashMap::new();
        variables.insert("code".to_string(), code.to_string());
        variables.insert(
            "json_schema".to_string(),
            AnalysisReport::schema_definition().to_string(),
        );

        Ok(substitute_variables(&template.template, &variables))
    }

    /// Compose every text-mode prompt, in order. One inference call is issued
    /// per returned prompt.
    pub fn compose_text_mode(&self, code: &str) -> Result<Vec<String>> {
        TEXT_MODE_TEMPLATES
            .iter()
            .map(|name| self.compose(name, code))
            .collect()
    }
}

/// Substitute `{key}` placeholders. Placeholders with no matching variable
/// stay verbatim; a template without the placeholder simply ignores the
/// variable.
fn substitute_variables(template: &str, variables: &HashMap<String, String>) -> String {
    let mut result = template.to_string();

    for (key, value) in variables {
        let placeholder = format!("{{{}}}", key);
        result = result.replace(&placeholder, value);
    }

    result
}

const RUNTIME_ERROR_TEMPLATE: &str = "check if this would make a runtime error: {code}";

const SECRET_LEAKAGE_TEMPLATE: &str = "check if code is sharing personal information including \
private keys, database credentials, or cryptographic secrets: {code}";

const COMPREHENSIVE_REPORT_TEMPLATE: &str = r#"You are an expert security reviewer analyzing source code for runtime-error risk and leakage of secrets or credentials.

ISSUES TO DETECT:
1. RUNTIME ERRORS
   - Out-of-bounds access, null/None dereference, division by zero
   - Unhandled exceptions and error paths
2. SECRET EXPOSURE
   - Hardcoded private keys, API tokens, passwords
   - Database credentials and connection strings
   - Cryptographic secrets embedded in source

ANALYSIS APPROACH:
- Report only issues you can point at a specific line for
- Rate severity honestly: critical|high|medium|low
- Include a CWE identifier or OWASP category where one applies

CODE:
{code}

Return a JSON object matching this exact schema:
{json_schema}

If no issues are found, return {"summary":{"total_vulnerabilities":0},"vulnerabilities":[]}"#;
