use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ollama::DEFAULT_ENDPOINT;
use crate::provider::SamplingOptions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// One prose-oriented inference call per fixed prompt, results joined
    /// with a visible separator.
    Text,
    /// A single comprehensive prompt producing one structured report.
    Report,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_mode")]
    pub mode: AnalysisMode,

    #[serde(default = "default_stream")]
    pub stream: bool,

    #[serde(default)]
    pub sampling: SamplingOptions,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    "llama3.1:latest".to_string()
}

fn default_mode() -> AnalysisMode {
    AnalysisMode::Report
}

fn default_stream() -> bool {
    true
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            mode: default_mode(),
            stream: default_stream(),
            sampling: SamplingOptions::default(),
        }
    }
}

impl CheckerConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(endpoint) = std::env::var("SAFECHECK_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("SAFECHECK_MODEL") {
            config.model = model;
        }

        if let Ok(temp) = std::env::var("SAFECHECK_TEMPERATURE") {
            if let Ok(t) = temp.parse::<f32>() {
                config.sampling.temperature = Some(t);
            }
        }

        Ok(config)
    }

    pub fn save_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

pub const EXAMPLE_CONFIG: &str = r#"
# Safecheck configuration

endpoint: http://localhost:11434
model: llama3.1:latest

# text: one prose answer per fixed prompt
# report: single structured JSON report with inline diagnostics
mode: report

stream: true

sampling:
  temperature: 0.2
  top_k: 40
  top_p: 0.9
  repeat_penalty: 1.1
  num_predict: 2048
"#;
