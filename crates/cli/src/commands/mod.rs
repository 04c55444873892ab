pub mod check;
pub mod report;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use safecheck_checker::{AnalysisPipeline, CheckerConfig, OllamaClient};

/// Connection flags shared by every subcommand.
#[derive(Args, Debug)]
pub struct ConnectionArgs {
    /// Ollama-compatible endpoint to talk to
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Model name to request
    #[arg(short, long)]
    pub model: Option<String>,

    /// Wait for the complete response instead of streaming it
    #[arg(long)]
    pub no_stream: bool,

    /// Load endpoint, model, and sampling options from a YAML file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    pub fn resolve_config(&self) -> Result<CheckerConfig> {
        let mut config = match &self.config {
            Some(path) => CheckerConfig::from_yaml_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => CheckerConfig::from_env().context("Failed to read environment overrides")?,
        };

        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if self.no_stream {
            config.stream = false;
        }

        Ok(config)
    }

    pub fn build_pipeline(&self) -> Result<AnalysisPipeline> {
        let config = self.resolve_config()?;
        let client = OllamaClient::new(config.endpoint.clone(), config.model.clone());
        Ok(AnalysisPipeline::new(Arc::new(client), config))
    }
}

pub fn read_source(path: &PathBuf) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))
}
