// SPDX-License-Identifier: MIT

//! Configuration - YAML file loading and defaults
//!
//! Every section is optional; a missing file section falls back to the
//! defaults below. Secrets (API keys) are never read from this file, only
//! from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::adk::error::GradeflowError;
use crate::gradeflow::workflow::state::ReviewTemplate;

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "GRADEFLOW_CONFIG";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct GradeflowConfig {
    #[serde(default)]
    pub grader: GraderConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default)]
    pub checkpoints: CheckpointConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which chat model grades answers
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GraderConfig {
    /// "openai" or "anthropic"; inferred from the model name when absent
    pub provider: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: Option<f32>,
}

fn default_model() -> String {
    "gpt-4o-2024-08-06".to_string()
}

fn default_temperature() -> Option<f32> {
    Some(0.0)
}

impl Default for GraderConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: default_model(),
            temperature: default_temperature(),
        }
    }
}

/// How review requests reach reviewers
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    #[default]
    Outbox,
    Webhook,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ReviewConfig {
    #[serde(default)]
    pub mode: ReviewMode,
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,
    pub webhook_url: Option<String>,
    /// app_name, title and folder_path stamped on each request
    #[serde(flatten)]
    pub template: ReviewTemplate,
}

fn default_outbox_dir() -> PathBuf {
    PathBuf::from("review-outbox")
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            mode: ReviewMode::default(),
            outbox_dir: default_outbox_dir(),
            webhook_url: None,
            template: ReviewTemplate::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    Memory,
    #[default]
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CheckpointConfig {
    #[serde(default)]
    pub backend: CheckpointBackend,
    #[serde(default = "default_checkpoint_dir")]
    pub dir: PathBuf,
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            backend: CheckpointBackend::default(),
            dir: default_checkpoint_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct AuditConfig {
    /// JSON-lines file receiving one entry per finalized run
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

impl GradeflowConfig {
    /// Cross-field checks serde cannot express
    pub fn validate(&self) -> Result<(), GradeflowError> {
        if self.review.mode == ReviewMode::Webhook {
            let url = self.review.webhook_url.as_deref().ok_or_else(|| {
                GradeflowError::config("review.webhook_url is required when review.mode is webhook")
            })?;
            url::Url::parse(url).map_err(|e| {
                GradeflowError::config(format!("review.webhook_url '{}': {}", url, e))
            })?;
        }
        if self.grader.model.trim().is_empty() {
            return Err(GradeflowError::config("grader.model must not be empty"));
        }
        Ok(())
    }
}

/// Loads configuration from YAML files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<GradeflowConfig, GradeflowError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            GradeflowError::config(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::parse_yaml(&content)
    }

    /// Parse and validate a configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GradeflowConfig, GradeflowError> {
        let config: GradeflowConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit path, then `GRADEFLOW_CONFIG`, then built-in defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<GradeflowConfig, GradeflowError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => {
                log::info!("No config file given, using defaults");
                Ok(GradeflowConfig::default())
            }
        }
    }
}
