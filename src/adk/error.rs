// SPDX-License-Identifier: MIT

//! Typed error handling for gradeflow-rs
//!
//! `WorkflowError` is the taxonomy surfaced by `start`/`resume`; each variant
//! names the capability or checkpoint step that failed. `GradeflowError` wraps
//! it together with the process-level failures (config, I/O, parsing).

use thiserror::Error;

/// Top-level error type for gradeflow-rs
#[derive(Debug, Error)]
pub enum GradeflowError {
    /// Configuration errors (missing env vars, invalid config)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Workflow-specific errors
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// Model/LLM errors
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors raised while running or resuming a grading workflow
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The grading capability replied with something that is not a valid grade
    #[error("Grading response could not be parsed: {0}")]
    GradingFormat(String),

    /// The review capability did not accept the review request
    #[error("Review request could not be delivered: {0}")]
    ReviewDelivery(String),

    /// No suspended run with this id
    #[error("No checkpoint found for run '{0}'")]
    CheckpointNotFound(String),

    /// Reviewer payload has the wrong shape; the checkpoint is left intact
    #[error("Invalid resume data: {0}")]
    InvalidResumeData(String),

    /// Checkpoint storage or serialization failure
    #[error("Checkpoint storage error: {0}")]
    Checkpoint(String),

    /// A single invocation executed more nodes than the graph allows
    #[error("Max steps reached: {limit}")]
    StepLimit { limit: u32 },
}

/// Model/LLM-specific errors
#[derive(Debug, Error)]
pub enum ModelError {
    /// API key not configured
    #[error("API key not configured for provider: {0}")]
    ApiKeyMissing(String),

    /// Provider not supported
    #[error("Provider not supported: {0}")]
    UnsupportedProvider(String),

    /// Non-success status from the provider API
    #[error("API error from {provider}: {message}")]
    Api { provider: String, message: String },

    /// Invalid response from model
    #[error("Invalid response from model: {0}")]
    InvalidResponse(String),

    /// Transport failure
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl GradeflowError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl WorkflowError {
    /// Create a grading format error
    pub fn grading(message: impl Into<String>) -> Self {
        Self::GradingFormat(message.into())
    }

    /// Create a review delivery error
    pub fn delivery(message: impl Into<String>) -> Self {
        Self::ReviewDelivery(message.into())
    }

    /// Create a resume data error
    pub fn invalid_resume(message: impl Into<String>) -> Self {
        Self::InvalidResumeData(message.into())
    }

    /// Create a checkpoint storage error
    pub fn checkpoint(message: impl Into<String>) -> Self {
        Self::Checkpoint(message.into())
    }
}

impl ModelError {
    /// Create an API error
    pub fn api(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            message: message.into(),
        }
    }
}
