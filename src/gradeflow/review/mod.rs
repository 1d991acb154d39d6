// SPDX-License-Identifier: MIT

//! Review capability - hands review requests to human reviewers
//!
//! Adapters:
//! - [outbox] - drops each request as a JSON file into a queue folder
//! - [webhook] - POSTs each request to an HTTP endpoint

pub mod outbox;
pub mod webhook;

use async_trait::async_trait;

use crate::adk::error::WorkflowError;
use crate::gradeflow::workflow::state::{ResumeData, SuspendRequest};

pub use outbox::OutboxReview;
pub use webhook::WebhookReview;

/// Result of handing a request to the review system
#[derive(Debug, Clone, PartialEq)]
pub enum ReviewOutcome {
    /// A decision was available right away
    Immediate(ResumeData),
    /// Delivered; the decision arrives later through `resume`
    Pending,
}

/// Delivers review requests to human reviewers
#[async_trait]
pub trait ReviewCapability: Send + Sync {
    /// Deliver the request. An `Err` means the request was not delivered and
    /// must surface as [`WorkflowError::ReviewDelivery`].
    async fn request_review(&self, request: &SuspendRequest)
        -> Result<ReviewOutcome, WorkflowError>;
}
