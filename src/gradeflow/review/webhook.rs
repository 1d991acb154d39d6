// SPDX-License-Identifier: MIT

//! HTTP webhook review delivery

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use super::{ReviewCapability, ReviewOutcome};
use crate::adk::error::{GradeflowError, WorkflowError};
use crate::gradeflow::workflow::state::{ResumeData, SuspendRequest};

/// POSTs each request as JSON to a task service.
///
/// A `200` reply carrying `{"resumeData": {...}}` is taken as an immediate
/// decision; any other success status means the task was created and the
/// decision will come back through `resume`.
pub struct WebhookReview {
    client: Client,
    endpoint: Url,
}

impl WebhookReview {
    pub fn new(endpoint: &str) -> Result<Self, GradeflowError> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            GradeflowError::config(format!("invalid webhook url '{}': {}", endpoint, e))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(GradeflowError::config(format!(
                "webhook url must be http(s), got '{}'",
                endpoint.scheme()
            )));
        }

        Ok(Self {
            client: Client::new(),
            endpoint,
        })
    }

    fn interpret_response(status: StatusCode, body: &str) -> Result<ReviewOutcome, WorkflowError> {
        if !status.is_success() {
            return Err(WorkflowError::delivery(format!(
                "task service returned {}: {}",
                status, body
            )));
        }

        if status == StatusCode::OK {
            if let Ok(json) = serde_json::from_str::<Value>(body) {
                if let Some(data) = json.get("resumeData").filter(|d| d.is_object()) {
                    return Ok(ReviewOutcome::Immediate(
                        ResumeData::from_value(data.clone()).map_err(|e| {
                            WorkflowError::delivery(format!("bad immediate decision: {}", e))
                        })?,
                    ));
                }
            }
        }

        Ok(ReviewOutcome::Pending)
    }
}

#[async_trait]
impl ReviewCapability for WebhookReview {
    async fn request_review(
        &self,
        request: &SuspendRequest,
    ) -> Result<ReviewOutcome, WorkflowError> {
        log::info!(
            "Posting review request for run {} to {}",
            request.run_id,
            self.endpoint
        );

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| WorkflowError::delivery(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| WorkflowError::delivery(e.to_string()))?;
        log::debug!("Task service replied {}: {}", status, body);

        Self::interpret_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradeflow::workflow::state::{ReviewTemplate, WorkflowState, FACULTY_SCORE};
    use serde_json::json;

    #[test]
    fn test_rejects_invalid_urls() {
        assert!(WebhookReview::new("not a url").is_err());
        assert!(WebhookReview::new("ftp://tasks.example.com").is_err());
        assert!(WebhookReview::new("https://tasks.example.com/review").is_ok());
    }

    #[test]
    fn test_accepted_means_pending() {
        let outcome =
            WebhookReview::interpret_response(StatusCode::ACCEPTED, r#"{"taskId": 7}"#).unwrap();
        assert_eq!(outcome, ReviewOutcome::Pending);

        let outcome = WebhookReview::interpret_response(StatusCode::OK, "").unwrap();
        assert_eq!(outcome, ReviewOutcome::Pending);
    }

    #[test]
    fn test_ok_with_decision_is_immediate() {
        let body = json!({"resumeData": {"FacultyScore": 4}}).to_string();
        let outcome = WebhookReview::interpret_response(StatusCode::OK, &body).unwrap();

        match outcome {
            ReviewOutcome::Immediate(data) => assert_eq!(data.get(FACULTY_SCORE), Some(&json!(4))),
            ReviewOutcome::Pending => panic!("Expected Immediate outcome"),
        }
    }

    #[test]
    fn test_error_status_is_delivery_error() {
        let err = WebhookReview::interpret_response(StatusCode::SERVICE_UNAVAILABLE, "down")
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ReviewDelivery(m) if m.contains("503")));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_delivery_error() {
        // Reserve a port, then release it so nothing is listening there
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let review = WebhookReview::new(&format!("http://127.0.0.1:{}/tasks", port)).unwrap();
        let request =
            SuspendRequest::build("run-1", &WorkflowState::default(), &ReviewTemplate::default());

        let err = review.request_review(&request).await.unwrap_err();
        assert!(matches!(err, WorkflowError::ReviewDelivery(_)));
    }
}
