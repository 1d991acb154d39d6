// SPDX-License-Identifier: MIT

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::adk::error::WorkflowError;
use crate::gradeflow::workflow::graph::{GradingWorkflow, RunResult};
use crate::gradeflow::workflow::state::ResumeData;

type AppState = Arc<GradingWorkflow>;

pub fn router(workflow: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/runs", post(create_run).get(list_runs))
        .route("/api/runs/{id}", get(get_run).delete(cancel_run))
        .route("/api/runs/{id}/resume", post(resume_run))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(workflow)
}

pub async fn serve(
    workflow: AppState,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    log::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(workflow)).await?;

    Ok(())
}

/// Workflow errors rendered as `{"error": message}` with a matching status
pub struct ApiError(WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(e: WorkflowError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            WorkflowError::CheckpointNotFound(_) => StatusCode::NOT_FOUND,
            WorkflowError::InvalidResumeData(_) => StatusCode::UNPROCESSABLE_ENTITY,
            WorkflowError::GradingFormat(_) | WorkflowError::ReviewDelivery(_) => {
                StatusCode::BAD_GATEWAY
            }
            WorkflowError::Checkpoint(_) | WorkflowError::StepLimit { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

fn run_response(result: RunResult) -> Json<Value> {
    match result {
        RunResult::Completed(state) => Json(json!({ "status": "completed", "state": state })),
        RunResult::Suspended(run_id) => Json(json!({ "status": "suspended", "runId": run_id })),
    }
}

async fn health_check(State(workflow): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "activeRuns": workflow.active_runs() }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    question: String,
    student_answer: String,
}

async fn create_run(
    State(workflow): State<AppState>,
    Json(payload): Json<RunRequest>,
) -> Result<Json<Value>, ApiError> {
    let result = workflow
        .start(&payload.question, &payload.student_answer)
        .await?;
    Ok(run_response(result))
}

async fn list_runs(State(workflow): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(workflow.pending().await?)))
}

async fn get_run(
    State(workflow): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(json!(workflow.inspect(&id).await?)))
}

async fn resume_run(
    State(workflow): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let data = ResumeData::from_value(body)?;
    let result = workflow.resume(&id, data).await?;
    Ok(run_response(result))
}

async fn cancel_run(
    State(workflow): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let checkpoint = workflow.cancel(&id).await?;
    Ok(Json(json!({ "status": "cancelled", "runId": checkpoint.run_id })))
}
