//! Workflow endpoints: start runs, send signals, run queries

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{debug, info};

use crate::api::state::AppState;
use crate::api::types::{
    ApiError, HistoryResponse, Json, ProgressResponse, SignalResponse, StartWorkflowRequest,
    StartWorkflowResponse, StatusResponse, SubmitPromptRequest, WorkflowListResponse,
};
use crate::domain::conversation::SubmitOutcome;

/// GET /workflows
pub async fn list_workflows(State(state): State<AppState>) -> Json<WorkflowListResponse> {
    Json(WorkflowListResponse {
        workflow_ids: state.conversations.list_running().await,
    })
}

/// POST /workflows/start
///
/// The body is optional; without one a fresh id is generated.
pub async fn start_workflow(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        StartWorkflowRequest::default()
    } else {
        serde_json::from_slice::<StartWorkflowRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON data: {}", e)))?
    };

    let started = state.conversations.start(request.workflow_id).await?;
    let status = if started.already_running {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };

    Ok((status, Json(StartWorkflowResponse::from(started))))
}

/// POST /workflows/{workflow_id}/prompt
pub async fn submit_prompt(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    Json(request): Json<SubmitPromptRequest>,
) -> Result<Json<SignalResponse>, ApiError> {
    let item = request.into_item()?;

    match state.conversations.submit_prompt(&workflow_id, item).await? {
        SubmitOutcome::Queued { position } => {
            debug!(workflow_id = %workflow_id, position, "Prompt queued");
        }
        SubmitOutcome::Dropped => {
            info!(workflow_id = %workflow_id, "Prompt dropped by ended conversation");
        }
    }

    Ok(Json(SignalResponse::prompt_sent(workflow_id)))
}

/// POST /workflows/{workflow_id}/end
pub async fn end_workflow(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<SignalResponse>, ApiError> {
    state.conversations.end_conversation(&workflow_id).await?;

    Ok(Json(SignalResponse::ended(workflow_id)))
}

/// GET /workflows/{workflow_id}/history
pub async fn get_history(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let history = state.conversations.history(&workflow_id).await?;

    Ok(Json(HistoryResponse::new(workflow_id, history)))
}

/// GET /workflows/{workflow_id}/progress
pub async fn get_progress(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let latest = state.conversations.latest_progress(&workflow_id).await?;

    Ok(Json(ProgressResponse::new(workflow_id, latest)))
}

/// GET /workflows/{workflow_id}/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let status = state.conversations.status(&workflow_id).await?;

    Ok(Json(StatusResponse::new(workflow_id, status)))
}
