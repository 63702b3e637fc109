//! Cleanup handlers

use crate::api::AppState;
use crate::error::ApiError;
use crate::types::CleanupTaskId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::CleanupStatusResponse;

/// GET /cleanup/:id - State of a deferred cleanup task
///
/// Tasks that already finished report `done`.
#[utoipa::path(
    get,
    path = "/cleanup/{id}",
    tag = "cleanup",
    params(
        ("id" = u64, Path, description = "Cleanup task ID")
    ),
    responses(
        (status = 200, description = "Task state", body = CleanupStatusResponse),
        (status = 404, description = "No task with this ID was ever scheduled", body = ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn cleanup_status(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    let id = CleanupTaskId(id);
    match state.service.cleanup().status(id) {
        Some(cleanup_state) => (
            StatusCode::OK,
            Json(CleanupStatusResponse {
                id,
                state: cleanup_state,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(
                "cleanup_task_not_found",
                format!("cleanup task {id} not found"),
            )),
        )
            .into_response(),
    }
}
