//! Reel handler: the one endpoint that does real work.

use crate::api::AppState;
use crate::error::Error;
use crate::types::ReelResponse;
use axum::{
    Json,
    extract::{Query, State},
};

use super::ReelQuery;

/// GET /download/reel - Fetch a reel, stage video and MP3, schedule their deletion
///
/// Blocks until both artifacts are staged. The returned URLs stay valid until
/// `expires_at`, after which the files are deleted.
#[utoipa::path(
    get,
    path = "/download/reel",
    tag = "reels",
    params(ReelQuery),
    responses(
        (status = 200, description = "Reel staged", body = ReelResponse),
        (status = 400, description = "Missing or invalid reel URL", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 404, description = "The fetch produced no video", body = crate::error::ApiError),
        (status = 422, description = "Audio extraction failed", body = crate::error::ApiError),
        (status = 502, description = "Proxy rotation or fetch failed", body = crate::error::ApiError),
        (status = 503, description = "Service is shutting down", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn download_reel(
    State(state): State<AppState>,
    Query(query): Query<ReelQuery>,
) -> Result<Json<ReelResponse>, Error> {
    let url = query.url.unwrap_or_default();
    let response = state.service.download_reel(&url).await?;
    Ok(Json(response))
}
