//! API key authentication for the reel endpoints
//!
//! When `ApiConfig::api_key` is set, guarded requests must carry a matching
//! `X-Api-Key` header or receive 401 Unauthorized. Header names are
//! case-insensitive; key values are compared exactly.

use crate::error::ApiError;
use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Middleware that rejects requests without a valid `X-Api-Key` header
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware};
/// use reel_dl::api::auth::require_api_key;
///
/// let api_key = Some("secret-key-123".to_string());
/// let router: Router = Router::new()
///     .layer(middleware::from_fn_with_state(api_key, require_api_key));
/// ```
pub async fn require_api_key(
    State(expected_api_key): State<Option<String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected_key) = expected_api_key else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    match provided {
        Some(key) if constant_time_eq(key.as_bytes(), expected_key.as_bytes()) => {
            next.run(request).await
        }
        Some(_) => {
            tracing::debug!(path = %request.uri().path(), "rejected request with invalid API key");
            unauthorized_response("Unauthorized: Invalid API Key")
        }
        None => unauthorized_response("Missing X-Api-Key header"),
    }
}

/// Constant-time byte comparison; always inspects every byte of equal-length inputs
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

fn unauthorized_response(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(ApiError::unauthorized(message))).into_response()
}
