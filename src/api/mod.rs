//! REST API server module
//!
//! Serves the reel endpoint, the staged artifacts under `/static`, and the
//! usual system endpoints (health, capabilities, OpenAPI, lifecycle events).

use crate::{Config, ReelService, Result};
use axum::{Router, http::HeaderValue, middleware, routing::get};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Reels (API key required when configured)
/// - `GET /download/reel?url=` - Fetch a reel and stage its video and MP3
/// - `GET /cleanup/:id` - State of a deferred cleanup task
///
/// ## System
/// - `GET /` - Liveness message
/// - `GET /health` - Health check
/// - `GET /capabilities` - Collaborators in use (API key required when configured)
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
/// - `GET /events` - Server-sent events stream (API key required when configured)
///
/// ## Artifacts
/// - `GET /static/:shortcode/:file` - Staged video and audio, until cleanup removes them
pub fn create_router(service: Arc<ReelService>, config: Arc<Config>) -> Router {
    let state = AppState::new(service.clone());

    let protected = Router::new()
        .route("/download/reel", get(routes::download_reel))
        .route("/cleanup/:id", get(routes::cleanup_status))
        .route("/capabilities", get(routes::get_capabilities))
        .route("/events", get(routes::event_stream));

    // Download links must work from a plain browser, so only the routes above
    // are guarded by the API key
    let protected = if config.server.api.api_key.is_some() {
        protected.layer(middleware::from_fn_with_state(
            config.server.api.api_key.clone(),
            auth::require_api_key,
        ))
    } else {
        protected
    };

    let router = Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .merge(protected)
        .nest_service(
            &format!("/{}", crate::staging::STATIC_ROUTE),
            ServeDir::new(service.public_root()),
        );

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    // Middleware layer ordering: In Axum's onion model, the LAST layer applied
    // is the OUTERMOST (runs first on requests). We want:
    //   Request → Trace → CORS → Rate Limit → Auth → Handler

    let router = if config.server.api.rate_limit.enabled {
        let limiter = Arc::new(rate_limit::RateLimiter::new(
            config.server.api.rate_limit.clone(),
        ));
        router.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ))
    } else {
        router
    };

    let router = if config.server.api.cors_enabled {
        router.layer(build_cors_layer(&config.server.api.cors_origins))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin; otherwise only the listed
/// origins are allowed. All methods and headers are allowed either way.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails. See [`start_api_server_with_shutdown`] for a
/// server that stops on a signal.
///
/// # Example
///
/// ```no_run
/// use reel_dl::{ReelService, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let service = Arc::new(ReelService::new((*config).clone()).await?);
///
/// // Start API server (blocks until the server stops)
/// reel_dl::api::start_api_server(service, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(service: Arc<ReelService>, config: Arc<Config>) -> Result<()> {
    start_api_server_with_shutdown(service, config, std::future::pending()).await
}

/// Start the API server and stop accepting connections once `shutdown` resolves
///
/// In-flight requests are allowed to finish before this returns.
pub async fn start_api_server_with_shutdown<F>(
    service: Arc<ReelService>,
    config: Arc<Config>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(
        address = %bind_address,
        "Starting API server"
    );

    let app = create_router(service, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(
        address = %bind_address,
        "API server listening"
    );

    // Must use into_make_service_with_connect_info to provide ConnectInfo<SocketAddr>
    // for the rate limiting middleware
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
