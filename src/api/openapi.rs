//! OpenAPI documentation and schema generation
//!
//! Describes the reel-dl REST API using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the reel-dl REST API
///
/// The document is served at:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "reel-dl REST API",
        version = "0.1.0",
        description = "Fetches Instagram Reels, stages the video and an extracted MP3 for temporary download, and deletes both after a fixed delay",
        contact(
            name = "reel-dl",
            url = "https://github.com/jvz-devx/reel-dl"
        ),
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Reels
        crate::api::routes::download_reel,

        // Cleanup
        crate::api::routes::cleanup_status,

        // System
        crate::api::routes::root,
        crate::api::routes::health_check,
        crate::api::routes::get_capabilities,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::ReelResponse,
        crate::types::Capabilities,
        crate::types::Event,
        crate::types::Shortcode,
        crate::types::CleanupTaskId,
        crate::types::CleanupState,

        // Config types from config.rs
        crate::config::Config,
        crate::config::StorageConfig,
        crate::config::CleanupConfig,
        crate::config::ToolsConfig,
        crate::config::ProxyConfig,
        crate::config::TorControlConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,
        crate::config::RateLimitConfig,

        // API request/response types from routes
        crate::api::routes::ReelQuery,
        crate::api::routes::CleanupStatusResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
        crate::error::ErrorKind,
    )),
    tags(
        (name = "reels", description = "Reels - Fetch a reel and stage its video and audio"),
        (name = "cleanup", description = "Cleanup - Inspect deferred deletion of staged artifacts"),
        (name = "system", description = "System endpoints - Home, health, capabilities, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `X-Api-Key` header scheme referenced by guarded routes
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
