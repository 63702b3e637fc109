//! Error types for reel-dl
//!
//! This module provides the error taxonomy of the service:
//! - Domain-specific error types (fetch, transcode, staging, cleanup)
//! - An explicit [`ErrorKind`] classification that drives propagation policy
//! - HTTP status code mapping for API integration
//! - Structured error responses with machine-readable error codes

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

/// Result type alias for reel-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of every failure the service can produce
///
/// The kind decides how far an error travels: input, fetch and transcode errors
/// are reported to the client, internal errors are reported as 500s, and cleanup
/// errors never leave the cleanup task that produced them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself is unusable (bad or missing URL)
    Input,
    /// Proxy rotation or media retrieval failed, or nothing was retrieved
    Fetch,
    /// Audio extraction failed
    Transcode,
    /// Deferred deletion failed (logged only)
    Cleanup,
    /// Anything else: I/O, configuration, server plumbing
    Internal,
}

/// Main error type for reel-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "cleanup.workers")
        key: Option<String>,
    },

    /// The supplied URL is missing, malformed, or not a reel URL
    #[error("invalid Instagram Reel URL: {0}")]
    InvalidUrl(String),

    /// Media retrieval error
    #[error("fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Audio extraction error
    #[error("transcode error: {0}")]
    Transcode(#[from] TranscodeError),

    /// Moving artifacts into the public directory failed
    #[error("staging error: {0}")]
    Stage(#[from] StageError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Shutdown in progress - not accepting new requests
    #[error("shutdown in progress: not accepting new requests")]
    ShuttingDown,

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Operation not supported (missing binary, not configured, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),
}

/// Errors raised while obtaining media for a shortcode
#[derive(Debug, Error)]
pub enum FetchError {
    /// The proxy rotation step failed; the fetch was not attempted
    #[error("proxy rotation failed: {reason}")]
    ProxyRotation {
        /// The reason rotation failed
        reason: String,
    },

    /// The fetcher ran but reported a failure
    #[error("failed to fetch reel {shortcode}: {reason}")]
    ToolFailed {
        /// The shortcode being fetched
        shortcode: String,
        /// The reason the fetch failed (usually the tool's stderr)
        reason: String,
    },

    /// The fetcher did not finish within the configured timeout
    #[error("fetching reel {shortcode} timed out after {seconds}s")]
    Timeout {
        /// The shortcode being fetched
        shortcode: String,
        /// The timeout that elapsed
        seconds: u64,
    },

    /// The working directory holds no video after the fetch
    #[error("no video file found in {dir}")]
    NoMediaFound {
        /// The working directory that was searched
        dir: PathBuf,
    },
}

/// Errors raised while extracting audio from a staged video
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The transcoder ran but reported a failure
    #[error("audio extraction failed for {video}: {reason}")]
    ToolFailed {
        /// The video that was being transcoded
        video: PathBuf,
        /// The reason extraction failed (usually the tool's stderr)
        reason: String,
    },

    /// The transcoder reported success but produced no audio file
    #[error("audio extraction for {video} produced no file at {expected}")]
    OutputMissing {
        /// The video that was transcoded
        video: PathBuf,
        /// Where the audio file was expected
        expected: PathBuf,
    },

    /// The transcoder did not finish within the configured timeout
    #[error("audio extraction for {video} timed out after {seconds}s")]
    Timeout {
        /// The video that was being transcoded
        video: PathBuf,
        /// The timeout that elapsed
        seconds: u64,
    },
}

/// Errors raised while moving artifacts into the public directory
#[derive(Debug, Error)]
pub enum StageError {
    /// File move/rename failed
    #[error("failed to move {source_path} to {dest_path}: {reason}")]
    MoveFailed {
        /// The source path of the file being moved
        source_path: PathBuf,
        /// The destination path where the file should be moved
        dest_path: PathBuf,
        /// The reason the move failed
        reason: String,
    },
}

/// Failure of a deferred deletion
///
/// Only ever constructed inside a cleanup task, where it is logged and dropped.
#[derive(Debug, Error)]
pub enum CleanupError {
    /// Removing a directory tree failed for a reason other than absence
    #[error("failed to remove {path}: {source}")]
    RemoveFailed {
        /// The directory that could not be removed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl CleanupError {
    /// Cleanup failures always classify as [`ErrorKind::Cleanup`]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Cleanup
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidUrl(_) => ErrorKind::Input,
            Error::Fetch(_) => ErrorKind::Fetch,
            Error::Transcode(_) => ErrorKind::Transcode,
            Error::Config { .. }
            | Error::Stage(_)
            | Error::Io(_)
            | Error::ShuttingDown
            | Error::ApiServerError(_)
            | Error::NotSupported(_) => ErrorKind::Internal,
        }
    }
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "no_media_found",
///     "message": "fetch error: no video file found in downloads/ABC123",
///     "kind": "fetch"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "invalid_url", "transcode_failed")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Error classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                kind: None,
                details: None,
            },
        }
    }

    /// Create an API error with additional details
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        let mut api_error = Self::new(code, message);
        api_error.error.details = Some(details);
        api_error
    }

    /// Create an "unauthorized" error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("unauthorized", message)
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - the client sent something unusable
            Error::InvalidUrl(_) => 400,

            // 404 - the reel exists as a URL but yielded no video
            Error::Fetch(FetchError::NoMediaFound { .. }) => 404,

            // 502/504 - upstream (Instagram, proxy) problems
            Error::Fetch(FetchError::ProxyRotation { .. }) => 502,
            Error::Fetch(FetchError::ToolFailed { .. }) => 502,
            Error::Fetch(FetchError::Timeout { .. }) => 504,

            // 422 - media was retrieved but could not be processed
            Error::Transcode(_) => 422,

            // 500 Internal Server Error - Server-side issues
            Error::Config { .. } => 500,
            Error::Stage(_) => 500,
            Error::Io(_) => 500,
            Error::ApiServerError(_) => 500,

            // 501 Not Implemented - collaborator binary missing
            Error::NotSupported(_) => 501,

            // 503 Service Unavailable
            Error::ShuttingDown => 503,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Config { .. } => "config_error",
            Error::InvalidUrl(_) => "invalid_url",
            Error::Fetch(e) => match e {
                FetchError::ProxyRotation { .. } => "proxy_rotation_failed",
                FetchError::ToolFailed { .. } => "fetch_failed",
                FetchError::Timeout { .. } => "fetch_timeout",
                FetchError::NoMediaFound { .. } => "no_media_found",
            },
            Error::Transcode(e) => match e {
                TranscodeError::ToolFailed { .. } => "transcode_failed",
                TranscodeError::OutputMissing { .. } => "audio_missing",
                TranscodeError::Timeout { .. } => "transcode_timeout",
            },
            Error::Stage(StageError::MoveFailed { .. }) => "move_failed",
            Error::Io(_) => "io_error",
            Error::ShuttingDown => "shutting_down",
            Error::ApiServerError(_) => "api_server_error",
            Error::NotSupported(_) => "not_supported",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();
        let kind = Some(error.kind());

        let details = match &error {
            Error::Config { key: Some(key), .. } => Some(serde_json::json!({
                "key": key,
            })),
            Error::Fetch(FetchError::ToolFailed { shortcode, .. }) => Some(serde_json::json!({
                "shortcode": shortcode,
            })),
            Error::Fetch(FetchError::Timeout { shortcode, seconds }) => {
                Some(serde_json::json!({
                    "shortcode": shortcode,
                    "timeout_seconds": seconds,
                }))
            }
            Error::Transcode(TranscodeError::Timeout { seconds, .. }) => {
                Some(serde_json::json!({
                    "timeout_seconds": seconds,
                }))
            }
            _ => None,
        };

        Self {
            error: ErrorDetail {
                code,
                message,
                kind,
                details,
            },
        }
    }
}
