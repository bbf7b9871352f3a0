//! Typed errors for the competitor pipeline.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Validation failures are
//! values callers render as guidance, never panics; external-service
//! failures are captured and surfaced through the session's error field.

use thiserror::Error;

/// Reasons a submitted URL is rejected before the pipeline starts.
///
/// Each variant maps to exactly one validation rule, so callers can
/// render precise guidance for the rule that fired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlRejection {
    /// Input exceeds the maximum accepted length
    #[error("URL is too long ({length} characters, max {max})")]
    TooLong { length: usize, max: usize },

    /// Input contains whitespace
    #[error("URL must not contain spaces or other whitespace")]
    ContainsWhitespace,

    /// Scheme other than http/https (e.g. ftp://, file://)
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    /// Loopback, RFC1918, link-local, or metadata host
    #[error("private or local address not allowed: {0}")]
    PrivateOrLocalAddress(String),

    /// Hostname from the fixed placeholder reject-list
    #[error("placeholder domain not allowed: {0}")]
    PlaceholderDomain(String),

    /// Hostname has no dot (bare word, not a registrable domain)
    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    /// The URL could not be parsed at all
    #[error("unparseable URL: {0}")]
    Unparseable(#[from] url::ParseError),
}

/// Errors surfaced at the external-service boundary (discovery, scoring,
/// fingerprinting, extraction, status polling).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The service answered but rejected the request
    #[error("service rejected request: {message}")]
    Rejected { message: String },

    /// Response body did not match the expected shape
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The push channel failed mid-stream
    #[error("event stream error: {0}")]
    Stream(String),

    /// The target site did not answer the reachability probe
    #[error("site unreachable: {0}")]
    Unreachable(String),
}

/// Result type alias for external-service calls.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
