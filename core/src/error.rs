//! Error types for the Pinboard API client.
//!
//! # Design
//! HTTP statuses the service uses to signal specific conditions (401, 403,
//! 404, 500, 503) each get a dedicated variant so callers can match on them.
//! Any other non-2xx response lands in `Http` with the raw status and body.
//! Application-level failures arrive on 200 responses as a `result_code`
//! other than `"done"` and surface as `Application`.
//!
//! Network-layer failures are wrapped in `TransportError` without being
//! reinterpreted; the client never retries.

use thiserror::Error;

/// Failure reported by a `Transport` before any HTTP status was received.
#[derive(Debug, Error)]
#[error("transport error: {0}")]
pub struct TransportError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl TransportError {
    pub fn new(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

/// Errors returned by calls against the Pinboard API.
#[derive(Debug, Error)]
pub enum Error {
    /// The service rejected the auth token (HTTP 401).
    #[error("authentication failed")]
    Authentication,

    /// HTTP 403.
    #[error("forbidden")]
    Forbidden,

    /// HTTP 404, usually an unknown call path.
    #[error("not found")]
    NotFound,

    /// HTTP 500.
    #[error("server error: {body}")]
    Server { body: String },

    /// HTTP 503, the service is throttling or down.
    #[error("service unavailable")]
    ServiceUnavailable,

    /// Any other non-2xx status.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A date-valued field matched neither accepted timestamp format.
    #[error("cannot parse {field:?} value {value:?} as a date")]
    DateParse { field: String, value: String },

    /// The service answered 200 with a `result_code` other than `"done"`.
    #[error("{0}")]
    Application(String),

    /// The response body did not have the shape expected for the call path.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// A typed accessor was used on a reply of a different kind.
    #[error("expected {expected} reply, got {actual}")]
    UnexpectedReply {
        expected: &'static str,
        actual: &'static str,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Deserialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
