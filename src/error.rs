use std::time::Duration;
use thiserror::Error;

/// Failure of a single request against the scanning service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// No response was received (DNS, TLS, refused connection, timeout).
    #[error("connection failed: {0}")]
    Connection(String),

    /// A response arrived but its body was not JSON.
    #[error("undecodable response body: {0}")]
    Decode(String),
}

impl HttpError {
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same request could reasonably succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::Connection(_) => true,
            HttpError::Status { status, .. } => matches!(*status, 408 | 429 | 500..=599),
            HttpError::Decode(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("scan configuration \"{name}\" not found among {available} configurations")]
    ConfigNotFound { name: String, available: usize },

    #[error("application \"{name}\" not found among {available} applications")]
    ApplicationNotFound { name: String, available: usize },

    #[error("failed to fetch {what}: {source}")]
    Transport {
        what: &'static str,
        #[source]
        source: HttpError,
    },
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to encode scan request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("scan submission failed after {attempts} attempt(s): {source}")]
    Submit {
        attempts: u32,
        #[source]
        source: HttpError,
    },

    #[error(
        "no scan id observed for configuration {configuration_id} after {}s ({attempts} lookups)",
        .waited.as_secs()
    )]
    Timeout {
        configuration_id: String,
        waited: Duration,
        attempts: u32,
    },
}
