//! Error types and failure classification.
//!
//! All fallible operations in this crate return [`Result`]. Transport and
//! HTTP failures are classified into a fixed set of user-facing messages via
//! [`Error::user_message`]; business failures carry the rejected envelope.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for request pipeline and stream consumer failures.
#[derive(Debug, Error)]
pub enum Error {
    /// The request was aborted through a cancellation token.
    #[error("request cancelled")]
    Cancelled,

    /// The server answered with a non-success HTTP status.
    ///
    /// `message` is the resolved user-facing message for the status, fixed at
    /// classification time.
    #[error("HTTP {status} for {url}: {message}")]
    Http {
        status: u16,
        url: String,
        message: String,
        body: String,
    },

    /// The server could not be reached (connect failure or timeout).
    #[error("network error: {0}")]
    Network(String),

    /// HTTP succeeded but the envelope code did not match the expected
    /// success code.
    #[error("business code {code}: {message}")]
    Business {
        code: i64,
        message: String,
        envelope: serde_json::Value,
    },

    /// A response body could not be decoded.
    #[error("parse error: {0}")]
    Parse(String),

    /// A streaming body failed mid-read.
    #[error("stream error: {0}")]
    Stream(String),

    /// Invalid client or request configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Anything that does not fit the classes above.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// The fixed human-readable message for this error, suitable for the
    /// global message hook (e.g. a UI toast).
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "request cancelled".to_string(),
            Self::Http { message, .. } => message.clone(),
            Self::Network(_) => "network error, unable to reach server".to_string(),
            Self::Business { code, message, .. } => {
                if message.is_empty() {
                    format!("Request failed, business code: {code}")
                } else {
                    message.clone()
                }
            }
            Self::Unknown(_) => "unknown error".to_string(),
            other => other.to_string(),
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Fixed status-to-message table.
///
/// Not configurable; `404` interpolates the request url, every other entry is
/// a constant string.
pub fn status_message(status: u16, url: &str) -> String {
    match status {
        401 => "unauthorized, please re-login".to_string(),
        403 => "access denied".to_string(),
        404 => format!("resource not found: {url}"),
        500 => "internal server error".to_string(),
        other => format!("HTTP error: {other}"),
    }
}

/// Classify a non-success HTTP response into an [`Error::Http`] carrying the
/// resolved table message.
pub(crate) fn classify_status(status: u16, url: &str, body: String) -> Error {
    Error::Http {
        status,
        url: url.to_string(),
        message: status_message(status, url),
        body,
    }
}

/// Classify a `reqwest` send failure.
///
/// Connect failures and timeouts map to [`Error::Network`] (no response from
/// the server); everything else is [`Error::Unknown`].
pub(crate) fn classify_send_error(err: reqwest::Error, url: &str) -> Error {
    if err.is_connect() || err.is_timeout() {
        Error::Network(format!("failed to reach {url}: {err}"))
    } else {
        Error::Unknown(format!("request to {url} failed: {err}"))
    }
}
