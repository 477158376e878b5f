//! Error types for the graph client.
//!
//! All fallible operations in this crate return [`Result`], whose error type
//! [`GraphError`] is derived with [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Transport failures** ([`GraphError::HttpError`], [`GraphError::Status`] with a 5xx or 429
//!   code): transient, retried by [`crate::reliability::RetryPolicy`]
//! - **Request errors** ([`GraphError::Status`] with a 4xx code, [`GraphError::BatchTooLarge`],
//!   [`GraphError::InvalidInput`]): the request itself is wrong
//! - **Decode errors** ([`GraphError::Decode`], [`GraphError::Json`]): the response does not match
//!   the selected schema version
//! - **Configuration errors** ([`GraphError::UnsupportedSchema`], [`GraphError::UnknownSchema`],
//!   [`GraphError::ConfigError`], [`GraphError::TransportError`])
//!
//! End of a paginated sequence is not an error: [`crate::cursor::Cursor::next`] returns
//! `Ok(None)`.
//!
//! # Examples
//!
//! ```
//! use cofactr_graph::error::{GraphError, Result};
//!
//! fn check_batch(ids: &[&str]) -> Result<()> {
//!     if ids.len() > 500 {
//!         return Err(GraphError::BatchTooLarge { requested: ids.len(), max: 500 });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_batch(&["CCI8TPV75AW2"]).is_ok());
//! ```

use thiserror::Error;

use crate::schema::EntityKind;

/// Result type alias for graph client operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while talking to the graph API.
///
/// # Error Recovery
///
/// - **Transient errors** ([`HttpError`](Self::HttpError), 5xx [`Status`](Self::Status)): retried
///   automatically up to the configured attempt ceiling, then surfaced unchanged
/// - **Request errors**: fix the request; retrying will not help
/// - **Decode errors**: the chosen schema version does not match the server response
/// - **Configuration errors**: fix the client configuration or the requested schema
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GraphError {
    /// HTTP request failed before a response was received.
    ///
    /// Wraps [`reqwest::Error`]. Common causes:
    /// - Request timeouts
    /// - Connection refused or reset
    /// - DNS resolution failures
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API answered with a non-2xx status code.
    #[error("graph API returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated to a few kilobytes.
        body: String,
    },

    /// Response body is not valid JSON or not shaped like the endpoint's envelope.
    #[error("invalid JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// A record does not match the decoder for its schema version.
    ///
    /// Never retried: it signals a schema/version mismatch between client and server.
    #[error("cannot decode {kind} record with schema '{schema}': {message}")]
    Decode {
        /// Entity kind being decoded.
        kind: EntityKind,
        /// Schema identifier used for decoding.
        schema: String,
        /// Decoder message.
        message: String,
    },

    /// No decoder is registered for this entity kind and schema pair.
    #[error("schema '{schema}' is not supported for {kind} entities")]
    UnsupportedSchema {
        /// Entity kind requested.
        kind: EntityKind,
        /// Schema identifier requested.
        schema: String,
    },

    /// A schema identifier string does not name any known schema version.
    #[error("unknown schema identifier: {0}")]
    UnknownSchema(String),

    /// More IDs were passed to a batch lookup than a single call accepts.
    ///
    /// Raised locally, before any network call.
    #[error("batch of {requested} IDs exceeds the maximum of {max}")]
    BatchTooLarge {
        /// Number of IDs passed by the caller.
        requested: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Caller input was rejected by local validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Client configuration is invalid.
    #[error("invalid configuration: {0}")]
    ConfigError(String),

    /// Transport could not build or send the request.
    #[error("transport error: {0}")]
    TransportError(String),
}

impl GraphError {
    /// Returns `true` for failures that may succeed when the same request is sent again.
    ///
    /// Transient failures are timeouts, connection errors, request send failures, and
    /// server-side statuses (5xx, 429).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Returns the HTTP status code when the error carries one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let error = GraphError::Status { status: 422, body: "too many ids".into() };
        assert_eq!(error.to_string(), "graph API returned status 422: too many ids");
    }

    #[test]
    fn test_batch_too_large_display() {
        let error = GraphError::BatchTooLarge { requested: 501, max: 500 };
        assert_eq!(error.to_string(), "batch of 501 IDs exceeds the maximum of 500");
    }

    #[test]
    fn test_decode_error_display() {
        let error = GraphError::Decode {
            kind: EntityKind::Product,
            schema: "flagship".into(),
            message: "missing field `mpn`".into(),
        };
        assert_eq!(
            error.to_string(),
            "cannot decode product record with schema 'flagship': missing field `mpn`"
        );
    }

    #[test]
    fn test_unsupported_schema_display() {
        let error =
            GraphError::UnsupportedSchema { kind: EntityKind::Offer, schema: "flagship-v7".into() };
        assert!(error.to_string().contains("not supported for offer"));
    }

    #[test]
    fn test_server_status_is_transient() {
        assert!(GraphError::Status { status: 500, body: String::new() }.is_transient());
        assert!(GraphError::Status { status: 503, body: String::new() }.is_transient());
        assert!(GraphError::Status { status: 429, body: String::new() }.is_transient());
    }

    #[test]
    fn test_client_status_is_not_transient() {
        assert!(!GraphError::Status { status: 404, body: String::new() }.is_transient());
        assert!(!GraphError::Status { status: 422, body: String::new() }.is_transient());
    }

    #[test]
    fn test_local_errors_are_not_transient() {
        assert!(!GraphError::BatchTooLarge { requested: 600, max: 500 }.is_transient());
        assert!(!GraphError::UnknownSchema("flagship-v99".into()).is_transient());
        assert!(!GraphError::ConfigError("bad".into()).is_transient());
        assert!(
            !GraphError::Decode {
                kind: EntityKind::Org,
                schema: "flagship".into(),
                message: "x".into()
            }
            .is_transient()
        );
    }

    #[test]
    fn test_status_accessor() {
        assert_eq!(GraphError::Status { status: 404, body: String::new() }.status(), Some(404));
        assert_eq!(GraphError::InvalidInput("x".into()).status(), None);
    }
}
