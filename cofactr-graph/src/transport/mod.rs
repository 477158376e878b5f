//! Transport abstraction layer.
//!
//! The graph client never talks to the network directly. Every call goes through a
//! [`Transport`], which sends one [`HttpRequest`] and hands back the raw
//! [`TransportResponse`]. [`HttpTransport`] is the reqwest-backed implementation;
//! tests substitute scripted transports.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cofactr_graph::transport::{HttpRequest, HttpSettings, HttpTransport, Transport};
//!
//! # async fn example() -> cofactr_graph::error::Result<()> {
//! let transport =
//!     HttpTransport::with_settings("https://graph.cofactr.com", &HttpSettings::default())?;
//!
//! let request = HttpRequest::get("/products").with_query("q", "IRFH4251DTRPBF");
//! let response = transport.send(&request).await?;
//! println!("Status: {}", response.status);
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use crate::error::{GraphError, Result};

pub mod config;
pub mod http;

pub use config::{HttpSettings, HttpVersion};
pub use http::HttpTransport;

/// Longest error body kept in [`GraphError::Status`].
const MAX_ERROR_BODY: usize = 4096;

/// HTTP method of a graph API request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

impl HttpMethod {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// A request relative to the transport's base URL.
///
/// Requests are plain owned values so a retried call can send the same request
/// again without rebuilding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: HttpMethod,
    /// Path starting with `/`, without query string.
    pub path: String,
    /// Query parameters, in order.
    pub query: Vec<(String, String)>,
    /// Extra headers, in order.
    pub headers: Vec<(String, String)>,
    /// JSON body, for `POST`.
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Creates a `GET` request for `path`.
    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Creates a `POST` request for `path` with a JSON body.
    #[must_use]
    pub fn post(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self { method: HttpMethod::Post, body: Some(body), ..Self::get(path) }
    }

    /// Appends a query parameter.
    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Appends every pair of `params`.
    #[must_use]
    pub fn with_query_pairs<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query.extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Returns the first value of the query parameter `name`.
    #[must_use]
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

/// Response returned by a transport.
///
/// Contains the raw response body, HTTP status code, and response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body bytes.
    pub body: Vec<u8>,
    /// Response headers.
    pub headers: Vec<(String, String)>,
}

impl TransportResponse {
    /// Creates a `200 OK` response with a JSON body.
    #[must_use]
    pub fn json(value: &serde_json::Value) -> Self {
        Self { status: 200, body: value.to_string().into_bytes(), headers: Vec::new() }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Converts a non-2xx response into [`GraphError::Status`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Status`] carrying the status code and the start of the body.
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let end = self.body.len().min(MAX_ERROR_BODY);
        let body = String::from_utf8_lossy(&self.body[..end]).into_owned();
        Err(GraphError::Status { status: self.status, body })
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Json`] if the body is not valid JSON for `T`.
    pub fn json_body<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Request/response capability used by the graph client.
///
/// Implementations must be cheap to share: the client holds one transport and
/// may drive several requests through it concurrently.
pub trait Transport: Send + Sync {
    /// Sends one request and returns the response, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be built or no response is received.
    fn send(&self, request: &HttpRequest) -> impl Future<Output = Result<TransportResponse>> + Send;

    /// Returns the protocol name for logging.
    fn protocol_name(&self) -> &'static str {
        "http"
    }
}
