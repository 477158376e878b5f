//! HTTP transport implementation.
//!
//! This module provides HTTP/1.1 and HTTP/2 transport using reqwest.

use reqwest::Client;
use tracing::instrument;
use url::Url;

use super::config::{HttpSettings, HttpVersion};
use crate::{
    error::{GraphError, Result},
    transport::{HttpMethod, HttpRequest, Transport, TransportResponse},
};

/// Validates the base URL.
///
/// Only `http` and `https` URLs with a host are accepted.
fn validate_url(url: &Url) -> Result<()> {
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GraphError::TransportError(format!(
            "unsupported URL scheme '{}': only http and https are allowed",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(GraphError::TransportError(format!("URL missing host: {url}")));
    }
    Ok(())
}

/// Rejects paths containing directory traversal sequences.
fn sanitize_path(path: &str) -> Result<&str> {
    if path.contains("..") || path.contains("//") {
        return Err(GraphError::TransportError(
            "Invalid path: traversal sequences not allowed".to_owned(),
        ));
    }
    if !path.is_empty() && !path.starts_with('/') {
        return Err(GraphError::TransportError("Path must start with '/'".to_owned()));
    }
    if path.contains('?') {
        return Err(GraphError::TransportError(
            "Path must not carry a query string; use HttpRequest::with_query".to_owned(),
        ));
    }
    Ok(path)
}

/// Validates header name and value for CRLF injection prevention.
fn validate_header(name: &str, value: &str) -> Result<()> {
    if name.contains('\r') || name.contains('\n') || name.contains('\0') {
        return Err(GraphError::TransportError(
            "Invalid header name: control characters not allowed".to_owned(),
        ));
    }
    if value.contains('\r') || value.contains('\n') || value.contains('\0') {
        return Err(GraphError::TransportError(
            "Invalid header value: control characters not allowed".to_owned(),
        ));
    }
    Ok(())
}

/// HTTP/1.1 and HTTP/2 transport using reqwest.
///
/// Supports automatic connection pooling and keep-alive. Cloning is cheap: clones
/// share the same connection pool.
///
/// # Examples
///
/// ```rust,no_run
/// use cofactr_graph::transport::{HttpRequest, HttpTransport, Transport};
///
/// # async fn example() -> cofactr_graph::error::Result<()> {
/// let transport = HttpTransport::new("https://graph.cofactr.com")?;
///
/// let response = transport.send(&HttpRequest::get("/health")).await?;
/// println!("Status: {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    http_version: HttpVersion,
}

impl HttpTransport {
    /// Creates a new HTTP transport with default settings.
    ///
    /// Default settings:
    /// - Pool max idle per host: 10
    /// - Timeout: 30 seconds
    /// - Connect timeout: 10 seconds
    /// - HTTP version: Auto (prefer HTTP/2)
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is not a valid http(s) URL or the HTTP client
    /// cannot be created.
    ///
    /// # Examples
    ///
    /// ```
    /// use cofactr_graph::transport::HttpTransport;
    ///
    /// let transport = HttpTransport::new("https://graph.cofactr.com").unwrap();
    /// assert_eq!(transport.base_url().as_str(), "https://graph.cofactr.com/");
    /// ```
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_settings(base_url, &HttpSettings::default())
    }

    /// Creates HTTP transport with custom settings.
    ///
    /// # Errors
    ///
    /// Returns error if `base_url` is invalid or HTTP client creation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use cofactr_graph::transport::{HttpSettings, HttpTransport, HttpVersion};
    ///
    /// let settings = HttpSettings {
    ///     pool_max_idle_per_host: 20,
    ///     timeout_secs: 60,
    ///     connect_timeout_secs: 15,
    ///     http_version: HttpVersion::Http1,
    /// };
    ///
    /// let transport = HttpTransport::with_settings("https://graph.cofactr.com", &settings).unwrap();
    /// ```
    pub fn with_settings(base_url: &str, settings: &HttpSettings) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| GraphError::TransportError(format!("invalid base_url: {e}")))?;
        validate_url(&base_url)?;

        let mut builder = Client::builder()
            .pool_max_idle_per_host(settings.pool_max_idle_per_host)
            .timeout(settings.timeout())
            .connect_timeout(settings.connect_timeout());

        builder = match settings.http_version {
            HttpVersion::Http1 => builder.http1_only(),
            HttpVersion::Http2 => builder.http2_prior_knowledge(),
            HttpVersion::Auto => builder,
        };

        let client = builder.build().map_err(GraphError::HttpError)?;

        Ok(Self { client, base_url, http_version: settings.http_version })
    }

    /// Base URL every request path is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves a request's path and query against the base URL.
    fn request_url(&self, request: &HttpRequest) -> Result<Url> {
        let path = sanitize_path(&request.path)?;

        let mut url = self.base_url.clone();
        let joined = format!("{}{path}", self.base_url.path().trim_end_matches('/'));
        url.set_path(&joined);
        url.set_query(None);

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }
        Ok(url)
    }

    #[instrument(
        skip(self, request),
        fields(method = request.method.as_str(), path = %request.path, status)
    )]
    async fn execute_request(&self, request: &HttpRequest) -> Result<TransportResponse> {
        let url = self.request_url(request)?;

        for (name, value) in &request.headers {
            validate_header(name, value)?;
        }

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        };

        builder = builder.header("Accept", "application/json");
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.header("Content-Type", "application/json").body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        tracing::Span::current().record("status", status);

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_owned()))
            .collect();

        let body = response.bytes().await.map_err(GraphError::HttpError)?.to_vec();
        tracing::debug!(status, bytes = body.len(), "Received response");

        Ok(TransportResponse { status, body, headers })
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: &HttpRequest) -> Result<TransportResponse> {
        self.execute_request(request).await
    }

    fn protocol_name(&self) -> &'static str {
        match self.http_version {
            HttpVersion::Http1 => "http/1.1",
            HttpVersion::Http2 => "http/2",
            HttpVersion::Auto => "http",
        }
    }
}
