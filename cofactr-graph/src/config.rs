//! Client configuration.
//!
//! [`GraphConfig`] is deserialized from TOML. Every table is optional and falls
//! back to the defaults shown below.
//!
//! ```toml
//! base_url = "https://graph.cofactr.com"
//! client_id = "my-client"
//! api_key = "my-key"
//!
//! [default_schemas]
//! product = "flagship-v7"
//! offer = "flagship-v5"
//! org = "flagship"
//! supplier = "flagship"
//!
//! [retry]
//! max_attempts = 3
//! multiplier = 1.0
//! min_delay_ms = 2000
//! max_delay_ms = 10000
//! retry_on = "transient"
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//!
//! [batch]
//! max_ids = 500
//! product_chunk_size = 250
//! supplier_chunk_size = 500
//! order_chunk_size = 500
//! max_concurrency = 1
//! ```

use std::{fmt, path::Path, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::{
    error::{GraphError, Result},
    reliability::{RetryOn, RetryPolicy},
    schema::{EntityKind, SchemaId},
    transport::HttpSettings,
};

/// Default graph API host.
pub const DEFAULT_BASE_URL: &str = "https://graph.cofactr.com";

/// Environment variable read by [`GraphConfig::with_env_credentials`] for the client ID.
pub const CLIENT_ID_ENV: &str = "COFACTR_CLIENT_ID";

/// Environment variable read by [`GraphConfig::with_env_credentials`] for the API key.
pub const API_KEY_ENV: &str = "COFACTR_API_KEY";

/// Root client configuration.
///
/// Immutable once handed to a client; every client instance carries its own copy,
/// including its default schemas.
#[derive(Clone, Deserialize)]
pub struct GraphConfig {
    /// API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as `X-CLIENT-ID` when set.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Sent as `X-API-KEY` when set.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Schema used when a call does not name one.
    #[serde(default)]
    pub default_schemas: DefaultSchemas,

    /// Retry settings.
    #[serde(default)]
    pub retry: RetrySettings,

    /// HTTP transport settings.
    #[serde(default)]
    pub http: HttpSettings,

    /// Batch lookup settings.
    #[serde(default)]
    pub batch: BatchSettings,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: None,
            api_key: None,
            default_schemas: DefaultSchemas::default(),
            retry: RetrySettings::default(),
            http: HttpSettings::default(),
            batch: BatchSettings::default(),
        }
    }
}

impl fmt::Debug for GraphConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphConfig")
            .field("base_url", &self.base_url)
            .field("client_id", &self.client_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("default_schemas", &self.default_schemas)
            .field("retry", &self.retry)
            .field("http", &self.http)
            .field("batch", &self.batch)
            .finish()
    }
}

impl GraphConfig {
    /// Parses and validates a TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if the TOML is malformed, names an unknown
    /// schema, or fails [`validate`](Self::validate).
    ///
    /// # Examples
    ///
    /// ```
    /// use cofactr_graph::{GraphConfig, schema::SchemaId};
    ///
    /// let config = GraphConfig::from_toml(
    ///     r#"
    ///     client_id = "my-client"
    ///
    ///     [default_schemas]
    ///     product = "flagship-v7"
    ///     "#,
    /// )?;
    ///
    /// assert_eq!(config.base_url, "https://graph.cofactr.com");
    /// assert_eq!(config.default_schemas.product, SchemaId::FlagshipV7);
    /// # Ok::<(), cofactr_graph::error::GraphError>(())
    /// ```
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| GraphError::ConfigError(format!("invalid TOML config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if the file cannot be read or is invalid.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| GraphError::ConfigError(format!("cannot read config file: {e}")))?;
        Self::from_toml(&content)
    }

    /// Validates every section.
    ///
    /// Checks that:
    /// - `base_url` is an `http` or `https` URL with a host
    /// - credentials contain no control characters
    /// - retry and batch settings are usable
    /// - HTTP timeouts are in range
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        self.validate_base_url()?;
        for (name, value) in [("client_id", &self.client_id), ("api_key", &self.api_key)] {
            if let Some(value) = value {
                validate_credential(name, value)?;
            }
        }
        self.retry.validate()?;
        self.http.validate()?;
        self.batch.validate()?;
        Ok(())
    }

    fn validate_base_url(&self) -> Result<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            GraphError::ConfigError(format!("invalid base_url '{}': {e}", self.base_url))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(GraphError::ConfigError(format!(
                "base_url must use http or https, got: {}",
                url.scheme()
            )));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(GraphError::ConfigError(format!("base_url has no host: {}", self.base_url)));
        }
        Ok(())
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Sets both credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        client_id: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.api_key = Some(api_key.into());
        self
    }

    /// Fills unset credentials from `COFACTR_CLIENT_ID` and `COFACTR_API_KEY`.
    #[must_use]
    pub fn with_env_credentials(mut self) -> Self {
        if self.client_id.is_none() {
            self.client_id = std::env::var(CLIENT_ID_ENV).ok().filter(|v| !v.is_empty());
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var(API_KEY_ENV).ok().filter(|v| !v.is_empty());
        }
        self
    }

    /// Sets the default schema of one entity kind.
    #[must_use]
    pub const fn with_default_schema(mut self, kind: EntityKind, schema: SchemaId) -> Self {
        self.default_schemas.set(kind, schema);
        self
    }

    /// Replaces the retry settings.
    #[must_use]
    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the HTTP settings.
    #[must_use]
    pub fn with_http(mut self, http: HttpSettings) -> Self {
        self.http = http;
        self
    }

    /// Replaces the batch settings.
    #[must_use]
    pub const fn with_batch(mut self, batch: BatchSettings) -> Self {
        self.batch = batch;
        self
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

/// Rejects credential values that would corrupt request headers.
fn validate_credential(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(GraphError::ConfigError(format!("{name} cannot be empty")));
    }
    if value.chars().any(char::is_control) {
        return Err(GraphError::ConfigError(format!("{name} contains control characters")));
    }
    Ok(())
}

/// Per-kind default schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DefaultSchemas {
    /// Default product schema.
    #[serde(default)]
    pub product: SchemaId,
    /// Default offer schema.
    #[serde(default)]
    pub offer: SchemaId,
    /// Default organization schema.
    #[serde(default)]
    pub org: SchemaId,
    /// Default supplier schema.
    #[serde(default)]
    pub supplier: SchemaId,
}

impl Default for DefaultSchemas {
    fn default() -> Self {
        Self {
            product: SchemaId::Flagship,
            offer: SchemaId::Flagship,
            org: SchemaId::Flagship,
            supplier: SchemaId::Flagship,
        }
    }
}

impl DefaultSchemas {
    /// Default schema of `kind`.
    #[must_use]
    pub const fn get(&self, kind: EntityKind) -> SchemaId {
        match kind {
            EntityKind::Product => self.product,
            EntityKind::Offer => self.offer,
            EntityKind::Org => self.org,
            EntityKind::Supplier => self.supplier,
        }
    }

    /// Sets the default schema of `kind`.
    pub const fn set(&mut self, kind: EntityKind, schema: SchemaId) {
        match kind {
            EntityKind::Product => self.product = schema,
            EntityKind::Offer => self.offer = schema,
            EntityKind::Org => self.org = schema,
            EntityKind::Supplier => self.supplier = schema,
        }
    }

    /// Returns `schema`, or the default of `kind` when `None`.
    #[must_use]
    pub fn resolve(&self, kind: EntityKind, schema: Option<SchemaId>) -> SchemaId {
        schema.unwrap_or_else(|| self.get(kind))
    }
}

/// Retry settings, converted to a [`RetryPolicy`] by the client.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RetrySettings {
    /// Attempts per call, including the first (default: 3).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff multiplier in seconds (default: 1.0).
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Shortest wait between attempts in milliseconds (default: 2000).
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Longest wait between attempts in milliseconds (default: 10000).
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Which errors are retried (default: `transient`).
    #[serde(default)]
    pub retry_on: RetryOn,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            multiplier: default_multiplier(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            retry_on: RetryOn::default(),
        }
    }
}

impl RetrySettings {
    /// Settings with no waiting between attempts.
    #[must_use]
    pub fn immediate() -> Self {
        Self { min_delay_ms: 0, max_delay_ms: 0, ..Self::default() }
    }

    /// Validates retry settings.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if `max_attempts` is zero, the multiplier is
    /// negative or not finite, or `min_delay_ms` exceeds `max_delay_ms`.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(GraphError::ConfigError("retry.max_attempts must be at least 1".to_owned()));
        }
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(GraphError::ConfigError(
                "retry.multiplier must be a non-negative number".to_owned(),
            ));
        }
        if self.min_delay_ms > self.max_delay_ms {
            return Err(GraphError::ConfigError(
                "retry.min_delay_ms must not exceed retry.max_delay_ms".to_owned(),
            ));
        }
        Ok(())
    }

    /// Builds the retry policy described by these settings.
    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            multiplier: self.multiplier,
            min_delay: Duration::from_millis(self.min_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            retry_on: self.retry_on,
        }
    }
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_multiplier() -> f64 {
    1.0
}

const fn default_min_delay_ms() -> u64 {
    2_000
}

const fn default_max_delay_ms() -> u64 {
    10_000
}

/// Bounds of ID batch lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BatchSettings {
    /// Most IDs one lookup call accepts (default: 500).
    #[serde(default = "default_max_ids")]
    pub max_ids: usize,
    /// IDs per product request (default: 250).
    #[serde(default = "default_product_chunk_size")]
    pub product_chunk_size: usize,
    /// IDs per supplier request (default: 500).
    #[serde(default = "default_supplier_chunk_size")]
    pub supplier_chunk_size: usize,
    /// IDs per order request (default: 500).
    #[serde(default = "default_order_chunk_size")]
    pub order_chunk_size: usize,
    /// Requests of one lookup in flight at once (default: 1).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_ids: default_max_ids(),
            product_chunk_size: default_product_chunk_size(),
            supplier_chunk_size: default_supplier_chunk_size(),
            order_chunk_size: default_order_chunk_size(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl BatchSettings {
    /// Validates batch settings.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if a size is zero or a chunk size exceeds
    /// `max_ids`.
    pub fn validate(&self) -> Result<()> {
        if self.max_ids == 0 {
            return Err(GraphError::ConfigError("batch.max_ids must be at least 1".to_owned()));
        }
        for (name, size) in [
            ("product_chunk_size", self.product_chunk_size),
            ("supplier_chunk_size", self.supplier_chunk_size),
            ("order_chunk_size", self.order_chunk_size),
        ] {
            if size == 0 || size > self.max_ids {
                return Err(GraphError::ConfigError(format!(
                    "batch.{name} must be between 1 and batch.max_ids ({})",
                    self.max_ids
                )));
            }
        }
        if self.max_concurrency == 0 {
            return Err(GraphError::ConfigError(
                "batch.max_concurrency must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

const fn default_max_ids() -> usize {
    500
}

const fn default_product_chunk_size() -> usize {
    250
}

const fn default_supplier_chunk_size() -> usize {
    500
}

const fn default_order_chunk_size() -> usize {
    500
}

const fn default_max_concurrency() -> usize {
    1
}
