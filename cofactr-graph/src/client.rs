//! Graph API client.
//!
//! [`GraphClient`] ties the pieces together: requests go through the configured
//! [`Transport`], wrapped in the client's [`RetryPolicy`]; responses are decoded
//! with the schema chosen per call, or the client's default schema for the
//! entity kind.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cofactr_graph::{
//!     GraphClient, GraphConfig,
//!     client::ProductOptions,
//!     schema::{EntityKind, SchemaId},
//! };
//!
//! # async fn example() -> cofactr_graph::error::Result<()> {
//! let config = GraphConfig::default()
//!     .with_credentials("my-client", "my-key")
//!     .with_default_schema(EntityKind::Product, SchemaId::FlagshipV7);
//! let client = GraphClient::new(config)?;
//!
//! if let Some(product) = client.get_product("TRRQ3ESYFO28", &ProductOptions::default()).await? {
//!     println!("{:?}", product.mpn());
//! }
//! # Ok(())
//! # }
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::instrument;
use url::form_urlencoded;

use crate::{
    config::GraphConfig,
    cursor::{Cursor, CursorOptions, PageRequest, PageSource},
    error::{GraphError, Result},
    order::Order,
    page::{Completion, List, Page, Single},
    query::{Filter, build_url_with_query, encode_filtering},
    reliability::{RetryOutcome, RetryPolicy, retry_with_stats},
    schema::{Entity, EntityKind, Offer, Org, Product, SchemaDecoder, SchemaId},
    transport::{HttpRequest, HttpTransport, Transport, TransportResponse},
};

/// Header carrying the client ID.
pub const CLIENT_ID_HEADER: &str = "X-CLIENT-ID";

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Query parameters of `GET /products`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    /// Search query.
    pub q: Option<String>,
    /// Field projection, passed through verbatim (e.g. `id,mpn,offers`).
    pub fields: Option<String>,
    /// Whether to query external sources.
    pub external: Option<bool>,
    /// Whether to bypass the server-side cache.
    pub force_refresh: Option<bool>,
    /// Response schema; the client default when `None`.
    pub schema: Option<SchemaId>,
    /// Filtering predicates.
    pub filtering: Vec<Filter>,
}

/// Options of single-product and offer lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductOptions {
    /// Field projection, passed through verbatim.
    pub fields: Option<String>,
    /// Whether to query external sources.
    pub external: Option<bool>,
    /// Whether to bypass the server-side cache.
    pub force_refresh: Option<bool>,
    /// Response schema; the client default when `None`.
    pub schema: Option<SchemaId>,
}

/// Query parameters of `GET /orgs`, for orgs and suppliers alike.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrgQuery {
    /// Search query.
    pub q: Option<String>,
    /// Response schema; the client default when `None`.
    pub schema: Option<SchemaId>,
}

/// How the server matches product search queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Server default ranking.
    #[default]
    Default,
    /// Match the query against MPNs, seller SKUs and manufacturer names.
    MpnSkuMfr,
}

impl SearchStrategy {
    /// Wire value of the `search_strategy` parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::MpnSkuMfr => "mpn_sku_mfr",
        }
    }
}

/// Options of a multi-search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Matching strategy.
    pub search_strategy: SearchStrategy,
    /// Results per query (default: 10).
    pub limit: usize,
    /// Response schema; the client default when `None`.
    pub schema: Option<SchemaId>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { search_strategy: SearchStrategy::Default, limit: 10, schema: None }
    }
}

/// One sub-request of a multi-query `POST /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubRequest {
    /// Always `GET`.
    pub method: &'static str,
    /// Path and query of the sub-request.
    pub relative_url: String,
}

impl SubRequest {
    /// `GET` sub-request for `relative_url`.
    #[must_use]
    pub fn get(relative_url: impl Into<String>) -> Self {
        Self { method: "GET", relative_url: relative_url.into() }
    }
}

/// Result of one sub-request, aligned with its request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubResponse {
    /// HTTP status of the sub-request.
    pub code: u16,
    /// Response body, either as JSON or as a JSON-encoded string.
    #[serde(default)]
    pub body: Value,
}

impl SubResponse {
    /// Decodes the body, unwrapping a JSON-encoded string first.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Status`] for a non-2xx code, or [`GraphError::Json`] if the
    /// body does not match `R`.
    pub fn json_body<R: DeserializeOwned>(self) -> Result<R> {
        if !(200..300).contains(&self.code) {
            return Err(GraphError::Status { status: self.code, body: self.body.to_string() });
        }
        match self.body {
            Value::String(text) => Ok(serde_json::from_str(&text)?),
            other => Ok(serde_json::from_value(other)?),
        }
    }
}

/// Page source of a list endpoint.
///
/// Holds the fixed request parameters of a listing; the cursor supplies the page
/// window of each fetch.
pub struct GraphPages<T, E> {
    client: GraphClient<T>,
    path: &'static str,
    params: Vec<(String, String)>,
    decoder: SchemaDecoder<E>,
}

impl<T, E> fmt::Debug for GraphPages<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphPages")
            .field("path", &self.path)
            .field("params", &self.params)
            .field("decoder", &self.decoder)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, E: Entity> PageSource<E> for GraphPages<T, E> {
    async fn fetch_page(&mut self, request: PageRequest) -> Result<Page<E>> {
        let page = self.client.fetch_raw_page(self.path, &self.params, &request).await?;
        page.try_map(|record| self.decoder.decode(record))
    }
}

/// Cursor over `GET /products`.
pub type ProductCursor<T = HttpTransport> = Cursor<GraphPages<T, Product>, Product>;

/// Cursor over `GET /orgs`, for orgs and suppliers alike.
pub type OrgCursor<T = HttpTransport> = Cursor<GraphPages<T, Org>, Org>;

/// Client of the graph API.
///
/// Cheap to clone: clones share the transport, its connection pool, and the
/// configuration.
pub struct GraphClient<T = HttpTransport> {
    transport: Arc<T>,
    config: Arc<GraphConfig>,
    retry: RetryPolicy,
}

impl<T> Clone for GraphClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            config: Arc::clone(&self.config),
            retry: self.retry.clone(),
        }
    }
}

impl<T> fmt::Debug for GraphClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphClient")
            .field("config", &self.config)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GraphClient<HttpTransport> {
    /// Creates a client using the reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if the configuration is invalid, or an error
    /// if the HTTP client cannot be built.
    pub fn new(config: GraphConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::with_settings(&config.base_url, &config.http)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> GraphClient<T> {
    /// Creates a client sending requests through `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::ConfigError`] if the configuration is invalid.
    pub fn with_transport(config: GraphConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let retry = config.retry.policy();
        Ok(Self { transport: Arc::new(transport), config: Arc::new(config), retry })
    }

    /// Client configuration.
    #[must_use]
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Transport requests are sent through.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Retry policy applied to every request.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Resolves the decoder of `kind` for an optional per-call schema.
    pub(crate) fn decoder<E: Entity>(
        &self,
        kind: EntityKind,
        schema: Option<SchemaId>,
    ) -> Result<SchemaDecoder<E>> {
        SchemaDecoder::lookup(kind, self.config.default_schemas.resolve(kind, schema))
    }

    fn authorize(&self, mut request: HttpRequest) -> HttpRequest {
        if let Some(client_id) = &self.config.client_id {
            request = request.with_header(CLIENT_ID_HEADER, client_id.as_str());
        }
        if let Some(api_key) = &self.config.api_key {
            request = request.with_header(API_KEY_HEADER, api_key.as_str());
        }
        request
    }

    /// Sends a request with credentials and retries, reporting attempt stats.
    ///
    /// Non-2xx responses become [`GraphError::Status`] inside the retried
    /// operation, so the retry policy sees them.
    pub async fn send_with_stats(
        &self,
        request: HttpRequest,
    ) -> RetryOutcome<TransportResponse, GraphError> {
        let request = self.authorize(request);
        let request = &request;
        let transport = &*self.transport;
        tracing::trace!(
            method = request.method.as_str(),
            path = %request.path,
            protocol = transport.protocol_name(),
            "Sending graph API request"
        );

        retry_with_stats(&self.retry, move || async move {
            transport.send(request).await?.error_for_status()
        })
        .await
    }

    /// Sends a request with credentials and retries.
    ///
    /// # Errors
    ///
    /// Returns the last error once retries are exhausted, or the first
    /// non-retryable error.
    pub async fn send(&self, request: HttpRequest) -> Result<TransportResponse> {
        let outcome = self.send_with_stats(request).await;
        if outcome.stats.attempt_number > 1 {
            tracing::debug!(
                attempts = outcome.stats.attempt_number,
                idle_ms = outcome.stats.idle_for.as_millis(),
                "Request needed retries"
            );
        }
        outcome.into_result()
    }

    async fn get_json<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R> {
        self.send(request).await?.json_body()
    }

    /// Fetches one undecoded page of a list endpoint.
    pub(crate) async fn fetch_raw_page(
        &self,
        path: &str,
        params: &[(String, String)],
        window: &PageRequest,
    ) -> Result<Page<Value>> {
        let request = HttpRequest::get(path)
            .with_query_pairs(params.iter().cloned())
            .with_query_pairs(window.query_pairs());
        self.get_json(request).await
    }

    /// Checks the operational status of the service.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not JSON.
    #[instrument(skip(self))]
    pub async fn check_health(&self) -> Result<Value> {
        self.get_json(HttpRequest::get("/health")).await
    }

    /// Opens a cursor over `GET /products`.
    ///
    /// The first page is fetched before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::UnsupportedSchema`] before any request if the schema is
    /// not registered for products, or the error of the first page fetch.
    #[instrument(skip(self, query, options), fields(q = query.q.as_deref(), limit = options.limit))]
    pub async fn get_products(
        &self,
        query: ProductQuery,
        options: CursorOptions,
    ) -> Result<ProductCursor<T>> {
        let decoder = self.decoder(EntityKind::Product, query.schema)?;

        let mut params = Vec::new();
        push_param(&mut params, "q", query.q);
        push_param(&mut params, "fields", query.fields);
        push_param(&mut params, "external", query.external);
        push_param(&mut params, "force_refresh", query.force_refresh);
        push_param(&mut params, "schema", Some(decoder.schema()));
        if !query.filtering.is_empty() {
            params.push(("filtering".to_owned(), encode_filtering(&query.filtering)?));
        }

        let source = GraphPages { client: self.clone(), path: "/products", params, decoder };
        Cursor::open(source, options).await
    }

    /// Fetches one product.
    ///
    /// Returns `Ok(None)` when the API answers `{"data": null}` or 404.
    ///
    /// # Errors
    ///
    /// Returns error if the schema is unsupported, the request fails, or the record
    /// does not decode.
    #[instrument(skip(self, options), fields(schema))]
    pub async fn get_product(&self, id: &str, options: &ProductOptions) -> Result<Option<Product>> {
        let decoder = self.decoder::<Product>(EntityKind::Product, options.schema)?;
        tracing::Span::current().record("schema", decoder.schema().as_str());

        let path = format!("/products/{}", path_segment(id));
        let request = product_request(&path, options, decoder.schema());
        match self.get_json::<Single>(request).await {
            Ok(single) => single.data.map(|record| decoder.decode(record)).transpose(),
            Err(GraphError::Status { status: 404, .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Fetches the offers of one product (`GET /products/{id}/offers`).
    ///
    /// # Errors
    ///
    /// Returns error if the offer schema is unsupported, the request fails, or a
    /// record does not decode.
    #[instrument(skip(self, options))]
    pub async fn get_offers(&self, product_id: &str, options: &ProductOptions) -> Result<Vec<Offer>> {
        let decoder = self.decoder::<Offer>(EntityKind::Offer, options.schema)?;

        let path = format!("/products/{}/offers", path_segment(product_id));
        let request = product_request(&path, options, decoder.schema());
        let list: List = self.get_json(request).await?;
        list.data.into_iter().map(|record| decoder.decode(record)).collect()
    }

    /// Opens a cursor over `GET /orgs`.
    ///
    /// # Errors
    ///
    /// Returns error if the org schema is unsupported or the first page fetch fails.
    #[instrument(skip(self, query, options), fields(q = query.q.as_deref()))]
    pub async fn get_orgs(&self, query: OrgQuery, options: CursorOptions) -> Result<OrgCursor<T>> {
        self.org_cursor(EntityKind::Org, query, options).await
    }

    /// Fetches one organization.
    ///
    /// # Errors
    ///
    /// Returns error if the org schema is unsupported, the request fails, or the
    /// record does not decode.
    #[instrument(skip(self))]
    pub async fn get_org(&self, id: &str, schema: Option<SchemaId>) -> Result<Option<Org>> {
        self.single_org(EntityKind::Org, id, schema).await
    }

    /// Opens a cursor over suppliers, served by `GET /orgs` with supplier schemas.
    ///
    /// # Errors
    ///
    /// Returns error if the supplier schema is unsupported or the first page fetch
    /// fails.
    #[instrument(skip(self, query, options), fields(q = query.q.as_deref()))]
    pub async fn get_suppliers(
        &self,
        query: OrgQuery,
        options: CursorOptions,
    ) -> Result<OrgCursor<T>> {
        self.org_cursor(EntityKind::Supplier, query, options).await
    }

    /// Fetches one supplier.
    ///
    /// # Errors
    ///
    /// Returns error if the supplier schema is unsupported, the request fails, or the
    /// record does not decode.
    #[instrument(skip(self))]
    pub async fn get_supplier(&self, id: &str, schema: Option<SchemaId>) -> Result<Option<Org>> {
        self.single_org(EntityKind::Supplier, id, schema).await
    }

    async fn org_cursor(
        &self,
        kind: EntityKind,
        query: OrgQuery,
        options: CursorOptions,
    ) -> Result<OrgCursor<T>> {
        let decoder = self.decoder(kind, query.schema)?;

        let mut params = Vec::new();
        push_param(&mut params, "q", query.q);
        push_param(&mut params, "schema", Some(decoder.schema()));

        let source = GraphPages { client: self.clone(), path: "/orgs", params, decoder };
        Cursor::open(source, options).await
    }

    async fn single_org(
        &self,
        kind: EntityKind,
        id: &str,
        schema: Option<SchemaId>,
    ) -> Result<Option<Org>> {
        let decoder = self.decoder::<Org>(kind, schema)?;

        let request = HttpRequest::get(format!("/orgs/{}", path_segment(id)))
            .with_query("schema", decoder.schema().as_str());
        match self.get_json::<Single>(request).await {
            Ok(single) => single.data.map(|record| decoder.decode(record)).transpose(),
            Err(GraphError::Status { status: 404, .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Autocompletes organization names (`GET /orgs/autocomplete`).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is malformed.
    #[instrument(skip(self))]
    pub async fn autocomplete_orgs(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Completion>> {
        let mut request = HttpRequest::get("/orgs/autocomplete").with_query("q", query);
        if let Some(limit) = limit {
            request = request.with_query("limit", limit.to_string());
        }
        let list: List<Completion> = self.get_json(request).await?;
        Ok(list.data)
    }

    /// Autocompletes classification names (`GET /classifications/autocomplete`).
    ///
    /// `types` restricts the classification taxonomy, e.g. `part_classification`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is malformed.
    #[instrument(skip(self))]
    pub async fn autocomplete_classifications(
        &self,
        query: &str,
        types: Option<&str>,
    ) -> Result<Vec<Completion>> {
        let mut request = HttpRequest::get("/classifications/autocomplete").with_query("q", query);
        if let Some(types) = types {
            request = request.with_query("types", types);
        }
        let list: List<Completion> = self.get_json(request).await?;
        Ok(list.data)
    }

    /// Lists orders matching `filtering` (`GET /orders`).
    ///
    /// Returns the first page; its paging links point at the rest.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or a record is not an order.
    #[instrument(skip(self, filtering), fields(filters = filtering.len()))]
    pub async fn get_orders(
        &self,
        filtering: &[Filter],
        limit: Option<usize>,
    ) -> Result<Page<Order>> {
        let mut params = Vec::new();
        if !filtering.is_empty() {
            params.push(("filtering".to_owned(), encode_filtering(filtering)?));
        }
        push_param(&mut params, "limit", limit);
        self.get_json(HttpRequest::get("/orders").with_query_pairs(params)).await
    }

    /// Sends several `GET` sub-requests in one `POST /products`.
    ///
    /// Responses are aligned with `requests` by position.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails, or if the number of responses differs from
    /// the number of sub-requests.
    #[instrument(skip(self, requests), fields(requests = requests.len()))]
    pub async fn multi_query(&self, requests: &[SubRequest]) -> Result<Vec<SubResponse>> {
        let body = serde_json::to_vec(requests)?;
        let responses: Vec<SubResponse> =
            self.get_json(HttpRequest::post("/products", body)).await?;

        if responses.len() != requests.len() {
            return Err(GraphError::TransportError(format!(
                "multi-query returned {} responses for {} requests",
                responses.len(),
                requests.len()
            )));
        }
        Ok(responses)
    }

    /// Runs several product searches in one round trip.
    ///
    /// Returns the decoded first page of every distinct query, keyed by query.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::BatchTooLarge`] before any request when more than
    /// `batch.max_ids` queries are given, duplicates included, or the first failed sub-request as
    /// [`GraphError::Status`].
    #[instrument(skip(self, queries, options), fields(queries = queries.len()))]
    pub async fn get_products_by_searches<Q: AsRef<str>>(
        &self,
        queries: &[Q],
        options: &SearchOptions,
    ) -> Result<HashMap<String, Vec<Product>>> {
        self.check_batch_size(queries.len())?;
        let queries = crate::batch::dedup(queries.iter().map(AsRef::as_ref));
        let decoder = self.decoder::<Product>(EntityKind::Product, options.schema)?;
        if queries.is_empty() {
            return Ok(HashMap::new());
        }

        let limit = options.limit.to_string();
        let requests = queries
            .iter()
            .map(|q| {
                build_url_with_query(
                    "/products",
                    &[
                        ("q", *q),
                        ("limit", limit.as_str()),
                        ("search_strategy", options.search_strategy.as_str()),
                        ("schema", decoder.schema().as_str()),
                    ],
                )
                .map(SubRequest::get)
            })
            .collect::<Result<Vec<_>>>()?;

        let responses = self.multi_query(&requests).await?;

        let mut results = HashMap::with_capacity(queries.len());
        for (query, response) in queries.into_iter().zip(responses) {
            let page: Page = response.json_body()?;
            let products = page.try_map(|record| decoder.decode(record))?.data;
            results.insert(query.to_owned(), products);
        }
        Ok(results)
    }
}

/// Percent-encodes `id` as a single path segment.
fn path_segment(id: &str) -> String {
    // form encoding writes spaces as `+`; a literal `+` is already `%2B`.
    form_urlencoded::byte_serialize(id.as_bytes()).collect::<String>().replace('+', "%20")
}

fn push_param<V: ToString>(params: &mut Vec<(String, String)>, name: &str, value: Option<V>) {
    if let Some(value) = value {
        params.push((name.to_owned(), value.to_string()));
    }
}

fn product_request(path: &str, options: &ProductOptions, schema: SchemaId) -> HttpRequest {
    let mut params = Vec::new();
    push_param(&mut params, "fields", options.fields.as_deref());
    push_param(&mut params, "external", options.external);
    push_param(&mut params, "force_refresh", options.force_refresh);
    push_param(&mut params, "schema", Some(schema));
    HttpRequest::get(path).with_query_pairs(params)
}
