//! Cofactr Graph: client for the Cofactr electronic-parts graph API
//!
//! The graph API serves products, offers, organizations and suppliers in many
//! versioned response schemas. This crate wraps it with:
//!
//! - **Pagination cursors**: list endpoints read as one lazy sequence of records,
//!   fetched page by page following each response's `next` link
//! - **Schema registry**: typed decoders per entity kind and schema version, chosen
//!   per call or from per-kind client defaults
//! - **Retries**: exponential backoff around every request, transient errors only by
//!   default
//! - **Batch lookups**: bounded ID lists split into filtered requests and merged into
//!   an ID-keyed map, transparent to merged (deprecated) IDs
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ GraphClient                                  │
//! │  ┌──────────┐  ┌──────────┐  ┌────────────┐  │
//! │  │  Cursor  │  │  Batch   │  │  Schema    │  │
//! │  │ (paging) │  │ (by ID)  │  │  registry  │  │
//! │  └────┬─────┘  └────┬─────┘  └────────────┘  │
//! │       └──────┬──────┘                        │
//! │        ┌─────▼──────┐                        │
//! │        │ RetryPolicy│                        │
//! │        └─────┬──────┘                        │
//! └──────────────┼───────────────────────────────┘
//!          ┌─────▼──────┐
//!          │ Transport  │  reqwest by default
//!          └─────┬──────┘
//!                │ HTTPS + X-CLIENT-ID / X-API-KEY
//!          ┌─────▼──────┐
//!          │ Graph API  │
//!          └────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cofactr_graph::{
//!     GraphClient, GraphConfig,
//!     client::{ProductOptions, ProductQuery},
//!     cursor::CursorOptions,
//!     schema::{EntityKind, SchemaId},
//! };
//!
//! # async fn example() -> cofactr_graph::Result<()> {
//! let config = GraphConfig::default()
//!     .with_env_credentials()
//!     .with_default_schema(EntityKind::Product, SchemaId::FlagshipV7);
//! let client = GraphClient::new(config)?;
//!
//! // Iterate a search, 50 records per request, 120 records at most.
//! let query = ProductQuery { q: Some("IRFH5006TRPBF".to_owned()), ..ProductQuery::default() };
//! let options = CursorOptions { limit: Some(120), batch_size: 50, ..CursorOptions::default() };
//! let mut cursor = client.get_products(query, options).await?;
//! while let Some(product) = cursor.next().await? {
//!     println!("{:?}", product.mpn());
//! }
//!
//! // Look up products by ID; merged IDs resolve to the current record.
//! let products = client
//!     .get_products_by_ids(&["TRRQ3ESYFO28", "CCV1F7A8UIYH"], &ProductOptions::default())
//!     .await?;
//! println!("found {} of 2", products.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`client`]: [`GraphClient`] and its endpoint operations
//! - [`cursor`]: lazy pagination over list endpoints
//! - [`batch`]: lookups by ID and canonical ID resolution
//! - [`schema`]: entity kinds, schema identifiers and typed records
//! - [`reliability`]: retry with exponential backoff
//! - [`transport`]: transport abstraction and the reqwest implementation
//! - [`config`]: client configuration, loadable from TOML
//! - [`query`]: paging link parsing and query encoding
//! - [`order`]: purchase orders
//! - [`page`]: response envelopes
//! - [`error`]: error types
//!
//! # Error Handling
//!
//! All operations return [`Result<T, GraphError>`](error::Result):
//!
//! ```rust
//! use cofactr_graph::{GraphClient, GraphError, client::ProductOptions, transport::Transport};
//!
//! # async fn example<T: Transport>(client: GraphClient<T>) {
//! match client.get_products_by_ids(&["TRRQ3ESYFO28"], &ProductOptions::default()).await {
//!     Ok(products) => println!("found {}", products.len()),
//!     Err(GraphError::BatchTooLarge { requested, max }) => {
//!         eprintln!("{requested} IDs requested, split into calls of at most {max}");
//!     }
//!     Err(e) if e.is_transient() => eprintln!("gave up after retries: {e}"),
//!     Err(e) => eprintln!("request failed: {e}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(clippy::multiple_crate_versions, reason = "transitive dependencies from reqwest and wiremock")]

pub mod batch;
pub mod client;
pub mod config;
pub mod cursor;
pub mod error;
pub mod order;
pub mod page;
pub mod query;
pub mod reliability;
pub mod schema;
pub mod transport;

pub use client::GraphClient;
pub use config::GraphConfig;
pub use error::{GraphError, Result};
