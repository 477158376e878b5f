//! Batch lookups by ID.
//!
//! ID lists are checked against `batch.max_ids` before anything is sent, then
//! deduplicated and split into chunks. Each chunk becomes one filtered list
//! request (`filtering=[{"field":"id","operator":"IN","value":[...]}]`), and the
//! results are merged into a map keyed by requested ID. IDs without a match are
//! absent from the map.
//!
//! Merged entities keep their superseded IDs in `deprecated_ids`; a lookup by
//! such an ID finds the current record under the ID the caller asked for.
//!
//! Orders take the same path without a schema: their records decode straight
//! into [`Order`].

use std::collections::{HashMap, HashSet};

use futures::{StreamExt, stream};
use serde_json::Value;
use tracing::instrument;

use crate::{
    client::{GraphClient, ProductOptions},
    cursor::PageRequest,
    error::{GraphError, Result},
    order::Order,
    page::Page,
    query::{Filter, encode_filtering},
    schema::{EntityKind, Org, Product, SchemaId, raw_deprecated_ids, raw_id},
    transport::Transport,
};

/// Deduplicates IDs, keeping first-seen order.
pub(crate) fn dedup<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

fn decode_order(record: Value) -> Result<Order> {
    Ok(serde_json::from_value(record)?)
}

/// Fixed parameters and decoding of one batch lookup.
struct Lookup<'a, D> {
    path: &'static str,
    params: Vec<(String, String)>,
    chunk_size: usize,
    decode: D,
    requested: &'a HashSet<&'a str>,
}

impl<T: Transport> GraphClient<T> {
    pub(crate) fn check_batch_size(&self, requested: usize) -> Result<()> {
        let max = self.config().batch.max_ids;
        if requested > max {
            return Err(GraphError::BatchTooLarge { requested, max });
        }
        Ok(())
    }

    /// Fetches one chunk of IDs as a single filtered page.
    async fn fetch_chunk(
        &self,
        path: &str,
        params: &[(String, String)],
        chunk: &[&str],
    ) -> Result<Page<Value>> {
        let mut params = params.to_vec();
        let filter = Filter::is_in("id", chunk.iter().copied());
        params.push(("filtering".to_owned(), encode_filtering(&[filter])?));

        let window = PageRequest { before: None, after: None, limit: chunk.len() };
        self.fetch_raw_page(path, &params, &window).await
    }

    /// Runs chunk requests with at most `batch.max_concurrency` in flight.
    async fn fetch_chunks(
        &self,
        path: &str,
        params: &[(String, String)],
        ids: &[&str],
        chunk_size: usize,
    ) -> Result<Vec<Value>> {
        let concurrency = self.config().batch.max_concurrency.max(1);
        let mut pages = stream::iter(ids.chunks(chunk_size.max(1)))
            .map(|chunk| self.fetch_chunk(path, params, chunk))
            .buffer_unordered(concurrency);

        let mut records = Vec::new();
        while let Some(page) = pages.next().await {
            records.extend(page?.data);
        }
        Ok(records)
    }

    async fn resolve<E, D>(&self, ids: &[&str], lookup: Lookup<'_, D>) -> Result<HashMap<String, E>>
    where
        E: Clone,
        D: Fn(Value) -> Result<E>,
    {
        let records =
            self.fetch_chunks(lookup.path, &lookup.params, ids, lookup.chunk_size).await?;

        let mut resolved = HashMap::with_capacity(ids.len());
        for record in records {
            let Some(id) = raw_id(&record).map(str::to_owned) else {
                tracing::warn!(path = lookup.path, "Record without id in batch response, skipping");
                continue;
            };
            let keys: Vec<String> = std::iter::once(id.as_str())
                .chain(raw_deprecated_ids(&record))
                .filter(|key| lookup.requested.contains(key))
                .map(str::to_owned)
                .collect();
            if keys.is_empty() {
                tracing::debug!(%id, "Batch response record matches no requested ID");
                continue;
            }

            let entity = (lookup.decode)(record)?;
            for key in keys {
                resolved.insert(key, entity.clone());
            }
        }
        Ok(resolved)
    }

    /// Fetches products by ID.
    ///
    /// The result holds an entry for every requested ID that matched a product,
    /// including IDs that were merged into another product.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::BatchTooLarge`] without sending anything when more than
    /// `batch.max_ids` IDs are given, [`GraphError::UnsupportedSchema`] for a schema
    /// products do not support, or the first failed request.
    #[instrument(skip(self, ids, options), fields(ids = ids.len()))]
    pub async fn get_products_by_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
        options: &ProductOptions,
    ) -> Result<HashMap<String, Product>> {
        self.check_batch_size(ids.len())?;
        let decoder = self.decoder::<Product>(EntityKind::Product, options.schema)?;
        let ids = dedup(ids.iter().map(AsRef::as_ref));
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut params = Vec::new();
        if let Some(fields) = &options.fields {
            params.push(("fields".to_owned(), fields.clone()));
        }
        if let Some(external) = options.external {
            params.push(("external".to_owned(), external.to_string()));
        }
        if let Some(force_refresh) = options.force_refresh {
            params.push(("force_refresh".to_owned(), force_refresh.to_string()));
        }
        params.push(("schema".to_owned(), decoder.schema().to_string()));

        let requested: HashSet<&str> = ids.iter().copied().collect();
        let lookup = Lookup {
            path: "/products",
            params,
            chunk_size: self.config().batch.product_chunk_size,
            decode: move |record: Value| decoder.decode(record),
            requested: &requested,
        };
        let resolved = self.resolve(&ids, lookup).await?;
        tracing::debug!(found = resolved.len(), "Resolved products by ID");
        Ok(resolved)
    }

    /// Fetches suppliers by ID.
    ///
    /// # Errors
    ///
    /// Same as [`get_products_by_ids`](Self::get_products_by_ids), for supplier schemas.
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn get_suppliers_by_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
        schema: Option<SchemaId>,
    ) -> Result<HashMap<String, Org>> {
        self.check_batch_size(ids.len())?;
        let decoder = self.decoder::<Org>(EntityKind::Supplier, schema)?;
        let ids = dedup(ids.iter().map(AsRef::as_ref));
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let requested: HashSet<&str> = ids.iter().copied().collect();
        let lookup = Lookup {
            path: "/orgs",
            params: vec![("schema".to_owned(), decoder.schema().to_string())],
            chunk_size: self.config().batch.supplier_chunk_size,
            decode: move |record: Value| decoder.decode(record),
            requested: &requested,
        };
        self.resolve(&ids, lookup).await
    }

    /// Fetches orders by ID.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::BatchTooLarge`] without sending anything when more than
    /// `batch.max_ids` IDs are given, [`GraphError::Json`] for a record that is not
    /// an order, or the first failed request.
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn get_orders_by_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<HashMap<String, Order>> {
        self.check_batch_size(ids.len())?;
        let ids = dedup(ids.iter().map(AsRef::as_ref));
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let requested: HashSet<&str> = ids.iter().copied().collect();
        let lookup = Lookup {
            path: "/orders",
            params: Vec::new(),
            chunk_size: self.config().batch.order_chunk_size,
            decode: decode_order,
            requested: &requested,
        };
        self.resolve(&ids, lookup).await
    }

    /// Maps product IDs to their canonical IDs.
    ///
    /// A canonical ID maps to itself, a merged ID to the product that replaced it,
    /// and an unknown ID to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::BatchTooLarge`] without sending anything when more than
    /// `batch.max_ids` IDs are given, or the first failed request.
    #[instrument(skip(self, ids), fields(ids = ids.len()))]
    pub async fn get_canonical_product_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> Result<HashMap<String, Option<String>>> {
        self.check_batch_size(ids.len())?;
        let ids = dedup(ids.iter().map(AsRef::as_ref));

        let params = vec![
            ("fields".to_owned(), "id,deprecated_ids".to_owned()),
            ("schema".to_owned(), SchemaId::Internal.to_string()),
        ];
        let records = if ids.is_empty() {
            Vec::new()
        } else {
            let chunk_size = self.config().batch.product_chunk_size;
            self.fetch_chunks("/products", &params, &ids, chunk_size).await?
        };

        let mut canonical: HashMap<&str, &str> = HashMap::new();
        for record in &records {
            let Some(id) = raw_id(record) else {
                continue;
            };
            canonical.insert(id, id);
            for deprecated in raw_deprecated_ids(record) {
                canonical.insert(deprecated, id);
            }
        }

        Ok(ids
            .into_iter()
            .map(|id| (id.to_owned(), canonical.get(id).map(|c| (*c).to_owned())))
            .collect())
    }

    /// Fetches products one request per ID, with at most `batch.max_concurrency`
    /// requests in flight.
    ///
    /// Every distinct requested ID gets an entry; `None` marks an ID with no product.
    ///
    /// # Errors
    ///
    /// Returns the first failed lookup.
    #[instrument(skip(self, ids, options), fields(ids = ids.len()))]
    pub async fn get_products_concurrently<S: AsRef<str>>(
        &self,
        ids: &[S],
        options: &ProductOptions,
    ) -> Result<HashMap<String, Option<Product>>> {
        // Fail on an unsupported schema once instead of per ID.
        self.decoder::<Product>(EntityKind::Product, options.schema)?;
        let ids = dedup(ids.iter().map(AsRef::as_ref));
        let concurrency = self.config().batch.max_concurrency.max(1);

        let mut lookups = stream::iter(ids)
            .map(|id| async move { (id, self.get_product(id, options).await) })
            .buffer_unordered(concurrency);

        let mut products = HashMap::new();
        while let Some((id, product)) = lookups.next().await {
            products.insert(id.to_owned(), product?);
        }
        Ok(products)
    }
}
