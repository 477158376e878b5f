//! Cursor pagination over list endpoints.
//!
//! A [`Cursor`] turns a sequence of page fetches into one lazy sequence of
//! records. It fetches the first page when opened, hands out that page's records
//! one by one, and fetches the next page only when the current one is exhausted,
//! following the page's `next` link. There is no read-ahead: at most one page is
//! held at a time and a page is never requested before it is needed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cofactr_graph::{GraphClient, GraphConfig, client::ProductQuery, cursor::CursorOptions};
//!
//! # async fn example() -> cofactr_graph::error::Result<()> {
//! let client = GraphClient::new(GraphConfig::default())?;
//!
//! let query = ProductQuery { q: Some("IRFH5006TRPBF".to_owned()), ..ProductQuery::default() };
//! let options = CursorOptions { limit: Some(20), batch_size: 10, ..CursorOptions::default() };
//! let mut cursor = client.get_products(query, options).await?;
//!
//! while let Some(product) = cursor.next().await? {
//!     println!("{:?}", product.mpn());
//! }
//! # Ok(())
//! # }
//! ```

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;

use futures::Stream;

use crate::{
    error::{GraphError, Result},
    page::{Page, Paging},
    query::{QueryParams, parse_paging},
};

/// Default number of records requested per page.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// One page fetch issued by a cursor.
///
/// `before` and `after` are opaque entity IDs bounding the page; `limit` is the
/// cursor's batch size.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Upper page boundary.
    pub before: Option<String>,
    /// Lower page boundary.
    pub after: Option<String>,
    /// Page size.
    pub limit: usize,
}

impl PageRequest {
    /// Builds the request for the page a `next` link points to.
    ///
    /// The link's `before`/`after` fully replace the previous window. Returns `None`
    /// when the link carries neither, since such a link cannot advance the cursor.
    fn from_link(params: &QueryParams, limit: usize) -> Option<Self> {
        let before = params.get("before").cloned();
        let after = params.get("after").cloned();
        if before.is_none() && after.is_none() {
            return None;
        }
        Some(Self { before, after, limit })
    }

    /// Query pairs of the page window, in wire order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(3);
        if let Some(before) = &self.before {
            pairs.push(("before", before.clone()));
        }
        if let Some(after) = &self.after {
            pairs.push(("after", after.clone()));
        }
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

/// Fetches single pages for a [`Cursor`].
///
/// The source owns every request parameter that stays fixed across pages (search
/// query, fields, schema...); the cursor only supplies the page window.
pub trait PageSource<T> {
    /// Fetches one page.
    ///
    /// # Errors
    ///
    /// Returns error if the page cannot be fetched or decoded.
    fn fetch_page(&mut self, request: PageRequest) -> impl Future<Output = Result<Page<T>>> + Send;
}

/// Construction options of a [`Cursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorOptions {
    /// Start before this entity ID.
    pub before: Option<String>,
    /// Start after this entity ID.
    pub after: Option<String>,
    /// Maximum number of records to yield; `None` for all of them.
    pub limit: Option<usize>,
    /// Records requested per page (default: 100).
    pub batch_size: usize,
}

impl Default for CursorOptions {
    fn default() -> Self {
        Self { before: None, after: None, limit: None, batch_size: DEFAULT_BATCH_SIZE }
    }
}

impl CursorOptions {
    /// Options yielding at most `limit` records.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self { limit: Some(limit), ..Self::default() }
    }
}

/// Lazy sequence of records spread over pages.
///
/// Single consumer: `next` takes `&mut self`. Once the cursor has ended, either
/// because the last page was consumed, the limit was reached, or a fetch failed,
/// it never fetches again.
#[derive(Debug)]
pub struct Cursor<S, T> {
    source: S,
    items: std::vec::IntoIter<T>,
    paging: Paging,
    batch_size: usize,
    limit: Option<usize>,
    yielded: usize,
    pages_fetched: usize,
    done: bool,
}

impl<S, T> Cursor<S, T>
where
    S: PageSource<T>,
{
    /// Opens a cursor and fetches its first page.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidInput`] if `batch_size` is zero, or the error of
    /// the first page fetch.
    pub async fn open(mut source: S, options: CursorOptions) -> Result<Self> {
        if options.batch_size == 0 {
            return Err(GraphError::InvalidInput("batch_size must be at least 1".to_owned()));
        }

        let request = PageRequest {
            before: options.before,
            after: options.after,
            limit: options.batch_size,
        };
        tracing::debug!(?request, "Fetching first page");
        let page = source.fetch_page(request).await?;

        Ok(Self {
            source,
            items: page.data.into_iter(),
            paging: page.paging,
            batch_size: options.batch_size,
            limit: options.limit,
            yielded: 0,
            pages_fetched: 1,
            done: false,
        })
    }

    /// Returns the next record, fetching the next page when the current one is used up.
    ///
    /// Returns `Ok(None)` at the end of the sequence and on every call after it.
    ///
    /// # Errors
    ///
    /// Returns the error of a failed page fetch. The cursor is finished afterwards.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            if self.done {
                return Ok(None);
            }
            if self.limit.is_some_and(|limit| self.yielded >= limit) {
                self.done = true;
                return Ok(None);
            }
            if let Some(item) = self.items.next() {
                self.yielded += 1;
                return Ok(Some(item));
            }

            let next = parse_paging(&self.paging).next;
            let Some(request) = PageRequest::from_link(&next, self.batch_size) else {
                if !next.is_empty() {
                    tracing::warn!(?next, "Next link has no page boundary, stopping");
                }
                self.done = true;
                return Ok(None);
            };

            tracing::debug!(?request, pages_fetched = self.pages_fetched, "Fetching next page");
            match self.source.fetch_page(request).await {
                Ok(page) => {
                    self.pages_fetched += 1;
                    self.items = page.data.into_iter();
                    self.paging = page.paging;
                }
                Err(error) => {
                    self.done = true;
                    return Err(error);
                }
            }
        }
    }

    /// Drains the cursor into a vector.
    ///
    /// # Errors
    ///
    /// Returns the first page fetch error; records yielded before it are dropped.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        while let Some(item) = self.next().await? {
            all.push(item);
        }
        Ok(all)
    }

    /// Adapts the cursor into a stream of records.
    ///
    /// A fetch error is yielded once, after which the stream ends.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>> {
        futures::stream::unfold(self, |mut cursor| async move {
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), cursor)),
                Ok(None) => None,
                Err(error) => Some((Err(error), cursor)),
            }
        })
    }
}

impl<S, T> Cursor<S, T> {
    /// Number of records handed out so far.
    #[must_use]
    pub const fn yielded(&self) -> usize {
        self.yielded
    }

    /// Number of pages fetched so far, including the first one.
    #[must_use]
    pub const fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Returns `true` once the cursor will not yield or fetch anything more.
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use futures::StreamExt;
    use proptest::prelude::*;

    use super::*;

    /// Serves `total` sequential integers in pages linked by `after`.
    #[derive(Debug, Clone)]
    struct NumberSource {
        total: u32,
        requests: Arc<Mutex<Vec<PageRequest>>>,
        fail_after_first: bool,
    }

    impl NumberSource {
        fn new(total: u32) -> Self {
            Self { total, requests: Arc::default(), fail_after_first: false }
        }

        fn fetches(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl PageSource<u32> for NumberSource {
        async fn fetch_page(&mut self, request: PageRequest) -> Result<Page<u32>> {
            let first_page = self.requests.lock().unwrap().is_empty();
            self.requests.lock().unwrap().push(request.clone());
            if self.fail_after_first && !first_page {
                return Err(GraphError::Status { status: 503, body: String::new() });
            }

            let start = request.after.as_deref().map_or(0, |a| a.parse::<u32>().unwrap() + 1);
            let limit = u32::try_from(request.limit).unwrap();
            let end = start.saturating_add(limit).min(self.total);
            let data: Vec<u32> = (start..end).collect();

            let next = (end < self.total).then(|| format!("/products?after={}&limit={limit}", end - 1));
            let previous = (start > 0).then(|| format!("/products?before={start}&limit={limit}"));
            Ok(Page { data, paging: Paging { previous, next } })
        }
    }

    /// Serves a fixed list of pages in order, ignoring the request.
    #[derive(Debug)]
    struct ScriptedSource {
        pages: std::vec::IntoIter<Page<&'static str>>,
        fetches: usize,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Page<&'static str>>) -> Self {
            Self { pages: pages.into_iter(), fetches: 0 }
        }
    }

    impl PageSource<&'static str> for ScriptedSource {
        async fn fetch_page(&mut self, _request: PageRequest) -> Result<Page<&'static str>> {
            self.fetches += 1;
            Ok(self.pages.next().unwrap_or_else(|| Page::last(Vec::new())))
        }
    }

    fn page(data: Vec<&'static str>, next: Option<&str>) -> Page<&'static str> {
        Page { data, paging: Paging { previous: None, next: next.map(str::to_owned) } }
    }

    fn options(batch_size: usize, limit: Option<usize>) -> CursorOptions {
        CursorOptions { batch_size, limit, ..CursorOptions::default() }
    }

    #[tokio::test]
    async fn test_yields_every_record_in_order() {
        let source = NumberSource::new(7);
        let cursor = Cursor::open(source.clone(), options(3, None)).await.unwrap();

        let all = cursor.collect_all().await.unwrap();
        assert_eq!(all, (0..7).collect::<Vec<_>>());
        assert_eq!(source.fetches(), 3);
    }

    #[tokio::test]
    async fn test_next_link_replaces_window() {
        let source = NumberSource::new(4);
        let cursor = Cursor::open(source.clone(), options(2, None)).await.unwrap();
        cursor.collect_all().await.unwrap();

        let requests = source.requests.lock().unwrap().clone();
        assert_eq!(requests[0], PageRequest { before: None, after: None, limit: 2 });
        assert_eq!(requests[1], PageRequest { before: None, after: Some("1".to_owned()), limit: 2 });
    }

    #[tokio::test]
    async fn test_initial_window_is_forwarded() {
        let source = NumberSource::new(10);
        let options = CursorOptions {
            after: Some("4".to_owned()),
            batch_size: 10,
            ..CursorOptions::default()
        };
        let cursor = Cursor::open(source.clone(), options).await.unwrap();

        assert_eq!(cursor.collect_all().await.unwrap(), vec![5, 6, 7, 8, 9]);
        assert_eq!(source.requests.lock().unwrap()[0].after.as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn test_limit_stops_without_extra_fetch() {
        let source = NumberSource::new(100);
        let mut cursor = Cursor::open(source.clone(), options(10, Some(15))).await.unwrap();

        let mut count = 0;
        while cursor.next().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 15);
        assert_eq!(cursor.yielded(), 15);
        assert_eq!(source.fetches(), 2);
        assert!(cursor.is_done());
    }

    #[tokio::test]
    async fn test_batch_size_one_limit_two() {
        let source = ScriptedSource::new(vec![
            page(vec!["A"], Some("?after=A")),
            page(vec!["B"], Some("?after=B")),
            page(vec!["C"], None),
        ]);
        let mut cursor = Cursor::open(source, options(1, Some(2))).await.unwrap();

        assert_eq!(cursor.next().await.unwrap(), Some("A"));
        assert_eq!(cursor.next().await.unwrap(), Some("B"));
        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(cursor.pages_fetched(), 2);
        assert_eq!(cursor.source.fetches, 2);
    }

    #[tokio::test]
    async fn test_limit_zero_yields_nothing() {
        let source = NumberSource::new(5);
        let mut cursor = Cursor::open(source.clone(), options(5, Some(0))).await.unwrap();

        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_empty_first_page() {
        let source = ScriptedSource::new(vec![page(vec![], None)]);
        let mut cursor = Cursor::open(source, CursorOptions::default()).await.unwrap();

        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(cursor.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_empty_page_with_next_link_is_followed() {
        let source = ScriptedSource::new(vec![
            page(vec![], Some("/products?after=X")),
            page(vec!["Y"], None),
        ]);
        let cursor = Cursor::open(source, CursorOptions::default()).await.unwrap();

        assert_eq!(cursor.collect_all().await.unwrap(), vec!["Y"]);
    }

    #[tokio::test]
    async fn test_blank_next_link_ends() {
        let source = ScriptedSource::new(vec![page(vec!["A"], Some("/products?after=")), page(vec!["B"], None)]);
        let mut cursor = Cursor::open(source, CursorOptions::default()).await.unwrap();

        assert_eq!(cursor.next().await.unwrap(), Some("A"));
        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(cursor.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn test_next_link_without_boundary_ends() {
        let source = ScriptedSource::new(vec![page(vec!["A"], Some("/products?limit=10")), page(vec!["B"], None)]);
        let cursor = Cursor::open(source, CursorOptions::default()).await.unwrap();

        assert_eq!(cursor.collect_all().await.unwrap(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_terminal_after_end() {
        let source = NumberSource::new(2);
        let mut cursor = Cursor::open(source.clone(), options(5, None)).await.unwrap();

        while cursor.next().await.unwrap().is_some() {}
        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(source.fetches(), 1);
    }

    #[tokio::test]
    async fn test_fetch_error_is_returned_once() {
        let mut source = NumberSource::new(10);
        source.fail_after_first = true;
        let mut cursor = Cursor::open(source.clone(), options(5, None)).await.unwrap();

        for _ in 0..5 {
            assert!(cursor.next().await.unwrap().is_some());
        }
        assert!(matches!(cursor.next().await, Err(GraphError::Status { status: 503, .. })));
        assert_eq!(cursor.next().await.unwrap(), None);
        assert_eq!(source.fetches(), 2);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let source = NumberSource::new(3);
        let result = Cursor::open(source.clone(), options(0, None)).await;

        assert!(matches!(result, Err(GraphError::InvalidInput(_))));
        assert_eq!(source.fetches(), 0);
    }

    #[tokio::test]
    async fn test_into_stream() {
        let source = NumberSource::new(5);
        let cursor = Cursor::open(source, options(2, Some(4))).await.unwrap();

        let items: Vec<u32> = cursor.into_stream().map(|r| r.unwrap()).collect().await;
        assert_eq!(items, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_page_request_query_pairs() {
        let request = PageRequest { before: None, after: Some("B".to_owned()), limit: 25 };
        assert_eq!(request.query_pairs(), vec![("after", "B".to_owned()), ("limit", "25".to_owned())]);
    }

    fn drain(total: u32, batch_size: usize, limit: Option<usize>) -> (usize, usize) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(async {
            let source = NumberSource::new(total);
            let cursor = Cursor::open(source.clone(), options(batch_size, limit)).await.unwrap();
            let count = cursor.collect_all().await.unwrap().len();
            (count, source.fetches())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_cursor_terminates_after_total(total in 0u32..60, batch_size in 1usize..12) {
            let (count, fetches) = drain(total, batch_size, None);
            prop_assert_eq!(count, total as usize);
            prop_assert_eq!(fetches, (total as usize).div_ceil(batch_size).max(1));
        }

        #[test]
        fn test_cursor_respects_limit(
            total in 0u32..60,
            batch_size in 1usize..12,
            limit in 0usize..70,
        ) {
            let (count, fetches) = drain(total, batch_size, Some(limit));
            prop_assert_eq!(count, limit.min(total as usize));
            prop_assert!(fetches <= count.div_ceil(batch_size).max(1));
        }
    }
}
