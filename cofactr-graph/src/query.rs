//! Query string codec.
//!
//! Builds request query strings and decodes the opaque paging links embedded in
//! list responses back into parameter maps.

use std::collections::BTreeMap;

use serde::Serialize;
use url::{Url, form_urlencoded};

use crate::{
    error::{GraphError, Result},
    page::Paging,
};

/// Query parameters decoded from a link, one value per name.
pub type QueryParams = BTreeMap<String, String>;

/// Decoded `previous`/`next` links of a page.
///
/// An empty map means "no page in that direction".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PagingParams {
    /// Parameters of the previous page.
    pub previous: QueryParams,
    /// Parameters of the next page.
    pub next: QueryParams,
}

/// Parses the query component of a link into a parameter map.
///
/// Accepts absolute URLs, absolute paths and bare `?a=b` queries. When a name repeats,
/// the first occurrence wins. Parameters with empty values are dropped, so a link like
/// `?after=` carries no parameters at all.
///
/// # Examples
///
/// ```
/// use cofactr_graph::query::parse_query_params;
///
/// let params = parse_query_params("https://graph.cofactr.com/products?after=CCV1&limit=2");
/// assert_eq!(params["after"], "CCV1");
/// assert_eq!(params["limit"], "2");
///
/// assert!(parse_query_params("").is_empty());
/// ```
#[must_use]
pub fn parse_query_params(link: &str) -> QueryParams {
    let Some((_, rest)) = link.trim().split_once('?') else {
        return QueryParams::new();
    };
    let query = rest.split_once('#').map_or(rest, |(query, _)| query);

    let mut params = QueryParams::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
    }
    params
}

/// Decodes both links of a page's paging object.
///
/// Absent links decode to empty maps; decoding is pure, so parsing the same paging
/// object twice yields equal results.
#[must_use]
pub fn parse_paging(paging: &Paging) -> PagingParams {
    PagingParams {
        previous: paging.previous.as_deref().map(parse_query_params).unwrap_or_default(),
        next: paging.next.as_deref().map(parse_query_params).unwrap_or_default(),
    }
}

/// Builds a URL path with properly encoded query parameters.
///
/// # Errors
///
/// Returns error if URL parsing fails.
///
/// # Examples
///
/// ```
/// use cofactr_graph::query::build_url_with_query;
///
/// let path = build_url_with_query("/products", &[("q", "IRFH4251DTRPBF"), ("limit", "10")])?;
/// assert_eq!(path, "/products?q=IRFH4251DTRPBF&limit=10");
/// # Ok::<(), cofactr_graph::error::GraphError>(())
/// ```
pub fn build_url_with_query<K, V>(base_path: &str, params: &[(K, V)]) -> Result<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let base_url = format!("https://example.com{base_path}");
    let mut url = Url::parse(&base_url).map_err(|e| GraphError::InvalidInput(e.to_string()))?;

    if !params.is_empty() {
        let mut query_pairs = url.query_pairs_mut();
        for (key, value) in params {
            query_pairs.append_pair(key.as_ref(), value.as_ref());
        }
    }

    let full_path = url.path().to_owned();
    match url.query() {
        Some(query) if !query.is_empty() => Ok(format!("{full_path}?{query}")),
        _ => Ok(full_path),
    }
}

/// Comparison operator of a [`Filter`] predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperator {
    /// Field value is one of a list.
    In,
    /// Field equals the value.
    Eq,
    /// Field differs from the value.
    Ne,
    /// Field is greater than the value.
    Gt,
    /// Field is greater than or equal to the value.
    Gte,
    /// Field is less than the value.
    Lt,
    /// Field is less than or equal to the value.
    Lte,
}

/// A `{field, operator, value}` predicate of the `filtering` query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Filter {
    /// Field the predicate applies to.
    pub field: String,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Operand.
    pub value: serde_json::Value,
}

impl Filter {
    /// Predicate matching records whose `field` is one of `values`.
    #[must_use]
    pub fn is_in<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(|v| serde_json::Value::String(v.into())).collect();
        Self {
            field: field.into(),
            operator: FilterOperator::In,
            value: serde_json::Value::Array(values),
        }
    }

    /// Predicate matching records whose `field` equals `value`.
    #[must_use]
    pub fn equals(field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self { field: field.into(), operator: FilterOperator::Eq, value: value.into() }
    }
}

/// Encodes predicates as the JSON list expected by the `filtering` parameter.
///
/// # Errors
///
/// Returns [`GraphError::Json`] if a predicate value cannot be serialized.
pub fn encode_filtering(filters: &[Filter]) -> Result<String> {
    Ok(serde_json::to_string(filters)?)
}
