//! Response envelopes returned by the graph API.

use serde::{Deserialize, Serialize};

/// Links to the neighbouring pages of a list response.
///
/// Links are opaque URL-like strings whose query parameters describe how to fetch
/// the neighbouring page. `next` is absent when there is no further data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paging {
    /// Link to the previous page.
    #[serde(default)]
    pub previous: Option<String>,
    /// Link to the next page.
    #[serde(default)]
    pub next: Option<String>,
}

/// One page of a list endpoint (`{data: [...], paging: {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T = serde_json::Value> {
    /// Records of this page, in server order.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Paging links.
    #[serde(default)]
    pub paging: Paging,
}

impl<T> Page<T> {
    /// Page with the given records and no neighbours.
    #[must_use]
    pub fn last(data: Vec<T>) -> Self {
        Self { data, paging: Paging::default() }
    }

    /// Applies `f` to every record, keeping the paging links.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map<U, E, F>(self, f: F) -> Result<Page<U>, E>
    where
        F: FnMut(T) -> Result<U, E>,
    {
        let data = self.data.into_iter().map(f).collect::<Result<Vec<_>, E>>()?;
        Ok(Page { data, paging: self.paging })
    }
}

/// Single-record envelope (`{data: record-or-null}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct Single<T = serde_json::Value> {
    #[serde(default = "Option::default")]
    pub(crate) data: Option<T>,
}

/// List envelope without paging (`{data: [...]}`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct List<T = serde_json::Value> {
    #[serde(default = "Vec::new")]
    pub(crate) data: Vec<T>,
}

/// Autocomplete prediction returned by `GET /orgs/autocomplete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Entity ID.
    pub id: String,
    /// Display label.
    pub label: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_page_deserialize_full() {
        let page: Page = serde_json::from_value(json!({
            "data": [{"id": "A"}, {"id": "B"}],
            "paging": {"previous": "/products?before=A", "next": "/products?after=B"}
        }))
        .unwrap();
        assert_eq!(page.data.len(), 2);
        assert_eq!(page.paging.next.as_deref(), Some("/products?after=B"));
    }

    #[test]
    fn test_page_deserialize_missing_paging() {
        let page: Page = serde_json::from_value(json!({"data": []})).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.paging, Paging::default());
    }

    #[test]
    fn test_page_deserialize_null_next() {
        let page: Page = serde_json::from_value(json!({
            "data": [1],
            "paging": {"previous": null, "next": null}
        }))
        .unwrap();
        assert!(page.paging.next.is_none());
    }

    #[test]
    fn test_page_try_map_keeps_paging() {
        let page = Page {
            data: vec![1, 2, 3],
            paging: Paging { previous: None, next: Some("?after=3".to_owned()) },
        };
        let mapped = page.try_map(|n| Ok::<_, ()>(n * 10)).unwrap();
        assert_eq!(mapped.data, vec![10, 20, 30]);
        assert_eq!(mapped.paging.next.as_deref(), Some("?after=3"));
    }

    #[test]
    fn test_page_try_map_stops_on_error() {
        let page = Page::last(vec![1, 2, 3]);
        let result = page.try_map(|n| if n == 2 { Err("bad") } else { Ok(n) });
        assert_eq!(result.unwrap_err(), "bad");
    }

    #[test]
    fn test_single_null_data() {
        let single: Single = serde_json::from_value(json!({"data": null})).unwrap();
        assert!(single.data.is_none());
    }

    #[test]
    fn test_completion_deserialize() {
        let list: List<Completion> =
            serde_json::from_value(json!({"data": [{"id": "ORG1", "label": "Digi-Key"}]}))
                .unwrap();
        assert_eq!(list.data[0].label, "Digi-Key");
    }
}
