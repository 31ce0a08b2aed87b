//! Pagination request options and response counters.
//!
//! Lists are page-number paginated by default (`page`, `per_page`). Keyset
//! pagination is opt-in with [`ListOptions::keyset`]; the server then only
//! returns a `Link` header, which [`crate::with_keyset_link`] follows.

use serde::Serialize;
use url::Url;

/// Sort direction for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Pagination options shared by every list endpoint.
///
/// Zero and unset fields are left out of the query string. Fields are always
/// encoded in declaration order, so encoding the same value twice yields the
/// same string.
///
/// ```
/// use forgeapi_core::{ListOptions, to_query_string};
///
/// let options = ListOptions::new().page(2).per_page(50);
/// assert_eq!(to_query_string(&options).unwrap(), "page=2&per_page=50");
/// assert_eq!(to_query_string(&ListOptions::default()).unwrap(), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    /// Page number, starting at 1.
    #[serde(skip_serializing_if = "is_zero")]
    pub page: u32,
    /// Items per page.
    #[serde(skip_serializing_if = "is_zero")]
    pub per_page: u32,
    /// `keyset` switches the endpoint to keyset pagination.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<String>,
    /// Column to order by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    /// Sort direction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortOrder>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u32) -> bool {
    *value == 0
}

impl ListOptions {
    /// Empty options: server defaults apply.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page number.
    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Set the page size.
    #[must_use]
    pub const fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page;
        self
    }

    /// Use keyset pagination ordered by `order_by`.
    #[must_use]
    pub fn keyset(mut self, order_by: impl Into<String>, sort: SortOrder) -> Self {
        self.pagination = Some("keyset".to_string());
        self.order_by = Some(order_by.into());
        self.sort = Some(sort);
        self
    }

    /// Options for the page after the one described by `pagination`.
    ///
    /// Returns `None` on the last page, and for keyset pagination where the
    /// next page is addressed by link instead of number.
    #[must_use]
    pub fn next(&self, pagination: &Pagination) -> Option<Self> {
        let next_page = pagination.next_page?;
        Some(Self {
            page: next_page,
            ..self.clone()
        })
    }
}

/// Pagination counters and links parsed from a list response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pagination {
    /// `X-Total`: total number of items.
    pub total: Option<u64>,
    /// `X-Total-Pages`: total number of pages.
    pub total_pages: Option<u32>,
    /// `X-Per-Page`: items per page.
    pub per_page: Option<u32>,
    /// `X-Page`: current page.
    pub page: Option<u32>,
    /// `X-Next-Page`: next page, absent on the last page.
    pub next_page: Option<u32>,
    /// `X-Prev-Page`: previous page, absent on the first page.
    pub prev_page: Option<u32>,
    /// URLs from the `Link` header.
    pub links: PaginationLinks,
}

/// URLs from an RFC 8288 `Link` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginationLinks {
    /// `rel="first"`.
    pub first: Option<Url>,
    /// `rel="prev"`.
    pub prev: Option<Url>,
    /// `rel="next"`.
    pub next: Option<Url>,
    /// `rel="last"`.
    pub last: Option<Url>,
}

impl Pagination {
    pub(crate) fn from_headers<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        // Empty values mean "none", e.g. `X-Next-Page: ` on the last page.
        let value = |name: &str| lookup(name).map(str::trim).filter(|v| !v.is_empty());
        let number = |name: &str| -> Option<u32> { value(name).and_then(|v| v.parse().ok()) };

        Self {
            total: value("X-Total").and_then(|v| v.parse().ok()),
            total_pages: number("X-Total-Pages"),
            per_page: number("X-Per-Page"),
            page: number("X-Page"),
            next_page: number("X-Next-Page"),
            prev_page: number("X-Prev-Page"),
            links: lookup("Link").map(PaginationLinks::parse).unwrap_or_default(),
        }
    }

    /// Returns `true` when another page follows, by number or by link.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.next_page.is_some() || self.links.next.is_some()
    }
}

impl PaginationLinks {
    /// Parse a `Link` header value. Unknown relations and malformed entries are ignored.
    #[must_use]
    pub fn parse(header: &str) -> Self {
        let mut links = Self::default();

        for entry in header.split(',') {
            let mut segments = entry.split(';');
            let Some(target) = segments.next().map(str::trim) else {
                continue;
            };
            let Some(target) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
                continue;
            };
            let Ok(url) = Url::parse(target) else {
                continue;
            };

            for param in segments {
                let Some((key, value)) = param.split_once('=') else {
                    continue;
                };
                if !key.trim().eq_ignore_ascii_case("rel") {
                    continue;
                }
                for rel in value.trim().trim_matches('"').split_whitespace() {
                    let slot = match rel {
                        "first" => &mut links.first,
                        "prev" => &mut links.prev,
                        "next" => &mut links.next,
                        "last" => &mut links.last,
                        _ => continue,
                    };
                    *slot = Some(url.clone());
                }
            }
        }

        links
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::check;

    use super::*;
    use crate::to_query_string;

    fn pagination(pairs: &[(&str, &str)]) -> Pagination {
        let headers: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_ascii_lowercase(), (*v).to_string()))
            .collect();
        Pagination::from_headers(|name| headers.get(&name.to_ascii_lowercase()).map(String::as_str))
    }

    #[test]
    fn query_contains_only_set_fields() {
        check!(to_query_string(&ListOptions::default()).expect("encode") == "");
        check!(to_query_string(&ListOptions::new().page(3)).expect("encode") == "page=3");
        check!(to_query_string(&ListOptions::new().per_page(20)).expect("encode") == "per_page=20");

        let keyset = ListOptions::new().per_page(100).keyset("id", SortOrder::Desc);
        check!(
            to_query_string(&keyset).expect("encode")
                == "per_page=100&pagination=keyset&order_by=id&sort=desc"
        );
    }

    #[test]
    fn query_encoding_is_stable() {
        let options = ListOptions::new().page(7).per_page(25);
        let first = to_query_string(&options).expect("encode");
        let second = to_query_string(&options).expect("encode");
        check!(first == second);
        check!(first == "page=7&per_page=25");
    }

    #[test]
    fn parses_offset_headers() {
        let parsed = pagination(&[
            ("X-Total", "42"),
            ("X-Total-Pages", "5"),
            ("X-Per-Page", "10"),
            ("X-Page", "2"),
            ("X-Next-Page", "3"),
            ("X-Prev-Page", "1"),
        ]);

        check!(parsed.total == Some(42));
        check!(parsed.total_pages == Some(5));
        check!(parsed.per_page == Some(10));
        check!(parsed.page == Some(2));
        check!(parsed.next_page == Some(3));
        check!(parsed.prev_page == Some(1));
        check!(parsed.has_next());
    }

    #[test]
    fn empty_next_page_means_last_page() {
        let parsed = pagination(&[("X-Page", "5"), ("X-Next-Page", ""), ("X-Prev-Page", "4")]);
        check!(parsed.next_page.is_none());
        check!(!parsed.has_next());

        let options = ListOptions::new().page(5).per_page(10);
        check!(options.next(&parsed).is_none());
    }

    #[test]
    fn next_keeps_page_size() {
        let parsed = pagination(&[("X-Page", "1"), ("X-Next-Page", "2")]);
        let next = ListOptions::new().page(1).per_page(10).next(&parsed);
        check!(next == Some(ListOptions::new().page(2).per_page(10)));
    }

    #[test]
    fn parses_link_header() {
        let links = PaginationLinks::parse(
            "<https://gitlab.example.com/api/v4/project_repository_storage_moves?id_before=40&order_by=id&pagination=keyset&per_page=2&sort=desc>; rel=\"next\", \
             <https://gitlab.example.com/api/v4/project_repository_storage_moves?order_by=id&pagination=keyset&per_page=2&sort=desc>; rel=\"first\"",
        );

        let next = links.next.expect("next link");
        check!(next.path() == "/api/v4/project_repository_storage_moves");
        check!(next.query_pairs().any(|(k, v)| k == "id_before" && v == "40"));
        check!(links.first.is_some());
        check!(links.prev.is_none());
        check!(links.last.is_none());
    }

    #[test]
    fn ignores_malformed_links() {
        let links = PaginationLinks::parse("garbage, <not a url>; rel=\"next\", <https://x.test/a>; rel=\"unknown\"");
        check!(links == PaginationLinks::default());
    }
}
