//! HTTP response handling.
//!
//! [`Response`] is the raw transport answer. [`ResponseMeta`] is what callers
//! keep after decoding: status, headers, pagination and rate-limit counters.

use std::collections::HashMap;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::Pagination;

// ============================================================================
// Buffered Response
// ============================================================================

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: u16,
    headers: HashMap<String, String>,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (u16, HashMap<String, String>, B) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Metadata view of this response. Headers are copied.
    #[must_use]
    pub fn meta(&self) -> ResponseMeta {
        ResponseMeta::from_parts(self.status, self.headers.clone())
    }
}

impl Response<Bytes> {
    /// Split into metadata and body.
    #[must_use]
    pub fn into_meta(self) -> (ResponseMeta, Bytes) {
        (ResponseMeta::from_parts(self.status, self.headers), self.body)
    }

    /// Get the response body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

fn find_header<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .or_else(|| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value)
        })
        .map(String::as_str)
}

// ============================================================================
// Response Metadata
// ============================================================================

/// Metadata of a received response.
///
/// Returned next to every decoded value, and carried by [`crate::Error::Api`]
/// so headers stay inspectable when the status signals failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMeta {
    status: u16,
    headers: HashMap<String, String>,
    pagination: Pagination,
    rate_limit: Option<RateLimit>,
}

impl ResponseMeta {
    /// Build metadata from a status and header map, parsing pagination and
    /// rate-limit headers.
    #[must_use]
    pub fn from_parts(status: u16, headers: HashMap<String, String>) -> Self {
        let lookup = |name: &str| find_header(&headers, name);
        let pagination = Pagination::from_headers(lookup);
        let rate_limit = RateLimit::from_headers(lookup);
        Self {
            status,
            headers,
            pagination,
            rate_limit,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Pagination counters and links.
    #[must_use]
    pub const fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Rate-limit counters, when the server sent them.
    #[must_use]
    pub const fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Rate-limit counters from the `RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Requests allowed in the current window.
    pub limit: u64,
    /// Requests observed in the current window.
    pub observed: Option<u64>,
    /// Requests left in the current window.
    pub remaining: Option<u64>,
    /// When the window resets.
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimit {
    fn from_headers<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Option<Self> {
        let number = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());

        let limit = number("RateLimit-Limit")?;
        let reset = lookup("RateLimit-Reset")
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        Some(Self {
            limit,
            observed: number("RateLimit-Observed"),
            remaining: number("RateLimit-Remaining"),
            reset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn response_basic() {
        let response = Response::new(
            200,
            headers(&[("content-type", "application/json")]),
            Bytes::from(r#"{"id":1}"#),
        );

        assert_eq!(response.status(), 200);
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert!(response.is_success());
        assert_eq!(response.text_lossy(), r#"{"id":1}"#);
    }

    #[test]
    fn meta_parses_rate_limit() {
        let meta = ResponseMeta::from_parts(
            200,
            headers(&[
                ("ratelimit-limit", "600"),
                ("ratelimit-observed", "3"),
                ("ratelimit-remaining", "597"),
                ("ratelimit-reset", "1700000000"),
            ]),
        );

        let rate_limit = meta.rate_limit().expect("rate limit headers");
        assert_eq!(rate_limit.limit, 600);
        assert_eq!(rate_limit.observed, Some(3));
        assert_eq!(rate_limit.remaining, Some(597));
        assert_eq!(
            rate_limit.reset,
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test]
    fn meta_without_rate_limit() {
        let meta = ResponseMeta::from_parts(404, HashMap::new());
        assert!(meta.rate_limit().is_none());
        assert!(!meta.is_success());
        assert_eq!(meta.pagination(), &Pagination::default());
    }

    #[test]
    fn into_meta_keeps_headers() {
        let response = Response::new(201, headers(&[("X-Total", "4")]), Bytes::from("[]"));
        let (meta, body) = response.into_meta();

        assert_eq!(meta.status(), 201);
        assert_eq!(meta.header("x-total"), Some("4"));
        assert_eq!(meta.pagination().total, Some(4));
        assert_eq!(body, Bytes::from("[]"));
    }
}
