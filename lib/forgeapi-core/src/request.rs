//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, query parameters, and bodies.
//! Header names are stored lowercase.
//!
//! # Example
//!
//! ```
//! use forgeapi_core::{Request, Method};
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(Method::Get, "https://gitlab.example.com/api/v4/projects".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build();
//!
//! assert_eq!(request.header("accept"), Some("application/json"));
//! ```

use std::collections::HashMap;
use std::time::Instant;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::{Method, PathTemplate};

/// Deadline attached to a request by [`crate::with_deadline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(pub Instant);

/// An HTTP request with method, URL, headers, optional body and extensions.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    extensions: http::Extensions,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// Reassemble a request from its parts.
    #[must_use]
    pub fn from_parts(
        method: Method,
        url: url::Url,
        headers: HashMap<String, String>,
        body: Option<B>,
        extensions: http::Extensions,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body,
            extensions,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Mutable access to the URL.
    #[must_use]
    pub fn url_mut(&mut self) -> &mut url::Url {
        &mut self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Mutable access to headers. Keys must be lowercase.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Typed extensions (path template, cancellation token, deadline).
    #[must_use]
    pub const fn extensions(&self) -> &http::Extensions {
        &self.extensions
    }

    /// Mutable access to extensions.
    #[must_use]
    pub fn extensions_mut(&mut self) -> &mut http::Extensions {
        &mut self.extensions
    }

    /// Route template this request was expanded from, if any.
    #[must_use]
    pub fn path_template(&self) -> Option<&PathTemplate> {
        self.extensions.get::<PathTemplate>()
    }

    /// Cancellation token attached by [`crate::with_cancellation`].
    #[must_use]
    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.extensions.get::<CancellationToken>()
    }

    /// Deadline attached by [`crate::with_deadline`] or [`crate::with_timeout`].
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.extensions.get::<Deadline>().map(|deadline| deadline.0)
    }

    /// Consume into (method, url, headers, body, extensions).
    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        Method,
        url::Url,
        HashMap<String, String>,
        Option<B>,
        http::Extensions,
    ) {
        (
            self.method,
            self.url,
            self.headers,
            self.body,
            self.extensions,
        )
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HashMap<String, String>,
    body: Option<B>,
    extensions: http::Extensions,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            extensions: http::Extensions::new(),
        }
    }

    /// Sets a header, replacing any previous value.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends an already encoded query string to the URL.
    ///
    /// An empty string leaves the URL untouched, so no dangling `?` is produced.
    #[must_use]
    pub fn encoded_query(mut self, query: &str) -> Self {
        if query.is_empty() {
            return self;
        }
        let merged = match self.url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{query}"),
            _ => query.to_string(),
        };
        self.url.set_query(Some(&merged));
        self
    }

    /// Stores a typed extension.
    #[must_use]
    pub fn extension<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the [`Request`].
    #[must_use]
    pub fn build(self) -> Request<B> {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
            extensions: self.extensions,
        }
    }
}

impl RequestBuilder<Bytes> {
    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize + ?Sized>(self, value: &T) -> crate::Result<Self> {
        let body = crate::to_json(value)?;
        Ok(self
            .header("Content-Type", crate::ContentType::Json.as_str())
            .body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> url::Url {
        url::Url::parse(&format!("https://gitlab.example.com/api/v4/{path}")).expect("valid URL")
    }

    #[test]
    fn request_builder_basic() {
        let request = Request::<Bytes>::builder(Method::Get, url("project_repository_storage_moves"))
            .header("Accept", "application/json")
            .build();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(
            request.url().as_str(),
            "https://gitlab.example.com/api/v4/project_repository_storage_moves"
        );
        assert_eq!(request.header("Accept"), Some("application/json"));
        assert_eq!(request.headers().get("accept").map(String::as_str), Some("application/json"));
        assert!(request.body().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let request = Request::<Bytes>::builder(Method::Get, url("projects"))
            .query("page", "1")
            .query("per_page", "10")
            .build();

        assert_eq!(
            request.url().as_str(),
            "https://gitlab.example.com/api/v4/projects?page=1&per_page=10"
        );
    }

    #[test]
    fn encoded_query_merges_and_skips_empty() {
        let request = Request::<Bytes>::builder(Method::Get, url("projects"))
            .encoded_query("")
            .build();
        assert_eq!(request.url().query(), None);

        let request = Request::<Bytes>::builder(Method::Get, url("projects"))
            .query("sudo", "root")
            .encoded_query("page=2")
            .build();
        assert_eq!(request.url().query(), Some("sudo=root&page=2"));
    }

    #[test]
    fn request_builder_json() {
        #[derive(serde::Serialize)]
        struct Schedule {
            destination_storage_name: String,
        }

        let request = Request::builder(Method::Post, url("projects/7/repository_storage_moves"))
            .json(&Schedule {
                destination_storage_name: "nfs-02".to_string(),
            })
            .expect("json")
            .build();

        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(
            request.body().map(|body| &body[..]),
            Some(br#"{"destination_storage_name":"nfs-02"}"#.as_slice())
        );
    }

    #[test]
    fn extensions_carry_template_and_token() {
        let token = CancellationToken::new();
        let request = Request::<Bytes>::builder(Method::Get, url("projects/7"))
            .extension(PathTemplate::new("projects/{project}"))
            .extension(token.clone())
            .build();

        assert_eq!(
            request.path_template().map(PathTemplate::as_str),
            Some("projects/{project}")
        );
        token.cancel();
        assert!(request.cancellation_token().is_some_and(CancellationToken::is_cancelled));
        assert!(request.deadline().is_none());
    }
}
