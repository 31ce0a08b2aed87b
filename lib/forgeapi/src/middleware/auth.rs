//! Credential header middleware.
//!
//! Adds the header matching the configured [`Credentials`] to every outgoing
//! request. Headers a caller already set on the request are left alone.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use tower::{Layer, Service};

use crate::{Error, Request, Response, Result};

/// API credentials and the header each one travels in.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Personal, project or group access token: `PRIVATE-TOKEN`.
    PrivateToken(Arc<str>),
    /// OAuth2 access token: `Authorization: Bearer`.
    OAuthToken(Arc<str>),
    /// CI job token: `JOB-TOKEN`.
    JobToken(Arc<str>),
}

impl Credentials {
    /// Access token sent as `PRIVATE-TOKEN`.
    pub fn private_token(token: impl Into<String>) -> Self {
        Self::PrivateToken(Arc::from(token.into()))
    }

    /// OAuth2 token sent as a bearer `Authorization` header.
    pub fn oauth_token(token: impl Into<String>) -> Self {
        Self::OAuthToken(Arc::from(token.into()))
    }

    /// CI job token sent as `JOB-TOKEN`.
    pub fn job_token(token: impl Into<String>) -> Self {
        Self::JobToken(Arc::from(token.into()))
    }

    /// Header name (lowercase) and value for these credentials.
    #[must_use]
    pub fn header(&self) -> (&'static str, String) {
        match self {
            Self::PrivateToken(token) => ("private-token", token.to_string()),
            Self::OAuthToken(token) => ("authorization", format!("Bearer {token}")),
            Self::JobToken(token) => ("job-token", token.to_string()),
        }
    }

    /// Returns `true` for header names that carry credentials.
    #[must_use]
    pub fn is_sensitive_header(name: &str) -> bool {
        ["private-token", "authorization", "job-token"]
            .iter()
            .any(|sensitive| sensitive.eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Self::PrivateToken(_) => "PrivateToken",
            Self::OAuthToken(_) => "OAuthToken",
            Self::JobToken(_) => "JobToken",
        };
        f.debug_tuple(kind).field(&"<redacted>").finish()
    }
}

/// Layer that attaches credentials to requests.
#[derive(Debug, Clone)]
pub struct AuthLayer {
    credentials: Credentials,
}

impl AuthLayer {
    /// Create a new auth layer for the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = Auth<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Auth {
            inner,
            credentials: self.credentials.clone(),
        }
    }
}

/// Service that attaches credentials to requests.
#[derive(Debug, Clone)]
pub struct Auth<S> {
    inner: S,
    credentials: Credentials,
}

impl<S> Service<Request<Bytes>> for Auth<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>, Error = Error> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<()>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Bytes>) -> Self::Future {
        let (name, value) = self.credentials.header();
        request
            .headers_mut()
            .entry(name.to_string())
            .or_insert(value);

        let mut inner = self.inner.clone();
        Box::pin(async move { inner.call(request).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_per_credential_kind() {
        assert_eq!(
            Credentials::private_token("glpat-abc").header(),
            ("private-token", "glpat-abc".to_string())
        );
        assert_eq!(
            Credentials::oauth_token("tok").header(),
            ("authorization", "Bearer tok".to_string())
        );
        assert_eq!(
            Credentials::job_token("job").header(),
            ("job-token", "job".to_string())
        );
    }

    #[test]
    fn debug_redacts_token() {
        let debug = format!("{:?}", Credentials::private_token("glpat-secret"));
        assert_eq!(debug, "PrivateToken(\"<redacted>\")");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn sensitive_headers() {
        assert!(Credentials::is_sensitive_header("PRIVATE-TOKEN"));
        assert!(Credentials::is_sensitive_header("authorization"));
        assert!(!Credentials::is_sensitive_header("accept"));
    }
}
