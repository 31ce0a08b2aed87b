//! Per-call request modifiers.
//!
//! A [`RequestModifier`] adjusts a built request before dispatch: extra
//! headers, query parameters, impersonation, cancellation, deadlines. Resource
//! methods take a slice of modifiers and apply them in order with
//! [`apply_modifiers`]; the first failure aborts the call.
//!
//! Built-in modifiers validate their input before touching the request, so a
//! failing modifier leaves the request as it found it.
//!
//! ```
//! use bytes::Bytes;
//! use forgeapi_core::{Method, Request, RequestModifier, apply_modifiers, with_header, with_sudo};
//!
//! let mut request = Request::<Bytes>::builder(
//!     Method::Get,
//!     "https://gitlab.example.com/api/v4/project_repository_storage_moves".parse().unwrap(),
//! )
//! .build();
//!
//! let trace = with_header("X-Request-Id", "abc-123");
//! let sudo = with_sudo("root");
//! apply_modifiers(&mut request, &[&trace, &sudo]).unwrap();
//!
//! assert_eq!(request.header("x-request-id"), Some("abc-123"));
//! assert_eq!(request.header("sudo"), Some("root"));
//! ```

use std::time::{Duration, Instant};

use bytes::Bytes;
use http::{HeaderName, HeaderValue};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{Deadline, Error, Request, Result};

/// A unit of request customisation applied before dispatch.
///
/// Implemented for every `Fn(&mut Request<Bytes>) -> Result<()>` closure.
pub trait RequestModifier: Send + Sync {
    /// Adjust the request, or fail without dispatching it.
    fn apply(&self, request: &mut Request<Bytes>) -> Result<()>;
}

impl<F> RequestModifier for F
where
    F: Fn(&mut Request<Bytes>) -> Result<()> + Send + Sync,
{
    fn apply(&self, request: &mut Request<Bytes>) -> Result<()> {
        self(request)
    }
}

/// Apply `modifiers` in order, stopping at the first error.
///
/// # Errors
///
/// Returns the first modifier error unchanged.
pub fn apply_modifiers(
    request: &mut Request<Bytes>,
    modifiers: &[&dyn RequestModifier],
) -> Result<()> {
    for (index, modifier) in modifiers.iter().enumerate() {
        modifier.apply(request).inspect_err(|err| {
            tracing::debug!(index, error = %err, "request modifier failed");
        })?;
    }
    Ok(())
}

// ============================================================================
// Built-in Modifiers
// ============================================================================

/// Sets a header. Fails on an invalid header name or value.
#[derive(Debug, Clone)]
pub struct WithHeader {
    name: String,
    value: String,
}

/// Sets header `name` to `value`.
#[must_use]
pub fn with_header(name: impl Into<String>, value: impl Into<String>) -> WithHeader {
    WithHeader {
        name: name.into(),
        value: value.into(),
    }
}

impl RequestModifier for WithHeader {
    fn apply(&self, request: &mut Request<Bytes>) -> Result<()> {
        let name = HeaderName::from_bytes(self.name.as_bytes())
            .map_err(|e| Error::invalid_request(format!("invalid header name `{}`: {e}", self.name)))?;
        HeaderValue::from_str(&self.value)
            .map_err(|e| Error::invalid_request(format!("invalid value for header `{name}`: {e}")))?;

        request
            .headers_mut()
            .insert(name.as_str().to_string(), self.value.clone());
        Ok(())
    }
}

/// Impersonate another user through the `Sudo` header (admin tokens only).
#[must_use]
pub fn with_sudo(user: impl Into<String>) -> WithHeader {
    with_header("Sudo", user)
}

/// Appends a query parameter. Fails on an empty name.
#[derive(Debug, Clone)]
pub struct WithQuery {
    name: String,
    value: String,
}

/// Appends `name=value` to the query string.
#[must_use]
pub fn with_query(name: impl Into<String>, value: impl Into<String>) -> WithQuery {
    WithQuery {
        name: name.into(),
        value: value.into(),
    }
}

impl RequestModifier for WithQuery {
    fn apply(&self, request: &mut Request<Bytes>) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_request("query parameter name is empty"));
        }
        request
            .url_mut()
            .query_pairs_mut()
            .append_pair(&self.name, &self.value);
        Ok(())
    }
}

/// Attaches a cancellation token honoured by the dispatcher.
#[derive(Debug, Clone)]
pub struct WithCancellation(CancellationToken);

/// Abort the call when `token` is cancelled.
///
/// A token that is already cancelled prevents the request from being sent.
#[must_use]
pub fn with_cancellation(token: CancellationToken) -> WithCancellation {
    WithCancellation(token)
}

impl RequestModifier for WithCancellation {
    fn apply(&self, request: &mut Request<Bytes>) -> Result<()> {
        request.extensions_mut().insert(self.0.clone());
        Ok(())
    }
}

/// Attaches a deadline honoured by the dispatcher.
#[derive(Debug, Clone, Copy)]
pub struct WithDeadline(Instant);

/// Abort the call if it has not completed by `deadline`.
///
/// When several deadlines are applied the earliest wins.
#[must_use]
pub fn with_deadline(deadline: Instant) -> WithDeadline {
    WithDeadline(deadline)
}

/// Abort the call if it has not completed within `timeout` from now.
#[must_use]
pub fn with_timeout(timeout: Duration) -> WithDeadline {
    WithDeadline(Instant::now() + timeout)
}

impl RequestModifier for WithDeadline {
    fn apply(&self, request: &mut Request<Bytes>) -> Result<()> {
        let deadline = match request.deadline() {
            Some(existing) => existing.min(self.0),
            None => self.0,
        };
        request.extensions_mut().insert(Deadline(deadline));
        Ok(())
    }
}

/// Copies the query of a keyset pagination `Link` URL onto the request.
#[derive(Debug, Clone)]
pub struct WithKeysetLink(Url);

/// Request the page a `rel="next"` (or other) link points at.
///
/// Parameters present in the link replace those of the same name on the
/// request; the request path is kept.
#[must_use]
pub fn with_keyset_link(link: Url) -> WithKeysetLink {
    WithKeysetLink(link)
}

impl RequestModifier for WithKeysetLink {
    fn apply(&self, request: &mut Request<Bytes>) -> Result<()> {
        let linked: Vec<(String, String)> = self
            .0
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if linked.is_empty() {
            return Err(Error::invalid_request(format!(
                "pagination link `{}` carries no query parameters",
                self.0
            )));
        }

        let kept: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .filter(|(k, _)| !linked.iter().any(|(name, _)| name == k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        request
            .url_mut()
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().chain(linked.iter()));
        Ok(())
    }
}
