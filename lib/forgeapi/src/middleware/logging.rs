//! Request/response logging middleware.
//!
//! Logs one span per request with the route template when the request was
//! built from one, so `/projects/7/...` and `/projects/8/...` group together.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use tower::{Layer, Service};
use tracing::{Instrument, Level, debug, info, span, warn};

use super::Credentials;
use crate::{Error, Request, Response, Result};

/// Layer that adds request/response logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingLayer {
    level: LogLevel,
}

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogLevel {
    /// Log at debug level, with redacted request headers.
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

impl LoggingLayer {
    /// Create a new logging layer with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging layer that logs at debug level.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }
}

impl<S> Layer<S> for LoggingLayer {
    type Service = Logging<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Logging {
            inner,
            level: self.level,
        }
    }
}

/// Service that logs requests and responses.
#[derive(Debug, Clone)]
pub struct Logging<S> {
    inner: S,
    level: LogLevel,
}

fn redacted_headers(request: &Request<Bytes>) -> Vec<(String, String)> {
    let mut headers: Vec<(String, String)> = request
        .headers()
        .iter()
        .map(|(name, value)| {
            let shown = if Credentials::is_sensitive_header(name) {
                "<redacted>".to_string()
            } else {
                value.clone()
            };
            (name.clone(), shown)
        })
        .collect();
    headers.sort();
    headers
}

impl<S> Service<Request<Bytes>> for Logging<S>
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

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let method = request.method();
        let url = request.url().to_string();
        let route = request
            .path_template()
            .map_or("-", |template| template.as_str());
        let level = self.level;

        let span = span!(Level::INFO, "forgeapi_request", %method, route);

        match level {
            LogLevel::Debug => {
                debug!(
                    parent: &span,
                    url = %url,
                    headers = ?redacted_headers(&request),
                    "sending request"
                );
            }
            LogLevel::Info => {
                info!(parent: &span, url = %url, "sending request");
            }
        }

        let mut inner = self.inner.clone();
        Box::pin(
            async move {
                let start = Instant::now();
                let result = inner.call(request).await;
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) if response.is_success() => {
                        info!(status = response.status(), elapsed_ms, "request completed");
                    }
                    Ok(response) => {
                        warn!(status = response.status(), elapsed_ms, "request returned error status");
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;

    #[test]
    fn logging_layer_levels() {
        assert!(matches!(LoggingLayer::new().level, LogLevel::Info));
        assert!(matches!(LoggingLayer::debug().level, LogLevel::Debug));
    }

    #[test]
    fn redacts_credentials() {
        let url = url::Url::parse("https://gitlab.example.com/api/v4/projects").expect("url");
        let request = Request::builder(Method::Get, url)
            .header("PRIVATE-TOKEN", "glpat-secret")
            .header("Accept", "application/json")
            .build();

        let headers = redacted_headers(&request);
        assert_eq!(
            headers,
            vec![
                ("accept".to_string(), "application/json".to_string()),
                ("private-token".to_string(), "<redacted>".to_string()),
            ]
        );
    }
}
