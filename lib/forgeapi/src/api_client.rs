//! API client: request building, dispatch and decoding.
//!
//! [`ApiClient`] combines any [`HttpClient`] with a base URL. Resource
//! services borrow it to build requests from route templates, send them
//! exactly once, and decode the body together with its [`ResponseMeta`].

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use forgeapi_core::{
    CancelReason, CancellationToken, ContentType, ErrorDecoder, JsonMessageDecoder,
    OptionsEncoding, PathTemplate, RequestModifier, ResponseMeta, apply_modifiers,
    decode_response, to_query_string,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::middleware::{Credentials, LoggingLayer};
use crate::resources::ProjectRepositoryStorageMoves;
use crate::{
    ClientConfig, Error, HttpClient, HyperClient, HyperClientBuilder, Method, Request, Response,
    Result, StatusCode,
};

/// Path prefix appended to base URLs that do not already carry it.
const API_PREFIX: &str = "api/v4";

/// Default `User-Agent` header value.
pub const DEFAULT_USER_AGENT: &str = concat!("forgeapi/", env!("CARGO_PKG_VERSION"));

/// Generic API client.
///
/// Wraps any [`HttpClient`] with a base URL, a user agent and an
/// [`ErrorDecoder`]. Configuration is immutable once built; clones share it.
///
/// # Example
///
/// ```ignore
/// use forgeapi::{ApiClient, ListOptions};
///
/// let client = ApiClient::builder()
///     .base_url("https://gitlab.example.com")
///     .private_token(std::env::var("GITLAB_TOKEN")?)
///     .build()?;
///
/// let (moves, meta) = client
///     .project_repository_storage_moves()
///     .retrieve_all_storage_moves(&ListOptions::new().per_page(50), &[])
///     .await?;
/// ```
pub struct ApiClient<C> {
    client: C,
    base_url: Url,
    user_agent: Arc<str>,
    error_decoder: Arc<dyn ErrorDecoder>,
}

impl<C: Clone> Clone for ApiClient<C> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            user_agent: Arc::clone(&self.user_agent),
            error_decoder: Arc::clone(&self.error_decoder),
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for ApiClient<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("client", &self.client)
            .field("base_url", &self.base_url.as_str())
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl ApiClient<HyperClient> {
    /// Create a builder for a client over the default hyper transport.
    #[must_use]
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }
}

impl<C> ApiClient<C> {
    /// Create a new API client.
    ///
    /// `base_url` is the instance root, e.g. `https://gitlab.example.com`;
    /// `/api/v4/` is appended unless the URL already ends with it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed or is not http(s).
    pub fn new(client: C, base_url: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url.as_ref())?,
            user_agent: Arc::from(DEFAULT_USER_AGENT),
            error_decoder: Arc::new(JsonMessageDecoder),
        })
    }

    /// Replace the decoder used for non-2xx bodies.
    #[must_use]
    pub fn with_error_decoder(mut self, decoder: impl ErrorDecoder) -> Self {
        self.error_decoder = Arc::new(decoder);
        self
    }

    /// Replace the `User-Agent` header value.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Arc::from(user_agent.into());
        self
    }

    /// Resolved API root, always ending in `/api/v4/`.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `User-Agent` sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Get a reference to the inner HTTP client.
    #[must_use]
    pub fn inner(&self) -> &C {
        &self.client
    }

    /// Repository storage moves of projects.
    #[must_use]
    pub fn project_repository_storage_moves(&self) -> ProjectRepositoryStorageMoves<'_, C> {
        ProjectRepositoryStorageMoves::new(self)
    }

    /// Build a request for a relative `path`.
    ///
    /// For GET, HEAD and DELETE `options` are encoded as query parameters, for
    /// the other methods as a JSON body. `None` sends no options at all.
    /// Modifiers run last, in order; the first failure is returned and nothing
    /// is sent.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] for absolute or malformed paths, encoding
    /// errors, or the first modifier error.
    pub fn new_request<O>(
        &self,
        method: Method,
        path: &str,
        options: Option<&O>,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<Request<Bytes>>
    where
        O: Serialize + ?Sized,
    {
        self.build_request(method, path, None, options, modifiers)
    }

    /// Build a request from a route template and its numeric parameters.
    ///
    /// The template is kept in the request extensions.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new_request`], plus template expansion errors.
    pub fn new_templated_request<O>(
        &self,
        method: Method,
        template: &PathTemplate,
        params: &[(&str, u64)],
        options: Option<&O>,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<Request<Bytes>>
    where
        O: Serialize + ?Sized,
    {
        let path = template.expand(params)?;
        self.build_request(method, &path, Some(template), options, modifiers)
    }

    fn build_request<O>(
        &self,
        method: Method,
        path: &str,
        template: Option<&PathTemplate>,
        options: Option<&O>,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<Request<Bytes>>
    where
        O: Serialize + ?Sized,
    {
        let url = self.resolve(path)?;

        let mut builder = Request::builder(method, url)
            .header("Accept", ContentType::Json.as_str())
            .header("User-Agent", &*self.user_agent);

        if let Some(template) = template {
            builder = builder.extension(template.clone());
        }

        if let Some(options) = options {
            builder = match method.options_encoding() {
                OptionsEncoding::Query => builder.encoded_query(&to_query_string(options)?),
                OptionsEncoding::JsonBody => builder.json(options)?,
            };
        }

        let mut request = builder.build();
        apply_modifiers(&mut request, modifiers)?;

        debug!(
            %method,
            url = %request.url(),
            modifiers = modifiers.len(),
            "built request"
        );
        Ok(request)
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        let invalid = || {
            Error::invalid_request(format!(
                "request path must be relative to the API root without query or fragment: {path}"
            ))
        };

        // A `:` in the first segment would be read as a scheme.
        let first_segment = path.split('/').next().unwrap_or_default();
        if path.is_empty()
            || path.starts_with('/')
            || path.contains(['?', '#', '\\'])
            || first_segment.contains(':')
            || path.split('/').any(|segment| matches!(segment, "." | ".."))
        {
            return Err(invalid());
        }

        let url = self.base_url.join(path).map_err(Error::InvalidUrl)?;
        if !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(invalid());
        }
        Ok(url)
    }

    fn api_error(&self, response: Response<Bytes>) -> Error {
        let status = response.status();
        let (meta, body) = response.into_meta();

        let message = self
            .error_decoder
            .decode(status, &body)
            .or_else(|| {
                let text = String::from_utf8_lossy(&body).trim().to_string();
                (!text.is_empty()).then_some(text)
            })
            .unwrap_or_else(|| {
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|code| code.canonical_reason())
                    .unwrap_or("unknown status")
                    .to_string()
            });

        Error::api(status, message, body, meta)
    }
}

impl<C: HttpClient> ApiClient<C> {
    /// Send a request once and return the raw response.
    ///
    /// A cancelled token or an expired deadline fails the call without
    /// reaching the transport. While in flight the transport call is raced
    /// against both; whichever wins decides the result.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] when the token fires or the deadline passes
    /// - transport errors from the [`HttpClient`], unchanged
    /// - [`Error::Api`] for non-2xx statuses, with the response metadata
    pub async fn dispatch(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let method = request.method();
        let url = request.url().clone();
        let token = request.cancellation_token().cloned();
        let deadline = request.deadline();

        if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            debug!(%method, %url, "request cancelled before dispatch");
            return Err(Error::Cancelled(CancelReason::Caller));
        }
        if deadline.is_some_and(|deadline| deadline <= Instant::now()) {
            debug!(%method, %url, "deadline passed before dispatch");
            return Err(Error::Cancelled(CancelReason::DeadlineExceeded));
        }

        debug!(%method, %url, "dispatching request");

        let cancelled = async {
            match &token {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
                }
                None => std::future::pending().await,
            }
        };

        let result = tokio::select! {
            biased;
            () = cancelled => Err(Error::Cancelled(CancelReason::Caller)),
            () = expired => Err(Error::Cancelled(CancelReason::DeadlineExceeded)),
            result = self.client.execute(request) => result,
        };

        let response = result.inspect_err(|err| {
            warn!(%method, %url, error = %err, "request failed");
        })?;

        if response.is_success() {
            debug!(%method, %url, status = response.status(), "request succeeded");
            return Ok(response);
        }

        let err = self.api_error(response);
        warn!(%method, %url, error = %err, "API returned error status");
        Err(err)
    }

    /// Dispatch a request and decode its body into `T`.
    ///
    /// # Errors
    ///
    /// Errors from [`Self::dispatch`], or [`Error::Decode`] carrying the
    /// response metadata.
    pub async fn send<T: DeserializeOwned>(
        &self,
        request: Request<Bytes>,
    ) -> Result<(T, ResponseMeta)> {
        let response = self.dispatch(request).await?;
        decode_response(response)
    }

    /// Build, dispatch and decode in one call.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::new_templated_request`] or [`Self::send`].
    pub async fn request<T, O>(
        &self,
        method: Method,
        template: &PathTemplate,
        params: &[(&str, u64)],
        options: Option<&O>,
        modifiers: &[&dyn RequestModifier],
    ) -> Result<(T, ResponseMeta)>
    where
        T: DeserializeOwned,
        O: Serialize + ?Sized,
    {
        let request = self.new_templated_request(method, template, params, options, modifiers)?;
        self.send(request).await
    }
}

/// Parse a base URL and make it point at the API root.
fn normalize_base_url(base_url: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(Error::InvalidUrl)?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::invalid_request(format!(
            "base URL must be an http(s) URL: {base_url}"
        )));
    }

    url.set_query(None);
    url.set_fragment(None);

    let trimmed = url.path().trim_end_matches('/');
    let path = if trimmed.ends_with(API_PREFIX) {
        format!("{trimmed}/")
    } else {
        format!("{trimmed}/{API_PREFIX}/")
    };
    url.set_path(&path);

    Ok(url)
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for an [`ApiClient`] over [`HyperClient`].
///
/// Credentials and logging are installed as tower layers on the transport.
/// Logging is off unless requested.
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    credentials: Option<Credentials>,
    logging: Option<LoggingLayer>,
    user_agent: Option<String>,
    error_decoder: Option<Arc<dyn ErrorDecoder>>,
    client: HyperClientBuilder,
}

impl fmt::Debug for ApiClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClientBuilder")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .field("logging", &self.logging)
            .field("user_agent", &self.user_agent)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl ApiClientBuilder {
    /// Instance root, e.g. `https://gitlab.example.com`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Credentials attached to every request.
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Shorthand for [`Credentials::private_token`].
    #[must_use]
    pub fn private_token(self, token: impl Into<String>) -> Self {
        self.credentials(Credentials::private_token(token))
    }

    /// Override the `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Decoder for non-2xx bodies. Defaults to [`JsonMessageDecoder`].
    #[must_use]
    pub fn error_decoder(mut self, decoder: impl ErrorDecoder) -> Self {
        self.error_decoder = Some(Arc::new(decoder));
        self
    }

    /// Transport configuration.
    #[must_use]
    pub fn config(mut self, config: &ClientConfig) -> Self {
        self.client = self.client.config(config);
        self
    }

    /// Transport request timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.timeout(timeout);
        self
    }

    /// Transport connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.connect_timeout(timeout);
        self
    }

    /// Largest response body accepted, in bytes.
    #[must_use]
    pub fn max_response_bytes(mut self, limit: usize) -> Self {
        self.client = self.client.max_response_bytes(limit);
        self
    }

    /// Log requests and responses with `tracing` at info level.
    #[must_use]
    pub fn with_logging(mut self) -> Self {
        self.logging = Some(LoggingLayer::new());
        self
    }

    /// Log at debug level, including redacted request headers.
    #[must_use]
    pub fn with_debug_logging(mut self) -> Self {
        self.logging = Some(LoggingLayer::debug());
        self
    }

    /// Customise the transport, e.g. to add tower layers.
    #[must_use]
    pub fn configure_client(
        mut self,
        configure: impl FnOnce(HyperClientBuilder) -> HyperClientBuilder,
    ) -> Self {
        self.client = configure(self.client);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidRequest`] without a base URL, or the errors of
    /// [`ApiClient::new`].
    pub fn build(mut self) -> Result<ApiClient<HyperClient>> {
        let Some(base_url) = self.base_url.take() else {
            return Err(Error::invalid_request("base URL is required"));
        };
        let transport = self.transport_builder().build();

        let mut client = ApiClient::new(transport, base_url)?;
        if let Some(user_agent) = self.user_agent {
            client = client.with_user_agent(user_agent);
        }
        if let Some(decoder) = self.error_decoder {
            client.error_decoder = decoder;
        }
        Ok(client)
    }

    /// Transport builder with the credential and logging layers added.
    fn transport_builder(&mut self) -> HyperClientBuilder {
        let mut transport = std::mem::take(&mut self.client);
        if let Some(credentials) = self.credentials.clone() {
            transport = transport.with_credentials(credentials);
        }
        if let Some(logging) = self.logging {
            transport = transport.layer(logging);
        }
        transport
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use forgeapi_core::{ErrorKind, ListOptions, with_header};

    use super::*;

    fn client() -> ApiClient<()> {
        ApiClient::new((), "https://gitlab.example.com").expect("client")
    }

    #[test]
    fn base_url_gets_api_prefix() {
        for (input, expected) in [
            ("https://gitlab.example.com", "https://gitlab.example.com/api/v4/"),
            ("https://gitlab.example.com/", "https://gitlab.example.com/api/v4/"),
            ("https://gitlab.example.com/api/v4", "https://gitlab.example.com/api/v4/"),
            ("https://example.com/gitlab/", "https://example.com/gitlab/api/v4/"),
            ("http://localhost:8080/api/v4/", "http://localhost:8080/api/v4/"),
        ] {
            let client = ApiClient::new((), input).expect("client");
            check!(client.base_url().as_str() == expected, "input: {input}");
        }
    }

    #[test]
    fn base_url_rejects_other_schemes() {
        let_assert!(Err(err) = ApiClient::new((), "ftp://gitlab.example.com"));
        check!(err.kind() == ErrorKind::InvalidRequest);

        let_assert!(Err(err) = ApiClient::new((), "not a url"));
        check!(err.kind() == ErrorKind::InvalidRequest);
    }

    #[test]
    fn get_options_become_query() {
        let options = ListOptions::new().page(2).per_page(20);
        let request = client()
            .new_request(Method::Get, "project_repository_storage_moves", Some(&options), &[])
            .expect("request");

        check!(
            request.url().as_str()
                == "https://gitlab.example.com/api/v4/project_repository_storage_moves?page=2&per_page=20"
        );
        check!(request.body().is_none());
        check!(request.header("accept") == Some("application/json"));
        check!(request.header("user-agent") == Some(DEFAULT_USER_AGENT));
    }

    #[test]
    fn default_options_leave_no_query() {
        let request = client()
            .new_request(
                Method::Get,
                "project_repository_storage_moves",
                Some(&ListOptions::new()),
                &[],
            )
            .expect("request");
        check!(request.url().query().is_none());
    }

    #[test]
    fn post_options_become_json_body() {
        #[derive(Serialize)]
        struct Body {
            destination_storage_name: &'static str,
        }

        let request = client()
            .new_request(
                Method::Post,
                "project_repository_storage_moves",
                Some(&Body {
                    destination_storage_name: "nfs-02",
                }),
                &[],
            )
            .expect("request");

        check!(request.url().query().is_none());
        check!(request.header("content-type") == Some("application/json"));
        let_assert!(Some(body) = request.body());
        check!(&body[..] == br#"{"destination_storage_name":"nfs-02"}"#);
    }

    #[test]
    fn none_options_send_empty_payload() {
        let request = client()
            .new_request(Method::Post, "project_repository_storage_moves", None::<&()>, &[])
            .expect("request");
        check!(request.body().is_none());
        check!(request.header("content-type").is_none());
    }

    #[test]
    fn rejects_non_relative_paths() {
        for path in [
            "",
            "/projects",
            "https://evil.example.com/x",
            "evil.example.com:443/x",
            "javascript:alert(1)",
            "projects?page=1",
            "a#b",
            "../../admin/x",
            "projects/../../admin",
            "projects/./1",
            "%2e%2e/admin",
            "..\\admin",
        ] {
            let result = client().new_request(Method::Get, path, None::<&()>, &[]);
            check!(
                result.map_err(|err| err.kind()).err() == Some(ErrorKind::InvalidRequest),
                "path: {path}"
            );
        }
    }

    #[test]
    fn templated_request_keeps_template() {
        let template = PathTemplate::new("projects/{project}/repository_storage_moves/{id}");
        let request = client()
            .new_templated_request(
                Method::Get,
                &template,
                &[("project", 7), ("id", 12)],
                None::<&()>,
                &[],
            )
            .expect("request");

        check!(
            request.url().as_str()
                == "https://gitlab.example.com/api/v4/projects/7/repository_storage_moves/12"
        );
        check!(request.path_template() == Some(&template));
    }

    #[test]
    fn modifiers_run_after_defaults() {
        let agent = with_header("User-Agent", "ops-bot/1.0");
        let request = client()
            .new_request(Method::Get, "projects", None::<&()>, &[&agent])
            .expect("request");
        check!(request.header("user-agent") == Some("ops-bot/1.0"));
    }

    #[test]
    fn modifier_failure_aborts_build() {
        let failing = |_: &mut Request<Bytes>| -> Result<()> {
            Err(Error::invalid_request("rejected"))
        };
        let_assert!(Err(err) = client().new_request(Method::Get, "projects", None::<&()>, &[&failing]));
        check!(err.to_string().contains("rejected"));
    }

    #[test]
    fn logging_is_opt_in() {
        let layers = |mut builder: ApiClientBuilder| format!("{:?}", builder.transport_builder());

        check!(layers(ApiClient::builder()).contains("layers_count: 0"));
        check!(layers(ApiClient::builder().private_token("t")).contains("layers_count: 1"));
        check!(
            layers(ApiClient::builder().private_token("t").with_logging())
                .contains("layers_count: 2")
        );
        check!(
            layers(ApiClient::builder().with_logging().with_debug_logging())
                .contains("layers_count: 1")
        );
    }

    #[test]
    fn builder_requires_base_url() {
        let_assert!(Err(err) = ApiClient::builder().build());
        check!(err.kind() == ErrorKind::InvalidRequest);
    }

    #[test]
    fn builder_applies_settings() {
        let client = ApiClient::builder()
            .base_url("https://gitlab.example.com")
            .private_token("glpat-secret")
            .user_agent("ops-bot/1.0")
            .timeout(Duration::from_secs(5))
            .build()
            .expect("client");

        check!(client.base_url().as_str() == "https://gitlab.example.com/api/v4/");
        check!(client.user_agent() == "ops-bot/1.0");
        check!(client.inner().config().timeout == Duration::from_secs(5));

        let debug = format!("{:?}", ApiClient::builder().private_token("glpat-secret"));
        check!(!debug.contains("glpat-secret"));
    }
}
