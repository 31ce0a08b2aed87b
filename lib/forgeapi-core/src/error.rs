//! Error types for forgeapi.
//!
//! Every failure in the pipeline is an [`Error`]. Callers that only care about
//! the broad failure class branch on [`Error::kind`].

use bytes::Bytes;
use derive_more::{Display, Error, From};

use crate::ResponseMeta;

// ============================================================================
// Error Decoder Trait
// ============================================================================

/// Turns the body of a non-2xx response into a human readable message.
///
/// The dispatcher calls the decoder for every error response. Returning
/// `None` makes the dispatcher fall back to the raw body text, or the status
/// reason phrase when the body is empty.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use forgeapi_core::ErrorDecoder;
///
/// struct CodeOnly;
///
/// impl ErrorDecoder for CodeOnly {
///     fn decode(&self, status: u16, _body: &Bytes) -> Option<String> {
///         Some(format!("failed with {status}"))
///     }
/// }
///
/// assert_eq!(
///     CodeOnly.decode(503, &Bytes::new()).as_deref(),
///     Some("failed with 503")
/// );
/// ```
pub trait ErrorDecoder: Send + Sync + 'static {
    /// Decode an error body, or `None` to use the fallback message.
    fn decode(&self, status: u16, body: &Bytes) -> Option<String>;
}

/// Decoder for the `{"message": ...}` / `{"error": ...}` bodies the API sends.
///
/// Structured messages are flattened: `{"message":{"name":["is taken"]}}`
/// becomes `name: is taken`, several fields are joined with `; `.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageDecoder;

impl ErrorDecoder for JsonMessageDecoder {
    fn decode(&self, _status: u16, body: &Bytes) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        let object = value.as_object()?;

        let mut parts = Vec::new();
        for key in ["message", "error"] {
            if let Some(field) = object.get(key) {
                flatten_message(None, field, &mut parts);
            }
        }
        if let Some(description) = object.get("error_description").and_then(|v| v.as_str()) {
            parts.push(description.to_string());
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

fn flatten_message(prefix: Option<&str>, value: &serde_json::Value, out: &mut Vec<String>) {
    use serde_json::Value;

    let push = |out: &mut Vec<String>, text: String| match prefix {
        Some(prefix) => out.push(format!("{prefix}: {text}")),
        None => out.push(text),
    };

    match value {
        Value::Null => {}
        Value::String(text) => push(out, text.clone()),
        Value::Array(items) => {
            let texts: Vec<String> = items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                })
                .collect();
            if !texts.is_empty() {
                push(out, texts.join(", "));
            }
        }
        Value::Object(fields) => {
            for (key, nested) in fields {
                let key = match prefix {
                    Some(prefix) => format!("{prefix}.{key}"),
                    None => key.clone(),
                };
                flatten_message(Some(&key), nested, out);
            }
        }
        other => push(out, other.to_string()),
    }
}

// ============================================================================
// Error Kinds
// ============================================================================

/// Broad failure classes of the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// The request could not be built; nothing was sent.
    #[display("invalid request")]
    InvalidRequest,
    /// Network, DNS, TLS or transport timeout failure; no response exists.
    #[display("transport failure")]
    Transport,
    /// The server answered with a non-2xx status.
    #[display("API status")]
    ApiStatus,
    /// A 2xx body did not match the expected shape.
    #[display("decode failure")]
    Decode,
    /// The caller cancelled the call or its deadline expired.
    #[display("cancelled")]
    Cancelled,
}

/// Why a call was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    #[display("cancelled by caller")]
    Caller,
    /// The deadline attached to the request passed.
    #[display("deadline exceeded")]
    DeadlineExceeded,
}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for forgeapi operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// Non-2xx response from the API.
    #[display("API error {status}: {message}")]
    #[from(skip)]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message decoded from the body, or the raw body text.
        message: String,
        /// Raw response body.
        #[error(not(source))]
        body: Bytes,
        /// Metadata of the failed response.
        #[error(not(source))]
        response: Box<ResponseMeta>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// The transport-level timeout from the client configuration fired.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The call was aborted before completing.
    #[display("request cancelled: {_0}")]
    #[from(skip)]
    Cancelled(#[error(not(source))] CancelReason),

    /// Invalid request input, caught before dispatch.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON body serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// Query string serialization error.
    #[display("query serialization error: {_0}")]
    #[from]
    QuerySerialization(serde_html_form::ser::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// A success body could not be decoded into the target type.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    Decode {
        /// JSON path to the error (e.g., `[0].project.id`).
        path: String,
        /// Error message.
        message: String,
        /// Metadata of the response whose body failed to decode.
        #[error(not(source))]
        response: Option<Box<ResponseMeta>>,
    },
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an API status error.
    #[must_use]
    pub fn api(status: u16, message: impl Into<String>, body: Bytes, response: ResponseMeta) -> Self {
        Self::Api {
            status,
            message: message.into(),
            body,
            response: Box::new(response),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a decode error without response metadata.
    #[must_use]
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
            response: None,
        }
    }

    /// Attach response metadata to a decode error. Other variants are returned unchanged.
    #[must_use]
    pub fn with_response(self, meta: ResponseMeta) -> Self {
        match self {
            Self::Decode { path, message, .. } => Self::Decode {
                path,
                message,
                response: Some(Box::new(meta)),
            },
            other => other,
        }
    }

    /// The failure class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Api { .. } => ErrorKind::ApiStatus,
            Self::Connection(_) | Self::Tls(_) | Self::Timeout => ErrorKind::Transport,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::InvalidRequest(_)
            | Self::JsonSerialization(_)
            | Self::QuerySerialization(_)
            | Self::InvalidUrl(_) => ErrorKind::InvalidRequest,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Returns `true` if the transport-level timeout fired.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns `true` if the call was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    /// Returns the HTTP status code if this is an API status error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a 404 Not Found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Response metadata, present whenever a response was received.
    #[must_use]
    pub fn response(&self) -> Option<&ResponseMeta> {
        match self {
            Self::Api { response, .. } => Some(&**response),
            Self::Decode { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    /// Returns the response body if this is an API status error.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Api { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Try to decode the API error body as JSON.
    ///
    /// Returns `None` if this is not an API status error.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert2::{check, let_assert};

    use super::*;

    fn meta(status: u16) -> ResponseMeta {
        ResponseMeta::from_parts(status, HashMap::new())
    }

    #[test]
    fn error_display() {
        let err = Error::api(404, "404 Not Found", Bytes::new(), meta(404));
        assert_eq!(err.to_string(), "API error 404: 404 Not Found");

        assert_eq!(Error::Timeout.to_string(), "request timeout");
        assert_eq!(
            Error::Cancelled(CancelReason::DeadlineExceeded).to_string(),
            "request cancelled: deadline exceeded"
        );

        let err = Error::decode("[0].project.id", "invalid type: string \"x\", expected u64");
        assert_eq!(
            err.to_string(),
            "JSON deserialization error at '[0].project.id': invalid type: string \"x\", expected u64"
        );
    }

    #[test]
    fn error_kinds() {
        check!(Error::invalid_request("x").kind() == ErrorKind::InvalidRequest);
        check!(Error::connection("refused").kind() == ErrorKind::Transport);
        check!(Error::tls("bad cert").kind() == ErrorKind::Transport);
        check!(Error::Timeout.kind() == ErrorKind::Transport);
        check!(Error::Cancelled(CancelReason::Caller).kind() == ErrorKind::Cancelled);
        check!(Error::decode("", "eof").kind() == ErrorKind::Decode);
        check!(Error::api(500, "boom", Bytes::new(), meta(500)).kind() == ErrorKind::ApiStatus);

        let url_err = url::Url::parse("::").expect_err("invalid url");
        check!(Error::from(url_err).kind() == ErrorKind::InvalidRequest);
    }

    #[test]
    fn response_metadata_only_when_received() {
        let err = Error::api(404, "Not Found", Bytes::new(), meta(404));
        let_assert!(Some(response) = err.response());
        check!(response.status() == 404);
        check!(err.is_not_found());

        check!(Error::connection("refused").response().is_none());

        let err = Error::decode("id", "missing field").with_response(meta(200));
        check!(err.response().map(ResponseMeta::status) == Some(200));

        let err = Error::Timeout.with_response(meta(200));
        check!(err.response().is_none());
    }

    #[test]
    fn error_decode_body() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct ApiMessage {
            message: String,
        }

        let body = Bytes::from(r#"{"message":"404 Not Found"}"#);
        let err = Error::api(404, "404 Not Found", body, meta(404));
        let_assert!(Some(Ok(decoded)) = err.decode_body::<ApiMessage>());
        check!(decoded.message == "404 Not Found");

        check!(Error::Timeout.decode_body::<ApiMessage>().is_none());
    }

    #[test]
    fn json_message_decoder_plain_message() {
        let body = Bytes::from(r#"{"message":"404 Project Not Found"}"#);
        check!(JsonMessageDecoder.decode(404, &body).as_deref() == Some("404 Project Not Found"));

        let body = Bytes::from(r#"{"error":"invalid_token","error_description":"Token expired"}"#);
        check!(JsonMessageDecoder.decode(401, &body).as_deref() == Some("invalid_token; Token expired"));
    }

    #[test]
    fn json_message_decoder_flattens_structured_messages() {
        let body = Bytes::from(
            r#"{"message":{"destination_storage_name":["is not included in the list"]}}"#,
        );
        check!(
            JsonMessageDecoder.decode(400, &body).as_deref()
                == Some("destination_storage_name: is not included in the list")
        );

        let body = Bytes::from(r#"{"message":["first","second"]}"#);
        check!(JsonMessageDecoder.decode(400, &body).as_deref() == Some("first, second"));
    }

    #[test]
    fn json_message_decoder_falls_back_on_unknown_bodies() {
        check!(JsonMessageDecoder.decode(502, &Bytes::from("Bad Gateway")).is_none());
        check!(JsonMessageDecoder.decode(400, &Bytes::from(r#"{"detail":"x"}"#)).is_none());
        check!(JsonMessageDecoder.decode(400, &Bytes::from("[1,2]")).is_none());
    }
}
