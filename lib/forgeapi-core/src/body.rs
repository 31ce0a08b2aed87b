//! Body serialization and response decoding.

use bytes::Bytes;

use crate::{Response, ResponseMeta, Result};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use forgeapi_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Schedule { destination_storage_name: String }
///
/// let schedule = Schedule { destination_storage_name: "nfs-02".to_string() };
/// let bytes = to_json(&schedule).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"destination_storage_name":"nfs-02"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Serialize a value to a query string.
///
/// Uses `serde_html_form` which supports `Vec<T>` for repeated query parameters
/// (e.g., `?tags=a&tags=b&tags=c`).
///
/// # Errors
///
/// Returns an error if query serialization fails, e.g. for nested structs.
///
/// # Example
///
/// ```
/// use forgeapi_core::to_query_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Search {
///     search: String,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     page: Option<u32>,
/// }
///
/// let search = Search { search: "storage".to_string(), page: Some(1) };
/// let query = to_query_string(&search).expect("serialize");
/// assert_eq!(query, "search=storage&page=1");
/// ```
pub fn to_query_string<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_html_form::to_string(value).map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// Uses `serde_path_to_error` so the error names the exact field that failed
/// (e.g. `[0].project.created_at`).
///
/// # Errors
///
/// Returns [`crate::Error::Decode`] if JSON deserialization fails.
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let value = serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| crate::Error::decode(e.path().to_string(), e.inner().to_string()))?;
    deserializer
        .end()
        .map_err(|e| crate::Error::decode("", e.to_string()))?;
    Ok(value)
}

/// Decode a successful response into `T` and its metadata.
///
/// The body is decoded whatever shape `T` has: a single object, a sequence, or
/// `()`. An empty or whitespace-only body decodes like JSON `null`, which
/// suits `()` and `Option<_>` targets.
///
/// # Errors
///
/// Returns [`crate::Error::Decode`] carrying the response metadata when the
/// body does not match `T`.
pub fn decode_response<T: serde::de::DeserializeOwned>(
    response: Response<Bytes>,
) -> Result<(T, ResponseMeta)> {
    let (meta, body) = response.into_meta();

    let bytes: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &body
    };

    match from_json(bytes) {
        Ok(value) => Ok((value, meta)),
        Err(err) => Err(err.with_response(meta)),
    }
}
