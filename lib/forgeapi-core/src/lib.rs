//! Request pipeline types for the forgeapi REST resource client.
//!
//! This crate holds everything that does not touch the network:
//! - [`Method`] - HTTP method enum and where options are encoded
//! - [`Request`] and [`RequestBuilder`] - outbound requests with typed extensions
//! - [`Response`] and [`ResponseMeta`] - raw responses and the metadata kept after decoding
//! - [`ListOptions`] and [`Pagination`] - pagination request and response sides
//! - [`PathTemplate`] - route templates with numeric parameters
//! - [`RequestModifier`] - per-call request customisation
//! - [`Error`], [`ErrorKind`] and [`Result`] - error handling
//! - [`ErrorDecoder`] - message extraction from error bodies
//! - [`HttpClient`] - transport trait

mod body;
mod client;
mod error;
mod method;
mod modifier;
mod pagination;
mod path_template;
pub mod prelude;
mod request;
mod response;

pub use body::{ContentType, decode_response, from_json, to_json, to_query_string};
pub use client::HttpClient;
pub use error::{CancelReason, Error, ErrorDecoder, ErrorKind, JsonMessageDecoder, Result};
pub use method::{Method, OptionsEncoding};
pub use modifier::{
    RequestModifier, WithCancellation, WithDeadline, WithHeader, WithKeysetLink, WithQuery,
    apply_modifiers, with_cancellation, with_deadline, with_header, with_keyset_link, with_query,
    with_sudo, with_timeout,
};
pub use pagination::{ListOptions, Pagination, PaginationLinks, SortOrder};
pub use path_template::PathTemplate;
pub use request::{Deadline, Request, RequestBuilder};
pub use response::{RateLimit, Response, ResponseMeta};

// Re-export for callers building cancellation modifiers
pub use tokio_util::sync::CancellationToken;

// Re-export http crate types for status codes and headers
pub use http::{StatusCode, header};
