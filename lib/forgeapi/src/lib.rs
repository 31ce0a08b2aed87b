//! Typed async client for GitLab-style REST resources.
//!
//! Requests go through one pipeline: [`ApiClient`] builds them from route
//! templates, options and [`RequestModifier`]s, dispatches each exactly once
//! over an [`HttpClient`], and decodes the body together with its
//! [`ResponseMeta`] (status, headers, pagination, rate limits).
//!
//! # Example
//!
//! ```ignore
//! use forgeapi::prelude::*;
//!
//! let client = ApiClient::builder()
//!     .base_url("https://gitlab.example.com")
//!     .private_token(std::env::var("GITLAB_TOKEN")?)
//!     .build()?;
//!
//! let moves = client.project_repository_storage_moves();
//! let (scheduled, _) = moves
//!     .schedule_storage_move_for_project(
//!         42,
//!         Some(&ScheduleStorageMoveForProjectOptions::to_storage("gitaly-2")),
//!         &[&with_timeout(Duration::from_secs(10))],
//!     )
//!     .await?;
//! ```

mod api_client;
mod client;
mod config;
mod connector;
pub mod middleware;
pub mod prelude;
pub mod resources;

// Re-export client types
pub use api_client::{ApiClient, ApiClientBuilder, DEFAULT_USER_AGENT};
pub use client::{BoxedService, HyperClient, HyperClientBuilder, ServiceFuture};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use middleware::Credentials;
pub use resources::{
    ProjectRepositoryStorageMoves, RetrieveAllStorageMovesOptions, ScheduleAllStorageMovesOptions,
    ScheduleStorageMoveForProjectOptions, StorageMove, StorageMoveProject,
};

// Re-export tower for middleware composition
pub use tower;

// Re-export core types
pub use forgeapi_core::{
    CancelReason, CancellationToken, ContentType, Deadline, Error, ErrorDecoder, ErrorKind,
    HttpClient, JsonMessageDecoder, ListOptions, Method, OptionsEncoding, Pagination,
    PaginationLinks, PathTemplate, RateLimit, Request, RequestBuilder, RequestModifier, Response,
    ResponseMeta, Result, SortOrder, WithCancellation, WithDeadline, WithHeader, WithKeysetLink,
    WithQuery, apply_modifiers, decode_response, from_json, to_json, to_query_string,
    with_cancellation, with_deadline, with_header, with_keyset_link, with_query, with_sudo,
    with_timeout,
};

// Re-export http types for status codes and headers
pub use forgeapi_core::{StatusCode, header};

pub use url;
