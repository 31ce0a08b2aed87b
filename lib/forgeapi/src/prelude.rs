//! Prelude module for convenient imports.
//!
//! ```ignore
//! use forgeapi::prelude::*;
//! ```

pub use crate::{
    ApiClient, CancellationToken, ClientConfig, Credentials, Error, ErrorKind, HttpClient,
    HyperClient, ListOptions, Method, RequestModifier, ResponseMeta, Result,
    ScheduleAllStorageMovesOptions, ScheduleStorageMoveForProjectOptions, SortOrder, StorageMove,
    with_cancellation, with_deadline, with_header, with_keyset_link, with_query, with_sudo,
    with_timeout,
};
pub use std::time::Duration;
