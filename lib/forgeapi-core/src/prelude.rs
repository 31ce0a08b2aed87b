//! Prelude module for convenient imports.
//!
//! ```ignore
//! use forgeapi_core::prelude::*;
//! ```

pub use crate::{
    CancellationToken, Error, ErrorKind, HttpClient, ListOptions, Method, Request,
    RequestModifier, Response, ResponseMeta, Result, with_cancellation, with_header,
    with_keyset_link, with_query, with_sudo, with_timeout,
};
