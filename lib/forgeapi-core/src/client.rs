//! Transport trait.
//!
//! [`HttpClient`] is the seam between the request pipeline and the network.
//! `forgeapi::HyperClient` implements it over hyper; tests implement it with
//! canned responses.

use std::future::Future;

use bytes::Bytes;

use crate::{Request, Response, Result};

/// Executes fully built requests.
///
/// Implementations perform exactly one round trip per call and return the
/// response whatever its status. Only transport failures are errors here:
/// status handling belongs to the caller.
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    fn execute(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send;
}
