//! Tower middleware layers for the transport.
//!
//! - [`AuthLayer`] - attaches the configured [`Credentials`] header
//! - [`LoggingLayer`] - logs requests/responses using `tracing`
//!
//! Layers compose with any `tower::Layer` through
//! [`HyperClientBuilder::layer`](crate::HyperClientBuilder::layer).
//!
//! ```ignore
//! use forgeapi::HyperClient;
//! use forgeapi::middleware::{AuthLayer, Credentials};
//!
//! let client = HyperClient::builder()
//!     .layer(AuthLayer::new(Credentials::job_token(std::env::var("CI_JOB_TOKEN")?)))
//!     .with_logging()
//!     .build();
//! ```

mod auth;
mod logging;

pub use auth::{Auth, AuthLayer, Credentials};
pub use logging::{LogLevel, Logging, LoggingLayer};

pub use tower::Layer;
