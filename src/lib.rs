//! reqkit
//!
//! A small convenience layer over `reqwest` for backends that wrap every
//! response in a `code`/`message`/`data` envelope. It standardizes:
//!
//! - a request pipeline with overridable interceptor hooks,
//! - business-code checking against a configurable success code,
//! - global error-messaging hooks (toast-style callbacks) with a fixed
//!   status-to-message table,
//! - a consumer for SSE-style streaming text responses with per-chunk
//!   callbacks and cooperative cancellation.
//!
//! It is not an HTTP client: transport, connection management, and TLS are
//! `reqwest`'s job, and there is no retry or backoff layer.
//!
//! # Unwrap policy
//!
//! On business success, [`ApiClient::request`] and the verb helpers resolve
//! with the envelope's `data` field, never the whole envelope. Callers that
//! need `code` or `message` on success deserialize into
//! [`envelope::ApiResponse`] themselves. This policy is uniform across the
//! crate.
//!
//! # Example
//!
//! ```rust,ignore
//! use reqkit::prelude::*;
//!
//! let client = ApiClient::builder("https://api.example.com")
//!     .handlers(
//!         Handlers::new()
//!             .on_request_header(|config| Ok(config.header("authorization", "Bearer token")))
//!             .on_global_message(|message| eprintln!("{message}")),
//!     )
//!     .build()?;
//!
//! let user: serde_json::Value = client.get("/user/profile").await?;
//! ```
//!
//! Streaming:
//!
//! ```rust,ignore
//! let outcome = client
//!     .stream(
//!         StreamRequest::new("/chat").json(serde_json::json!({"prompt": "hi"})),
//!         StreamCallbacks::new().on_message(|chunk, _full| print!("{chunk}")),
//!     )
//!     .await?;
//! println!("{}", outcome.full_text);
//! ```

#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod interceptor;
pub mod streaming;

mod headers;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{Error, Result};

/// Common types for everyday use.
pub mod prelude {
    pub use crate::client::{ApiClient, ApiClientBuilder};
    pub use crate::config::{RequestConfig, DEFAULT_SUCCESS_CODE};
    pub use crate::envelope::ApiResponse;
    pub use crate::error::{Error, Result};
    pub use crate::handlers::Handlers;
    pub use crate::interceptor::{Interceptors, ResponseContext};
    pub use crate::streaming::{StreamCallbacks, StreamOutcome, StreamRequest};
}
