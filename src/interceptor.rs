//! Overridable pipeline interceptor hooks.
//!
//! Four hooks cover the request and response sides of the pipeline, each
//! individually overridable. Setting a hook fully replaces the default logic
//! for that stage; there is no chaining. The defaults live in
//! [`crate::client::ApiClient`]:
//!
//! - request fulfilled: merge defaults, run the request-header handler
//! - request rejected: pass the error through unchanged
//! - response fulfilled: envelope code check, backend/global hooks, unwrap
//!   `data`
//! - response rejected: fixed-message classification plus the global message
//!   hook

use crate::config::RequestConfig;
use crate::error::{Error, Result};
use std::sync::Arc;

/// What the response-fulfilled hook sees: the HTTP outcome plus the request
/// config that produced it (for the code-check policy fields).
#[derive(Clone, Debug)]
pub struct ResponseContext {
    pub status: u16,
    pub url: String,
    /// Parsed JSON response body.
    pub body: serde_json::Value,
    pub config: RequestConfig,
}

pub type RequestFulfilledHook = dyn Fn(RequestConfig) -> Result<RequestConfig> + Send + Sync;
pub type RequestRejectedHook = dyn Fn(Error) -> Error + Send + Sync;
pub type ResponseFulfilledHook = dyn Fn(ResponseContext) -> Result<serde_json::Value> + Send + Sync;
pub type ResponseRejectedHook = dyn Fn(Error) -> Error + Send + Sync;

/// Optional overrides for the four pipeline stages.
#[derive(Clone, Default)]
pub struct Interceptors {
    pub(crate) request_on_fulfilled: Option<Arc<RequestFulfilledHook>>,
    pub(crate) request_on_rejected: Option<Arc<RequestRejectedHook>>,
    pub(crate) response_on_fulfilled: Option<Arc<ResponseFulfilledHook>>,
    pub(crate) response_on_rejected: Option<Arc<ResponseRejectedHook>>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_on_fulfilled<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestConfig) -> Result<RequestConfig> + Send + Sync + 'static,
    {
        self.request_on_fulfilled = Some(Arc::new(hook));
        self
    }

    pub fn request_on_rejected<F>(mut self, hook: F) -> Self
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        self.request_on_rejected = Some(Arc::new(hook));
        self
    }

    pub fn response_on_fulfilled<F>(mut self, hook: F) -> Self
    where
        F: Fn(ResponseContext) -> Result<serde_json::Value> + Send + Sync + 'static,
    {
        self.response_on_fulfilled = Some(Arc::new(hook));
        self
    }

    pub fn response_on_rejected<F>(mut self, hook: F) -> Self
    where
        F: Fn(Error) -> Error + Send + Sync + 'static,
    {
        self.response_on_rejected = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("request_on_fulfilled", &self.request_on_fulfilled.is_some())
            .field("request_on_rejected", &self.request_on_rejected.is_some())
            .field(
                "response_on_fulfilled",
                &self.response_on_fulfilled.is_some(),
            )
            .field("response_on_rejected", &self.response_on_rejected.is_some())
            .finish()
    }
}
