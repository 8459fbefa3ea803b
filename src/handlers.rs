//! Process-wide handler hooks supplied once at client construction.
//!
//! Each hook is an optional capability; dispatch is a plain conditional on
//! presence. Hooks are advisory side effects (UI toasts, token injection,
//! error reporting) and never suppress the pipeline's rejection. They may be
//! called concurrently from independent in-flight requests and must be
//! side-effect-safe under concurrent invocation.

use crate::config::RequestConfig;
use crate::error::Result;
use std::sync::Arc;

/// Transforms the merged request config before send (e.g. injects an
/// authorization header).
pub type RequestHeaderHook = dyn Fn(RequestConfig) -> Result<RequestConfig> + Send + Sync;

/// Receives the resolved user-facing message for a failure (e.g. a toast).
pub type GlobalMessageHook = dyn Fn(&str) + Send + Sync;

/// Receives `(code, message)` for business failures; when registered it
/// takes precedence over the global message path.
pub type BackendErrorHook = dyn Fn(i64, &str) + Send + Sync;

/// The three optional handler hooks held by a client for its lifetime.
#[derive(Clone, Default)]
pub struct Handlers {
    pub(crate) request_header: Option<Arc<RequestHeaderHook>>,
    pub(crate) global_message: Option<Arc<GlobalMessageHook>>,
    pub(crate) backend_error: Option<Arc<BackendErrorHook>>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request_header<F>(mut self, hook: F) -> Self
    where
        F: Fn(RequestConfig) -> Result<RequestConfig> + Send + Sync + 'static,
    {
        self.request_header = Some(Arc::new(hook));
        self
    }

    pub fn on_global_message<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.global_message = Some(Arc::new(hook));
        self
    }

    pub fn on_backend_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(i64, &str) + Send + Sync + 'static,
    {
        self.backend_error = Some(Arc::new(hook));
        self
    }
}

impl std::fmt::Debug for Handlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("request_header", &self.request_header.is_some())
            .field("global_message", &self.global_message.is_some())
            .field("backend_error", &self.backend_error.is_some())
            .finish()
    }
}
