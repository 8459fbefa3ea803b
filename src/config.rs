//! Per-call request configuration and client-wide defaults.

use reqwest::Method;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default business success code used when neither the call nor the client
/// overrides it.
pub const DEFAULT_SUCCESS_CODE: i64 = 10_000;

/// Client-wide defaults for the business extensions of [`RequestConfig`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct Defaults {
    pub show_global_message: bool,
    pub success_code: i64,
    pub enable_code_check: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            show_global_message: true,
            success_code: DEFAULT_SUCCESS_CODE,
            enable_code_check: true,
        }
    }
}

/// Configuration for a single request.
///
/// Constructed per call, merged over the client defaults (call-specific
/// values win), consumed by the pipeline and discarded afterwards. `url` may
/// be a path joined onto the client's base url, or an absolute `http(s)://`
/// url used as-is.
#[derive(Clone, Debug, Default)]
pub struct RequestConfig {
    pub url: String,
    pub method: Method,
    pub headers: HashMap<String, String>,
    pub params: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
    pub cancel: Option<CancellationToken>,
    /// Surface failures through the global message hook. Defaults to `true`.
    pub show_global_message: Option<bool>,
    /// Envelope code that counts as business success. Defaults to `10000`.
    pub success_code: Option<i64>,
    /// Compare the envelope code at all. Defaults to `true`.
    pub enable_code_check: Option<bool>,
}

impl RequestConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::GET)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::POST)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::PUT)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(url).method(Method::DELETE)
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Add a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Set the JSON request body.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach an external cancellation token observed while the request is
    /// in flight.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn show_global_message(mut self, on: bool) -> Self {
        self.show_global_message = Some(on);
        self
    }

    pub fn success_code(mut self, code: i64) -> Self {
        self.success_code = Some(code);
        self
    }

    pub fn enable_code_check(mut self, on: bool) -> Self {
        self.enable_code_check = Some(on);
        self
    }

    /// Fill unset business extensions from the client defaults.
    pub(crate) fn merge_defaults(mut self, defaults: &Defaults) -> Self {
        self.show_global_message
            .get_or_insert(defaults.show_global_message);
        self.success_code.get_or_insert(defaults.success_code);
        self.enable_code_check
            .get_or_insert(defaults.enable_code_check);
        self
    }
}
