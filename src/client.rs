//! Envelope-aware request pipeline over `reqwest`.
//!
//! [`ApiClient`] owns an HTTP client plus the immutable hook configuration
//! captured at construction. Every verb helper builds a [`RequestConfig`]
//! and delegates to [`ApiClient::request`], which runs the interceptor
//! stages: merge defaults, request-header handler, send, classify, envelope
//! code check.

use crate::config::{Defaults, RequestConfig};
use crate::error::{Error, Result, classify_send_error, classify_status};
use crate::handlers::Handlers;
use crate::headers;
use crate::interceptor::{Interceptors, ResponseContext};
use crate::streaming::{self, StreamCallbacks, StreamOutcome, StreamRequest};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

/// Envelope-aware HTTP client.
///
/// Cheap to clone; all configuration is immutable after
/// [`ApiClientBuilder::build`] and concurrent calls share no mutable state.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    defaults: Defaults,
    handlers: Handlers,
    interceptors: Interceptors,
}

/// Builder for [`ApiClient`].
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: String,
    handlers: Handlers,
    interceptors: Interceptors,
    http: Option<reqwest::Client>,
    default_headers: HashMap<String, String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    defaults: Defaults,
}

impl ApiClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Register the long-lived handler hooks.
    pub fn handlers(mut self, handlers: Handlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Override individual pipeline stages.
    pub fn interceptors(mut self, interceptors: Interceptors) -> Self {
        self.interceptors = interceptors;
        self
    }

    /// Supply an externally configured `reqwest::Client`. When set, the
    /// builder's `default_header`/`timeout`/`user_agent` knobs are ignored.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.http = Some(client);
        self
    }

    /// Header sent with every request built by the internal client.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Client-wide default for [`RequestConfig::show_global_message`].
    pub fn show_global_message(mut self, on: bool) -> Self {
        self.defaults.show_global_message = on;
        self
    }

    /// Client-wide default for [`RequestConfig::success_code`].
    pub fn success_code(mut self, code: i64) -> Self {
        self.defaults.success_code = code;
        self
    }

    /// Client-wide default for [`RequestConfig::enable_code_check`].
    pub fn enable_code_check(mut self, on: bool) -> Self {
        self.defaults.enable_code_check = on;
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let http = match self.http {
            Some(client) => client,
            None => {
                let mut builder = reqwest::Client::builder();
                if !self.default_headers.is_empty() {
                    builder = builder.default_headers(headers::header_map(&self.default_headers)?);
                }
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                if let Some(user_agent) = &self.user_agent {
                    builder = builder.user_agent(user_agent);
                }
                builder.build().map_err(|e| {
                    Error::Configuration(format!("failed to build http client: {e}"))
                })?
            }
        };

        Ok(ApiClient {
            http,
            base_url: self.base_url,
            defaults: self.defaults,
            handlers: self.handlers,
            interceptors: self.interceptors,
        })
    }
}

impl ApiClient {
    pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
        ApiClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The underlying `reqwest::Client`.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    /// Run a request through the pipeline and deserialize the unwrapped
    /// envelope `data` into `T`.
    pub async fn request<T: DeserializeOwned>(&self, config: RequestConfig) -> Result<T> {
        let value = self.request_value(config).await?;
        serde_json::from_value(value)
            .map_err(|e| Error::Parse(format!("failed to decode response data: {e}")))
    }

    /// GET without query parameters; use [`RequestConfig::query`] with
    /// [`ApiClient::request`] when parameters are needed.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(RequestConfig::get(path)).await
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: impl Serialize) -> Result<T> {
        let body = match serde_json::to_value(body) {
            Ok(value) => value,
            Err(e) => {
                return Err(self.reject_request(Error::Parse(format!(
                    "failed to serialize request body: {e}"
                ))));
            }
        };
        self.request(RequestConfig::post(path).json(body)).await
    }

    pub async fn put<T: DeserializeOwned>(&self, path: &str, body: impl Serialize) -> Result<T> {
        let body = match serde_json::to_value(body) {
            Ok(value) => value,
            Err(e) => {
                return Err(self.reject_request(Error::Parse(format!(
                    "failed to serialize request body: {e}"
                ))));
            }
        };
        self.request(RequestConfig::put(path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(RequestConfig::delete(path)).await
    }

    /// Like [`ApiClient::request`] but returns the unwrapped `data` as raw
    /// JSON.
    pub async fn request_value(&self, config: RequestConfig) -> Result<serde_json::Value> {
        // 1. Request stage (merge defaults + header handler, or override)
        let config = match self.run_request_stage(config) {
            Ok(config) => config,
            Err(error) => return Err(self.reject_request(error)),
        };

        let url = join_url(&self.base_url, &config.url);
        let request_id = generate_request_id();
        let show_global = config
            .show_global_message
            .unwrap_or(self.defaults.show_global_message);
        tracing::debug!(target: "reqkit::http", request_id = %request_id, method = %config.method, url = %url, "sending request");

        // 2. Build the outbound request; construction errors are setup
        // errors and go through the request-rejected hook.
        let builder = match self.build_request(&config, &url) {
            Ok(builder) => builder,
            Err(error) => return Err(self.reject_request(error)),
        };

        // 3. Send, observing the cancellation token between suspension
        // points.
        let response = match send(builder, config.cancel.as_ref(), &url).await {
            Ok(response) => response,
            Err(error) => return Err(self.reject_response(error, show_global, &request_id)),
        };

        // 4. Non-2xx: classify into the fixed message table.
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status.as_u16(), &url, body);
            return Err(self.reject_response(error, show_global, &request_id));
        }

        // 5. Decode the body as JSON.
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                let error = Error::Unknown(format!("failed to read response body: {e}"));
                return Err(self.reject_response(error, show_global, &request_id));
            }
        };
        let body: serde_json::Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                let error = Error::Parse(format!("response body is not valid JSON: {e}"));
                return Err(self.reject_response(error, show_global, &request_id));
            }
        };
        tracing::debug!(target: "reqkit::http", request_id = %request_id, status = status.as_u16(), "response received");

        // 6. Response stage (envelope code check, or override).
        self.run_response_stage(ResponseContext {
            status: status.as_u16(),
            url,
            body,
            config,
        })
    }

    /// Issue a streaming request against this client's base url; see
    /// [`crate::streaming`].
    pub async fn stream(
        &self,
        request: StreamRequest,
        callbacks: StreamCallbacks,
    ) -> Result<StreamOutcome> {
        streaming::execute_stream(&self.http, &self.base_url, request, callbacks).await
    }

    fn run_request_stage(&self, config: RequestConfig) -> Result<RequestConfig> {
        if let Some(hook) = &self.interceptors.request_on_fulfilled {
            return hook(config);
        }
        let merged = config.merge_defaults(&self.defaults);
        match &self.handlers.request_header {
            Some(hook) => hook(merged),
            None => Ok(merged),
        }
    }

    fn reject_request(&self, error: Error) -> Error {
        match &self.interceptors.request_on_rejected {
            Some(hook) => hook(error),
            None => error,
        }
    }

    fn reject_response(&self, error: Error, show_global: bool, request_id: &str) -> Error {
        if let Some(hook) = &self.interceptors.response_on_rejected {
            return hook(error);
        }
        tracing::debug!(target: "reqkit::http", request_id = %request_id, error = %error, "request failed");
        if show_global && let Some(hook) = &self.handlers.global_message {
            hook(&error.user_message());
        }
        error
    }

    fn run_response_stage(&self, ctx: ResponseContext) -> Result<serde_json::Value> {
        if let Some(hook) = &self.interceptors.response_on_fulfilled {
            return hook(ctx);
        }

        let ResponseContext { body, config, .. } = ctx;
        let code = body
            .get("code")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| Error::Parse("response is missing a numeric 'code' field".into()))?;
        let message = body
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        let enable_check = config
            .enable_code_check
            .unwrap_or(self.defaults.enable_code_check);
        let success_code = config.success_code.unwrap_or(self.defaults.success_code);

        if !enable_check || code == success_code {
            return Ok(body.get("data").cloned().unwrap_or(serde_json::Value::Null));
        }

        // Business failure: the backend-error hook wins over the global
        // message path; exactly one of the two fires.
        let resolved = if message.is_empty() {
            format!("Request failed, business code: {code}")
        } else {
            message.to_string()
        };
        if let Some(hook) = &self.handlers.backend_error {
            hook(code, message);
        } else if config
            .show_global_message
            .unwrap_or(self.defaults.show_global_message)
            && let Some(hook) = &self.handlers.global_message
        {
            hook(&resolved);
        }
        Err(Error::Business {
            code,
            message: resolved,
            envelope: body,
        })
    }

    fn build_request(&self, config: &RequestConfig, url: &str) -> Result<reqwest::RequestBuilder> {
        let mut builder = self.http.request(config.method.clone(), url);
        if !config.headers.is_empty() {
            builder = builder.headers(headers::header_map(&config.headers)?);
        }
        if !config.params.is_empty() {
            builder = builder.query(&config.params);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &config.body {
            builder = builder.json(body);
        }
        Ok(builder)
    }
}

async fn send(
    builder: reqwest::RequestBuilder,
    cancel: Option<&tokio_util::sync::CancellationToken>,
    url: &str,
) -> Result<reqwest::Response> {
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = builder.send() => result.map_err(|e| classify_send_error(e, url)),
            }
        }
        None => builder
            .send()
            .await
            .map_err(|e| classify_send_error(e, url)),
    }
}

/// Join a path onto a base url; absolute `http(s)://` paths pass through.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub(crate) fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_handles_slashes_and_absolute_paths() {
        assert_eq!(join_url("http://a.test", "/x"), "http://a.test/x");
        assert_eq!(join_url("http://a.test/", "x"), "http://a.test/x");
        assert_eq!(join_url("http://a.test/", "/x/y"), "http://a.test/x/y");
        assert_eq!(join_url("http://a.test", ""), "http://a.test");
        assert_eq!(
            join_url("http://a.test", "https://b.test/z"),
            "https://b.test/z"
        );
    }
}
