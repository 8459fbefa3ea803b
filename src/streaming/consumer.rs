//! Streaming response consumer.
//!
//! Issues a single streaming HTTP request and folds the body into text:
//! bytes are decoded incrementally (multi-byte sequences split across reads
//! are buffered, never broken), split into lines, and interpreted with an
//! SSE-like framing convention. `data: `-prefixed payloads may be JSON (fed
//! through an optional projection) or plain text; bare lines are carried
//! verbatim; a `data: [DONE]` line ends the stream. Each call owns its own
//! accumulation buffer and cancellation token; nothing is shared between
//! concurrent streams.

use crate::client::{generate_request_id, join_url};
use crate::error::{Error, Result, classify_send_error, classify_status};
use crate::headers;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Projection applied to JSON-framed payloads to obtain the text to append.
/// Returning `None` appends nothing for that line.
pub type ExtractContentFn = dyn Fn(&serde_json::Value) -> Option<String> + Send + Sync;

/// Configuration for one streaming request.
#[derive(Clone)]
pub struct StreamRequest {
    pub url: String,
    /// Defaults to POST.
    pub method: Method,
    /// Overrides the client's base url for this call.
    pub base_url: Option<String>,
    pub headers: HashMap<String, String>,
    /// JSON-serialized request body.
    pub body: Option<serde_json::Value>,
    /// External cancellation token; the consumer creates and owns its own
    /// when absent.
    pub cancel: Option<CancellationToken>,
    pub extract_content: Option<Arc<ExtractContentFn>>,
}

impl StreamRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::POST,
            base_url: None,
            headers: HashMap::new(),
            body: None,
            cancel: None,
            extract_content: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn extract_content<F>(mut self, f: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Option<String> + Send + Sync + 'static,
    {
        self.extract_content = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for StreamRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRequest")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("extract_content", &self.extract_content.is_some())
            .finish()
    }
}

/// Caller-supplied stream callbacks; each is optional.
#[derive(Default)]
pub struct StreamCallbacks {
    on_start: Option<Box<dyn FnMut() + Send>>,
    on_message: Option<Box<dyn FnMut(&str, &str) + Send>>,
    on_complete: Option<Box<dyn FnMut(&str) + Send>>,
    on_error: Option<Box<dyn FnMut(&Error) + Send>>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked once before the request is issued.
    pub fn on_start<F>(mut self, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_start = Some(Box::new(f));
        self
    }

    /// Invoked per appended chunk with `(content, full_text)`.
    pub fn on_message<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str, &str) + Send + 'static,
    {
        self.on_message = Some(Box::new(f));
        self
    }

    /// Invoked once with the accumulated text when the stream ends.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Invoked exactly once on any failure, before the call rejects.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Error) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }
}

/// Result of a completed stream.
#[derive(Debug)]
pub struct StreamOutcome {
    pub full_text: String,
    cancel: CancellationToken,
}

impl StreamOutcome {
    /// Cancel the token owned by this stream call. The in-flight loop has
    /// already finished by the time the outcome exists; to abort mid-flight,
    /// pass an external token via [`StreamRequest::cancel_token`] and cancel
    /// that.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

pub(crate) async fn execute_stream(
    http: &reqwest::Client,
    default_base_url: &str,
    request: StreamRequest,
    mut callbacks: StreamCallbacks,
) -> Result<StreamOutcome> {
    let cancel = request.cancel.clone().unwrap_or_default();
    match run(http, default_base_url, &request, &mut callbacks, &cancel).await {
        Ok(full_text) => {
            if let Some(f) = callbacks.on_complete.as_mut() {
                f(&full_text);
            }
            Ok(StreamOutcome { full_text, cancel })
        }
        Err(error) => {
            if let Some(f) = callbacks.on_error.as_mut() {
                f(&error);
            }
            Err(error)
        }
    }
}

async fn run(
    http: &reqwest::Client,
    default_base_url: &str,
    request: &StreamRequest,
    callbacks: &mut StreamCallbacks,
    cancel: &CancellationToken,
) -> Result<String> {
    if let Some(f) = callbacks.on_start.as_mut() {
        f();
    }

    let base = request.base_url.as_deref().unwrap_or(default_base_url);
    let url = join_url(base, &request.url);
    let request_id = generate_request_id();
    tracing::debug!(target: "reqkit::stream", request_id = %request_id, method = %request.method, url = %url, "starting streaming request");

    // Default headers first; caller headers win on name collision.
    let mut base_headers = HeaderMap::new();
    base_headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
    if request.body.is_some() {
        base_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    let effective_headers = headers::merge_headers(base_headers, &request.headers);

    let mut builder = http
        .request(request.method.clone(), &url)
        .headers(effective_headers);
    if let Some(body) = &request.body {
        builder = builder.json(body);
    }

    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(Error::Cancelled),
        result = builder.send() => result.map_err(|e| classify_send_error(e, &url))?,
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_status(status.as_u16(), &url, body));
    }

    let byte_stream = response
        .bytes_stream()
        .map_err(|e| std::io::Error::other(format!("stream error: {e}")));

    let full_text = consume_byte_stream(
        byte_stream,
        request.extract_content.as_deref(),
        callbacks,
        cancel,
        &request_id,
    )
    .await?;

    tracing::debug!(target: "reqkit::stream", request_id = %request_id, chars = full_text.len(), "stream complete");
    Ok(full_text)
}

/// Fold a byte stream into accumulated text, honoring the `data: ` framing
/// convention. Line decoding buffers both partial lines and multi-byte
/// sequences split across reads.
async fn consume_byte_stream<S, B>(
    byte_stream: S,
    extract_content: Option<&ExtractContentFn>,
    callbacks: &mut StreamCallbacks,
    cancel: &CancellationToken,
    request_id: &str,
) -> Result<String>
where
    S: futures_util::Stream<Item = std::io::Result<B>> + Send,
    B: bytes::Buf,
{
    let reader = StreamReader::new(Box::pin(byte_stream));
    let mut lines = Box::pin(FramedRead::new(reader, LinesCodec::new()));

    let mut full_text = String::new();
    loop {
        // Cancellation is observed between reads; a pending read wakes when
        // the token fires.
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            item = lines.next() => item,
        };
        let Some(item) = next else { break };
        let line =
            item.map_err(|e| Error::Stream(format!("failed to decode stream line: {e}")))?;
        if line.trim().is_empty() {
            continue;
        }

        let content = if line.starts_with(DATA_PREFIX) {
            let payload = line[DATA_PREFIX.len()..].trim();
            if payload == DONE_MARKER {
                tracing::trace!(target: "reqkit::stream", request_id = %request_id, "done marker received");
                break;
            }
            payload_text(payload, extract_content)
        } else {
            // No SSE framing: carry the line as plain text.
            line
        };

        if !content.is_empty() {
            full_text.push_str(&content);
            if let Some(f) = callbacks.on_message.as_mut() {
                f(&content, &full_text);
            }
        }
    }

    Ok(full_text)
}

/// Text to append for one `data: ` payload: a fallible JSON parse decides
/// between the JSON branch (with optional projection) and plain text.
fn payload_text(payload: &str, extract_content: Option<&ExtractContentFn>) -> String {
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => match extract_content {
            Some(f) => f(&value).unwrap_or_default(),
            None => json_value_text(&value),
        },
        Err(_) => payload.to_string(),
    }
}

/// String form of a JSON value: strings verbatim, everything else serialized.
fn json_value_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
