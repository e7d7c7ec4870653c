//! Request/response model and the client capability trait
//!
//! Defines the generic request descriptor handed down by the SDK layer, the
//! prepared request derived from it, the response handed back, and the
//! `AsyncHttpClient` trait every transport variant implements.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Callback invoked once per received body chunk, in arrival order.
pub type ChunkCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Non-JSON request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestData {
    /// Raw body bytes, sent as-is
    Bytes(Bytes),
    /// Plain form fields, url-encoded (or multipart parts when files are attached)
    Form(Vec<(String, String)>),
}

/// Request payload. JSON and data are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// No payload
    #[default]
    None,
    /// Raw bytes or form fields
    Data(RequestData),
    /// JSON document
    Json(serde_json::Value),
}

/// A file attached to a multipart upload.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttachment {
    /// Form field name of the part
    pub field: String,
    /// File content
    pub content: Bytes,
}

/// How the response body is handled once headers arrive.
#[derive(Clone, Default)]
pub enum ResponseMode {
    /// Decode the whole body into text
    #[default]
    Buffered,
    /// Leave the body unread; the caller consumes it via the raw handle
    Deferred,
    /// Feed each body chunk to the callback, buffering nothing
    Chunked(ChunkCallback),
}

impl fmt::Debug for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffered => write!(f, "Buffered"),
            Self::Deferred => write!(f, "Deferred"),
            Self::Chunked(_) => write!(f, "Chunked(<callback>)"),
        }
    }
}

/// HTTP request descriptor
///
/// Represents an HTTP request as described by the SDK layer, before any body
/// encoding has happened.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,

    /// Request URL
    pub url: String,

    /// Request headers
    pub headers: HashMap<String, String>,

    /// Request payload
    pub payload: Payload,

    /// File attachments, in insertion order
    pub files: Vec<FileAttachment>,

    /// Response body handling
    pub mode: ResponseMode,
}

impl HttpRequest {
    /// Create a new HTTP request
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            payload: Payload::None,
            files: Vec::new(),
            mode: ResponseMode::Buffered,
        }
    }

    /// Add a header to the request
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set a JSON payload, replacing any data payload
    pub fn with_json(mut self, json: serde_json::Value) -> Self {
        self.payload = Payload::Json(json);
        self
    }

    /// Set a raw body, replacing any JSON payload
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.payload = Payload::Data(RequestData::Bytes(body.into()));
        self
    }

    /// Add a plain form field, replacing any JSON or raw payload
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let field = (name.into(), value.into());
        match &mut self.payload {
            Payload::Data(RequestData::Form(fields)) => fields.push(field),
            _ => self.payload = Payload::Data(RequestData::Form(vec![field])),
        }
        self
    }

    /// Attach a file under the given form field name
    pub fn with_file(mut self, field: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.files.push(FileAttachment {
            field: field.into(),
            content: content.into(),
        });
        self
    }

    /// Leave the response body unread (`true`) or buffer it (`false`).
    ///
    /// Has no effect once a chunk callback is set.
    pub fn with_stream(mut self, stream: bool) -> Self {
        match (&self.mode, stream) {
            (ResponseMode::Chunked(_), _) => {}
            (_, true) => self.mode = ResponseMode::Deferred,
            (_, false) => self.mode = ResponseMode::Buffered,
        }
        self
    }

    /// Stream the response body through a per-chunk callback
    pub fn with_chunk_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[u8]) + Send + Sync + 'static,
    {
        self.mode = ResponseMode::Chunked(Arc::new(callback));
        self
    }
}

/// Finalized request body.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// No body
    Empty,
    /// JSON document, serialized at send time
    Json(serde_json::Value),
    /// Raw bytes or url-encoded form fields
    Data(RequestData),
    /// Fully serialized multipart body
    Multipart {
        /// `multipart/form-data; boundary=...`
        content_type: String,
        /// Encoded parts
        bytes: Bytes,
    },
}

/// A request with its body finalized and headers merged, ready to send.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    /// HTTP method
    pub method: Method,
    /// Request URL
    pub url: String,
    /// Headers, including any generated by body encoding
    pub headers: HashMap<String, String>,
    /// Finalized body
    pub body: RequestBody,
    /// Response body handling
    pub mode: ResponseMode,
}

impl PreparedRequest {
    /// JSON payload, if the body is JSON.
    ///
    /// Always `None` for multipart bodies.
    pub fn json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            RequestBody::Json(json) => Some(json),
            _ => None,
        }
    }

    /// Check if the body is multipart-encoded
    pub fn is_multipart(&self) -> bool {
        matches!(self.body, RequestBody::Multipart { .. })
    }

    /// Get a header value by name (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP response
///
/// A 4xx or 5xx status is still a successful exchange and comes back here.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Decoded body; `None` when the body was streamed or deferred
    pub text: Option<String>,

    /// Response headers
    pub headers: HeaderMap,

    raw: Option<reqwest::Response>,
}

impl HttpResponse {
    /// Create a new HTTP response
    pub fn new(
        status: u16,
        text: Option<String>,
        headers: HeaderMap,
        raw: Option<reqwest::Response>,
    ) -> Self {
        Self {
            status,
            text,
            headers,
            raw,
        }
    }

    /// Check if response is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response is an error (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    /// Get a header value by name (case-insensitive)
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Parse the decoded body as JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the body was not buffered or is not valid JSON for `T`
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(self.text.as_deref().unwrap_or_default())
    }

    /// Underlying response handle, present only when the body was deferred
    pub fn raw(&self) -> Option<&reqwest::Response> {
        self.raw.as_ref()
    }

    /// Take the underlying response handle to consume a deferred body.
    ///
    /// The caller is responsible for reading it to completion (or dropping
    /// it) so the connection returns to the pool.
    pub fn into_raw(self) -> Option<reqwest::Response> {
        self.raw
    }
}

/// Capability set shared by every HTTP transport variant.
#[async_trait]
pub trait AsyncHttpClient: Send + Sync {
    /// Finalize the body and headers of a request descriptor
    async fn prepare_request(&self, request: HttpRequest) -> Result<PreparedRequest>;

    /// Execute a prepared request within `timeout`
    async fn send_request(
        &self,
        prepared: PreparedRequest,
        timeout: Duration,
    ) -> Result<HttpResponse>;

    /// Prepare and send in one step
    async fn request(&self, request: HttpRequest, timeout: Duration) -> Result<HttpResponse> {
        let prepared = self.prepare_request(request).await?;
        self.send_request(prepared, timeout).await
    }

    /// Check if the client has been closed
    fn is_closed(&self) -> bool;

    /// Release the underlying session and its pooled connections
    async fn close(&mut self) -> Result<()>;
}
