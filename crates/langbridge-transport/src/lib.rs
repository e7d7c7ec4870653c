//! Async HTTP client adapter for langbridge
//!
//! Translates the SDK's generic request/response model into calls against
//! reqwest. The SDK layer hands over an `HttpRequest`; the adapter prepares
//! it, executes it with a timeout, and hands back an `HttpResponse` or a
//! typed `Error`.
//!
//! # Architecture
//!
//! - **AsyncHttpClient trait**: `prepare_request`, `send_request`, `close`
//! - **ReqwestHttpClient**: the reqwest-backed implementation
//! - **Error handling**: configuration errors plus one connection error kind
//!   carrying an advisory retry flag

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```ignore
//! use langbridge_transport::{AsyncHttpClient, ClientConfig, HttpRequest, ReqwestHttpClient};
//! use std::time::Duration;
//!
//! let client = ReqwestHttpClient::with_config(ClientConfig::default().with_verify_ssl(false))?;
//! let request = HttpRequest::new(http::Method::GET, "https://api.example.com/v2/usage");
//! let response = client.request(request, Duration::from_secs(10)).await?;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use crate::http::{CallOptions, ProxyConfig, ReqwestHttpClient, TlsConfig};
pub use traits::{
    AsyncHttpClient, ChunkCallback, FileAttachment, HttpRequest, HttpResponse, Payload,
    PreparedRequest, RequestBody, RequestData, ResponseMode,
};
