//! HTTP transport implementation
//!
//! Provides the reqwest-backed `AsyncHttpClient`.
//! Handles proxy selection, TLS settings, multipart bodies, streaming, and
//! failure translation.

pub mod classify;
pub mod client;
pub mod multipart;
pub mod proxy;
pub mod tls;

pub use client::{CallOptions, ReqwestHttpClient};
pub use proxy::ProxyConfig;
pub use tls::TlsConfig;
