//! HTTP transport client implementation
//!
//! Implements `AsyncHttpClient` on top of a single long-lived
//! `reqwest::Client`, which owns the connection pool for the adapter's
//! whole lifetime.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::classify::{self, classify};
use crate::http::multipart;
use crate::http::proxy::ProxyConfig;
use crate::http::tls::TlsConfig;
use crate::traits::{
    AsyncHttpClient, HttpRequest, HttpResponse, Payload, PreparedRequest, RequestBody,
    RequestData, ResponseMode,
};
use async_trait::async_trait;
use futures::StreamExt;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client as ReqwestClient;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Options applied to one outgoing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOptions {
    /// Deadline for the whole exchange
    pub timeout: Duration,
    /// Verification flag; `None` when a CA bundle (or nothing) was configured
    pub verify: Option<bool>,
    /// Resolved proxy; `None` when no proxy is configured
    pub proxy: Option<Url>,
}

/// HTTP client adapter backed by reqwest
///
/// Handles:
/// - Proxy selection, resolved on every call
/// - TLS verification or a custom CA trust store
/// - Buffered multipart uploads
/// - Buffered, chunk-streamed, or deferred response bodies
/// - Translation of transport failures into `Error::Connection`
///
/// Calls take `&self` and may run concurrently; they share one pool.
#[derive(Debug)]
pub struct ReqwestHttpClient {
    client: Option<ReqwestClient>,
    proxy: Option<Arc<ProxyConfig>>,
    tls: Option<TlsConfig>,
    timeout: Duration,
}

impl ReqwestHttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the CA bundle cannot be loaded or the
    /// underlying client cannot be built
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host);

        if let Some(tls) = &config.verify_ssl {
            builder = tls.apply(builder)?;
        }

        let proxy = config.proxy.map(Arc::new);
        builder = match &proxy {
            Some(proxy) => builder.proxy(session_proxy(Arc::clone(proxy))),
            // Without an explicit proxy, ambient proxy variables are ignored
            None => builder.no_proxy(),
        };

        let client = builder
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build HTTP client: {e}")))?;

        tracing::debug!(
            "Created HTTP client (proxy configured: {}, tls: {:?})",
            proxy.is_some(),
            config.verify_ssl
        );

        Ok(Self {
            client: Some(client),
            proxy,
            tls: config.verify_ssl,
            timeout: config.timeout,
        })
    }

    /// Default timeout used by `AsyncHttpClient::request`
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Compute the options for one outgoing call.
    ///
    /// The proxy configuration is resolved here on every call.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the proxy mapping has no usable entry
    pub fn call_options(&self, timeout: Duration) -> Result<CallOptions> {
        let proxy = self
            .proxy
            .as_deref()
            .map(ProxyConfig::resolve_url)
            .transpose()?;
        Ok(CallOptions {
            timeout,
            verify: self.tls.as_ref().and_then(TlsConfig::verify_flag),
            proxy,
        })
    }

    fn session(&self) -> Result<&ReqwestClient> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::connection("HTTP client has been closed", false))
    }

    fn build_request(
        client: &ReqwestClient,
        prepared: PreparedRequest,
        options: &CallOptions,
    ) -> Result<reqwest::RequestBuilder> {
        let mut headers = HeaderMap::with_capacity(prepared.headers.len());
        for (key, value) in &prepared.headers {
            let name = HeaderName::from_bytes(key.as_bytes())?;
            // Names differing only in case collapse into one header
            if headers.contains_key(&name) {
                return Err(Error::InvalidRequest(format!(
                    "header {name} is set more than once"
                )));
            }
            headers.insert(name, HeaderValue::from_str(value)?);
        }

        let builder = client
            .request(prepared.method, &prepared.url)
            .headers(headers)
            .timeout(options.timeout);

        Ok(match prepared.body {
            RequestBody::Empty => builder,
            RequestBody::Json(json) => builder.json(&json),
            RequestBody::Data(RequestData::Bytes(bytes)) => builder.body(bytes),
            RequestBody::Data(RequestData::Form(fields)) => builder.form(&fields),
            // Content type was merged into the headers during preparation
            RequestBody::Multipart { bytes, .. } => builder.body(bytes),
        })
    }
}

/// Route every request through the resolved proxy, minus `NO_PROXY` exclusions.
fn session_proxy(config: Arc<ProxyConfig>) -> reqwest::Proxy {
    reqwest::Proxy::custom(move |_| config.resolve_url().ok())
        .no_proxy(reqwest::NoProxy::from_env())
}

async fn execute(request: reqwest::RequestBuilder, mode: ResponseMode) -> Result<HttpResponse> {
    let response = request.send().await.map_err(|e| classify(&e))?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    tracing::debug!("Received response with status: {}", status);

    match mode {
        ResponseMode::Buffered => {
            let text = response.text().await.map_err(|e| classify(&e))?;
            Ok(HttpResponse::new(status, Some(text), headers, None))
        }
        ResponseMode::Chunked(callback) => {
            let mut chunks = response.bytes_stream();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| classify(&e))?;
                tracing::trace!("Streaming chunk of {} bytes", chunk.len());
                catch_unwind(AssertUnwindSafe(|| callback(&chunk)))
                    .map_err(|_| classify::unexpected("chunk callback panicked"))?;
            }
            Ok(HttpResponse::new(status, None, headers, None))
        }
        // Releasing the connection is up to whoever reads the raw body
        ResponseMode::Deferred => Ok(HttpResponse::new(status, None, headers, Some(response))),
    }
}

#[async_trait]
impl AsyncHttpClient for ReqwestHttpClient {
    async fn prepare_request(&self, request: HttpRequest) -> Result<PreparedRequest> {
        let HttpRequest {
            method,
            url,
            mut headers,
            payload,
            files,
            mode,
        } = request;

        let body = if files.is_empty() {
            match payload {
                Payload::None => RequestBody::Empty,
                Payload::Data(data) => RequestBody::Data(data),
                Payload::Json(json) => RequestBody::Json(json),
            }
        } else {
            let fields = match payload {
                Payload::None => Vec::new(),
                Payload::Data(RequestData::Form(fields)) => fields,
                Payload::Data(RequestData::Bytes(_)) => {
                    return Err(Error::InvalidRequest(
                        "raw body data cannot be combined with file attachments".to_string(),
                    ));
                }
                Payload::Json(_) => {
                    tracing::debug!("Ignoring JSON payload in favor of multipart body");
                    Vec::new()
                }
            };

            let encoded = multipart::encode(self.session()?, &files, &fields).await?;
            headers.retain(|key, _| !key.eq_ignore_ascii_case("content-type"));
            headers.insert("Content-Type".to_string(), encoded.content_type.clone());
            RequestBody::Multipart {
                content_type: encoded.content_type,
                bytes: encoded.bytes,
            }
        };

        Ok(PreparedRequest {
            method,
            url,
            headers,
            body,
            mode,
        })
    }

    async fn send_request(
        &self,
        prepared: PreparedRequest,
        timeout: Duration,
    ) -> Result<HttpResponse> {
        let client = self.session()?;
        let options = self.call_options(timeout)?;

        tracing::debug!(
            "Sending {} request to {} (verify: {:?}, proxy: {:?})",
            prepared.method,
            prepared.url,
            options.verify,
            options.proxy.as_ref().map(Url::as_str)
        );

        let mode = prepared.mode.clone();
        let request = Self::build_request(client, prepared, &options)?;

        match tokio::time::timeout(timeout, execute(request, mode)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => {
                tracing::warn!("Request failed: {}", err);
                Err(err)
            }
            Err(_) => {
                let err = classify::deadline_elapsed(timeout);
                tracing::warn!("Request failed: {}", err);
                Err(err)
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.client.is_none()
    }

    async fn close(&mut self) -> Result<()> {
        if self.client.take().is_some() {
            tracing::debug!("Closed HTTP client");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_http_client_creation() {
        let client = ReqwestHttpClient::new().expect("Failed to create client");
        assert!(!client.is_closed());
        assert_eq!(client.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_call_options_without_verification_or_proxy() {
        let client = ReqwestHttpClient::with_config(ClientConfig::default().with_verify_ssl(false))
            .expect("Failed to create client");
        let options = client.call_options(Duration::from_secs(5)).unwrap();
        assert_eq!(options.verify, Some(false));
        assert_eq!(options.proxy, None);
        assert_eq!(options.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_call_options_defaults() {
        let client = ReqwestHttpClient::new().unwrap();
        let options = client.call_options(Duration::from_secs(1)).unwrap();
        assert_eq!(options.verify, None);
        assert_eq!(options.proxy, None);
    }

    #[test]
    fn test_call_options_resolve_proxy_mapping() {
        let mapping = HashMap::from([
            ("https".to_string(), "http://secure-proxy:8443".to_string()),
            ("http".to_string(), "http://plain-proxy:3128".to_string()),
        ]);
        let client =
            ReqwestHttpClient::with_config(ClientConfig::default().with_proxy(mapping)).unwrap();
        let options = client.call_options(Duration::from_secs(1)).unwrap();
        assert_eq!(options.proxy.unwrap().as_str(), "http://plain-proxy:3128/");
    }

    #[test]
    fn test_call_options_reject_unusable_mapping() {
        let mapping = HashMap::from([("ftp".to_string(), "http://p:21".to_string())]);
        let client =
            ReqwestHttpClient::with_config(ClientConfig::default().with_proxy(mapping)).unwrap();
        let err = client.call_options(Duration::from_secs(1)).unwrap_err();
        assert!(err.is_config());
    }

    #[tokio::test]
    async fn test_prepare_keeps_json_without_files() {
        let client = ReqwestHttpClient::new().unwrap();
        let payload = json!({"text": ["Hello"], "target_lang": "DE"});
        let request = HttpRequest::new(Method::POST, "https://example.test/v2/translate")
            .with_header("Authorization", "Bearer abc")
            .with_json(payload.clone());

        let prepared = client.prepare_request(request).await.unwrap();
        assert_eq!(prepared.json(), Some(&payload));
        assert_eq!(prepared.body, RequestBody::Json(payload));
        assert_eq!(prepared.get_header("authorization"), Some("Bearer abc"));
        assert_eq!(prepared.headers.len(), 1);
    }

    #[tokio::test]
    async fn test_prepare_keeps_data_without_files() {
        let client = ReqwestHttpClient::new().unwrap();
        let request =
            HttpRequest::new(Method::POST, "https://example.test/upload").with_body("raw bytes");

        let prepared = client.prepare_request(request).await.unwrap();
        assert_eq!(
            prepared.body,
            RequestBody::Data(RequestData::Bytes("raw bytes".into()))
        );
        assert!(prepared.json().is_none());
        assert!(!prepared.is_multipart());
    }

    #[tokio::test]
    async fn test_prepare_files_force_multipart() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(Method::POST, "https://example.test/v2/document")
            .with_header("content-type", "application/json")
            .with_json(json!({"ignored": true}))
            .with_file("file", "document body");

        let prepared = client.prepare_request(request).await.unwrap();
        assert!(prepared.is_multipart());
        assert!(prepared.json().is_none());

        let content_type = prepared.get_header("Content-Type").unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
        assert_eq!(
            prepared
                .headers
                .keys()
                .filter(|k| k.eq_ignore_ascii_case("content-type"))
                .count(),
            1
        );

        let RequestBody::Multipart { bytes, .. } = &prepared.body else {
            panic!("expected multipart body");
        };
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("document body"));
        assert!(!body.contains("ignored"));
    }

    #[tokio::test]
    async fn test_prepare_fields_alongside_files() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(Method::POST, "https://example.test/v2/document")
            .with_field("target_lang", "DE")
            .with_field("formality", "more")
            .with_file("file", "Hallo");

        let prepared = client.prepare_request(request).await.unwrap();
        let RequestBody::Multipart { bytes, content_type } = &prepared.body else {
            panic!("expected multipart body");
        };
        assert_eq!(prepared.get_header("content-type"), Some(content_type.as_str()));

        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains(r#"name="file"; filename="file""#));
        assert!(body.contains(r#"name="target_lang""#));
        assert!(body.contains(r#"name="formality""#));
        assert!(body.find("Hallo").unwrap() < body.find("target_lang").unwrap());
    }

    #[tokio::test]
    async fn test_prepare_rejects_raw_data_with_files() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(Method::POST, "https://example.test/v2/document")
            .with_body("raw")
            .with_file("file", "content");

        let err = client.prepare_request(request).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_invalid_header_is_rejected() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(Method::GET, "http://127.0.0.1:1/")
            .with_header("bad header", "value");
        let err = client
            .request(request, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_header_names_differing_in_case_are_rejected() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(Method::GET, "http://127.0.0.1:1/")
            .with_header("Authorization", "Bearer one")
            .with_header("authorization", "Bearer two");
        let err = client
            .request(request, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert!(err.to_string().contains("authorization"));
    }

    #[tokio::test]
    async fn test_multipart_preparation_ignores_url() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::new(Method::POST, "::not a url").with_file("file", "content");
        let prepared = client.prepare_request(request).await.unwrap();
        assert!(prepared.is_multipart());

        // The bad URL surfaces at send time, the same as for any other body
        let err = client
            .send_request(prepared, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection { should_retry: false, .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_final() {
        let mut client = ReqwestHttpClient::new().unwrap();
        client.close().await.unwrap();
        assert!(client.is_closed());
        client.close().await.unwrap();

        let request = HttpRequest::new(Method::GET, "http://127.0.0.1:1/");
        let err = client
            .request(request, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Connection { should_retry: false, .. }));
    }
}
