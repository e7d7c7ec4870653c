//! Configuration for the HTTP client adapter

use crate::error::{Error, Result};
use crate::http::proxy::ProxyConfig;
use crate::http::tls::TlsConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding a proxy URL or a JSON scheme mapping
pub const ENV_PROXY: &str = "LANGBRIDGE_PROXY";
/// Environment variable holding `true`/`false` or a CA bundle path
pub const ENV_VERIFY_SSL: &str = "LANGBRIDGE_VERIFY_SSL";
/// Environment variable holding the default timeout in seconds
pub const ENV_TIMEOUT: &str = "LANGBRIDGE_TIMEOUT";

/// Construction-time configuration for `ReqwestHttpClient`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicit proxy; `None` also disables ambient proxy environment variables
    pub proxy: Option<ProxyConfig>,

    /// TLS verification; `None` keeps the platform default
    pub verify_ssl: Option<TlsConfig>,

    /// Default timeout for `AsyncHttpClient::request`
    pub timeout: Duration,

    /// Connection timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections per host
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            verify_ssl: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
        }
    }
}

impl ClientConfig {
    /// Set the proxy
    pub fn with_proxy(mut self, proxy: impl Into<ProxyConfig>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Set TLS verification
    pub fn with_verify_ssl(mut self, verify_ssl: impl Into<TlsConfig>) -> Self {
        self.verify_ssl = Some(verify_ssl.into());
        self
    }

    /// Set the default timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// This will look for:
    /// - `LANGBRIDGE_PROXY`: a proxy URL, or a JSON object such as
    ///   `{"http": "http://proxy:3128"}`
    /// - `LANGBRIDGE_VERIFY_SSL`: `true`, `false`, `1`, `0`, or a CA bundle path
    /// - `LANGBRIDGE_TIMEOUT`: default timeout in seconds
    pub fn from_env() -> Result<Self> {
        use std::env;

        let mut config = Self::default();

        if let Ok(proxy) = env::var(ENV_PROXY) {
            config.proxy = Some(parse_proxy(&proxy)?);
        }

        if let Ok(verify) = env::var(ENV_VERIFY_SSL) {
            config.verify_ssl = Some(parse_verify_ssl(&verify));
        }

        if let Ok(timeout) = env::var(ENV_TIMEOUT) {
            let secs = timeout
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|s| s.is_finite() && *s > 0.0)
                .ok_or_else(|| {
                    Error::InvalidConfig(format!(
                        "{ENV_TIMEOUT} must be a positive number of seconds"
                    ))
                })?;
            config.timeout = Duration::try_from_secs_f64(secs).map_err(|e| {
                Error::InvalidConfig(format!("{ENV_TIMEOUT} is out of range: {e}"))
            })?;
        }

        Ok(config)
    }
}

fn parse_proxy(raw: &str) -> Result<ProxyConfig> {
    let raw = raw.trim();
    if raw.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(raw)
            .map_err(|e| Error::InvalidConfig(format!("{ENV_PROXY} is not valid JSON: {e}")))?;
        ProxyConfig::try_from(value)
    } else {
        Ok(ProxyConfig::Url(raw.to_string()))
    }
}

fn parse_verify_ssl(raw: &str) -> TlsConfig {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => TlsConfig::Verify(true),
        "false" | "0" => TlsConfig::Verify(false),
        _ => TlsConfig::CaBundle(PathBuf::from(raw.trim())),
    }
}
