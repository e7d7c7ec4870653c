//! Proxy configuration and per-call resolution

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Proxy configuration supplied at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyConfig {
    /// One proxy URL for every request
    Url(String),
    /// Proxy URLs keyed by scheme (`"http"`, `"https"`)
    ByScheme(HashMap<String, String>),
}

impl ProxyConfig {
    /// Pick the proxy URL for an outgoing call.
    ///
    /// A scheme mapping prefers `"http"` and falls back to `"https"`.
    pub fn resolve(&self) -> Result<&str> {
        match self {
            Self::Url(url) => Ok(url),
            Self::ByScheme(map) => map
                .get("http")
                .or_else(|| map.get("https"))
                .map(String::as_str)
                .ok_or_else(|| {
                    Error::InvalidConfig(
                        "proxy mapping must contain an \"http\" or \"https\" key".to_string(),
                    )
                }),
        }
    }

    /// Resolve and parse the proxy URL.
    pub fn resolve_url(&self) -> Result<Url> {
        let raw = self.resolve()?;
        Url::parse(raw).map_err(|e| Error::InvalidConfig(format!("invalid proxy URL {raw:?}: {e}")))
    }
}

impl From<&str> for ProxyConfig {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for ProxyConfig {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<HashMap<String, String>> for ProxyConfig {
    fn from(map: HashMap<String, String>) -> Self {
        Self::ByScheme(map)
    }
}

impl TryFrom<Value> for ProxyConfig {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(url) => Ok(Self::Url(url)),
            Value::Object(map) => map
                .into_iter()
                .map(|(scheme, url)| match url {
                    Value::String(url) => Ok((scheme, url)),
                    other => Err(Error::InvalidConfig(format!(
                        "proxy URL for {scheme:?} must be a string, got {other}"
                    ))),
                })
                .collect::<Result<HashMap<_, _>>>()
                .map(Self::ByScheme),
            other => Err(Error::InvalidConfig(format!(
                "proxy must be a URL string or a scheme mapping, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn mapping(entries: &[(&str, &str)]) -> ProxyConfig {
        ProxyConfig::ByScheme(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[rstest]
    #[case(&[("http", "http://h:1")], "http://h:1")]
    #[case(&[("https", "http://s:2")], "http://s:2")]
    #[case(&[("https", "http://s:2"), ("http", "http://h:1")], "http://h:1")]
    fn test_mapping_resolution(#[case] entries: &[(&str, &str)], #[case] expected: &str) {
        assert_eq!(mapping(entries).resolve().unwrap(), expected);
    }

    #[rstest]
    #[case(&[])]
    #[case(&[("socks5", "socks5://p:1080")])]
    #[case(&[("HTTP", "http://h:1")])]
    fn test_mapping_without_known_scheme(#[case] entries: &[(&str, &str)]) {
        assert!(mapping(entries).resolve().unwrap_err().is_config());
    }

    #[test]
    fn test_single_url() {
        let config = ProxyConfig::from("http://proxy.local:3128");
        assert_eq!(config.resolve().unwrap(), "http://proxy.local:3128");
        assert_eq!(config.resolve_url().unwrap().port(), Some(3128));
    }

    #[test]
    fn test_unparsable_url() {
        let config = ProxyConfig::from("not a url");
        assert!(config.resolve_url().unwrap_err().is_config());
    }

    #[rstest]
    #[case(json!(8080))]
    #[case(json!(true))]
    #[case(json!(["http://h:1"]))]
    #[case(json!(null))]
    #[case(json!({"http": 1}))]
    fn test_invalid_shapes(#[case] value: Value) {
        assert!(ProxyConfig::try_from(value).unwrap_err().is_config());
    }

    #[test]
    fn test_value_shapes() {
        assert_eq!(
            ProxyConfig::try_from(json!("http://h:1")).unwrap(),
            ProxyConfig::from("http://h:1")
        );
        let config = ProxyConfig::try_from(json!({"https": "http://s:2"})).unwrap();
        assert_eq!(config.resolve().unwrap(), "http://s:2");
    }
}
