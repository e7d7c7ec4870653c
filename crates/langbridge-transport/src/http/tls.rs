//! TLS verification settings

use crate::error::{Error, Result};
use reqwest::{Certificate, ClientBuilder};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// TLS verification configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlsConfig {
    /// Enable or disable certificate verification
    Verify(bool),
    /// Trust only the CA certificates found at this path (PEM file or directory)
    CaBundle(PathBuf),
}

impl TlsConfig {
    /// Per-call verification flag.
    ///
    /// `None` when a custom trust store is in effect.
    pub fn verify_flag(&self) -> Option<bool> {
        match self {
            Self::Verify(verify) => Some(*verify),
            Self::CaBundle(_) => None,
        }
    }

    /// Apply these settings to a client under construction.
    pub(crate) fn apply(&self, builder: ClientBuilder) -> Result<ClientBuilder> {
        match self {
            Self::Verify(true) => Ok(builder),
            Self::Verify(false) => Ok(builder.danger_accept_invalid_certs(true)),
            Self::CaBundle(path) => {
                let builder = load_certificates(path)?
                    .into_iter()
                    .fold(builder.tls_built_in_root_certs(false), |b, cert| {
                        b.add_root_certificate(cert)
                    });
                Ok(builder)
            }
        }
    }
}

impl From<bool> for TlsConfig {
    fn from(verify: bool) -> Self {
        Self::Verify(verify)
    }
}

impl From<PathBuf> for TlsConfig {
    fn from(path: PathBuf) -> Self {
        Self::CaBundle(path)
    }
}

impl From<&Path> for TlsConfig {
    fn from(path: &Path) -> Self {
        Self::CaBundle(path.to_path_buf())
    }
}

impl TryFrom<Value> for TlsConfig {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Bool(verify) => Ok(Self::Verify(verify)),
            Value::String(path) => Ok(Self::CaBundle(PathBuf::from(path))),
            other => Err(Error::InvalidConfig(format!(
                "verify_ssl must be a boolean or a CA bundle path, got {other}"
            ))),
        }
    }
}

/// Read CA certificates from a PEM file, or from every file in a directory.
pub fn load_certificates(path: &Path) -> Result<Vec<Certificate>> {
    let files = if path.is_dir() {
        let mut files = fs::read_dir(path)
            .map_err(|e| ca_error(path, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file())
            .collect::<Vec<_>>();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut certs = Vec::new();
    for file in &files {
        let pem = fs::read(file).map_err(|e| ca_error(file, e))?;
        match Certificate::from_pem_bundle(&pem) {
            Ok(found) => certs.extend(found),
            // Skip non-PEM files when scanning a directory
            Err(_) if files.len() > 1 => {
                tracing::debug!("Skipping unreadable CA file {}", file.display());
            }
            Err(e) => return Err(ca_error(file, e)),
        }
    }

    if certs.is_empty() {
        return Err(Error::InvalidConfig(format!(
            "no CA certificates found at {}",
            path.display()
        )));
    }
    tracing::debug!("Loaded {} CA certificates from {}", certs.len(), path.display());
    Ok(certs)
}

fn ca_error(path: &Path, err: impl std::fmt::Display) -> Error {
    Error::InvalidConfig(format!("cannot load CA bundle {}: {err}", path.display()))
}
