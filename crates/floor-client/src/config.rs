//! Remote endpoint and TLS settings.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://appfloor.in";

/// Where the remote API lives and how to trust it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub verify_tls: bool,
    /// PEM bundle added to the trust roots.
    pub ca_cert_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            verify_tls: true,
            ca_cert_path: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Reads `XFLOOR_API_BASE_URL`, `XFLOOR_VERIFY_SSL` and `XFLOOR_SSL_CA_CERT` (or `SSL_CERT_FILE`).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup("XFLOOR_API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let verify_tls = flag_enabled(lookup("XFLOOR_VERIFY_SSL").as_deref());
        let ca_cert_path = non_blank(lookup("XFLOOR_SSL_CA_CERT"))
            .or_else(|| non_blank(lookup("SSL_CERT_FILE")))
            .map(PathBuf::from);
        Self {
            base_url,
            verify_tls,
            ca_cert_path,
        }
    }
}

/// Unset means enabled; only `0`, `false`, `no` and `off` disable.
fn flag_enabled(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
