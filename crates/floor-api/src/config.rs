//! Environment configuration for the gateway.

use floor_client::ClientConfig;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://127.0.0.1:3000,http://localhost:5173,http://127.0.0.1:5173";
const FALLBACK_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub client: ClientConfig,
    pub listen: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let client = ClientConfig::from_lookup(&lookup);
        let listen = lookup("XFLOOR_LISTEN")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let cors_allowed_origins = parse_origins(
            lookup("CORS_ALLOWED_ORIGINS")
                .as_deref()
                .unwrap_or(DEFAULT_CORS_ORIGINS),
        );
        let max_body_bytes = match lookup("XFLOOR_MAX_BODY_BYTES") {
            None => DEFAULT_MAX_BODY_BYTES,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid XFLOOR_MAX_BODY_BYTES, using default");
                DEFAULT_MAX_BODY_BYTES
            }),
        };
        Self {
            client,
            listen,
            cors_allowed_origins,
            max_body_bytes,
        }
    }
}

/// Comma-separated origins; an all-blank list falls back to the local dev origins.
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect();
    if origins.is_empty() {
        return FALLBACK_CORS_ORIGINS.iter().map(|o| o.to_string()).collect();
    }
    origins
}
