//! Bearer token handling for inbound and remote `Authorization` headers.

use serde_json::Value;

const BEARER_PREFIX: &str = "bearer ";

/// Token carried by an `Authorization` header value.
///
/// A `Bearer ` prefix (any case) is stripped; a value without the prefix is
/// returned as-is. Blank input, a bare `Bearer`, or a blank remainder yields `None`.
pub fn extract_access_token(authorization: Option<&str>) -> Option<String> {
    let value = authorization?.trim();
    if value.is_empty() || value.eq_ignore_ascii_case(BEARER_PREFIX.trim_end()) {
        return None;
    }
    let has_prefix = value
        .get(..BEARER_PREFIX.len())
        .map_or(false, |p| p.eq_ignore_ascii_case(BEARER_PREFIX));
    if has_prefix {
        let token = value[BEARER_PREFIX.len()..].trim();
        return (!token.is_empty()).then(|| token.to_string());
    }
    Some(value.to_string())
}

/// Loggable form of a token: first 8 and last 6 characters.
pub fn mask_token(token: Option<&str>) -> String {
    let value = match token.map(str::trim) {
        Some(v) if !v.is_empty() => v,
        _ => return "-".to_string(),
    };
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 14 {
        return "***".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 6..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Add `token` to an object body from a remote `Authorization` header, unless already set.
pub fn attach_token(body: Value, authorization: &str) -> Value {
    match (body, extract_access_token(Some(authorization))) {
        (Value::Object(mut map), Some(token)) => {
            map.entry("token").or_insert(Value::String(token));
            Value::Object(map)
        }
        (body, _) => body,
    }
}
