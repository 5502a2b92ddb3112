//! Uniform JSON error envelope: `{"error": {"message", "details"?}}`.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use floor_types::FloorError;
use serde_json::{json, Map, Value};

pub const REMOTE_FALLBACK_MESSAGE: &str = "xFloor SDK request failed";
pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request payload.";
pub const UNEXPECTED_MESSAGE: &str = "Unexpected server error.";
pub const TLS_FAILURE_MESSAGE: &str = "TLS certificate verification failed while connecting to xFloor API. Fix local trust store (recommended) or set XFLOOR_SSL_CA_CERT.";

/// An HTTP status with a JSON body, returned by every failing handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    pub fn invalid_request(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            envelope(INVALID_REQUEST_MESSAGE, Some(Value::String(details.into()))),
        )
    }

    pub fn unexpected(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            envelope(UNEXPECTED_MESSAGE, Some(Value::String(details.into()))),
        )
    }

    /// A request that matched no route, or no method on a route.
    pub fn unrouted(status: StatusCode, details: Option<String>) -> Self {
        let message = status.canonical_reason().unwrap_or(REMOTE_FALLBACK_MESSAGE);
        Self::new(status, envelope(message, details.map(Value::String)))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Error answer of the remote API, reshaped into the envelope.
    ///
    /// A parsed body that already has an `error` object is passed through untouched.
    pub fn remote(status: Option<u16>, reason: Option<String>, body: Option<String>) -> Self {
        let status = status
            .filter(|s| *s != 0)
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::BAD_GATEWAY);
        let parsed: Option<Value> = body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .and_then(|b| serde_json::from_str(b).ok());
        let fallback = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| REMOTE_FALLBACK_MESSAGE.to_string());
        let message = match parsed {
            Some(ref payload) => extract_message(payload, &fallback),
            None => fallback,
        };
        let content = match parsed {
            Some(Value::Object(map)) if map.get("error").map_or(false, Value::is_object) => {
                Value::Object(map)
            }
            Some(details @ (Value::Object(_) | Value::Array(_))) => {
                envelope(&message, Some(details))
            }
            _ => envelope(
                &message,
                body.filter(|b| !b.trim().is_empty()).map(Value::String),
            ),
        };
        Self::new(status, content)
    }
}

fn envelope(message: &str, details: Option<Value>) -> Value {
    let mut error = Map::new();
    error.insert("message".to_string(), Value::String(message.to_string()));
    if let Some(details) = details {
        error.insert("details".to_string(), details);
    }
    json!({ "error": error })
}

fn non_blank_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
}

/// Most specific human-readable message in a remote error payload.
///
/// Order: `error.message`, `message`, `detail`, then `fallback`.
pub fn extract_message(payload: &Value, fallback: &str) -> String {
    let Some(obj) = payload.as_object() else {
        return fallback.to_string();
    };
    let nested = obj.get("error").and_then(|e| e.get("message"));
    non_blank_str(nested)
        .or_else(|| non_blank_str(obj.get("message")))
        .or_else(|| non_blank_str(obj.get("detail")))
        .unwrap_or(fallback)
        .to_string()
}

impl From<FloorError> for ApiError {
    fn from(err: FloorError) -> Self {
        match err {
            FloorError::Api {
                status,
                reason,
                body,
            } => {
                tracing::warn!(?status, ?reason, body = ?body, "xFloor API error");
                Self::remote(status, reason, body)
            }
            FloorError::InvalidRequest(details) => Self::invalid_request(details),
            ref other if other.is_certificate_failure() => {
                tracing::error!(error = %other, "TLS verification failed");
                let details = match other {
                    FloorError::Transport(msg) => msg.clone(),
                    _ => other.to_string(),
                };
                Self::new(
                    StatusCode::BAD_GATEWAY,
                    envelope(TLS_FAILURE_MESSAGE, Some(Value::String(details))),
                )
            }
            FloorError::Transport(details) | FloorError::Config(details) => {
                tracing::error!(error = %details, "request to xFloor failed");
                Self::unexpected(details)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::invalid_request(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::invalid_request(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
