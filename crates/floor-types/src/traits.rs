//! Traits for the remote memory API and its per-request connector.

use crate::{
    ConversationsParams, EditFloorRequest, EventRequest, FloorInfoParams, QueryRequest,
    RecentEventsParams, RemoteResponse, SendValidationCodeRequest, SignInEmailRequest,
    SignInMobileRequest, SignUpRequest, ThreadsParams,
};
use async_trait::async_trait;

/// Substrings that identify a failed TLS certificate verification.
const CERTIFICATE_FAILURE_MARKERS: &[&str] = &[
    "certificate_verify_failed",
    "certificate verify failed",
    "invalid peer certificate",
    "unable to get local issuer certificate",
];

/// One call per remote operation of the xFloor memory API.
///
/// Every method is a single round trip. Non-2xx answers surface as [`FloorError::Api`].
#[async_trait]
pub trait MemoryApi: Send + Sync {
    async fn query(&self, req: &QueryRequest) -> Result<RemoteResponse, FloorError>;

    /// Create an event; `req.files` may be empty.
    async fn create_event(&self, req: &EventRequest) -> Result<RemoteResponse, FloorError>;

    async fn recent_events(&self, params: &RecentEventsParams)
        -> Result<RemoteResponse, FloorError>;

    async fn floor_information(
        &self,
        floor_id: &str,
        params: &FloorInfoParams,
    ) -> Result<RemoteResponse, FloorError>;

    async fn edit_floor(
        &self,
        floor_id: &str,
        req: &EditFloorRequest,
    ) -> Result<RemoteResponse, FloorError>;

    async fn conversations(&self, params: &ConversationsParams)
        -> Result<RemoteResponse, FloorError>;

    async fn conversation_threads(&self, params: &ThreadsParams)
        -> Result<RemoteResponse, FloorError>;

    async fn sign_up(&self, req: &SignUpRequest) -> Result<RemoteResponse, FloorError>;

    async fn sign_in_with_email(&self, req: &SignInEmailRequest)
        -> Result<RemoteResponse, FloorError>;

    async fn sign_in_with_mobile(
        &self,
        req: &SignInMobileRequest,
    ) -> Result<RemoteResponse, FloorError>;

    async fn send_validation_code(
        &self,
        req: &SendValidationCodeRequest,
    ) -> Result<RemoteResponse, FloorError>;
}

/// Builds a short-lived [`MemoryApi`] client for one inbound request.
pub trait MemoryConnector: Send + Sync {
    /// `access_token` is sent as a bearer token when present.
    fn connect(&self, access_token: Option<&str>) -> Result<Box<dyn MemoryApi>, FloorError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FloorError {
    /// The remote API answered with a non-success status.
    #[error("xFloor API error: status={status:?} reason={reason:?}")]
    Api {
        status: Option<u16>,
        reason: Option<String>,
        body: Option<String>,
    },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("client configuration error: {0}")]
    Config(String),
    /// Connection or protocol failure; carries the whole source chain as text.
    #[error("transport error: {0}")]
    Transport(String),
}

impl FloorError {
    pub fn is_certificate_failure(&self) -> bool {
        match self {
            FloorError::Transport(msg) => {
                let lowered = msg.to_lowercase();
                CERTIFICATE_FAILURE_MARKERS
                    .iter()
                    .any(|marker| lowered.contains(marker))
            }
            _ => false,
        }
    }
}
