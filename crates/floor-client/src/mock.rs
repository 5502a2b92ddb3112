//! Mock connector for tests: records tokens and calls, no network.

use floor_types::{
    ConversationsParams, EditFloorRequest, EventRequest, FloorError, FloorInfoParams,
    MemoryApi, MemoryConnector, QueryRequest, RecentEventsParams, RemoteResponse,
    SendValidationCodeRequest, SignInEmailRequest, SignInMobileRequest, SignUpRequest,
    ThreadsParams,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// A remote operation as it reached the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Query(QueryRequest),
    CreateEvent(EventRequest),
    RecentEvents(RecentEventsParams),
    FloorInformation(String, FloorInfoParams),
    EditFloor(String, EditFloorRequest),
    Conversations(ConversationsParams),
    ConversationThreads(ThreadsParams),
    SignUp(SignUpRequest),
    SignInWithEmail(SignInEmailRequest),
    SignInWithMobile(SignInMobileRequest),
    SendValidationCode(SendValidationCodeRequest),
}

#[derive(Default)]
struct MockState {
    tokens: Mutex<Vec<Option<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    outcome: Mutex<Option<Result<RemoteResponse, FloorError>>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Connector whose clients answer every call with one scripted outcome.
///
/// Defaults to `200 {"ok": true}` until [`respond_with`](Self::respond_with) or
/// [`fail_with`](Self::fail_with) is called.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond_with(&self, res: RemoteResponse) {
        *lock(&self.state.outcome) = Some(Ok(res));
    }

    pub fn fail_with(&self, err: FloorError) {
        *lock(&self.state.outcome) = Some(Err(err));
    }

    /// Token passed to each `connect`, in order.
    pub fn tokens(&self) -> Vec<Option<String>> {
        lock(&self.state.tokens).clone()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.state.calls).clone()
    }

    pub fn last_call(&self) -> Option<RecordedCall> {
        lock(&self.state.calls).last().cloned()
    }
}

impl MemoryConnector for MockConnector {
    fn connect(&self, access_token: Option<&str>) -> Result<Box<dyn MemoryApi>, FloorError> {
        lock(&self.state.tokens).push(access_token.map(String::from));
        Ok(Box::new(MockApi {
            state: Arc::clone(&self.state),
        }))
    }
}

struct MockApi {
    state: Arc<MockState>,
}

impl MockApi {
    fn record(&self, call: RecordedCall) -> Result<RemoteResponse, FloorError> {
        lock(&self.state.calls).push(call);
        lock(&self.state.outcome)
            .clone()
            .unwrap_or_else(|| Ok(RemoteResponse::ok(serde_json::json!({ "ok": true }))))
    }
}

#[async_trait::async_trait]
impl MemoryApi for MockApi {
    async fn query(&self, req: &QueryRequest) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::Query(req.clone()))
    }

    async fn create_event(&self, req: &EventRequest) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::CreateEvent(req.clone()))
    }

    async fn recent_events(
        &self,
        params: &RecentEventsParams,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::RecentEvents(params.clone()))
    }

    async fn floor_information(
        &self,
        floor_id: &str,
        params: &FloorInfoParams,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::FloorInformation(
            floor_id.to_string(),
            params.clone(),
        ))
    }

    async fn edit_floor(
        &self,
        floor_id: &str,
        req: &EditFloorRequest,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::EditFloor(floor_id.to_string(), req.clone()))
    }

    async fn conversations(
        &self,
        params: &ConversationsParams,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::Conversations(params.clone()))
    }

    async fn conversation_threads(
        &self,
        params: &ThreadsParams,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::ConversationThreads(params.clone()))
    }

    async fn sign_up(&self, req: &SignUpRequest) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::SignUp(req.clone()))
    }

    async fn sign_in_with_email(
        &self,
        req: &SignInEmailRequest,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::SignInWithEmail(req.clone()))
    }

    async fn sign_in_with_mobile(
        &self,
        req: &SignInMobileRequest,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::SignInWithMobile(req.clone()))
    }

    async fn send_validation_code(
        &self,
        req: &SendValidationCodeRequest,
    ) -> Result<RemoteResponse, FloorError> {
        self.record(RecordedCall::SendValidationCode(req.clone()))
    }
}
