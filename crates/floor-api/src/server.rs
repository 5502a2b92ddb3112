//! Axum server and routes.

use crate::auth::{attach_token, extract_access_token, mask_token};
use crate::config::{Config, DEFAULT_MAX_BODY_BYTES};
use crate::error::ApiError;
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::header::{ALLOW, AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode, Uri};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use floor_types::{
    ConversationsParams, EditFloorRequest, EventRequest, FloorError, FloorInfoParams, MemoryApi,
    MemoryConnector, QueryRequest, RecentEventsParams, RemoteResponse, SendValidationCodePayload,
    SignInEmailRequest, SignInMobileRequest, SignUpRequest, ThreadsParams, Upload,
};
use serde_json::{json, Value};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::Instrument;
use uuid::Uuid;

pub struct AppState {
    pub connector: Arc<dyn MemoryConnector>,
    pub cors_allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl AppState {
    /// State with the default CORS origins and body limit.
    pub fn new(connector: Arc<dyn MemoryConnector>) -> Self {
        let defaults = Config::from_lookup(|_| None);
        Self {
            connector,
            cors_allowed_origins: defaults.cors_allowed_origins,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn from_config(config: &Config, connector: Arc<dyn MemoryConnector>) -> Self {
        Self {
            connector,
            cors_allowed_origins: config.cors_allowed_origins.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.cors_allowed_origins);
    let body_limit = DefaultBodyLimit::max(state.max_body_bytes);
    Router::new()
        .route("/health", get(handle_health))
        .route("/memory/query", post(handle_query))
        .route("/memory/events", post(handle_create_event))
        .route("/memory/recent-events", get(handle_recent_events))
        .route("/memory/floors/:floor_id", get(handle_floor_information))
        .route("/memory/floors/:floor_id/edit", post(handle_edit_floor))
        .route("/memory/conversations", get(handle_conversations))
        .route("/memory/threads", get(handle_threads))
        .route("/memory/auth/sign-up", post(handle_sign_up))
        .route("/memory/auth/sign-in/email", post(handle_sign_in_email))
        .route("/memory/auth/sign-in/mobile", post(handle_sign_in_mobile))
        .route(
            "/memory/auth/send-validation-code",
            post(handle_send_validation_code),
        )
        .fallback(handle_not_found)
        .layer(middleware::map_response(method_not_allowed_envelope))
        .layer(body_limit)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .with_state(state)
}

/// Listed origins with credentials; methods and headers mirror the preflight.
///
/// A `*` entry mirrors any origin, since a literal wildcard cannot be combined with credentials.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS_ALLOWED_ORIGINS contains *, every origin will be allowed");
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(parse_origins(origins))
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .expose_headers([AUTHORIZATION])
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    tracing::error!(%details, "handler panicked");
    ApiError::unexpected(details).into_response()
}

async fn handle_not_found(uri: Uri) -> ApiError {
    ApiError::unrouted(
        StatusCode::NOT_FOUND,
        Some(format!("No route for {}", uri.path())),
    )
}

/// Axum answers a known path with an unsupported method with an empty 405; give it the envelope.
async fn method_not_allowed_envelope(res: Response) -> Response {
    if res.status() != StatusCode::METHOD_NOT_ALLOWED || res.headers().contains_key(CONTENT_TYPE) {
        return res;
    }
    let allow = res.headers().get(ALLOW).cloned();
    let mut out = ApiError::unrouted(StatusCode::METHOD_NOT_ALLOWED, None).into_response();
    if let Some(allow) = allow {
        out.headers_mut().insert(ALLOW, allow);
    }
    out
}

/// Connect with the caller's bearer token and run one remote operation.
///
/// The client lives only for the duration of `call`.
async fn forward<F, Fut>(
    state: &AppState,
    headers: &HeaderMap,
    operation: &'static str,
    call: F,
) -> Result<RemoteResponse, ApiError>
where
    F: FnOnce(Box<dyn MemoryApi>) -> Fut,
    Fut: Future<Output = Result<RemoteResponse, FloorError>>,
{
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("xfloor", %request_id, operation);
    async move {
        let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
        let token = extract_access_token(authorization);
        tracing::info!(token = %mask_token(token.as_deref()), "forwarding to xFloor");
        let api = state.connector.connect(token.as_deref())?;
        let res = call(api).await?;
        tracing::debug!(status = res.status, "xFloor responded");
        Ok::<_, ApiError>(res)
    }
    .instrument(span)
    .await
}

/// Success answer of an auth endpoint: remote status, echoed `Authorization`, `token` in body.
fn auth_response(res: RemoteResponse) -> Response {
    let status = StatusCode::from_u16(res.status).unwrap_or(StatusCode::OK);
    let authorization = res.header(AUTHORIZATION.as_str()).map(String::from);
    let mut body = res.body;
    let mut headers = HeaderMap::new();
    if let Some(ref value) = authorization {
        body = attach_token(body, value);
        match HeaderValue::from_str(value) {
            Ok(v) => {
                headers.insert(AUTHORIZATION, v);
            }
            Err(_) => tracing::warn!("remote Authorization header is not a valid header value"),
        }
    }
    (status, headers, Json(body)).into_response()
}

async fn read_upload(field: Field<'_>) -> Result<Option<Upload>, ApiError> {
    let file_name = match field.file_name() {
        Some(name) if !name.trim().is_empty() => name.to_string(),
        _ => return Ok(None),
    };
    let content_type = field.content_type().map(String::from);
    let bytes = field.bytes().await?;
    Ok(Some(Upload {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_query(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let req = req.normalized()?;
    let res = forward(&state, &headers, "query", move |api| async move {
        api.query(&req).await
    })
    .await?;
    Ok(Json(res.body))
}

async fn handle_create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let mut multipart = multipart?;
    let mut input_info = String::new();
    let mut app_id = String::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "input_info" => input_info = field.text().await?,
            "app_id" => app_id = field.text().await?,
            "files" => {
                if let Some(upload) = read_upload(field).await? {
                    files.push(upload);
                }
            }
            _ => {}
        }
    }
    let req = EventRequest {
        input_info,
        app_id,
        files,
    }
    .normalized()?;
    tracing::debug!(files = req.files.len(), "create event");
    let res = forward(&state, &headers, "create_event", move |api| async move {
        api.create_event(&req).await
    })
    .await?;
    Ok(Json(res.body))
}

async fn handle_recent_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<RecentEventsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let params = params.normalized()?;
    let res = forward(&state, &headers, "recent_events", move |api| async move {
        api.recent_events(&params).await
    })
    .await?;
    Ok(Json(res.body))
}

async fn handle_floor_information(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    floor_id: Result<Path<String>, PathRejection>,
    params: Result<Query<FloorInfoParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(floor_id) = floor_id?;
    let Query(params) = params?;
    let params = params.normalized()?;
    let res = forward(&state, &headers, "floor_information", move |api| async move {
        api.floor_information(&floor_id, &params).await
    })
    .await?;
    Ok(Json(res.body))
}

async fn handle_edit_floor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    floor_id: Result<Path<String>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(floor_id) = floor_id?;
    let mut multipart = multipart?;
    let mut req = EditFloorRequest {
        user_id: String::new(),
        app_id: String::new(),
        title: None,
        details: None,
        logo_file: None,
    };
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => req.user_id = field.text().await?,
            "app_id" => req.app_id = field.text().await?,
            "title" => req.title = Some(field.text().await?),
            "details" => req.details = Some(field.text().await?),
            "logo_file" => req.logo_file = read_upload(field).await?,
            _ => {}
        }
    }
    let req = req.normalized()?;
    let res = forward(&state, &headers, "edit_floor", move |api| async move {
        api.edit_floor(&floor_id, &req).await
    })
    .await?;
    Ok(Json(res.body))
}

async fn handle_conversations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<ConversationsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let params = params.normalized();
    let res = forward(&state, &headers, "conversations", move |api| async move {
        api.conversations(&params).await
    })
    .await?;
    Ok(Json(res.body))
}

async fn handle_threads(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<ThreadsParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params?;
    let params = params.normalized()?;
    let res = forward(&state, &headers, "conversation_threads", move |api| async move {
        api.conversation_threads(&params).await
    })
    .await?;
    Ok(Json(res.body))
}

async fn handle_sign_up(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let req = req.normalized()?;
    let res = forward(&state, &headers, "sign_up", move |api| async move {
        api.sign_up(&req).await
    })
    .await?;
    Ok(auth_response(res))
}

async fn handle_sign_in_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignInEmailRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let req = req.normalized()?;
    let res = forward(&state, &headers, "sign_in_with_email", move |api| async move {
        api.sign_in_with_email(&req).await
    })
    .await?;
    Ok(auth_response(res))
}

async fn handle_sign_in_mobile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SignInMobileRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let req = req.normalized()?;
    let res = forward(&state, &headers, "sign_in_with_mobile", move |api| async move {
        api.sign_in_with_mobile(&req).await
    })
    .await?;
    Ok(auth_response(res))
}

async fn handle_send_validation_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SendValidationCodePayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = payload?;
    let req = payload.into_request()?;
    let res = forward(&state, &headers, "send_validation_code", move |api| async move {
        api.send_validation_code(&req).await
    })
    .await?;
    Ok(Json(res.body))
}
