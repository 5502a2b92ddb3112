//! Wire-format tests: the reqwest client against a local capturing server.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use floor_client::{ClientConfig, FloorError, MemoryConnector, XfloorConnector};
use floor_types::{
    ConversationsParams, EditFloorRequest, EventRequest, FloorInfoParams, QueryRequest,
    RecentEventsParams, SendValidationCodeRequest, SignInEmailRequest, SignInMobileRequest,
    SignUpRequest, ThreadsParams, Upload,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct Captured {
    method: Method,
    path: String,
    query: Option<String>,
    authorization: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
}

type Log = Arc<Mutex<Vec<Captured>>>;

async fn capture(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    log.lock().unwrap().push(Captured {
        method,
        path: path.clone(),
        query: uri.query().map(String::from),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        content_type: headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: body.to_vec(),
    });
    if path.ends_with("/missing") {
        return (StatusCode::NOT_FOUND, "not here").into_response();
    }
    if path == "/api/auth/sign-in/mobile" {
        return (
            [("authorization", "Bearer issued-token")],
            Json(json!({ "user": { "id": "u1" } })),
        )
            .into_response();
    }
    Json(json!({ "received": true })).into_response()
}

async fn spawn_remote() -> (String, Log) {
    let log: Log = Arc::default();
    let app = Router::new().fallback(capture).with_state(Arc::clone(&log));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    (format!("http://{}", addr), log)
}

fn last(log: &Log) -> Captured {
    log.lock().unwrap().last().cloned().unwrap()
}

fn is_multipart(seen: &Captured) -> bool {
    seen.content_type
        .as_deref()
        .map_or(false, |ct| ct.starts_with("multipart/form-data"))
}

/// Names of the multipart parts in order of appearance.
fn part_names(body: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(body);
    text.split("; name=\"")
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .map(String::from)
        .collect()
}

fn upload(name: &str, content: &str) -> Upload {
    Upload {
        file_name: name.to_string(),
        content_type: Some("text/plain".to_string()),
        bytes: content.as_bytes().to_vec(),
    }
}

#[tokio::test]
async fn query_posts_json_with_bearer_token() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(Some("tok-123"))
        .unwrap();
    let req = QueryRequest {
        user_id: "u1".to_string(),
        query: "what did I eat?".to_string(),
        floor_ids: vec!["f1".to_string(), "f2".to_string()],
        include_metadata: Some("1".to_string()),
        summary_needed: Some("0".to_string()),
        app_id: "app".to_string(),
        filters: None,
    };
    let res = api.query(&req).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({ "received": true }));

    let seen = last(&log);
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/memory/query");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok-123"));
    let body: serde_json::Value = serde_json::from_slice(&seen.body).unwrap();
    assert_eq!(body["floor_ids"], json!(["f1", "f2"]));
    assert_eq!(body["summary_needed"], "0");
    assert!(body.get("filters").is_none());
}

#[tokio::test]
async fn requests_without_token_carry_no_authorization() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();
    let params = RecentEventsParams {
        floor_id: "f1".to_string(),
        app_id: "a1".to_string(),
        user_id: None,
    };
    api.recent_events(&params).await.unwrap();

    let seen = last(&log);
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/memory/recent-events");
    assert_eq!(seen.query.as_deref(), Some("floor_id=f1&app_id=a1"));
    assert!(seen.authorization.is_none());
}

#[tokio::test]
async fn events_send_one_part_per_file() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();

    let mut req = EventRequest {
        input_info: "met with the team".to_string(),
        app_id: "app".to_string(),
        files: vec![upload("a.txt", "alpha"), upload("b.txt", "beta")],
    };
    api.create_event(&req).await.unwrap();
    let body = String::from_utf8(last(&log).body).unwrap();
    assert_eq!(body.matches("name=\"files\"").count(), 2);
    assert!(body.contains("filename=\"a.txt\""));
    assert!(body.contains("filename=\"b.txt\""));
    assert!(body.contains("name=\"input_info\""));

    req.files.clear();
    api.create_event(&req).await.unwrap();
    let seen = last(&log);
    assert_eq!(seen.path, "/api/memory/events");
    let body = String::from_utf8(seen.body).unwrap();
    assert_eq!(body.matches("name=\"files\"").count(), 0);
    assert!(body.contains("name=\"app_id\""));
}

#[tokio::test]
async fn validation_code_uses_remote_field_name() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();
    let req = SendValidationCodeRequest {
        mode: "mobile".to_string(),
        user_id: None,
        email_id: None,
        mobiles_number: Some("+15550100".to_string()),
    };
    api.send_validation_code(&req).await.unwrap();

    let seen = last(&log);
    assert_eq!(seen.path, "/api/auth/send-validation-code");
    let body: serde_json::Value = serde_json::from_slice(&seen.body).unwrap();
    assert_eq!(body, json!({ "mode": "mobile", "mobiles_number": "+15550100" }));
}

#[tokio::test]
async fn response_headers_are_kept() {
    let (base, _log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();
    let req = SignInMobileRequest {
        mobile_number: "+15550100".to_string(),
        pass_code: "1234".to_string(),
        login_type: "otp".to_string(),
        app_id: None,
    };
    let res = api.sign_in_with_mobile(&req).await.unwrap();
    assert_eq!(res.header("Authorization"), Some("Bearer issued-token"));
    assert_eq!(res.body["user"]["id"], "u1");
}

#[tokio::test]
async fn non_success_status_becomes_api_error() {
    let (base, _log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();
    let params = FloorInfoParams {
        app_id: "app".to_string(),
        user_id: Some("u1".to_string()),
    };
    match api.floor_information("missing", &params).await {
        Err(FloorError::Api {
            status,
            reason,
            body,
        }) => {
            assert_eq!(status, Some(404));
            assert_eq!(reason.as_deref(), Some("Not Found"));
            assert_eq!(body.as_deref(), Some("not here"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_remote_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = XfloorConnector::new(ClientConfig::new(format!("http://{}", addr)))
        .connect(None)
        .unwrap();
    let params = RecentEventsParams {
        floor_id: "f1".to_string(),
        app_id: "a1".to_string(),
        user_id: None,
    };
    let err = api.recent_events(&params).await.unwrap_err();
    assert!(matches!(err, FloorError::Transport(_)));
    assert!(!err.is_certificate_failure());
}

#[tokio::test]
async fn sign_up_sends_text_form_fields() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();
    let req = SignUpRequest {
        name: "Ada".to_string(),
        password: " pw with spaces ".to_string(),
        email_id: Some("ada@example.com".to_string()),
        mobile_number: None,
        app_id: Some("app".to_string()),
    };
    api.sign_up(&req).await.unwrap();

    let seen = last(&log);
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/auth/sign-up");
    assert!(is_multipart(&seen));
    assert_eq!(part_names(&seen.body), vec!["name", "password", "email_id", "app_id"]);
    let body = String::from_utf8(seen.body).unwrap();
    assert!(body.contains("\r\n\r\n pw with spaces \r\n"));
    assert!(!body.contains("filename="));
}

#[tokio::test]
async fn email_sign_in_sends_text_form_fields() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();
    let req = SignInEmailRequest {
        email_id: "ada@example.com".to_string(),
        pass_code: "1234".to_string(),
        login_type: "otp".to_string(),
        app_id: None,
    };
    api.sign_in_with_email(&req).await.unwrap();

    let seen = last(&log);
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/auth/sign-in/email");
    assert!(is_multipart(&seen));
    assert_eq!(part_names(&seen.body), vec!["email_id", "pass_code", "login_type"]);
}

#[tokio::test]
async fn edit_floor_sends_optional_parts_only_when_present() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(Some("tok"))
        .unwrap();
    let mut req = EditFloorRequest {
        user_id: "u1".to_string(),
        app_id: "app".to_string(),
        title: Some("Trips".to_string()),
        details: Some("Places I went".to_string()),
        logo_file: Some(upload("logo.png", "png-bytes")),
    };
    api.edit_floor("floor-9", &req).await.unwrap();

    let seen = last(&log);
    assert_eq!(seen.method, Method::POST);
    assert_eq!(seen.path, "/api/memory/floors/floor-9/edit");
    assert!(is_multipart(&seen));
    assert_eq!(
        part_names(&seen.body),
        vec!["user_id", "app_id", "title", "details", "logo_file"]
    );
    let body = String::from_utf8(seen.body).unwrap();
    assert!(body.contains("filename=\"logo.png\""));

    req.title = None;
    req.details = None;
    req.logo_file = None;
    api.edit_floor("floor-9", &req).await.unwrap();
    assert_eq!(part_names(&last(&log).body), vec!["user_id", "app_id"]);
}

#[tokio::test]
async fn conversations_send_only_present_params() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();

    let params = ConversationsParams {
        user_id: Some("u1".to_string()),
        thread_id: Some("t7".to_string()),
    };
    api.conversations(&params).await.unwrap();
    let seen = last(&log);
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/memory/conversations");
    assert_eq!(seen.query.as_deref(), Some("user_id=u1&thread_id=t7"));

    let params = ConversationsParams {
        user_id: None,
        thread_id: Some("t7".to_string()),
    };
    api.conversations(&params).await.unwrap();
    assert_eq!(last(&log).query.as_deref(), Some("thread_id=t7"));

    api.conversations(&ConversationsParams::default()).await.unwrap();
    assert!(last(&log).query.map_or(true, |q| q.is_empty()));
}

#[tokio::test]
async fn conversation_threads_use_their_own_path() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(None)
        .unwrap();
    let params = ThreadsParams {
        user_id: "u1".to_string(),
        floor_id: "f1".to_string(),
    };
    let res = api.conversation_threads(&params).await.unwrap();
    assert_eq!(res.body, json!({ "received": true }));

    let seen = last(&log);
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/memory/conversation-threads");
    assert_eq!(seen.query.as_deref(), Some("user_id=u1&floor_id=f1"));
}

#[tokio::test]
async fn floor_information_puts_id_in_path_and_params_in_query() {
    let (base, log) = spawn_remote().await;
    let api = XfloorConnector::new(ClientConfig::new(base))
        .connect(Some("tok"))
        .unwrap();
    let params = FloorInfoParams {
        app_id: "app".to_string(),
        user_id: Some("u1".to_string()),
    };
    let res = api.floor_information("floor-9", &params).await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(res.body, json!({ "received": true }));

    let seen = last(&log);
    assert_eq!(seen.method, Method::GET);
    assert_eq!(seen.path, "/api/memory/floors/floor-9");
    assert_eq!(seen.query.as_deref(), Some("app_id=app&user_id=u1"));
    assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
}
