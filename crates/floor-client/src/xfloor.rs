//! reqwest client for the xFloor memory API.

use crate::ClientConfig;
use async_trait::async_trait;
use floor_types::{
    ConversationsParams, EditFloorRequest, EventRequest, FloorError, FloorInfoParams,
    MemoryApi, MemoryConnector, QueryRequest, RecentEventsParams, RemoteResponse,
    SendValidationCodeRequest, SignInEmailRequest, SignInMobileRequest, SignUpRequest,
    ThreadsParams, Upload,
};
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Url};

const QUERY: &[&str] = &["api", "memory", "query"];
const EVENTS: &[&str] = &["api", "memory", "events"];
const RECENT_EVENTS: &[&str] = &["api", "memory", "recent-events"];
const CONVERSATIONS: &[&str] = &["api", "memory", "conversations"];
const CONVERSATION_THREADS: &[&str] = &["api", "memory", "conversation-threads"];
const SIGN_UP: &[&str] = &["api", "auth", "sign-up"];
const SIGN_IN_EMAIL: &[&str] = &["api", "auth", "sign-in", "email"];
const SIGN_IN_MOBILE: &[&str] = &["api", "auth", "sign-in", "mobile"];
const SEND_VALIDATION_CODE: &[&str] = &["api", "auth", "send-validation-code"];

/// Builds one [`XfloorClient`] per inbound request from a fixed [`ClientConfig`].
pub struct XfloorConnector {
    config: ClientConfig,
}

impl XfloorConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn http_client(&self) -> Result<reqwest::Client, FloorError> {
        let mut builder =
            reqwest::Client::builder().danger_accept_invalid_certs(!self.config.verify_tls);
        if let Some(ref path) = self.config.ca_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                FloorError::Config(format!("cannot read CA bundle {}: {}", path.display(), e))
            })?;
            let certs = reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| {
                FloorError::Config(format!("invalid CA bundle {}: {}", path.display(), e))
            })?;
            for cert in certs {
                builder = builder.add_root_certificate(cert);
            }
        }
        builder.build().map_err(transport)
    }
}

impl MemoryConnector for XfloorConnector {
    fn connect(&self, access_token: Option<&str>) -> Result<Box<dyn MemoryApi>, FloorError> {
        let base_url = Url::parse(&self.config.base_url).map_err(|e| {
            FloorError::Config(format!("invalid base URL {}: {}", self.config.base_url, e))
        })?;
        let client = self.http_client()?;
        Ok(Box::new(XfloorClient::new(
            client,
            base_url,
            access_token.map(String::from),
        )))
    }
}

/// Client bound to one base URL and, optionally, one bearer token.
pub struct XfloorClient {
    client: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl XfloorClient {
    pub fn new(client: reqwest::Client, base_url: Url, access_token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, FloorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FloorError::Config(format!("unusable base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, req: RequestBuilder) -> Result<RemoteResponse, FloorError> {
        let mut req = req.header(ACCEPT, "application/json");
        if let Some(ref token) = self.access_token {
            req = req.bearer_auth(token);
        }
        let request = req.build().map_err(transport)?;
        tracing::debug!(method = %request.method(), url = %request.url(), "xFloor request");

        let res = self.client.execute(request).await.map_err(transport)?;
        let status = res.status();
        let headers: Vec<(String, String)> = res
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let bytes = res.bytes().await.map_err(transport)?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            return Err(FloorError::Api {
                status: Some(status.as_u16()),
                reason: status.canonical_reason().map(String::from),
                body: Some(body).filter(|b| !b.trim().is_empty()),
            });
        }
        Ok(RemoteResponse {
            status: status.as_u16(),
            headers,
            body: to_plain(&bytes),
        })
    }
}

#[async_trait]
impl MemoryApi for XfloorClient {
    async fn query(&self, req: &QueryRequest) -> Result<RemoteResponse, FloorError> {
        self.send(self.client.post(self.url(QUERY)?).json(req)).await
    }

    async fn create_event(&self, req: &EventRequest) -> Result<RemoteResponse, FloorError> {
        let mut form = Form::new()
            .text("input_info", req.input_info.clone())
            .text("app_id", req.app_id.clone());
        for file in &req.files {
            form = form.part("files", file_part(file)?);
        }
        self.send(self.client.post(self.url(EVENTS)?).multipart(form))
            .await
    }

    async fn recent_events(
        &self,
        params: &RecentEventsParams,
    ) -> Result<RemoteResponse, FloorError> {
        self.send(self.client.get(self.url(RECENT_EVENTS)?).query(params))
            .await
    }

    async fn floor_information(
        &self,
        floor_id: &str,
        params: &FloorInfoParams,
    ) -> Result<RemoteResponse, FloorError> {
        let url = self.url(&["api", "memory", "floors", floor_id])?;
        self.send(self.client.get(url).query(params)).await
    }

    async fn edit_floor(
        &self,
        floor_id: &str,
        req: &EditFloorRequest,
    ) -> Result<RemoteResponse, FloorError> {
        let mut form = Form::new()
            .text("user_id", req.user_id.clone())
            .text("app_id", req.app_id.clone());
        if let Some(ref title) = req.title {
            form = form.text("title", title.clone());
        }
        if let Some(ref details) = req.details {
            form = form.text("details", details.clone());
        }
        if let Some(ref logo) = req.logo_file {
            form = form.part("logo_file", file_part(logo)?);
        }
        let url = self.url(&["api", "memory", "floors", floor_id, "edit"])?;
        self.send(self.client.post(url).multipart(form)).await
    }

    async fn conversations(
        &self,
        params: &ConversationsParams,
    ) -> Result<RemoteResponse, FloorError> {
        self.send(self.client.get(self.url(CONVERSATIONS)?).query(params))
            .await
    }

    async fn conversation_threads(
        &self,
        params: &ThreadsParams,
    ) -> Result<RemoteResponse, FloorError> {
        self.send(
            self.client
                .get(self.url(CONVERSATION_THREADS)?)
                .query(params),
        )
        .await
    }

    async fn sign_up(&self, req: &SignUpRequest) -> Result<RemoteResponse, FloorError> {
        let form = text_form(req.form_fields());
        self.send(self.client.post(self.url(SIGN_UP)?).multipart(form))
            .await
    }

    async fn sign_in_with_email(
        &self,
        req: &SignInEmailRequest,
    ) -> Result<RemoteResponse, FloorError> {
        let form = text_form(req.form_fields());
        self.send(self.client.post(self.url(SIGN_IN_EMAIL)?).multipart(form))
            .await
    }

    async fn sign_in_with_mobile(
        &self,
        req: &SignInMobileRequest,
    ) -> Result<RemoteResponse, FloorError> {
        self.send(self.client.post(self.url(SIGN_IN_MOBILE)?).json(req))
            .await
    }

    async fn send_validation_code(
        &self,
        req: &SendValidationCodeRequest,
    ) -> Result<RemoteResponse, FloorError> {
        self.send(
            self.client
                .post(self.url(SEND_VALIDATION_CODE)?)
                .json(req),
        )
        .await
    }
}

fn text_form(fields: Vec<(&'static str, String)>) -> Form {
    fields
        .into_iter()
        .fold(Form::new(), |form, (name, value)| form.text(name, value))
}

fn file_part(upload: &Upload) -> Result<Part, FloorError> {
    let part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
    match upload.content_type.as_deref() {
        Some(ct) => part
            .mime_str(ct)
            .map_err(|e| FloorError::InvalidRequest(format!("invalid content type {}: {}", ct, e))),
        None => Ok(part),
    }
}

fn transport(e: reqwest::Error) -> FloorError {
    FloorError::Transport(error_chain(&e))
}

/// Display of an error followed by each of its sources.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

/// Decode a response body into plain JSON.
///
/// Empty bodies become `null`; bodies that are not JSON become a string with
/// invalid UTF-8 sequences dropped.
pub fn to_plain(bytes: &[u8]) -> serde_json::Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| serde_json::Value::String(utf8_dropping_invalid(bytes)))
}

fn utf8_dropping_invalid(mut bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    loop {
        match std::str::from_utf8(bytes) {
            Ok(valid) => {
                out.push_str(valid);
                return out;
            }
            Err(e) => {
                let (valid, rest) = bytes.split_at(e.valid_up_to());
                out.push_str(&String::from_utf8_lossy(valid));
                let skip = e.error_len().unwrap_or(rest.len());
                bytes = &rest[skip..];
            }
        }
    }
}
