//! Request DTOs and the remote response envelope.

use crate::FloorError;
use serde::{Deserialize, Serialize};

/// Reject a blank value; a non-blank one is forwarded exactly as received.
fn required(field: &str, value: String) -> Result<String, FloorError> {
    if value.trim().is_empty() {
        return Err(FloorError::InvalidRequest(format!(
            "Missing required field: {}",
            field
        )));
    }
    Ok(value)
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn default_flag() -> String {
    "1".to_string()
}

/// Time/type/tag filters for a memory query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_tags: Option<String>,
}

impl QueryFilters {
    fn normalized(self) -> Option<Self> {
        let filters = Self {
            time_from: optional(self.time_from),
            time_to: optional(self.time_to),
            filter_types: optional(self.filter_types),
            filter_tags: optional(self.filter_tags),
        };
        if filters == Self::default() {
            None
        } else {
            Some(filters)
        }
    }
}

/// Memory query (POST /memory/query). Sent to the remote API as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub floor_ids: Vec<String>,
    #[serde(default)]
    pub include_metadata: Option<String>,
    #[serde(default)]
    pub summary_needed: Option<String>,
    #[serde(default)]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<QueryFilters>,
}

impl QueryRequest {
    /// Drop blank floor ids and empty filters, default the flags to `"1"`;
    /// reject missing required fields.
    pub fn normalized(self) -> Result<Self, FloorError> {
        let floor_ids: Vec<String> = self
            .floor_ids
            .into_iter()
            .filter(|id| !id.trim().is_empty())
            .collect();
        if floor_ids.is_empty() {
            return Err(FloorError::InvalidRequest(
                "Missing required field: floor_ids".to_string(),
            ));
        }
        Ok(Self {
            user_id: required("user_id", self.user_id)?,
            query: required("query", self.query)?,
            floor_ids,
            include_metadata: Some(optional(self.include_metadata).unwrap_or_else(default_flag)),
            summary_needed: Some(optional(self.summary_needed).unwrap_or_else(default_flag)),
            app_id: required("app_id", self.app_id)?,
            filters: self.filters.and_then(QueryFilters::normalized),
        })
    }
}

/// One uploaded file, held in memory for the lifetime of a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Event creation with zero or more attached files.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRequest {
    pub input_info: String,
    pub app_id: String,
    pub files: Vec<Upload>,
}

impl EventRequest {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            input_info: required("input_info", self.input_info)?,
            app_id: required("app_id", self.app_id)?,
            files: self.files,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEventsParams {
    #[serde(default)]
    pub floor_id: String,
    #[serde(default)]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl RecentEventsParams {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            floor_id: required("floor_id", self.floor_id)?,
            app_id: required("app_id", self.app_id)?,
            user_id: optional(self.user_id),
        })
    }
}

/// Query parameters for floor information; the floor id travels in the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorInfoParams {
    #[serde(default)]
    pub app_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl FloorInfoParams {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            app_id: required("app_id", self.app_id)?,
            user_id: optional(self.user_id),
        })
    }
}

/// Floor edit with an optional replacement logo.
#[derive(Debug, Clone, PartialEq)]
pub struct EditFloorRequest {
    pub user_id: String,
    pub app_id: String,
    pub title: Option<String>,
    pub details: Option<String>,
    pub logo_file: Option<Upload>,
}

impl EditFloorRequest {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            user_id: required("user_id", self.user_id)?,
            app_id: required("app_id", self.app_id)?,
            title: optional(self.title),
            details: optional(self.details),
            logo_file: self.logo_file,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationsParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

impl ConversationsParams {
    pub fn normalized(self) -> Self {
        Self {
            user_id: optional(self.user_id),
            thread_id: optional(self.thread_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadsParams {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub floor_id: String,
}

impl ThreadsParams {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            user_id: required("user_id", self.user_id)?,
            floor_id: required("floor_id", self.floor_id)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl SignUpRequest {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            name: required("name", self.name)?,
            password: required("password", self.password)?,
            email_id: optional(self.email_id),
            mobile_number: optional(self.mobile_number),
            app_id: optional(self.app_id),
        })
    }

    /// Form fields in remote order; absent optionals are omitted.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("name", self.name.clone()),
            ("password", self.password.clone()),
        ];
        push_some(&mut fields, "email_id", &self.email_id);
        push_some(&mut fields, "mobile_number", &self.mobile_number);
        push_some(&mut fields, "app_id", &self.app_id);
        fields
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInEmailRequest {
    #[serde(default)]
    pub email_id: String,
    #[serde(default)]
    pub pass_code: String,
    #[serde(default)]
    pub login_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl SignInEmailRequest {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            email_id: required("email_id", self.email_id)?,
            pass_code: required("pass_code", self.pass_code)?,
            login_type: required("login_type", self.login_type)?,
            app_id: optional(self.app_id),
        })
    }

    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("email_id", self.email_id.clone()),
            ("pass_code", self.pass_code.clone()),
            ("login_type", self.login_type.clone()),
        ];
        push_some(&mut fields, "app_id", &self.app_id);
        fields
    }
}

fn push_some(fields: &mut Vec<(&'static str, String)>, name: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        fields.push((name, v.clone()));
    }
}

/// Mobile sign-in; serialized directly as the remote JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInMobileRequest {
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub pass_code: String,
    #[serde(default)]
    pub login_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
}

impl SignInMobileRequest {
    pub fn normalized(self) -> Result<Self, FloorError> {
        Ok(Self {
            mobile_number: required("mobile_number", self.mobile_number)?,
            pass_code: required("pass_code", self.pass_code)?,
            login_type: required("login_type", self.login_type)?,
            app_id: optional(self.app_id),
        })
    }
}

/// Inbound body of POST /memory/auth/send-validation-code.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendValidationCodePayload {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email_id: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
}

impl SendValidationCodePayload {
    /// Build the remote request; `mobile_number` becomes `mobiles_number`.
    pub fn into_request(self) -> Result<SendValidationCodeRequest, FloorError> {
        Ok(SendValidationCodeRequest {
            mode: required("mode", self.mode)?,
            user_id: optional(self.user_id),
            email_id: optional(self.email_id),
            mobiles_number: optional(self.mobile_number),
        })
    }
}

/// Remote body for sending a validation code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendValidationCodeRequest {
    pub mode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobiles_number: Option<String>,
}

/// Successful remote response: status, headers and the body as plain JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

impl RemoteResponse {
    pub fn ok(body: serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// First non-blank value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .find(|v| !v.trim().is_empty())
    }
}
