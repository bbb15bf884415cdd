use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::physical_id::{resolve_physical_resource_id, synthesize_physical_resource_id};

pub const DEFAULT_SUCCESS_REASON: &str = "Life is good, man";
pub const HANDLER_FAILURE_REASON: &str = "Exception was raised while handling custom resource";
pub const MALFORMED_EVENT_REASON: &str = "Malformed custom resource event";

/// Opaque key/value mapping used for resource properties and response data.
pub type ResourceData = Map<String, Value>;

/// Failure raised by user handler code. Any error type converts via `?`.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl ResponseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

/// Lifecycle request CloudFormation sends to a custom resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct LifecycleEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub resource_type: String,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: ResourceData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_resource_properties: Option<ResourceData>,
    #[serde(default)]
    pub service_token: String,
}

/// Partial response produced by a handler. Missing keys are defaulted when the
/// envelope is built.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct HandlerResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ResponseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ResourceData>,
}

impl HandlerResult {
    pub fn success() -> Self {
        Self {
            status: Some(ResponseStatus::Success),
            ..Self::default()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: Some(ResponseStatus::Failed),
            reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Fragment applied when a handler errors out.
    pub fn handler_failure() -> Self {
        Self {
            data: Some(ResourceData::new()),
            ..Self::failed(HANDLER_FAILURE_REASON)
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_physical_resource_id(mut self, physical_resource_id: impl Into<String>) -> Self {
        self.physical_resource_id = Some(physical_resource_id.into());
        self
    }

    pub fn with_data(mut self, data: ResourceData) -> Self {
        self.data = Some(data);
        self
    }
}

/// What a handler asks the dispatcher to do.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    Respond(HandlerResult),
    /// Skip delivery entirely; CloudFormation gets no answer from this invocation.
    NoResponse,
}

impl From<HandlerResult> for HandlerOutcome {
    fn from(result: HandlerResult) -> Self {
        Self::Respond(result)
    }
}

/// Body PUT to the event's ResponseURL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ResponseEnvelope {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub data: ResourceData,
}

impl ResponseEnvelope {
    pub fn from_handler_result(event: &LifecycleEvent, result: &HandlerResult) -> Self {
        Self {
            status: result.status.unwrap_or(ResponseStatus::Success),
            reason: result
                .reason
                .clone()
                .unwrap_or_else(|| DEFAULT_SUCCESS_REASON.to_string()),
            physical_resource_id: result
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| resolve_physical_resource_id(event)),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data: result.data.clone().unwrap_or_default(),
        }
    }

    pub fn from_handler_failure(event: &LifecycleEvent) -> Self {
        Self::from_handler_result(event, &HandlerResult::handler_failure())
    }
}

/// Builds a FAILED envelope for a payload that could not be decoded as a
/// `LifecycleEvent`, as long as it still names where and for whom to answer.
/// Returns the response URL alongside the envelope.
pub fn salvage_failure_envelope(
    payload: &Value,
    detail: &str,
) -> Option<(String, ResponseEnvelope)> {
    let field = |name: &str| payload.get(name).and_then(Value::as_str).map(str::to_string);

    let response_url = field("ResponseURL")?;
    let stack_id = field("StackId")?;
    let request_id = field("RequestId")?;
    let logical_resource_id = field("LogicalResourceId")?;
    let physical_resource_id = field("PhysicalResourceId")
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| {
            synthesize_physical_resource_id(&stack_id, &logical_resource_id, &request_id)
        });

    let envelope = ResponseEnvelope {
        status: ResponseStatus::Failed,
        reason: format!("{MALFORMED_EVENT_REASON}: {detail}"),
        physical_resource_id,
        stack_id,
        request_id,
        logical_resource_id,
        data: ResourceData::new(),
    };
    Some((response_url, envelope))
}
