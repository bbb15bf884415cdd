use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use cfn_resource_core::contract::{
    salvage_failure_envelope, HandlerError, HandlerOutcome, HandlerResult, LifecycleEvent,
    RequestType, ResourceData, ResponseEnvelope, ResponseStatus, DEFAULT_SUCCESS_REASON,
};
use cfn_resource_core::physical_id::resolve_physical_resource_id;
use serde_json::{json, Value};

use crate::adapters::context::InvocationContext;
use crate::adapters::response_sender::{DeliveryError, HttpResponseSender, ResponseSender};
use crate::config::DeliveryConfig;
use crate::handlers::responder::Responder;
use crate::logging::{log_error, log_info};

pub type ResourceHandler = Box<
    dyn Fn(&LifecycleEvent, &dyn InvocationContext) -> Result<HandlerOutcome, HandlerError>
        + Send
        + Sync,
>;

/// Routes lifecycle events to registered handlers and answers CloudFormation
/// with exactly one envelope per dispatch, unless the handler opts out.
///
/// Handlers are registered during setup; a later registration for the same
/// request type replaces the earlier one. Request types without a handler fall
/// back to [`default_handler`].
pub struct ResourceDispatcher {
    handlers: BTreeMap<RequestType, ResourceHandler>,
    responder: Responder,
}

impl ResourceDispatcher {
    pub fn new(sender: impl ResponseSender + 'static) -> Self {
        Self {
            handlers: BTreeMap::new(),
            responder: Responder::new(sender),
        }
    }

    /// Dispatcher that PUTs envelopes to CloudFormation over HTTP.
    pub fn with_http_delivery(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        Ok(Self::new(HttpResponseSender::new(config)?))
    }

    pub fn register<F>(&mut self, request_type: RequestType, handler: F) -> &mut Self
    where
        F: Fn(&LifecycleEvent, &dyn InvocationContext) -> Result<HandlerOutcome, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(request_type, Box::new(handler));
        self
    }

    pub fn on_create<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&LifecycleEvent, &dyn InvocationContext) -> Result<HandlerOutcome, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register(RequestType::Create, handler)
    }

    pub fn on_update<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&LifecycleEvent, &dyn InvocationContext) -> Result<HandlerOutcome, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register(RequestType::Update, handler)
    }

    pub fn on_delete<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&LifecycleEvent, &dyn InvocationContext) -> Result<HandlerOutcome, HandlerError>
            + Send
            + Sync
            + 'static,
    {
        self.register(RequestType::Delete, handler)
    }

    pub fn is_registered(&self, request_type: RequestType) -> bool {
        self.handlers.contains_key(&request_type)
    }

    /// Runs the handler for `event`, delivers the resulting envelope and returns
    /// the handler's own result. Handler errors and panics become a FAILED
    /// envelope; the returned value is then the failure fragment. Returns `None`
    /// without delivering anything when the handler answers `NoResponse`.
    pub fn dispatch(
        &self,
        event: &LifecycleEvent,
        context: &dyn InvocationContext,
    ) -> Option<HandlerResult> {
        let handler_kind = if self.is_registered(event.request_type) {
            "registered"
        } else {
            "default"
        };
        log_info(
            "dispatcher",
            "event_received",
            json!({
                "request_type": event.request_type.as_str(),
                "resource_type": event.resource_type.clone(),
                "stack_id": event.stack_id.clone(),
                "request_id": event.request_id.clone(),
                "logical_resource_id": event.logical_resource_id.clone(),
                "handler": handler_kind,
                "aws_request_id": context.aws_request_id(),
                "remaining_time_ms": context.remaining_time_millis(),
            }),
        );

        let (result, envelope) = match self.run_handler(event, context) {
            Ok(HandlerOutcome::Respond(result)) => {
                let envelope = ResponseEnvelope::from_handler_result(event, &result);
                (result, envelope)
            }
            Ok(HandlerOutcome::NoResponse) => {
                log_info(
                    "dispatcher",
                    "response_suppressed",
                    json!({
                        "request_type": event.request_type.as_str(),
                        "request_id": event.request_id.clone(),
                        "logical_resource_id": event.logical_resource_id.clone(),
                    }),
                );
                return None;
            }
            Err(error) => {
                log_error(
                    "dispatcher",
                    "handler_failed",
                    json!({
                        "request_type": event.request_type.as_str(),
                        "request_id": event.request_id.clone(),
                        "logical_resource_id": event.logical_resource_id.clone(),
                        "error": error.to_string(),
                    }),
                );
                (
                    HandlerResult::handler_failure(),
                    ResponseEnvelope::from_handler_failure(event),
                )
            }
        };

        self.deliver(&envelope, &event.response_url);
        Some(result)
    }

    /// Decodes a raw invocation payload and dispatches it. A payload that is not
    /// a valid lifecycle event still gets a FAILED envelope when it names a
    /// response URL and the resource it belongs to; the decode error is returned
    /// either way.
    pub fn dispatch_json(
        &self,
        payload: Value,
        context: &dyn InvocationContext,
    ) -> Result<Option<HandlerResult>, String> {
        match serde_json::from_value::<LifecycleEvent>(payload.clone()) {
            Ok(event) => Ok(self.dispatch(&event, context)),
            Err(error) => {
                let detail = error.to_string();
                let salvaged = salvage_failure_envelope(&payload, &detail);
                log_error(
                    "dispatcher",
                    "malformed_event",
                    json!({
                        "error": detail.clone(),
                        "aws_request_id": context.aws_request_id(),
                        "failure_response_sent": salvaged.is_some(),
                    }),
                );
                if let Some((response_url, envelope)) = salvaged {
                    self.deliver(&envelope, &response_url);
                }
                Err(format!("invalid custom resource event: {detail}"))
            }
        }
    }

    fn run_handler(
        &self,
        event: &LifecycleEvent,
        context: &dyn InvocationContext,
    ) -> Result<HandlerOutcome, HandlerError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            match self.handlers.get(&event.request_type) {
                Some(handler) => handler(event, context),
                None => default_handler(event, context),
            }
        }));

        outcome.unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|text| text.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "handler panicked".to_string());
            Err(format!("handler panicked: {message}").into())
        })
    }

    // Delivery failures are logged and dropped; the decided status stands.
    fn deliver(&self, envelope: &ResponseEnvelope, response_url: &str) {
        if let Err(error) = self.responder.deliver(envelope, response_url) {
            log_error(
                "dispatcher",
                "delivery_failed",
                json!({
                    "status": envelope.status.as_str(),
                    "request_id": envelope.request_id.clone(),
                    "logical_resource_id": envelope.logical_resource_id.clone(),
                    "status_code": error.status_code,
                    "error": error.message,
                }),
            );
        }
    }
}

/// Answers SUCCESS for any request type nobody registered, keeping the
/// resource's physical id (synthesized on Create).
pub fn default_handler(
    event: &LifecycleEvent,
    _context: &dyn InvocationContext,
) -> Result<HandlerOutcome, HandlerError> {
    Ok(HandlerOutcome::Respond(HandlerResult {
        status: Some(ResponseStatus::Success),
        reason: Some(DEFAULT_SUCCESS_REASON.to_string()),
        physical_resource_id: Some(resolve_physical_resource_id(event)),
        data: Some(ResourceData::new()),
    }))
}
