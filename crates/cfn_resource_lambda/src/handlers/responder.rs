use cfn_resource_core::contract::ResponseEnvelope;
use serde_json::json;

use crate::adapters::response_sender::{DeliveryError, ResponseSender};
use crate::logging::log_info;

/// Serializes envelopes and hands them to the configured sender. One PUT per
/// call, no retry.
pub struct Responder {
    sender: Box<dyn ResponseSender>,
}

impl Responder {
    pub fn new(sender: impl ResponseSender + 'static) -> Self {
        Self {
            sender: Box::new(sender),
        }
    }

    pub fn deliver(
        &self,
        envelope: &ResponseEnvelope,
        response_url: &str,
    ) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(envelope).map_err(|error| {
            DeliveryError::new(format!("failed to serialize response envelope: {error}"))
        })?;

        self.sender.put_response(response_url, &body)?;

        // The URL is presigned; never log it.
        log_info(
            "responder",
            "response_delivered",
            json!({
                "status": envelope.status.as_str(),
                "request_id": envelope.request_id.clone(),
                "logical_resource_id": envelope.logical_resource_id.clone(),
                "physical_resource_id": envelope.physical_resource_id.clone(),
                "body_bytes": body.len(),
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use cfn_resource_core::contract::{ResourceData, ResponseStatus};
    use serde_json::Value;

    use super::*;

    struct CapturingSender {
        calls: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ResponseSender for CapturingSender {
        fn put_response(&self, response_url: &str, body: &[u8]) -> Result<(), DeliveryError> {
            self.calls
                .lock()
                .expect("poisoned mutex")
                .push((response_url.to_string(), body.to_vec()));
            Ok(())
        }
    }

    struct RejectingSender;

    impl ResponseSender for RejectingSender {
        fn put_response(&self, _response_url: &str, _body: &[u8]) -> Result<(), DeliveryError> {
            Err(DeliveryError::with_status("rejected", 403))
        }
    }

    fn sample_envelope() -> ResponseEnvelope {
        ResponseEnvelope {
            status: ResponseStatus::Success,
            reason: "ok".to_string(),
            physical_resource_id: "thing-1".to_string(),
            stack_id: "stack-1".to_string(),
            request_id: "request-1".to_string(),
            logical_resource_id: "Thing".to_string(),
            data: ResourceData::new(),
        }
    }

    #[test]
    fn delivers_serialized_envelope_once() {
        let sender = Arc::new(CapturingSender {
            calls: Mutex::new(Vec::new()),
        });
        let responder = Responder::new(Arc::clone(&sender));

        responder
            .deliver(&sample_envelope(), "https://example.com/response?sig=1")
            .expect("delivery should succeed");

        let calls = sender.calls.lock().expect("poisoned mutex");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "https://example.com/response?sig=1");

        let body: Value = serde_json::from_slice(&calls[0].1).expect("body should be json");
        assert_eq!(body["Status"], "SUCCESS");
        assert_eq!(body["PhysicalResourceId"], "thing-1");
        assert_eq!(body["Data"], serde_json::json!({}));
    }

    #[test]
    fn surfaces_sender_failure() {
        let responder = Responder::new(RejectingSender);

        let error = responder
            .deliver(&sample_envelope(), "https://example.com/response")
            .expect_err("rejection should surface");

        assert_eq!(error.status_code, Some(403));
    }
}
