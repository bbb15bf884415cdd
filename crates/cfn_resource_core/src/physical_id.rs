use sha2::{Digest, Sha256};

use crate::contract::LifecycleEvent;

const SYNTHESIZED_SUFFIX_LEN: usize = 12;

/// Physical id used when a handler does not name one: the event's own id, or a
/// synthesized one for Create events that have none yet.
pub fn resolve_physical_resource_id(event: &LifecycleEvent) -> String {
    match event.physical_resource_id.as_deref() {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => synthesize_physical_resource_id(
            &event.stack_id,
            &event.logical_resource_id,
            &event.request_id,
        ),
    }
}

/// `<stack-name>-<logical-id>-<12 hex chars>`; the suffix hashes all three
/// inputs so the same request always yields the same id.
pub fn synthesize_physical_resource_id(
    stack_id: &str,
    logical_resource_id: &str,
    request_id: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stack_id.as_bytes());
    hasher.update(b"|");
    hasher.update(logical_resource_id.as_bytes());
    hasher.update(b"|");
    hasher.update(request_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!(
        "{}-{}-{}",
        stack_name(stack_id),
        logical_resource_id,
        &digest[..SYNTHESIZED_SUFFIX_LEN]
    )
}

/// Stack name out of `arn:aws:cloudformation:<region>:<account>:stack/<name>/<uuid>`.
/// Anything that does not look like a stack ARN is used as-is.
pub fn stack_name(stack_id: &str) -> &str {
    stack_id
        .split_once(":stack/")
        .and_then(|(_, rest)| rest.split('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(stack_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK_ID: &str = "arn:aws:cloudformation:us-east-1:123456789012:stack/SomeStackHere3/d50d1280-a454-11e5-bd51-50e2416294a8";

    #[test]
    fn stack_name_extracts_name_from_arn() {
        assert_eq!(stack_name(STACK_ID), "SomeStackHere3");
    }

    #[test]
    fn stack_name_falls_back_to_raw_value() {
        assert_eq!(stack_name("not-an-arn"), "not-an-arn");
        let empty_name = "arn:aws:cloudformation:x:y:stack//uuid";
        assert_eq!(stack_name(empty_name), empty_name);
    }

    #[test]
    fn synthesized_id_is_deterministic() {
        let first = synthesize_physical_resource_id(STACK_ID, "FakeThing", "request-1");
        let second = synthesize_physical_resource_id(STACK_ID, "FakeThing", "request-1");

        assert_eq!(first, second);
        assert!(first.starts_with("SomeStackHere3-FakeThing-"));
        assert_eq!(
            first.len(),
            "SomeStackHere3-FakeThing-".len() + SYNTHESIZED_SUFFIX_LEN
        );
    }

    #[test]
    fn synthesized_id_changes_with_request() {
        let first = synthesize_physical_resource_id(STACK_ID, "FakeThing", "request-1");
        let second = synthesize_physical_resource_id(STACK_ID, "FakeThing", "request-2");

        assert_ne!(first, second);
    }
}
