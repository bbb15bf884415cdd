use cfn_resource_core::contract::{
    HandlerError, HandlerOutcome, HandlerResult, LifecycleEvent, ResourceData,
};
use cfn_resource_lambda::adapters::context::InvocationContext;
use cfn_resource_lambda::config::DeliveryConfig;
use cfn_resource_lambda::handlers::dispatcher::ResourceDispatcher;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

/// Keys CloudFormation injects into ResourceProperties that are not part of the
/// resource's own configuration.
const RESERVED_PROPERTIES: &[&str] = &["ServiceToken"];

/// Echoes the resource's properties back as response data so templates can
/// `Fn::GetAtt` them. Delete falls through to the default handler.
fn echo_properties(
    event: &LifecycleEvent,
    _context: &dyn InvocationContext,
) -> Result<HandlerOutcome, HandlerError> {
    Ok(HandlerResult::default()
        .with_data(public_properties(&event.resource_properties))
        .into())
}

fn public_properties(properties: &ResourceData) -> ResourceData {
    properties
        .iter()
        .filter(|(key, _)| !RESERVED_PROPERTIES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn build_dispatcher(config: &DeliveryConfig) -> Result<ResourceDispatcher, Error> {
    let mut dispatcher = ResourceDispatcher::with_http_delivery(config)
        .map_err(|error| Error::from(format!("failed to set up response delivery: {error}")))?;
    dispatcher
        .on_create(echo_properties)
        .on_update(echo_properties);
    Ok(dispatcher)
}

async fn handle_request(
    dispatcher: &ResourceDispatcher,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let LambdaEvent { payload, context } = event;

    // Handlers and the response PUT block; keep them off the async executor.
    let result = tokio::task::block_in_place(|| dispatcher.dispatch_json(payload, &context))
        .map_err(Error::from)?;

    serde_json::to_value(result)
        .map_err(|error| Error::from(format!("failed to serialize handler result: {error}")))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config =
        DeliveryConfig::from_env().map_err(|error| Error::from(error.message().to_string()))?;
    let dispatcher = tokio::task::block_in_place(|| build_dispatcher(&config))?;
    let dispatcher = &dispatcher;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(dispatcher, event).await
    }))
    .await
}
