/// Execution metadata handed to resource handlers. Read-only; remaining time is
/// informational and never enforced by the dispatcher.
pub trait InvocationContext {
    fn function_name(&self) -> &str;
    fn function_version(&self) -> &str;
    fn remaining_time_millis(&self) -> i64;
    fn aws_request_id(&self) -> &str;
    fn invoked_function_arn(&self) -> &str;
    fn memory_limit_in_mb(&self) -> i32;
}

impl InvocationContext for lambda_runtime::Context {
    fn function_name(&self) -> &str {
        &self.env_config.function_name
    }

    fn function_version(&self) -> &str {
        &self.env_config.version
    }

    fn remaining_time_millis(&self) -> i64 {
        let deadline_ms = i64::try_from(self.deadline).unwrap_or(i64::MAX);
        deadline_ms
            .saturating_sub(chrono::Utc::now().timestamp_millis())
            .max(0)
    }

    fn aws_request_id(&self) -> &str {
        &self.request_id
    }

    fn invoked_function_arn(&self) -> &str {
        &self.invoked_function_arn
    }

    fn memory_limit_in_mb(&self) -> i32 {
        self.env_config.memory
    }
}

/// Fixed context for local invocations and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticInvocationContext {
    pub function_name: String,
    pub function_version: String,
    pub remaining_time_millis: i64,
    pub aws_request_id: String,
    pub invoked_function_arn: String,
    pub memory_limit_in_mb: i32,
}

impl StaticInvocationContext {
    pub fn new(function_name: impl Into<String>) -> Self {
        let function_name = function_name.into();
        Self {
            invoked_function_arn: format!(
                "arn:aws:lambda:us-east-1:123456789012:function:{function_name}"
            ),
            function_name,
            function_version: "$LATEST".to_string(),
            remaining_time_millis: 10_000,
            aws_request_id: "1234567890".to_string(),
            memory_limit_in_mb: 1024,
        }
    }
}

impl InvocationContext for StaticInvocationContext {
    fn function_name(&self) -> &str {
        &self.function_name
    }

    fn function_version(&self) -> &str {
        &self.function_version
    }

    fn remaining_time_millis(&self) -> i64 {
        self.remaining_time_millis
    }

    fn aws_request_id(&self) -> &str {
        &self.aws_request_id
    }

    fn invoked_function_arn(&self) -> &str {
        &self.invoked_function_arn
    }

    fn memory_limit_in_mb(&self) -> i32 {
        self.memory_limit_in_mb
    }
}
