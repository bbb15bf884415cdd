use std::time::Duration;

pub const RESPONSE_TIMEOUT_ENV: &str = "CFN_RESPONSE_TIMEOUT_SECS";
pub const RESPONSE_CONTENT_TYPE_ENV: &str = "CFN_RESPONSE_CONTENT_TYPE";
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// Presigned S3 response URLs are signed without a content type, so the header
/// is sent empty unless configured otherwise.
pub const DEFAULT_RESPONSE_CONTENT_TYPE: &str = "";

/// How response envelopes are PUT back to CloudFormation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    pub timeout: Duration,
    pub content_type: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RESPONSE_TIMEOUT,
            content_type: DEFAULT_RESPONSE_CONTENT_TYPE.to_string(),
        }
    }
}

impl DeliveryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let timeout = match lookup(RESPONSE_TIMEOUT_ENV) {
            None => DEFAULT_RESPONSE_TIMEOUT,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::new(format!(
                        "{RESPONSE_TIMEOUT_ENV} must be a positive integer, got '{raw}'"
                    )));
                }
                Ok(seconds) => Duration::from_secs(seconds),
            },
        };

        let content_type = lookup(RESPONSE_CONTENT_TYPE_ENV)
            .map(|value| value.trim().to_string())
            .unwrap_or_else(|| DEFAULT_RESPONSE_CONTENT_TYPE.to_string());

        Ok(Self {
            timeout,
            content_type,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ConfigError {}
