use std::sync::Arc;

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;

use crate::config::DeliveryConfig;

/// Transport used for the single PUT back to CloudFormation. Swapped out in
/// tests and local runs.
pub trait ResponseSender: Send + Sync {
    fn put_response(&self, response_url: &str, body: &[u8]) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryError {
    pub message: String,
    pub status_code: Option<u16>,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }

    pub fn with_status(message: impl Into<String>, status_code: u16) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status_code),
        }
    }
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for DeliveryError {}

impl<T: ResponseSender + ?Sized> ResponseSender for Arc<T> {
    fn put_response(&self, response_url: &str, body: &[u8]) -> Result<(), DeliveryError> {
        (**self).put_response(response_url, body)
    }
}

/// Blocking HTTP PUT to the presigned response URL.
#[derive(Debug, Clone)]
pub struct HttpResponseSender {
    client: Client,
    content_type: String,
}

impl HttpResponseSender {
    pub fn new(config: &DeliveryConfig) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|error| {
                DeliveryError::new(format!("failed to build response client: {error}"))
            })?;
        Ok(Self {
            client,
            content_type: config.content_type.clone(),
        })
    }
}

impl ResponseSender for HttpResponseSender {
    fn put_response(&self, response_url: &str, body: &[u8]) -> Result<(), DeliveryError> {
        let response = self
            .client
            .put(response_url)
            .header(CONTENT_TYPE, self.content_type.as_str())
            .body(body.to_vec())
            .send()
            .map_err(|error| DeliveryError::new(format!("failed to send response: {error}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::with_status(
                format!("response endpoint rejected envelope with status {status}"),
                status.as_u16(),
            ));
        }
        Ok(())
    }
}

/// Accepts every envelope without sending it anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResponseSender;

impl ResponseSender for NoopResponseSender {
    fn put_response(&self, _response_url: &str, _body: &[u8]) -> Result<(), DeliveryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wiremock::matchers::{body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn put_blocking(
        config: DeliveryConfig,
        url: String,
        body: &'static str,
    ) -> tokio::task::JoinHandle<Result<(), DeliveryError>> {
        // The blocking client must live and die off the async worker threads.
        tokio::task::spawn_blocking(move || {
            HttpResponseSender::new(&config)?.put_response(&url, body.as_bytes())
        })
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn puts_body_to_presigned_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/responses/stack-1"))
            .and(query_param("Signature", "abc="))
            .and(body_string("{\"Status\":\"SUCCESS\"}"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/responses/stack-1?Signature=abc%3D", server.uri());
        put_blocking(DeliveryConfig::default(), url, "{\"Status\":\"SUCCESS\"}")
            .await
            .expect("blocking task should join")
            .expect("delivery should succeed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn honours_configured_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = DeliveryConfig {
            timeout: Duration::from_secs(5),
            content_type: "application/json".to_string(),
        };
        put_blocking(config, format!("{}/r", server.uri()), "{}")
            .await
            .expect("blocking task should join")
            .expect("delivery should succeed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reports_rejected_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let error = put_blocking(DeliveryConfig::default(), format!("{}/r", server.uri()), "{}")
            .await
            .expect("blocking task should join")
            .expect_err("403 should be a delivery error");

        assert_eq!(error.status_code, Some(403));
        assert!(error.message.contains("403"));
    }

    #[test]
    fn reports_unreachable_endpoint() {
        let config = DeliveryConfig {
            timeout: Duration::from_secs(1),
            content_type: String::new(),
        };
        let sender = HttpResponseSender::new(&config).expect("client should build");

        let error = sender
            .put_response("http://127.0.0.1:9/unreachable", b"{}")
            .expect_err("closed port should fail");

        assert_eq!(error.status_code, None);
        assert!(error.message.starts_with("failed to send response"));
    }
}
