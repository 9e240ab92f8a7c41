//! SQS-compatible queue sink (AWS JSON 1.0 protocol, unsigned).

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::PublishError;

use super::{MessageSink, Result};

const CONTENT_TYPE: &str = "application/x-amz-json-1.0";
const SEND_MESSAGE_TARGET: &str = "AmazonSQS.SendMessage";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessageRequest<'a> {
    queue_url: &'a str,
    message_body: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SendMessageResponse {
    #[serde(default)]
    message_id: Option<String>,
}

/// Message sink posting `SendMessage` requests.
pub struct SqsSink {
    client: Client,
    endpoint: Option<String>,
}

impl SqsSink {
    /// Create a sink. Without an explicit endpoint, requests go to the queue URL.
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    fn endpoint_for<'a>(&'a self, destination: &'a str) -> &'a str {
        self.endpoint.as_deref().unwrap_or(destination)
    }
}

impl MessageSink for SqsSink {
    fn send(&self, destination: &str, body: &str) -> Result<()> {
        let endpoint = self.endpoint_for(destination);
        let request = SendMessageRequest {
            queue_url: destination,
            message_body: body,
        };

        let response = self
            .client
            .post(endpoint)
            .header("X-Amz-Target", SEND_MESSAGE_TARGET)
            .header("Content-Type", CONTENT_TYPE)
            .json(&request)
            .send()
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        // The message id is informational only.
        if let Ok(sent) = response.json::<SendMessageResponse>() {
            debug!("Queued message {:?}", sent.message_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_body() {
        let request = SendMessageRequest {
            queue_url: "http://localhost:4566/000000000000/items",
            message_body: "[]",
        };
        assert_eq!(
            serde_json::to_string(&request).unwrap(),
            r#"{"QueueUrl":"http://localhost:4566/000000000000/items","MessageBody":"[]"}"#
        );
    }

    #[test]
    fn test_endpoint_defaults_to_queue_url() {
        let sink = SqsSink::new(None, Duration::from_secs(1)).unwrap();
        assert_eq!(sink.endpoint_for("http://q/1/items"), "http://q/1/items");

        let sink = SqsSink::new(Some("http://proxy".to_string()), Duration::from_secs(1)).unwrap();
        assert_eq!(sink.endpoint_for("http://q/1/items"), "http://proxy");
    }

    #[test]
    fn test_unreachable_queue() {
        let sink = SqsSink::new(None, Duration::from_secs(2)).unwrap();
        assert!(matches!(
            sink.send("http://127.0.0.1:9/000000000000/items", "[]"),
            Err(PublishError::Transport(_))
        ));
    }
}
