//! Textract-compatible JSON API client.
//!
//! Requests use the AWS JSON 1.1 protocol (`X-Amz-Target` header plus a JSON
//! body). Request signing is not performed; the endpoint must accept
//! unsigned requests (local emulators, signing proxies).

use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::JobError;
use crate::models::DocumentLocation;
use crate::models::config::AnalysisConfig;

use super::{AnalysisBackend, AnalysisPage, FeatureType, Result};

const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "Textract";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartRequest<'a> {
    document_location: RequestLocation<'a>,
    feature_types: &'a [FeatureType],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestLocation<'a> {
    s3_object: RequestObject<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RequestObject<'a> {
    bucket: &'a str,
    name: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StartResponse {
    job_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct GetRequest<'a> {
    job_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

/// Analysis backend talking to a Textract-compatible HTTP endpoint.
pub struct TextractHttpBackend {
    client: Client,
    endpoint: String,
}

impl TextractHttpBackend {
    /// Create a client for the configured endpoint.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| JobError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn call<Req, Resp>(&self, operation: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        debug!("POST {} {}.{}", self.endpoint, TARGET_PREFIX, operation);

        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .header("Content-Type", CONTENT_TYPE)
            .json(request)
            .send()
            .map_err(|e| JobError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(JobError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Resp>()
            .map_err(|e| JobError::Decode(e.to_string()))
    }
}

impl AnalysisBackend for TextractHttpBackend {
    fn start_analysis(&self, location: &DocumentLocation, features: &[FeatureType]) -> Result<String> {
        let request = StartRequest {
            document_location: RequestLocation {
                s3_object: RequestObject {
                    bucket: &location.bucket,
                    name: &location.key,
                },
            },
            feature_types: features,
        };

        let response: StartResponse = self.call("StartDocumentAnalysis", &request)?;
        Ok(response.job_id)
    }

    fn get_analysis(&self, job_id: &str, next_token: Option<&str>) -> Result<AnalysisPage> {
        self.call("GetDocumentAnalysis", &GetRequest { job_id, next_token })
    }
}
