//! HTTP client for the gateway's run endpoint.
//!
//! The MCP server never talks to ComfyUI directly; runs are forwarded to
//! the deployed gateway, which owns injection, execution, and image
//! retrieval.

use serde_json::{Map, Value};

/// Client for one deployed gateway.
#[derive(Clone)]
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

/// A completed run forwarded back from the gateway.
pub struct RunResponse {
    pub data: Vec<u8>,
    pub content_type: String,
    pub prompt_id: Option<String>,
}

/// Errors from forwarding a run to the gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Gateway request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The gateway answered with a structured error body.
    #[error("{message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },
}

impl GatewayError {
    /// Whether the caller's arguments (not the deployment) are at fault.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, GatewayError::Remote { status, .. } if *status == 400 || *status == 404)
    }
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// POST /api/v1/run with the workflow name and caller arguments.
    pub async fn run(
        &self,
        workflow: &str,
        args: &Map<String, Value>,
    ) -> Result<RunResponse, GatewayError> {
        let body = serde_json::json!({
            "workflow": workflow,
            "args": args,
        });

        let response = self
            .client
            .post(format!("{}/api/v1/run", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error_body(status.as_u16(), &body));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();
        let prompt_id = response
            .headers()
            .get("x-prompt-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Ok(RunResponse {
            data: response.bytes().await?.to_vec(),
            content_type,
            prompt_id,
        })
    }
}

/// Decode the gateway's `{"error": ..., "code": ...}` body, falling back
/// to the raw text when it is not JSON.
fn parse_error_body(status: u16, body: &str) -> GatewayError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let (code, message) = match &parsed {
        Some(v) => (
            v["code"].as_str().unwrap_or("UNKNOWN").to_string(),
            v["error"].as_str().unwrap_or(body).to_string(),
        ),
        None => ("UNKNOWN".to_string(), body.to_string()),
    };
    GatewayError::Remote {
        status,
        code,
        message,
    }
}
