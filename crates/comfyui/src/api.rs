//! REST wrapper for the ComfyUI HTTP endpoints.
//!
//! Covers prompt submission (`POST /prompt`), history retrieval
//! (`GET /history/{prompt_id}`), output image download (`GET /view`),
//! the health probe (`GET /system_stats`), and interruption
//! (`POST /interrupt`).

use serde::Deserialize;

/// HTTP client for one ComfyUI server.
pub struct ComfyApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response from `POST /prompt` after the workflow is queued.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued prompt.
    pub prompt_id: String,
    /// Position in the execution queue.
    pub number: i32,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    Api {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ComfyApi {
    /// Create an API client for the given base URL (e.g. `http://host:8188`).
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Reuse an existing [`reqwest::Client`] for connection pooling.
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Submit an injected workflow graph for execution.
    pub async fn submit_prompt(
        &self,
        workflow: &serde_json::Value,
        client_id: &str,
    ) -> Result<SubmitResponse, ComfyApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the execution history for a prompt. The returned JSON holds
    /// per-node outputs, including generated image file references.
    pub async fn get_history(&self, prompt_id: &str) -> Result<serde_json::Value, ComfyApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download an output image by the file reference found in history.
    pub async fn get_image(
        &self,
        filename: &str,
        subfolder: &str,
        folder_type: &str,
    ) -> Result<Vec<u8>, ComfyApiError> {
        let response = self
            .client
            .get(format!("{}/view", self.api_url))
            .query(&[
                ("filename", filename),
                ("subfolder", subfolder),
                ("type", folder_type),
            ])
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Probe `GET /system_stats`. ComfyUI servers are known to stop
    /// responding under memory pressure; callers treat a failed probe as
    /// "do not submit".
    pub async fn health_check(&self) -> Result<(), ComfyApiError> {
        let response = self
            .client
            .get(format!("{}/system_stats", self.api_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    /// Interrupt whatever is executing right now.
    pub async fn interrupt(&self) -> Result<(), ComfyApiError> {
        let response = self
            .client
            .post(format!("{}/interrupt", self.api_url))
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    async fn check_status(response: reqwest::Response) -> Result<(), ComfyApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}
