//! WebSocket connection bootstrap for a ComfyUI server.
//!
//! [`ComfyClient`] holds the server's base URL; [`ComfyClient::connect`]
//! opens the `/ws` endpoint with a fresh client ID so ComfyUI can address
//! execution messages back to us.

use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Connection configuration for one ComfyUI server.
#[derive(Debug, Clone)]
pub struct ComfyClient {
    api_url: String,
    ws_url: String,
}

/// A live WebSocket connection plus the identifiers tied to it.
pub struct ComfyConnection {
    /// Client ID sent during the handshake; submitted prompts must carry
    /// the same ID for their messages to reach this connection.
    pub client_id: String,
    pub ws_stream: WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

/// Errors from the WebSocket layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyClientError {
    #[error("Connection error: {0}")]
    Connection(String),
}

impl ComfyClient {
    /// Create a client from the server's HTTP base URL
    /// (e.g. `http://host:8188`). The WebSocket URL is derived from it.
    pub fn new(api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        let ws_url = ws_url_from_http(&api_url);
        Self { api_url, ws_url }
    }

    /// HTTP base URL.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// WebSocket base URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Open the `/ws` endpoint with a freshly generated client ID.
    pub async fn connect(&self) -> Result<ComfyConnection, ComfyClientError> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{}/ws?clientId={}", self.ws_url, client_id);

        let (ws_stream, _response) = connect_async(&url).await.map_err(|e| {
            ComfyClientError::Connection(format!(
                "Failed to connect to ComfyUI at {}: {e}",
                self.ws_url
            ))
        })?;

        tracing::info!(client_id = %client_id, url = %self.ws_url, "Connected to ComfyUI");

        Ok(ComfyConnection {
            client_id,
            ws_stream,
        })
    }
}

/// Derive the WebSocket base URL from an HTTP base URL.
fn ws_url_from_http(api_url: &str) -> String {
    if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        format!("ws://{api_url}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_ws_url() {
        assert_eq!(ws_url_from_http("http://localhost:8188"), "ws://localhost:8188");
        assert_eq!(ws_url_from_http("https://comfy.example.com"), "wss://comfy.example.com");
        assert_eq!(ws_url_from_http("localhost:8188"), "ws://localhost:8188");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = ComfyClient::new("http://localhost:8188/");
        assert_eq!(client.api_url(), "http://localhost:8188");
        assert_eq!(client.ws_url(), "ws://localhost:8188");
    }
}
