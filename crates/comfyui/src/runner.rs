//! One-shot workflow run driver.
//!
//! [`run_workflow`] takes a fully injected workflow graph and drives it to
//! completion: health-check the server, open the WebSocket, submit the
//! prompt, follow execution messages until the terminal signal, then pull
//! the output images out of history and download them.

use std::time::Duration;

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::api::{ComfyApi, ComfyApiError};
use crate::client::{ComfyClient, ComfyClientError};
use crate::messages::{parse_message, ComfyMessage};

/// One downloaded output image.
#[derive(Debug, Clone)]
pub struct OutputImage {
    pub filename: String,
    pub subfolder: String,
    pub folder_type: String,
    pub data: Vec<u8>,
}

/// Result of a completed run.
#[derive(Debug)]
pub struct RunOutput {
    pub prompt_id: String,
    pub images: Vec<OutputImage>,
}

/// Errors from driving a workflow run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Api(#[from] ComfyApiError),

    #[error(transparent)]
    Connection(#[from] ComfyClientError),

    #[error("WebSocket stream error: {0}")]
    WebSocket(String),

    /// ComfyUI reported a node failure. The message is passed through
    /// unaltered so callers see the real cause (OOM, missing model, ...).
    #[error("Execution failed in node {node_id}: {message}")]
    Execution { node_id: String, message: String },

    /// The WebSocket closed before the completion signal arrived.
    #[error("Connection closed before execution completed")]
    ConnectionClosed,

    #[error("Workflow did not complete within {0:?}")]
    Timeout(Duration),

    /// History held no images for the prompt (or the requested node).
    #[error("No output images found for prompt {prompt_id}")]
    MissingOutput { prompt_id: String },
}

/// Run an injected workflow graph to completion and download its images.
///
/// When `output_node` is set, only that node's images are collected;
/// otherwise every node output in history contributes.
pub async fn run_workflow(
    api: &ComfyApi,
    client: &ComfyClient,
    workflow: &serde_json::Value,
    output_node: Option<&str>,
    timeout: Duration,
) -> Result<RunOutput, RunError> {
    api.health_check().await?;

    let mut connection = client.connect().await?;

    let submit = api.submit_prompt(workflow, &connection.client_id).await?;
    let prompt_id = submit.prompt_id;
    tracing::info!(
        prompt_id = %prompt_id,
        queue_position = submit.number,
        "Workflow submitted"
    );

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let frame = tokio::time::timeout_at(deadline, connection.ws_stream.next())
            .await
            .map_err(|_| RunError::Timeout(timeout))?;

        let message = match frame {
            Some(Ok(Message::Text(text))) => text,
            // Preview frames and pings are not relevant here.
            Some(Ok(Message::Binary(_))) | Some(Ok(Message::Ping(_)))
            | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => continue,
            Some(Ok(Message::Close(_))) | None => return Err(RunError::ConnectionClosed),
            Some(Err(e)) => return Err(RunError::WebSocket(e.to_string())),
        };

        let parsed = match parse_message(&message) {
            Ok(parsed) => parsed,
            Err(_) => {
                // Custom-node extensions broadcast their own kinds.
                tracing::debug!(raw = %message, "Skipping unrecognized WebSocket message");
                continue;
            }
        };

        match parsed {
            ComfyMessage::Executing(data) if data.prompt_id == prompt_id => {
                match data.node {
                    Some(node) => tracing::debug!(node = %node, "Executing node"),
                    None => {
                        tracing::info!(prompt_id = %prompt_id, "Execution complete");
                        break;
                    }
                }
            }
            ComfyMessage::Progress(data) => {
                tracing::debug!(value = data.value, max = data.max, "Progress");
            }
            ComfyMessage::ExecutionError(data) if data.prompt_id == prompt_id => {
                tracing::error!(
                    node_id = %data.node_id,
                    exception_type = %data.exception_type,
                    "Execution error"
                );
                return Err(RunError::Execution {
                    node_id: data.node_id,
                    message: data.exception_message,
                });
            }
            ComfyMessage::ExecutionCached(data) if data.prompt_id == prompt_id => {
                tracing::debug!(nodes = data.nodes.len(), "Nodes served from cache");
            }
            // Status broadcasts and messages for other prompts.
            _ => {}
        }
    }

    fetch_outputs(api, prompt_id, output_node, deadline, timeout).await
}

/// Fetch history and download the output images, still bounded by the run
/// deadline. The engine can hang after signalling completion; the deadline
/// covers this phase too, not just the WebSocket watch.
async fn fetch_outputs(
    api: &ComfyApi,
    prompt_id: String,
    output_node: Option<&str>,
    deadline: tokio::time::Instant,
    timeout: Duration,
) -> Result<RunOutput, RunError> {
    let fetch = async {
        let history = api.get_history(&prompt_id).await?;
        let references = extract_output_images(&history, &prompt_id, output_node);
        if references.is_empty() {
            return Err(RunError::MissingOutput {
                prompt_id: prompt_id.clone(),
            });
        }

        let mut images = Vec::with_capacity(references.len());
        for reference in references {
            let data = api
                .get_image(&reference.filename, &reference.subfolder, &reference.folder_type)
                .await?;
            images.push(OutputImage {
                filename: reference.filename,
                subfolder: reference.subfolder,
                folder_type: reference.folder_type,
                data,
            });
        }

        Ok(RunOutput {
            prompt_id: prompt_id.clone(),
            images,
        })
    };

    tokio::time::timeout_at(deadline, fetch)
        .await
        .map_err(|_| RunError::Timeout(timeout))?
}

/// File reference from history, before download.
#[derive(Debug, Clone, PartialEq)]
struct ImageRef {
    filename: String,
    subfolder: String,
    folder_type: String,
}

/// Walk `history[prompt_id].outputs` and collect image file references.
fn extract_output_images(
    history: &serde_json::Value,
    prompt_id: &str,
    output_node: Option<&str>,
) -> Vec<ImageRef> {
    let mut refs = Vec::new();

    let Some(outputs) = history[prompt_id]["outputs"].as_object() else {
        return refs;
    };

    for (node_id, output) in outputs {
        if let Some(wanted) = output_node {
            if node_id != wanted {
                continue;
            }
        }
        let Some(images) = output["images"].as_array() else {
            continue;
        };
        for image in images {
            let Some(filename) = image["filename"].as_str() else {
                continue;
            };
            refs.push(ImageRef {
                filename: filename.to_string(),
                subfolder: image["subfolder"].as_str().unwrap_or("").to_string(),
                folder_type: image["type"].as_str().unwrap_or("output").to_string(),
            });
        }
    }

    refs
}
