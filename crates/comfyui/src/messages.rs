//! ComfyUI WebSocket message types.
//!
//! ComfyUI broadcasts JSON frames shaped `{"type": "<kind>", "data": {..}}`
//! while a prompt executes. This module deserializes the kinds we care
//! about into a typed [`ComfyMessage`] enum; unknown kinds parse as errors
//! and callers log and skip them.

use serde::Deserialize;

/// Known ComfyUI WebSocket message kinds.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ComfyMessage {
    /// Queue status broadcast.
    #[serde(rename = "status")]
    Status(StatusData),

    /// A prompt has started executing.
    #[serde(rename = "execution_start")]
    ExecutionStart(ExecutionStartData),

    /// Nodes served from the execution cache.
    #[serde(rename = "execution_cached")]
    ExecutionCached(ExecutionCachedData),

    /// A node is executing; `node: null` signals the prompt finished.
    #[serde(rename = "executing")]
    Executing(ExecutingData),

    /// Step-level progress within a long-running node.
    #[serde(rename = "progress")]
    Progress(ProgressData),

    /// A node finished and produced output.
    #[serde(rename = "executed")]
    Executed(ExecutedData),

    /// Execution failed inside a node.
    #[serde(rename = "execution_error")]
    ExecutionError(ErrorData),
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusData {
    pub status: QueueStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueueStatus {
    pub exec_info: ExecInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecInfo {
    pub queue_remaining: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionStartData {
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionCachedData {
    pub prompt_id: String,
    #[serde(default)]
    pub nodes: Vec<String>,
}

/// `node` is `None` once every node of the prompt has run.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutingData {
    pub node: Option<String>,
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressData {
    pub value: i32,
    pub max: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutedData {
    pub node: String,
    pub output: serde_json::Value,
    pub prompt_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorData {
    pub prompt_id: String,
    pub node_id: String,
    pub exception_message: String,
    pub exception_type: String,
}

/// Parse a ComfyUI WebSocket text frame.
pub fn parse_message(text: &str) -> Result<ComfyMessage, serde_json::Error> {
    serde_json::from_str(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_status() {
        let json = r#"{"type":"status","data":{"status":{"exec_info":{"queue_remaining":2}}}}"#;
        match parse_message(json).unwrap() {
            ComfyMessage::Status(data) => {
                assert_eq!(data.status.exec_info.queue_remaining, 2);
            }
            other => panic!("Expected Status, got {other:?}"),
        }
    }

    #[test]
    fn parses_executing_with_node() {
        let json = r#"{"type":"executing","data":{"node":"3","prompt_id":"p-1"}}"#;
        match parse_message(json).unwrap() {
            ComfyMessage::Executing(data) => {
                assert_eq!(data.node.as_deref(), Some("3"));
                assert_eq!(data.prompt_id, "p-1");
            }
            other => panic!("Expected Executing, got {other:?}"),
        }
    }

    #[test]
    fn parses_executing_completion_signal() {
        let json = r#"{"type":"executing","data":{"node":null,"prompt_id":"p-1"}}"#;
        match parse_message(json).unwrap() {
            ComfyMessage::Executing(data) => assert!(data.node.is_none()),
            other => panic!("Expected Executing, got {other:?}"),
        }
    }

    #[test]
    fn parses_progress() {
        let json = r#"{"type":"progress","data":{"value":10,"max":20}}"#;
        match parse_message(json).unwrap() {
            ComfyMessage::Progress(data) => {
                assert_eq!(data.value, 10);
                assert_eq!(data.max, 20);
            }
            other => panic!("Expected Progress, got {other:?}"),
        }
    }

    #[test]
    fn parses_executed_output() {
        let json = r#"{"type":"executed","data":{"node":"9","output":{"images":[{"filename":"x.png"}]},"prompt_id":"p-1"}}"#;
        match parse_message(json).unwrap() {
            ComfyMessage::Executed(data) => {
                assert_eq!(data.node, "9");
                assert!(data.output["images"].is_array());
            }
            other => panic!("Expected Executed, got {other:?}"),
        }
    }

    #[test]
    fn parses_execution_error() {
        let json = r#"{"type":"execution_error","data":{"prompt_id":"p-1","node_id":"3","exception_message":"CUDA out of memory","exception_type":"RuntimeError"}}"#;
        match parse_message(json).unwrap() {
            ComfyMessage::ExecutionError(data) => {
                assert_eq!(data.node_id, "3");
                assert_eq!(data.exception_message, "CUDA out of memory");
            }
            other => panic!("Expected ExecutionError, got {other:?}"),
        }
    }

    #[test]
    fn parses_cached_with_and_without_nodes() {
        let with = r#"{"type":"execution_cached","data":{"prompt_id":"p","nodes":["1","2"]}}"#;
        match parse_message(with).unwrap() {
            ComfyMessage::ExecutionCached(data) => assert_eq!(data.nodes.len(), 2),
            other => panic!("Expected ExecutionCached, got {other:?}"),
        }
        let without = r#"{"type":"execution_cached","data":{"prompt_id":"p"}}"#;
        match parse_message(without).unwrap() {
            ComfyMessage::ExecutionCached(data) => assert!(data.nodes.is_empty()),
            other => panic!("Expected ExecutionCached, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_is_an_error() {
        assert!(parse_message(r#"{"type":"crystools.monitor","data":{}}"#).is_err());
        assert!(parse_message("garbage").is_err());
    }
}
