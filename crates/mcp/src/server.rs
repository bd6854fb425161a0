//! MCP server exposing deployed workflows as callable tools.
//!
//! Each visible, active workflow becomes one tool whose input schema is
//! generated from the workflow's parameter specs. Tool calls forward to
//! the gateway; images come back inline as base64 content, or are written
//! to disk when the caller passes `save_path`.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, ListToolsResult,
    PaginatedRequestParam, ProtocolVersion, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::{ErrorData as McpError, ServerHandler};
use serde_json::Map;

use comfydeck_core::{Workspace, WorkflowEntry};

use crate::gateway::GatewayClient;
use crate::schema::{input_schema, SAVE_PATH_ARG};

/// MCP handler over one deployed workspace.
#[derive(Clone)]
pub struct ComfyDeckServer {
    workspace: Arc<Workspace>,
    gateway: GatewayClient,
}

impl ComfyDeckServer {
    pub fn new(workspace: Arc<Workspace>, gateway: GatewayClient) -> Self {
        Self { workspace, gateway }
    }
}

/// Build the tool list for a set of workflows.
pub fn tool_catalog<'a>(entries: impl Iterator<Item = &'a WorkflowEntry>) -> Vec<Tool> {
    entries
        .map(|entry| {
            let description = entry
                .config
                .description
                .clone()
                .unwrap_or_else(|| format!("Run the '{}' workflow", entry.name));
            Tool::new(
                entry.name.clone(),
                description,
                Arc::new(input_schema(&entry.config.parameters)),
            )
        })
        .collect()
}

impl ServerHandler for ComfyDeckServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Image generation workflows. Each tool runs one workflow and returns \
                 the generated image; pass save_path to write it to disk instead."
                    .to_string(),
            ),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: tool_catalog(self.workspace.visible()),
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let name = request.name.as_ref();

        // Only visible workflows are callable; hidden ones stay hidden
        // even if a client guesses the name.
        if !self.workspace.visible().any(|e| e.name == name) {
            return Err(McpError::invalid_params(
                format!("Unknown tool: {name}"),
                None,
            ));
        }

        let mut args: Map<String, serde_json::Value> = request.arguments.unwrap_or_default();
        let save_path = args
            .remove(SAVE_PATH_ARG)
            .and_then(|v| v.as_str().map(str::to_string));

        tracing::info!(tool = %name, args = args.len(), "Tool call");

        let response = self.gateway.run(name, &args).await.map_err(|e| {
            if e.is_caller_error() {
                McpError::invalid_params(e.to_string(), None)
            } else {
                McpError::internal_error(e.to_string(), None)
            }
        })?;

        if let Some(prompt_id) = &response.prompt_id {
            tracing::info!(tool = %name, prompt_id = %prompt_id, bytes = response.data.len(), "Tool call complete");
        }

        match save_path {
            Some(path) => {
                tokio::fs::write(&path, &response.data).await.map_err(|e| {
                    McpError::internal_error(
                        format!("Failed to write image to {path}: {e}"),
                        None,
                    )
                })?;
                Ok(CallToolResult::success(vec![Content::text(format!(
                    "Image saved to {path}"
                ))]))
            }
            None => Ok(CallToolResult::success(vec![Content::image(
                BASE64.encode(&response.data),
                response.content_type,
            )])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comfydeck_core::{WorkflowConfig, WorkflowGraph};

    fn entry(name: &str, yaml: &str) -> WorkflowEntry {
        let graph = WorkflowGraph::from_json(
            r#"{"6": {"class_type": "CLIPTextEncode", "inputs": {"text": "x"}}}"#,
        )
        .unwrap();
        WorkflowEntry {
            name: name.to_string(),
            config: WorkflowConfig::from_yaml(yaml).unwrap(),
            graph,
            test_input: None,
        }
    }

    #[test]
    fn catalog_carries_schema_and_description() {
        let e = entry(
            "txt2img",
            r#"
name: Text to Image
description: Generate an image from text
parameters:
  prompt:
    type: string
    required: true
    comfyui:
      node_id: "6"
      field: inputs
      subfield: text
"#,
        );
        let tools = tool_catalog([&e].into_iter());
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "txt2img");
        assert_eq!(
            tools[0].description.as_deref(),
            Some("Generate an image from text")
        );
        let schema = tools[0].input_schema.as_ref();
        assert_eq!(schema["properties"]["prompt"]["type"], "string");
    }

    #[test]
    fn catalog_falls_back_to_generated_description() {
        let e = entry("upscale", "name: Upscale\nparameters: {}\n");
        let tools = tool_catalog([&e].into_iter());
        assert_eq!(tools[0].description.as_deref(), Some("Run the 'upscale' workflow"));
    }
}
