use std::sync::Arc;

use anyhow::Context;
use rmcp::{transport::stdio, ServiceExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comfydeck_core::Workspace;
use comfydeck_mcp::{ComfyDeckServer, GatewayClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout carries the MCP protocol; all logging goes to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comfydeck_mcp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let workspace_name = std::env::var("WORKSPACE").context("WORKSPACE must be set")?;
    let workspaces_dir =
        std::env::var("WORKSPACES_DIR").unwrap_or_else(|_| "workspaces".into());
    let subset = std::env::var("WORKFLOWS")
        .ok()
        .and_then(|raw| comfydeck_core::workspace::parse_selector(&raw));
    let gateway_url = std::env::var("COMFYDECK_GATEWAY_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:3000".into());

    let workspace = Workspace::load(
        workspaces_dir.as_ref(),
        &workspace_name,
        subset.as_deref(),
    )
    .with_context(|| format!("Failed to load workspace '{workspace_name}'"))?;

    let tool_count = workspace.visible().count();
    tracing::info!(
        workspace = %workspace_name,
        tools = tool_count,
        gateway = %gateway_url,
        "Starting MCP server on stdio"
    );

    let server = ComfyDeckServer::new(Arc::new(workspace), GatewayClient::new(gateway_url));

    let service = server
        .serve(stdio())
        .await
        .context("Failed to start MCP service")?;
    service.waiting().await.context("MCP service error")?;

    Ok(())
}
