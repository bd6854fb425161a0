use std::sync::Arc;

use comfydeck_comfyui::{ComfyApi, ComfyClient};
use comfydeck_core::Workspace;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Loaded workspace; immutable after startup.
    pub workspace: Arc<Workspace>,
    /// ComfyUI REST client (pools connections to the engine).
    pub api: Arc<ComfyApi>,
    /// ComfyUI WebSocket connection factory.
    pub client: ComfyClient,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}
