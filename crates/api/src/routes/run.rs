use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::{routing::post, Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for POST /api/v1/run.
#[derive(Deserialize)]
pub struct RunRequest {
    /// Workflow name (directory name within the workspace).
    pub workflow: String,
    /// Caller-supplied parameter values, keyed by parameter name.
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// POST /api/v1/run -- inject caller values and execute the workflow.
///
/// Responds with the raw bytes of the first output image; the
/// `X-Prompt-Id` header carries the engine's prompt ID for correlation.
async fn run(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> AppResult<impl IntoResponse> {
    let entry = state
        .workspace
        .get(&request.workflow)
        .filter(|e| e.config.active)
        .ok_or_else(|| AppError::WorkflowNotFound(request.workflow.clone()))?;

    let mut graph = comfydeck_core::inject(&entry.graph, &entry.config.parameters, &request.args)?;

    // Per-request prefix; parallel runs must never collide on output files.
    let run_id = uuid::Uuid::new_v4().simple().to_string();
    let output_node = entry
        .config
        .comfyui_output_node_id
        .as_ref()
        .map(|n| n.as_str());
    graph.set_filename_prefix(output_node, &format!("{}_{run_id}", request.workflow))?;

    tracing::info!(
        workflow = %request.workflow,
        run_id = %run_id,
        args = request.args.len(),
        "Running workflow"
    );

    let output = comfydeck_comfyui::run_workflow(
        &state.api,
        &state.client,
        &graph.into_value(),
        output_node,
        state.config.run_timeout(),
    )
    .await?;

    let image = output
        .images
        .into_iter()
        .next()
        .ok_or_else(|| AppError::Run(comfydeck_comfyui::RunError::MissingOutput {
            prompt_id: output.prompt_id.clone(),
        }))?;

    tracing::info!(
        workflow = %request.workflow,
        prompt_id = %output.prompt_id,
        filename = %image.filename,
        bytes = image.data.len(),
        "Workflow complete"
    );

    let content_type = content_type_for(&image.filename);
    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::HeaderName::from_static("x-prompt-id"),
            output.prompt_id,
        ),
    ];

    Ok((headers, image.data))
}

/// MIME type from the output filename extension.
fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next().map(str::to_ascii_lowercase) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/run", post(run))
}
