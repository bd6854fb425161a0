use std::collections::BTreeMap;

use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use comfydeck_core::{ParamSpec, WorkflowEntry};

use crate::state::AppState;

/// One workflow in the listing, with its callable parameter surface.
#[derive(Serialize)]
pub struct WorkflowSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_estimate: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
    pub parameters: BTreeMap<String, ParamSpec>,
}

impl WorkflowSummary {
    fn from_entry(entry: &WorkflowEntry) -> Self {
        Self {
            name: entry.name.clone(),
            description: entry.config.description.clone(),
            output_type: entry.config.output_type.clone(),
            cost_estimate: entry.config.cost_estimate.clone(),
            base_model: entry.config.base_model.clone(),
            parameters: entry.config.parameters.clone(),
        }
    }
}

/// GET /api/v1/workflows -- list visible, active workflows.
async fn list_workflows(State(state): State<AppState>) -> Json<Vec<WorkflowSummary>> {
    let workflows: Vec<_> = state
        .workspace
        .visible()
        .map(WorkflowSummary::from_entry)
        .collect();

    Json(workflows)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/workflows", get(list_workflows))
}
