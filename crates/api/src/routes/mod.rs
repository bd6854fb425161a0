pub mod health;
pub mod run;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// All routes mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(workflows::router())
        .merge(run::router())
}
