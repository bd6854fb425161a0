use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use comfydeck_comfyui::RunError;
use comfydeck_core::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for injection/config errors and [`RunError`] for
/// engine failures. Implements [`IntoResponse`] to produce consistent
/// JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `comfydeck_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure while driving the ComfyUI engine.
    #[error(transparent)]
    Run(#[from] RunError),

    /// The requested workflow is not deployed in this workspace.
    #[error("Workflow '{0}' not found")]
    WorkflowNotFound(String),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants: the caller or the deployment is wrong ---
            AppError::Core(core) => match core {
                CoreError::Value { .. } => {
                    (StatusCode::BAD_REQUEST, "INVALID_VALUE", core.to_string())
                }
                CoreError::Config { .. } => {
                    // A config error surfacing at request time means the
                    // deployed mapping is broken, not the caller's input.
                    tracing::error!(error = %core, "Workflow configuration error");
                    (StatusCode::BAD_REQUEST, "CONFIG_ERROR", core.to_string())
                }
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Io { .. } => {
                    tracing::error!(error = %core, "I/O error");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },

            // --- Engine errors ---
            AppError::Run(run) => classify_run_error(run),

            // --- HTTP-specific errors ---
            AppError::WorkflowNotFound(name) => (
                StatusCode::NOT_FOUND,
                "WORKFLOW_NOT_FOUND",
                format!("Workflow '{name}' not found"),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify an engine failure into an HTTP status, error code, and message.
///
/// Node failures pass the engine's message through verbatim so callers see
/// the real cause. Timeouts map to 504; everything else is a 502 because
/// the gateway itself is fine but the engine behind it is not.
fn classify_run_error(err: &RunError) -> (StatusCode, &'static str, String) {
    match err {
        RunError::Execution { node_id, message } => (
            StatusCode::BAD_GATEWAY,
            "EXECUTION_ERROR",
            format!("Execution failed in node {node_id}: {message}"),
        ),
        RunError::Timeout(duration) => (
            StatusCode::GATEWAY_TIMEOUT,
            "TIMEOUT",
            format!("Workflow did not complete within {duration:?}"),
        ),
        other => {
            tracing::error!(error = %other, "Engine error");
            (
                StatusCode::BAD_GATEWAY,
                "ENGINE_ERROR",
                other.to_string(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_errors_are_bad_requests() {
        let err = AppError::Core(CoreError::value("seed", "above maximum"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unknown_workflow_is_404() {
        let err = AppError::WorkflowNotFound("txt2vid".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn node_failures_are_bad_gateway() {
        let err = AppError::Run(RunError::Execution {
            node_id: "3".to_string(),
            message: "CUDA out of memory".to_string(),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn run_timeouts_are_gateway_timeouts() {
        let err = AppError::Run(RunError::Timeout(std::time::Duration::from_secs(600)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
