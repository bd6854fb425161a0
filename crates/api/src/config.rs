use std::path::PathBuf;

/// Gateway configuration loaded from environment variables.
///
/// `WORKSPACE` is the only required variable; everything else has a
/// default suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Name of the workspace to deploy (directory under `workspaces_dir`).
    pub workspace: String,
    /// Root directory containing workspaces (default: `workspaces`).
    pub workspaces_dir: PathBuf,
    /// Optional comma-separated subset of workflows to deploy.
    pub workflows: Option<Vec<String>>,
    /// Deployment stage label, surfaced in logs and health output.
    pub stage: String,
    /// Base URL of the ComfyUI server (default: `http://127.0.0.1:8188`).
    pub comfyui_url: String,
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `600`).
    ///
    /// Generation runs are long; the workflow execution deadline is this
    /// value minus a small margin so the engine timeout surfaces as a
    /// typed error rather than a dropped connection.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `WORKSPACE`            | (required)                 |
    /// | `WORKSPACES_DIR`       | `workspaces`               |
    /// | `WORKFLOWS`            | (all workflows)            |
    /// | `STAGE`                | `stage`                    |
    /// | `COMFYUI_URL`          | `http://127.0.0.1:8188`    |
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `REQUEST_TIMEOUT_SECS` | `600`                      |
    pub fn from_env() -> Self {
        let workspace = std::env::var("WORKSPACE").expect("WORKSPACE must be set");

        let workspaces_dir: PathBuf = std::env::var("WORKSPACES_DIR")
            .unwrap_or_else(|_| "workspaces".into())
            .into();

        let workflows = std::env::var("WORKFLOWS")
            .ok()
            .and_then(|raw| comfydeck_core::workspace::parse_selector(&raw));

        let stage = std::env::var("STAGE").unwrap_or_else(|_| "stage".into());

        let comfyui_url =
            std::env::var("COMFYUI_URL").unwrap_or_else(|_| "http://127.0.0.1:8188".into());

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        Self {
            workspace,
            workspaces_dir,
            workflows,
            stage,
            comfyui_url,
            host,
            port,
            request_timeout_secs,
        }
    }

    /// Deadline handed to workflow runs: the request timeout minus a
    /// margin so history retrieval and the error path still fit.
    pub fn run_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.saturating_sub(10).max(1))
    }
}
