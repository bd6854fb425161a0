//! Smoke-test client for a deployed gateway.
//!
//! Loads a workflow's test input, posts it to the run endpoint, and saves
//! the returned image. Useful for verifying a deployment end to end
//! without an MCP client in the loop.

use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::Parser;
use serde_json::{Map, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "comfydeck-client", about = "Run a deployed workflow once and save the output image")]
struct Args {
    /// Base URL of the gateway.
    #[arg(long, env = "COMFYDECK_GATEWAY_URL", default_value = "http://127.0.0.1:3000")]
    gateway_url: String,

    /// Workspace directory the test input is read from.
    #[arg(long, env = "WORKSPACE")]
    workspace: Option<String>,

    /// Root directory containing workspaces.
    #[arg(long, env = "WORKSPACES_DIR", default_value = "workspaces")]
    workspaces_dir: PathBuf,

    /// Workflow to run.
    #[arg(long, default_value = "txt2img")]
    workflow: String,

    /// Explicit test input JSON file; overrides the workspace lookup.
    #[arg(long)]
    test_json: Option<PathBuf>,

    /// Directory the output image is written to.
    #[arg(long, default_value = "comfydeck_outputs")]
    output_dir: PathBuf,

    /// Target a local dev gateway on port 8000 instead of --gateway-url.
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "comfydeck_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let gateway_url = if args.dev {
        "http://127.0.0.1:8000".to_string()
    } else {
        args.gateway_url.clone()
    };

    let test_args = load_test_input(&args)?;
    tracing::info!(
        workflow = %args.workflow,
        gateway = %gateway_url,
        args = test_args.len(),
        "Posting run request"
    );

    let body = serde_json::json!({
        "workflow": args.workflow,
        "args": test_args,
    });

    let started = Instant::now();
    let response = reqwest::Client::new()
        .post(format!("{gateway_url}/api/v1/run"))
        .json(&body)
        .send()
        .await
        .context("Request failed")?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Gateway returned {status}: {body}");
    }

    let image = response.bytes().await.context("Failed to read response body")?;
    let elapsed = started.elapsed();

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("Failed to create {}", args.output_dir.display()))?;

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System clock before Unix epoch")
        .as_secs();
    let path = args.output_dir.join(format!("{}_{ts}.png", args.workflow));
    std::fs::write(&path, &image)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    tracing::info!(
        path = %path.display(),
        bytes = image.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "Image saved"
    );
    println!(
        "Saved {} ({} bytes) in {:.1}s",
        path.display(),
        image.len(),
        elapsed.as_secs_f64()
    );

    Ok(())
}

/// Resolve the test input map: explicit --test-json wins, then the
/// workflow's `test.json` inside the workspace, then empty args.
fn load_test_input(args: &Args) -> anyhow::Result<Map<String, Value>> {
    let path = match (&args.test_json, &args.workspace) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(workspace)) => {
            let candidate = args
                .workspaces_dir
                .join(workspace)
                .join("workflows")
                .join(&args.workflow)
                .join("test.json");
            candidate.exists().then_some(candidate)
        }
        (None, None) => None,
    };

    let Some(path) = path else {
        tracing::warn!("No test input found; sending empty args");
        return Ok(Map::new());
    };

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", path.display()))?;
    value
        .as_object()
        .cloned()
        .with_context(|| format!("{} must contain a JSON object", path.display()))
}
