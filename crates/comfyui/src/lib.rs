//! ComfyUI client library.
//!
//! Typed WebSocket message parsing, REST API wrappers, and a one-shot
//! run driver that takes an injected workflow graph to completion and
//! returns the output images.

pub mod api;
pub mod client;
pub mod messages;
pub mod runner;

pub use api::{ComfyApi, ComfyApiError, SubmitResponse};
pub use client::{ComfyClient, ComfyClientError, ComfyConnection};
pub use messages::{parse_message, ComfyMessage};
pub use runner::{run_workflow, OutputImage, RunError, RunOutput};
