//! ComfyDeck MCP server library.
//!
//! Turns a deployed workspace into an MCP tool catalog and forwards tool
//! calls to the gateway.

pub mod gateway;
pub mod schema;
pub mod server;

pub use gateway::{GatewayClient, GatewayError};
pub use server::ComfyDeckServer;
