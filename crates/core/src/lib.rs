//! Core domain types for comfydeck.
//!
//! Workflow graph representation, parameter specifications, the parameter
//! injector, and workspace loading. Pure and synchronous -- all network
//! and server concerns live in the other crates.

pub mod error;
pub mod graph;
pub mod inject;
pub mod spec;
pub mod workspace;

pub use error::CoreError;
pub use graph::WorkflowGraph;
pub use inject::inject;
pub use spec::{ParamSpec, ParamTarget, ParamType, WorkflowConfig};
pub use workspace::{Workspace, WorkflowEntry};
