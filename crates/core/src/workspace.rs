//! Workspace loading.
//!
//! A workspace is a directory of configured workflows:
//!
//! ```text
//! <workspaces_dir>/<workspace>/workflows/<workflow>/
//!     workflow_api.json   -- the ComfyUI graph (API format)
//!     api.yaml            -- parameter specifications and metadata
//!     test.json           -- optional test inputs for manual invocation
//! ```
//!
//! Everything is loaded and cross-validated up front so configuration
//! errors surface at startup, not on the first request.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::graph::WorkflowGraph;
use crate::spec::WorkflowConfig;

/// Workflow graph file name within a workflow directory.
pub const GRAPH_FILE: &str = "workflow_api.json";

/// Parameter specification file name within a workflow directory.
pub const CONFIG_FILE: &str = "api.yaml";

/// Optional test input file name within a workflow directory.
pub const TEST_INPUT_FILE: &str = "test.json";

/// One fully loaded workflow: graph, config, and optional test inputs.
///
/// The directory name is authoritative for addressing; the config's `name`
/// field is display metadata.
#[derive(Debug, Clone)]
pub struct WorkflowEntry {
    pub name: String,
    pub config: WorkflowConfig,
    pub graph: WorkflowGraph,
    pub test_input: Option<Map<String, Value>>,
}

impl WorkflowEntry {
    /// Load a single workflow directory and cross-validate config vs graph.
    pub fn load(dir: &Path) -> Result<Self, CoreError> {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                CoreError::Validation(format!("Workflow directory {} has no name", dir.display()))
            })?
            .to_string();

        let config = WorkflowConfig::from_yaml(&read_file(&dir.join(CONFIG_FILE))?)?;
        let graph = WorkflowGraph::from_json(&read_file(&dir.join(GRAPH_FILE))?)?;
        config.validate_against_graph(&graph)?;

        let test_path = dir.join(TEST_INPUT_FILE);
        let test_input = if test_path.exists() {
            let value: Value = serde_json::from_str(&read_file(&test_path)?).map_err(|e| {
                CoreError::Validation(format!("Invalid test input JSON in {}: {e}", test_path.display()))
            })?;
            let map = value.as_object().cloned().ok_or_else(|| {
                CoreError::Validation(format!(
                    "Test input {} must be a JSON object",
                    test_path.display()
                ))
            })?;
            Some(map)
        } else {
            None
        };

        Ok(Self {
            name,
            config,
            graph,
            test_input,
        })
    }
}

/// A named set of loaded workflows.
#[derive(Debug)]
pub struct Workspace {
    pub name: String,
    workflows: BTreeMap<String, WorkflowEntry>,
}

impl Workspace {
    /// Load the named workspace from `workspaces_dir`, optionally
    /// restricted to a subset of workflow names.
    ///
    /// Subset entries that match no workflow directory are configuration
    /// errors; a misspelled selector must not silently deploy nothing.
    pub fn load(
        workspaces_dir: &Path,
        name: &str,
        subset: Option<&[String]>,
    ) -> Result<Self, CoreError> {
        let workflows_dir = workspaces_dir.join(name).join("workflows");
        let read_dir = std::fs::read_dir(&workflows_dir).map_err(|e| CoreError::Io {
            path: workflows_dir.clone(),
            source: e,
        })?;

        let mut dirs: Vec<PathBuf> = read_dir
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        dirs.sort();

        let mut workflows = BTreeMap::new();
        for dir in dirs {
            if !dir.join(CONFIG_FILE).exists() {
                tracing::warn!(dir = %dir.display(), "Skipping directory without {CONFIG_FILE}");
                continue;
            }
            let entry = WorkflowEntry::load(&dir)?;
            tracing::info!(
                workflow = %entry.name,
                params = entry.config.parameters.len(),
                visible = entry.config.visible,
                active = entry.config.active,
                "Loaded workflow",
            );
            workflows.insert(entry.name.clone(), entry);
        }

        if let Some(subset) = subset {
            for wanted in subset {
                if !workflows.contains_key(wanted) {
                    return Err(CoreError::Validation(format!(
                        "Selected workflow '{wanted}' not found in workspace '{name}'"
                    )));
                }
            }
            workflows.retain(|k, _| subset.contains(k));
        }

        if workflows.is_empty() {
            return Err(CoreError::Validation(format!(
                "Workspace '{name}' contains no workflows"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            workflows,
        })
    }

    /// Look up a workflow by name.
    pub fn get(&self, workflow: &str) -> Option<&WorkflowEntry> {
        self.workflows.get(workflow)
    }

    /// All loaded workflows, in name order.
    pub fn iter(&self) -> impl Iterator<Item = &WorkflowEntry> {
        self.workflows.values()
    }

    /// Workflows surfaced to listings and tool catalogs.
    pub fn visible(&self) -> impl Iterator<Item = &WorkflowEntry> {
        self.iter().filter(|w| w.config.visible && w.config.active)
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// Parse a comma-separated workflow selector (the `WORKFLOWS` env var).
/// Returns `None` for an empty/blank selector, meaning "all workflows".
pub fn parse_selector(raw: &str) -> Option<Vec<String>> {
    let names: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        None
    } else {
        Some(names)
    }
}

fn read_file(path: &Path) -> Result<String, CoreError> {
    std::fs::read_to_string(path).map_err(|e| CoreError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
