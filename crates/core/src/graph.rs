//! Workflow graph representation.
//!
//! A ComfyUI workflow in "API format" is a JSON object mapping node IDs to
//! node records:
//!
//! ```json
//! {
//!   "3": {
//!     "class_type": "KSampler",
//!     "inputs": { "seed": 42, "cfg": 7.5 }
//!   }
//! }
//! ```
//!
//! [`WorkflowGraph`] wraps that object and offers the narrow set of
//! operations the rest of the system needs: node lookup, targeted field
//! writes (used by the parameter injector), and output-node discovery.

use serde_json::{Map, Value};

use crate::error::CoreError;

/// SaveImage node class type; the default output node when the workflow
/// config does not pin one explicitly.
const SAVE_IMAGE_CLASS: &str = "SaveImage";

/// A parsed ComfyUI workflow graph.
///
/// The graph is read-only except for the fields written through
/// [`set_field`](Self::set_field) and
/// [`set_filename_prefix`](Self::set_filename_prefix).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowGraph {
    nodes: Map<String, Value>,
}

impl WorkflowGraph {
    /// Build a graph from a JSON value.
    ///
    /// The value must be a non-empty object keyed by node ID.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let nodes = match value {
            Value::Object(map) => map,
            _ => {
                return Err(CoreError::Validation(
                    "Workflow graph JSON must be an object".to_string(),
                ))
            }
        };
        if nodes.is_empty() {
            return Err(CoreError::Validation(
                "Workflow graph must contain at least one node".to_string(),
            ));
        }
        Ok(Self { nodes })
    }

    /// Parse a graph from raw JSON text.
    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CoreError::Validation(format!("Invalid workflow graph JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Consume the graph, returning the underlying JSON value ready for
    /// submission to ComfyUI.
    pub fn into_value(self) -> Value {
        Value::Object(self.nodes)
    }

    /// Borrow the underlying JSON object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.nodes
    }

    /// Whether a node with the given ID exists.
    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    /// Look up a node record by ID.
    pub fn node(&self, node_id: &str) -> Option<&Value> {
        self.nodes.get(node_id)
    }

    /// The `class_type` of a node, if present.
    pub fn class_type(&self, node_id: &str) -> Option<&str> {
        self.nodes
            .get(node_id)?
            .get("class_type")
            .and_then(|v| v.as_str())
    }

    /// Write a value at `nodes[node_id][field]` or, when `subfield` is
    /// given, at `nodes[node_id][field][subfield]`.
    ///
    /// The node must exist. A missing `field` object is created when a
    /// subfield write needs it; a `field` that exists but is not an object
    /// is rejected rather than clobbered.
    pub fn set_field(
        &mut self,
        node_id: &str,
        field: &str,
        subfield: Option<&str>,
        value: Value,
    ) -> Result<(), CoreError> {
        let node = self.nodes.get_mut(node_id).ok_or_else(|| {
            CoreError::Validation(format!("Node '{node_id}' not present in workflow graph"))
        })?;

        let node_obj = node.as_object_mut().ok_or_else(|| {
            CoreError::Validation(format!("Node '{node_id}' is not a JSON object"))
        })?;

        match subfield {
            None => {
                node_obj.insert(field.to_string(), value);
            }
            Some(sub) => {
                let slot = node_obj
                    .entry(field.to_string())
                    .or_insert_with(|| Value::Object(Map::new()));
                let slot_obj = slot.as_object_mut().ok_or_else(|| {
                    CoreError::Validation(format!(
                        "Field '{field}' of node '{node_id}' is not a JSON object"
                    ))
                })?;
                slot_obj.insert(sub.to_string(), value);
            }
        }
        Ok(())
    }

    /// ID of the first `SaveImage` node, in node-ID order.
    pub fn find_save_image_node(&self) -> Option<&str> {
        self.nodes
            .iter()
            .filter(|(_, node)| {
                node.get("class_type").and_then(|v| v.as_str()) == Some(SAVE_IMAGE_CLASS)
            })
            .map(|(id, _)| id.as_str())
            .next()
    }

    /// Stamp a unique `filename_prefix` onto the output node so concurrent
    /// requests never collide on output files.
    ///
    /// Uses the explicitly configured output node when given, falling back
    /// to the first `SaveImage` node. Fails if neither resolves.
    pub fn set_filename_prefix(
        &mut self,
        output_node_id: Option<&str>,
        prefix: &str,
    ) -> Result<(), CoreError> {
        let node_id = match output_node_id {
            Some(id) => id.to_string(),
            None => self
                .find_save_image_node()
                .ok_or_else(|| {
                    CoreError::Validation(
                        "Workflow has no SaveImage node and no configured output node".to_string(),
                    )
                })?
                .to_string(),
        };
        self.set_field(
            &node_id,
            "inputs",
            Some("filename_prefix"),
            Value::String(prefix.to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_graph() -> WorkflowGraph {
        WorkflowGraph::from_value(json!({
            "3": {
                "class_type": "KSampler",
                "inputs": { "seed": 42, "cfg": 7.5, "steps": 20 }
            },
            "6": {
                "class_type": "CLIPTextEncode",
                "inputs": { "text": "", "clip": ["1", 1] }
            },
            "9": {
                "class_type": "SaveImage",
                "inputs": { "images": ["8", 0], "filename_prefix": "ComfyUI" }
            }
        }))
        .unwrap()
    }

    #[test]
    fn from_value_rejects_non_object() {
        assert!(WorkflowGraph::from_value(json!([1, 2])).is_err());
        assert!(WorkflowGraph::from_value(json!("nope")).is_err());
    }

    #[test]
    fn from_value_rejects_empty_object() {
        assert!(WorkflowGraph::from_value(json!({})).is_err());
    }

    #[test]
    fn from_json_rejects_malformed_text() {
        assert!(WorkflowGraph::from_json("{not json").is_err());
    }

    #[test]
    fn contains_and_lookup() {
        let graph = sample_graph();
        assert!(graph.contains_node("3"));
        assert!(!graph.contains_node("999"));
        assert_eq!(graph.class_type("6"), Some("CLIPTextEncode"));
    }

    #[test]
    fn set_field_with_subfield() {
        let mut graph = sample_graph();
        graph
            .set_field("6", "inputs", Some("text"), json!("a cat"))
            .unwrap();
        assert_eq!(graph.node("6").unwrap()["inputs"]["text"], json!("a cat"));
    }

    #[test]
    fn set_field_without_subfield_replaces_whole_field() {
        let mut graph = sample_graph();
        graph.set_field("3", "inputs", None, json!({"seed": 7})).unwrap();
        assert_eq!(graph.node("3").unwrap()["inputs"], json!({"seed": 7}));
    }

    #[test]
    fn set_field_missing_node_fails() {
        let mut graph = sample_graph();
        let err = graph
            .set_field("290", "inputs", Some("text"), json!("x"))
            .unwrap_err();
        assert!(err.to_string().contains("290"));
    }

    #[test]
    fn set_field_creates_missing_subfield_container() {
        let mut graph = sample_graph();
        graph.set_field("3", "extras", Some("note"), json!("hi")).unwrap();
        assert_eq!(graph.node("3").unwrap()["extras"]["note"], json!("hi"));
    }

    #[test]
    fn set_field_rejects_non_object_container() {
        let mut graph = WorkflowGraph::from_value(json!({
            "1": { "class_type": "X", "inputs": "not an object" }
        }))
        .unwrap();
        assert!(graph.set_field("1", "inputs", Some("text"), json!("x")).is_err());
    }

    #[test]
    fn finds_save_image_node() {
        let graph = sample_graph();
        assert_eq!(graph.find_save_image_node(), Some("9"));
    }

    #[test]
    fn filename_prefix_uses_explicit_output_node() {
        let mut graph = sample_graph();
        graph.set_filename_prefix(Some("9"), "req-abc").unwrap();
        assert_eq!(
            graph.node("9").unwrap()["inputs"]["filename_prefix"],
            json!("req-abc")
        );
    }

    #[test]
    fn filename_prefix_falls_back_to_save_image() {
        let mut graph = sample_graph();
        graph.set_filename_prefix(None, "req-xyz").unwrap();
        assert_eq!(
            graph.node("9").unwrap()["inputs"]["filename_prefix"],
            json!("req-xyz")
        );
    }

    #[test]
    fn filename_prefix_without_output_node_fails() {
        let mut graph = WorkflowGraph::from_value(json!({
            "1": { "class_type": "KSampler", "inputs": {} }
        }))
        .unwrap();
        assert!(graph.set_filename_prefix(None, "p").is_err());
    }
}
