//! Workflow configuration and parameter specifications.
//!
//! Each workflow directory carries an `api.yaml` describing how external
//! parameters map onto graph nodes:
//!
//! ```yaml
//! name: txt2img
//! description: Text to image generation
//! output_type: image
//! comfyui_output_node_id: 9
//! parameters:
//!   prompt:
//!     type: string
//!     label: Prompt
//!     required: true
//!     comfyui:
//!       node_id: 6
//!       field: inputs
//!       subfield: text
//!   seed:
//!     type: int
//!     default: random
//!     minimum: 0
//!     maximum: 2147483647
//!     comfyui:
//!       node_id: 3
//!       field: inputs
//!       subfield: seed
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::graph::WorkflowGraph;

/// Sentinel default that resolves to a fresh uniform draw from
/// `[minimum, maximum]` at injection time.
pub const RANDOM_DEFAULT: &str = "random";

/// A reference to a graph node.
///
/// Workflow authors write node IDs as integers or strings interchangeably;
/// both normalize to the string form used as the graph's object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeRef(String);

impl NodeRef {
    pub fn new(id: impl Into<String>) -> Self {
        NodeRef(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => NodeRef(n.to_string()),
            Raw::Str(s) => NodeRef(s),
        })
    }
}

/// Declared type of an external parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Int,
    Float,
    Bool,
}

impl ParamType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ParamType::Int | ParamType::Float)
    }

    /// JSON-Schema type name for this parameter type.
    pub fn json_schema_type(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "integer",
            ParamType::Float => "number",
            ParamType::Bool => "boolean",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
        })
    }
}

/// Where a parameter value lands in the workflow graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamTarget {
    /// Node the value is written into.
    pub node_id: NodeRef,
    /// Top-level field within the node record (almost always `inputs`).
    pub field: String,
    /// Optional key within `field`.
    #[serde(default)]
    pub subfield: Option<String>,
}

/// Declarative specification of one external parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Literal default, or the string `"random"` for numeric types.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    /// Injection target in the workflow graph.
    pub comfyui: ParamTarget,
}

impl ParamSpec {
    /// Whether the declared default is the `random` sentinel.
    pub fn has_random_default(&self) -> bool {
        matches!(&self.default, Some(Value::String(s)) if s == RANDOM_DEFAULT)
    }

    /// Check the parameter's declared constraints (not a supplied value).
    pub fn validate(&self, name: &str) -> Result<(), CoreError> {
        if let (Some(min), Some(max)) = (self.minimum, self.maximum) {
            if min > max {
                return Err(CoreError::config(
                    name,
                    format!("minimum ({min}) is greater than maximum ({max})"),
                ));
            }
        }
        if self.has_random_default() {
            if !self.param_type.is_numeric() {
                return Err(CoreError::config(
                    name,
                    format!("'random' default is only valid for numeric types, not {}", self.param_type),
                ));
            }
            if self.minimum.is_none() || self.maximum.is_none() {
                return Err(CoreError::config(
                    name,
                    "'random' default requires both minimum and maximum",
                ));
            }
        }
        Ok(())
    }
}

/// Per-workflow configuration (`api.yaml`).
///
/// `resolutions`, `handler`, `cost_estimate`, and `base_model` are parsed
/// and surfaced in listings but never interpreted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub output_type: Option<String>,
    #[serde(default)]
    pub cost_estimate: Option<Value>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub resolutions: Option<Value>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub base_model: Option<String>,
    /// Node whose output images are returned to the caller. Falls back to
    /// the first `SaveImage` node when absent.
    #[serde(default)]
    pub comfyui_output_node_id: Option<NodeRef>,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamSpec>,
}

fn default_true() -> bool {
    true
}

impl WorkflowConfig {
    /// Parse a workflow config from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, CoreError> {
        let config: WorkflowConfig = serde_yaml::from_str(text)
            .map_err(|e| CoreError::Validation(format!("Invalid workflow config YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter spec's own constraints.
    pub fn validate(&self) -> Result<(), CoreError> {
        for (name, spec) in &self.parameters {
            spec.validate(name)?;
        }
        Ok(())
    }

    /// Check the cross-file invariant: every referenced target node must
    /// exist in the workflow graph. Violations are configuration errors,
    /// caught at load time rather than per request.
    pub fn validate_against_graph(&self, graph: &WorkflowGraph) -> Result<(), CoreError> {
        for (name, spec) in &self.parameters {
            let node_id = spec.comfyui.node_id.as_str();
            if !graph.contains_node(node_id) {
                return Err(CoreError::config(
                    name,
                    format!("target node '{node_id}' not present in workflow graph"),
                ));
            }
        }
        match &self.comfyui_output_node_id {
            Some(output) => {
                if !graph.contains_node(output.as_str()) {
                    return Err(CoreError::Validation(format!(
                        "comfyui_output_node_id '{output}' not present in workflow graph"
                    )));
                }
            }
            // The output node must be resolvable at load time; finding out
            // at request time would turn a deployment defect into a 400.
            None => {
                if graph.find_save_image_node().is_none() {
                    return Err(CoreError::Validation(
                        "Workflow has no SaveImage node and no comfyui_output_node_id"
                            .to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Validate a supplied value against a parameter's declared type and range.
pub fn check_value(name: &str, spec: &ParamSpec, value: &Value) -> Result<(), CoreError> {
    match spec.param_type {
        ParamType::String => {
            if !value.is_string() {
                return Err(CoreError::value(name, format!("expected a string, got {value}")));
            }
        }
        ParamType::Bool => {
            if !value.is_boolean() {
                return Err(CoreError::value(name, format!("expected a bool, got {value}")));
            }
        }
        ParamType::Int => {
            if value.as_i64().is_none() && value.as_u64().is_none() {
                return Err(CoreError::value(name, format!("expected an integer, got {value}")));
            }
        }
        ParamType::Float => {
            if !value.is_number() {
                return Err(CoreError::value(name, format!("expected a number, got {value}")));
            }
        }
    }

    if spec.param_type.is_numeric() {
        // Range constraints only apply to numeric types.
        let n = value.as_f64().unwrap_or_default();
        if let Some(min) = spec.minimum {
            if n < min {
                return Err(CoreError::value(name, format!("{n} is below minimum {min}")));
            }
        }
        if let Some(max) = spec.maximum {
            if n > max {
                return Err(CoreError::value(name, format!("{n} is above maximum {max}")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TXT2IMG_YAML: &str = r#"
name: txt2img
description: Text to image generation
output_type: image
base_model: SD1.5
comfyui_output_node_id: 9
parameters:
  prompt:
    type: string
    label: Prompt
    description: Text description of the image to generate
    required: true
    comfyui:
      node_id: 6
      field: inputs
      subfield: text
  seed:
    type: int
    label: Seed
    default: random
    minimum: 0
    maximum: 2147483647
    comfyui:
      node_id: "3"
      field: inputs
      subfield: seed
"#;

    #[test]
    fn parses_full_config() {
        let config = WorkflowConfig::from_yaml(TXT2IMG_YAML).unwrap();
        assert_eq!(config.name, "txt2img");
        assert!(config.visible);
        assert!(config.active);
        assert_eq!(config.parameters.len(), 2);
        assert_eq!(
            config.comfyui_output_node_id.as_ref().map(NodeRef::as_str),
            Some("9")
        );
    }

    #[test]
    fn node_id_accepts_int_and_string_forms() {
        let config = WorkflowConfig::from_yaml(TXT2IMG_YAML).unwrap();
        assert_eq!(config.parameters["prompt"].comfyui.node_id.as_str(), "6");
        assert_eq!(config.parameters["seed"].comfyui.node_id.as_str(), "3");
    }

    #[test]
    fn random_default_detected() {
        let config = WorkflowConfig::from_yaml(TXT2IMG_YAML).unwrap();
        assert!(config.parameters["seed"].has_random_default());
        assert!(!config.parameters["prompt"].has_random_default());
    }

    #[test]
    fn minimum_above_maximum_rejected() {
        let yaml = r#"
name: broken
parameters:
  steps:
    type: int
    minimum: 50
    maximum: 10
    comfyui:
      node_id: 3
      field: inputs
      subfield: steps
"#;
        let err = WorkflowConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("steps"));
        assert!(err.to_string().contains("greater than maximum"));
    }

    #[test]
    fn random_default_on_string_rejected() {
        let yaml = r#"
name: broken
parameters:
  prompt:
    type: string
    default: random
    comfyui:
      node_id: 6
      field: inputs
      subfield: text
"#;
        assert!(WorkflowConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn random_default_requires_bounds() {
        let yaml = r#"
name: broken
parameters:
  seed:
    type: int
    default: random
    comfyui:
      node_id: 3
      field: inputs
      subfield: seed
"#;
        let err = WorkflowConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("minimum and maximum"));
    }

    #[test]
    fn unknown_param_type_rejected() {
        let yaml = r#"
name: broken
parameters:
  img:
    type: tensor
    comfyui:
      node_id: 1
      field: inputs
"#;
        assert!(WorkflowConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn validate_against_graph_catches_dangling_node() {
        let config = WorkflowConfig::from_yaml(TXT2IMG_YAML).unwrap();
        let graph = WorkflowGraph::from_value(json!({
            "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "" } },
            "9": { "class_type": "SaveImage", "inputs": {} }
        }))
        .unwrap();
        // Node "3" (seed target) is missing.
        let err = config.validate_against_graph(&graph).unwrap_err();
        assert!(err.to_string().contains("seed"));
        assert!(err.to_string().contains("'3'"));
    }

    #[test]
    fn validate_against_graph_requires_resolvable_output_node() {
        let yaml = r#"
name: t
parameters:
  prompt:
    type: string
    comfyui:
      node_id: 6
      field: inputs
      subfield: text
"#;
        let config = WorkflowConfig::from_yaml(yaml).unwrap();
        let graph = WorkflowGraph::from_value(json!({
            "6": { "class_type": "CLIPTextEncode", "inputs": { "text": "" } }
        }))
        .unwrap();

        // No SaveImage node and no explicit output node: a deployment
        // defect, rejected at load time.
        let err = config.validate_against_graph(&graph).unwrap_err();
        assert!(err.to_string().contains("SaveImage"));

        // Pinning the output node explicitly satisfies the check.
        let pinned = WorkflowConfig::from_yaml(&format!("{yaml}comfyui_output_node_id: 6\n"))
            .unwrap();
        assert!(pinned.validate_against_graph(&graph).is_ok());
    }

    #[test]
    fn check_value_type_mismatches() {
        let config = WorkflowConfig::from_yaml(TXT2IMG_YAML).unwrap();
        let prompt = &config.parameters["prompt"];
        let seed = &config.parameters["seed"];

        assert!(check_value("prompt", prompt, &json!("a cat")).is_ok());
        assert!(check_value("prompt", prompt, &json!(12)).is_err());
        assert!(check_value("seed", seed, &json!(42)).is_ok());
        assert!(check_value("seed", seed, &json!("42")).is_err());
        assert!(check_value("seed", seed, &json!(1.5)).is_err());
    }

    #[test]
    fn check_value_range() {
        let config = WorkflowConfig::from_yaml(TXT2IMG_YAML).unwrap();
        let seed = &config.parameters["seed"];

        assert!(check_value("seed", seed, &json!(0)).is_ok());
        assert!(check_value("seed", seed, &json!(2147483647i64)).is_ok());
        assert!(check_value("seed", seed, &json!(-1)).is_err());
        assert!(check_value("seed", seed, &json!(2147483648i64)).is_err());
    }

    #[test]
    fn missing_comfyui_target_rejected() {
        let yaml = r#"
name: broken
parameters:
  prompt:
    type: string
"#;
        assert!(WorkflowConfig::from_yaml(yaml).is_err());
    }
}
