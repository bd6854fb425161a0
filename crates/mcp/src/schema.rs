//! JSON Schema generation for tool inputs.
//!
//! Each workflow's parameter map becomes the `inputSchema` of its tool so
//! MCP clients can validate and auto-complete arguments before calling.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use comfydeck_core::spec::RANDOM_DEFAULT;
use comfydeck_core::ParamSpec;

/// Reserved argument: when present, the output image is written to this
/// path instead of being returned inline.
pub const SAVE_PATH_ARG: &str = "save_path";

/// Build a JSON Schema object for a workflow's parameters.
pub fn input_schema(params: &BTreeMap<String, ParamSpec>) -> Map<String, Value> {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for (name, spec) in params {
        properties.insert(name.clone(), property_schema(spec));
        // A parameter with a default is satisfiable without the caller.
        if spec.required && spec.default.is_none() {
            required.push(Value::String(name.clone()));
        }
    }

    // Workflow parameters win a name collision; the file-output escape
    // hatch is only offered when the name is free.
    if !properties.contains_key(SAVE_PATH_ARG) {
        properties.insert(
            SAVE_PATH_ARG.to_string(),
            json!({
                "type": "string",
                "description": "Optional absolute path; when set, the output image is written there instead of returned inline",
            }),
        );
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    schema
}

fn property_schema(spec: &ParamSpec) -> Value {
    let mut prop = Map::new();
    prop.insert(
        "type".to_string(),
        json!(spec.param_type.json_schema_type()),
    );

    if let Some(text) = spec.description.as_ref().or(spec.label.as_ref()) {
        prop.insert("description".to_string(), json!(text));
    }
    if let Some(min) = spec.minimum {
        prop.insert("minimum".to_string(), json!(min));
    }
    if let Some(max) = spec.maximum {
        prop.insert("maximum".to_string(), json!(max));
    }
    // The random sentinel is an injection-time behavior, not a literal
    // default a client could echo back.
    if let Some(default) = &spec.default {
        if default.as_str() != Some(RANDOM_DEFAULT) {
            prop.insert("default".to_string(), default.clone());
        }
    }

    Value::Object(prop)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params_fixture() -> BTreeMap<String, ParamSpec> {
        let yaml = r#"
prompt:
  type: string
  label: Prompt
  required: true
  comfyui:
    node_id: "6"
    field: inputs
    subfield: text
steps:
  type: int
  description: Sampling steps
  default: 20
  minimum: 1
  maximum: 50
  comfyui:
    node_id: "3"
    field: inputs
    subfield: steps
seed:
  type: int
  default: random
  minimum: 0
  maximum: 2147483647
  comfyui:
    node_id: "3"
    field: inputs
    subfield: seed
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn builds_properties_and_required() {
        let schema = input_schema(&params_fixture());
        assert_eq!(schema["type"], "object");

        let properties = schema["properties"].as_object().unwrap();
        assert_eq!(properties["prompt"]["type"], "string");
        assert_eq!(properties["prompt"]["description"], "Prompt");
        assert_eq!(properties["steps"]["type"], "integer");
        assert_eq!(properties["steps"]["description"], "Sampling steps");
        assert_eq!(properties["steps"]["minimum"], 1.0);
        assert_eq!(properties["steps"]["maximum"], 50.0);
        assert_eq!(properties["steps"]["default"], 20);

        let required = schema["required"].as_array().unwrap();
        assert_eq!(required, &[serde_json::json!("prompt")]);
    }

    #[test]
    fn random_sentinel_is_not_advertised_as_default() {
        let schema = input_schema(&params_fixture());
        let seed = &schema["properties"]["seed"];
        assert!(seed.get("default").is_none());
        assert_eq!(seed["minimum"], 0.0);
    }

    #[test]
    fn save_path_is_offered() {
        let schema = input_schema(&params_fixture());
        assert_eq!(schema["properties"][SAVE_PATH_ARG]["type"], "string");
    }

    #[test]
    fn required_with_default_is_optional() {
        let yaml = r#"
width:
  type: int
  required: true
  default: 1024
  comfyui:
    node_id: "5"
    field: inputs
    subfield: width
"#;
        let params: BTreeMap<String, ParamSpec> = serde_yaml::from_str(yaml).unwrap();
        let schema = input_schema(&params);
        assert!(schema.get("required").is_none());
    }
}
