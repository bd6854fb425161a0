//! Parameter injection.
//!
//! Takes a workflow graph, the workflow's parameter specifications, and a
//! caller-supplied value mapping, and produces a new graph with the values
//! written at their declared targets. Single-pass, synchronous, and
//! all-or-nothing: the caller never observes a partially modified graph.
//!
//! Resolution order per declared parameter:
//! 1. explicit value from the request;
//! 2. the declared `default` (`random` draws uniformly from
//!    `[minimum, maximum]` inclusive at injection time);
//! 3. `required: true` with neither is a configuration error;
//! 4. otherwise the parameter is skipped and the graph left untouched.
//!
//! Request keys that match no declared parameter are rejected; a typo'd
//! parameter name fails loudly instead of being silently dropped.

use std::collections::BTreeMap;

use rand::Rng;
use serde_json::{Map, Value};

use crate::error::CoreError;
use crate::graph::WorkflowGraph;
use crate::spec::{check_value, ParamSpec, ParamType};

/// Inject caller-supplied values into a workflow graph.
///
/// Validates every effective value against its declared type and range
/// before any write happens, then applies all writes to a copy of the
/// graph. Errors name the offending parameter.
pub fn inject(
    graph: &WorkflowGraph,
    params: &BTreeMap<String, ParamSpec>,
    request: &Map<String, Value>,
) -> Result<WorkflowGraph, CoreError> {
    for key in request.keys() {
        if !params.contains_key(key) {
            return Err(CoreError::value(key, "unknown parameter"));
        }
    }

    let mut writes: Vec<(&str, &ParamSpec, Value)> = Vec::new();
    for (name, spec) in params {
        spec.validate(name)?;

        let value = match request.get(name) {
            Some(v) => Some(v.clone()),
            None => resolve_default(spec),
        };
        let Some(value) = value else {
            if spec.required {
                return Err(CoreError::config(
                    name,
                    "required parameter has no value and no default",
                ));
            }
            continue;
        };

        check_value(name, spec, &value)?;

        let node_id = spec.comfyui.node_id.as_str();
        if !graph.contains_node(node_id) {
            return Err(CoreError::config(
                name,
                format!("target node '{node_id}' not present in workflow graph"),
            ));
        }
        writes.push((name, spec, value));
    }

    let mut injected = graph.clone();
    for (name, spec, value) in writes {
        tracing::debug!(
            param = name,
            node_id = spec.comfyui.node_id.as_str(),
            field = %spec.comfyui.field,
            subfield = spec.comfyui.subfield.as_deref(),
            "Injecting parameter",
        );
        injected.set_field(
            spec.comfyui.node_id.as_str(),
            &spec.comfyui.field,
            spec.comfyui.subfield.as_deref(),
            value,
        )?;
    }
    Ok(injected)
}

/// Resolve a declared default into a concrete value, drawing the `random`
/// sentinel from `[minimum, maximum]` inclusive.
fn resolve_default(spec: &ParamSpec) -> Option<Value> {
    let default = spec.default.as_ref()?;
    if !spec.has_random_default() {
        return Some(default.clone());
    }
    // validate() guarantees numeric type and both bounds.
    let min = spec.minimum.unwrap_or_default();
    let max = spec.maximum.unwrap_or_default();
    let drawn = match spec.param_type {
        ParamType::Int => {
            let lo = min.ceil() as i64;
            let hi = max.floor() as i64;
            Value::from(rand::rng().random_range(lo..=hi))
        }
        _ => Value::from(rand::rng().random_range(min..=max)),
    };
    Some(drawn)
}
