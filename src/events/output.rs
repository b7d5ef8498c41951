//! Step output payload built from stack outputs.

use crate::backend::{ProvisioningBackend, StackLocation};
use crate::error::Result;
use crate::models::DesiredState;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Payload reported with `report-success`.
///
/// Deleted stacks report `{}`. Otherwise outputs become `{key: value}`, nested
/// under `output_path` when one is configured.
pub async fn create_output(
    backend: &dyn ProvisioningBackend,
    location: &StackLocation,
    stack: &str,
    output_path: Option<&str>,
    desired_state: DesiredState,
) -> Result<Value> {
    if desired_state.is_deleted() {
        return Ok(Value::Object(Map::new()));
    }

    let description = backend.describe_stack(location, stack).await?;
    debug!(stack = %stack, outputs = description.outputs.len(), "Fetched stack outputs");
    Ok(project_outputs(&description.outputs, output_path))
}

pub fn project_outputs(outputs: &BTreeMap<String, String>, output_path: Option<&str>) -> Value {
    let flat: Map<String, Value> = outputs
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();

    match output_path {
        Some(path) => {
            let mut nested = Map::new();
            nested.insert(path.to_string(), Value::Object(flat));
            Value::Object(nested)
        }
        None => Value::Object(flat),
    }
}
