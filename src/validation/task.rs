use crate::combination::{self, Axes, Axis, INPUTS_KEY};
use crate::config::LimitsConfig;
use crate::dtos::{NewTaskDto, UpdateItemDto};
use crate::models::StatusKind;

use super::constants::{MAX_ERROR_LEN, MAX_NAME_LEN, MAX_OVERRIDE_KEY_LEN, MAX_RESULT_BYTES};
use super::{ValidationError, ValidationResult, check_text, finish};

/// Validates a sweep against the workflow document it will be applied to.
pub fn validate_axes(axes: &Axes, document: &serde_json::Value, limits: &LimitsConfig) -> ValidationResult {
    let max_items = limits.max_task_items;
    let mut errors = Vec::new();

    for axis in Axis::ALL {
        let candidates = axes.get(axis);
        for (i, candidate) in candidates.iter().enumerate() {
            if candidate.0.is_empty() {
                errors.push(ValidationError::new(
                    format!("axes.{}[{}]", axis.name(), i),
                    "A candidate needs at least one override",
                ));
            }
        }
        if let Some(i) = combination::find_duplicate_candidate(candidates) {
            errors.push(ValidationError::new(
                format!("axes.{}[{}]", axis.name(), i),
                "Duplicate candidate on the same axis",
            ));
        }
    }

    for (axis, i, o) in axes.overrides() {
        let field = format!("axes.{}[{}]", axis.name(), i);
        if o.node_id.trim().is_empty() || o.node_id.len() > MAX_OVERRIDE_KEY_LEN {
            errors.push(ValidationError::new(
                format!("{}.node_id", field),
                format!("Must be 1 to {} characters", MAX_OVERRIDE_KEY_LEN),
            ));
            continue;
        }
        if o.param_key.trim().is_empty() || o.param_key.len() > MAX_OVERRIDE_KEY_LEN {
            errors.push(ValidationError::new(
                format!("{}.param_key", field),
                format!("Must be 1 to {} characters", MAX_OVERRIDE_KEY_LEN),
            ));
        }
        match document.get(o.node_id.as_str()).and_then(|n| n.as_object()) {
            None => errors.push(ValidationError::new(
                format!("{}.node_id", field),
                format!("Node '{}' does not exist in the workflow", o.node_id),
            )),
            Some(node) => {
                if node.get(INPUTS_KEY).is_some_and(|i| !i.is_object()) {
                    errors.push(ValidationError::new(
                        format!("{}.node_id", field),
                        format!("Node '{}' has non-object inputs", o.node_id),
                    ));
                }
            }
        }
    }

    match combination::total_combinations(axes) {
        Some(count) if count <= max_items => {}
        Some(count) => errors.push(ValidationError::new(
            "axes",
            format!("Sweep produces {} items, the limit is {}", count, max_items),
        )),
        None => errors.push(ValidationError::new(
            "axes",
            format!("Sweep is too large, the limit is {} items", max_items),
        )),
    }

    // Only meaningful once the item count is within bounds.
    if errors.is_empty() {
        match combination::estimated_sweep_bytes(document, axes) {
            Some(bytes) if bytes <= limits.max_sweep_bytes => {}
            estimate => errors.push(ValidationError::new(
                "axes",
                format!(
                    "Sweep needs about {} bytes of parameters, the limit is {}",
                    estimate.map_or_else(|| "too many".to_string(), |b| b.to_string()),
                    limits.max_sweep_bytes
                ),
            )),
        }
    }

    finish(errors)
}

/// Validates a new task DTO before expansion.
pub fn validate_new_task(
    dto: &NewTaskDto,
    document: &serde_json::Value,
    limits: &LimitsConfig,
) -> ValidationResult {
    let mut errors = Vec::new();
    check_text(&mut errors, "name", &dto.name, MAX_NAME_LEN);
    if let Err(axis_errors) = validate_axes(&dto.axes, document, limits) {
        errors.extend(axis_errors);
    }
    finish(errors)
}

/// Validates an executor callback.
pub fn validate_update_item(dto: &UpdateItemDto) -> ValidationResult {
    let mut errors = Vec::new();

    match dto.status {
        StatusKind::Success => {}
        StatusKind::Failure => match dto.error.as_deref() {
            Some(e) if !e.trim().is_empty() => {}
            _ => errors.push(ValidationError::new(
                "error",
                "Required when status is Failure",
            )),
        },
        other => errors.push(ValidationError::new(
            "status",
            format!("Must be Success or Failure, got {:?}", other),
        )),
    }

    if let Some(e) = &dto.error
        && e.chars().count() > MAX_ERROR_LEN
    {
        errors.push(ValidationError::new(
            "error",
            format!("Cannot exceed {} characters", MAX_ERROR_LEN),
        ));
    }

    if let Some(result) = &dto.result {
        let size = serde_json::to_vec(result).map(|v| v.len()).unwrap_or(0);
        if size > MAX_RESULT_BYTES {
            errors.push(ValidationError::new("result", "Cannot exceed 1MB"));
        }
    }

    finish(errors)
}
