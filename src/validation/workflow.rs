use crate::dtos::{NewWorkflowDto, UpdateWorkflowDto};

use super::constants::{MAX_DESCRIPTION_LEN, MAX_NAME_LEN};
use super::{ValidationError, ValidationResult, check_text, finish};

/// A workflow document is a non-empty JSON object whose entries are node objects.
pub fn validate_document(
    document: &serde_json::Value,
    max_bytes: usize,
) -> Result<(), ValidationError> {
    let Some(nodes) = document.as_object() else {
        return Err(ValidationError::new(
            "document",
            "Must be a JSON object mapping node ids to nodes",
        ));
    };
    if nodes.is_empty() {
        return Err(ValidationError::new(
            "document",
            "Must contain at least one node",
        ));
    }
    if let Some((node_id, _)) = nodes.iter().find(|(_, node)| !node.is_object()) {
        return Err(ValidationError::new(
            format!("document.{}", node_id),
            "Node must be a JSON object",
        ));
    }
    let size = serde_json::to_vec(document).map(|v| v.len()).unwrap_or(0);
    if size > max_bytes {
        return Err(ValidationError::new(
            "document",
            format!("Cannot exceed {} bytes (got {})", max_bytes, size),
        ));
    }
    Ok(())
}

fn check_description(errors: &mut Vec<ValidationError>, description: Option<&str>) {
    if let Some(d) = description
        && d.chars().count() > MAX_DESCRIPTION_LEN
    {
        errors.push(ValidationError::new(
            "description",
            format!("Cannot exceed {} characters", MAX_DESCRIPTION_LEN),
        ));
    }
}

pub fn validate_new_workflow(dto: &NewWorkflowDto, max_document_bytes: usize) -> ValidationResult {
    let mut errors = Vec::new();
    check_text(&mut errors, "name", &dto.name, MAX_NAME_LEN);
    check_description(&mut errors, dto.description.as_deref());
    if let Err(e) = validate_document(&dto.document, max_document_bytes) {
        errors.push(e);
    }
    finish(errors)
}

pub fn validate_update_workflow(
    dto: &UpdateWorkflowDto,
    max_document_bytes: usize,
) -> ValidationResult {
    let mut errors = Vec::new();
    if dto.name.is_none() && dto.description.is_none() && dto.document.is_none() {
        errors.push(ValidationError::new("body", "Nothing to update"));
    }
    if let Some(name) = &dto.name {
        check_text(&mut errors, "name", name, MAX_NAME_LEN);
    }
    check_description(&mut errors, dto.description.as_deref());
    if let Some(document) = &dto.document
        && let Err(e) = validate_document(document, max_document_bytes)
    {
        errors.push(e);
    }
    finish(errors)
}
