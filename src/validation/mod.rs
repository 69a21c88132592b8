//! Input validation for request payloads.
//!
//! Validators collect every problem instead of stopping at the first one, so
//! a client gets the full list in a single 400 response.

mod admin;
mod auth;
pub mod constants;
mod file;
mod task;
mod workflow;

pub use admin::{validate_new_notification, validate_setting_key};
pub use auth::{validate_login, validate_register};
pub use file::validate_filename;
pub use task::{validate_axes, validate_new_task, validate_update_item};
pub use workflow::{validate_document, validate_new_workflow, validate_update_workflow};

/// Validation error with details about what failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of validation - either Ok or a list of errors.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn finish(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check a required, length-bounded text field.
fn check_text(errors: &mut Vec<ValidationError>, field: &str, value: &str, max_len: usize) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "Cannot be empty"));
    } else if value.chars().count() > max_len {
        errors.push(ValidationError::new(
            field,
            format!("Cannot exceed {} characters", max_len),
        ));
    }
}
