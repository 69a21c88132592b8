use crate::dtos::NewNotificationDto;

use super::constants::{
    MAX_NOTIFICATION_BODY_LEN, MAX_NOTIFICATION_TITLE_LEN, MAX_SETTING_KEY_LEN,
    MAX_SETTING_VALUE_BYTES,
};
use super::{ValidationError, ValidationResult, check_text, finish};

/// Setting keys are short lowercase identifiers: `[a-z0-9_.-]`.
pub fn validate_setting_key(key: &str, value: &serde_json::Value) -> ValidationResult {
    let mut errors = Vec::new();
    if key.is_empty() || key.len() > MAX_SETTING_KEY_LEN {
        errors.push(ValidationError::new(
            "key",
            format!("Must be 1 to {} characters", MAX_SETTING_KEY_LEN),
        ));
    } else if !key
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
    {
        errors.push(ValidationError::new(
            "key",
            "Only lowercase letters, digits, '_', '.' and '-' are allowed",
        ));
    }
    let size = serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0);
    if size > MAX_SETTING_VALUE_BYTES {
        errors.push(ValidationError::new("value", "Cannot exceed 64KB"));
    }
    finish(errors)
}

pub fn validate_new_notification(
    dto: &NewNotificationDto,
    now: chrono::DateTime<chrono::Utc>,
) -> ValidationResult {
    let mut errors = Vec::new();
    check_text(&mut errors, "title", &dto.title, MAX_NOTIFICATION_TITLE_LEN);
    check_text(&mut errors, "body", &dto.body, MAX_NOTIFICATION_BODY_LEN);
    if let Some(expires_at) = dto.expires_at
        && expires_at <= now
    {
        errors.push(ValidationError::new("expires_at", "Must be in the future"));
    }
    finish(errors)
}
