use crate::dtos::{LoginDto, RegisterDto};

use super::constants::{MAX_DISPLAY_NAME_LEN, MAX_EMAIL_LEN, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN};
use super::{ValidationError, ValidationResult, check_text, finish};

fn check_email(errors: &mut Vec<ValidationError>, email: &str) {
    let email = email.trim();
    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        errors.push(ValidationError::new("email", "Must be a valid email address"));
    } else if email.len() > MAX_EMAIL_LEN {
        errors.push(ValidationError::new(
            "email",
            format!("Cannot exceed {} characters", MAX_EMAIL_LEN),
        ));
    }
}

pub fn validate_register(dto: &RegisterDto) -> ValidationResult {
    let mut errors = Vec::new();
    check_email(&mut errors, &dto.email);

    let len = dto.password.chars().count();
    if len < MIN_PASSWORD_LEN {
        errors.push(ValidationError::new(
            "password",
            format!("Must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    } else if len > MAX_PASSWORD_LEN {
        errors.push(ValidationError::new(
            "password",
            format!("Cannot exceed {} characters", MAX_PASSWORD_LEN),
        ));
    }

    check_text(
        &mut errors,
        "display_name",
        &dto.display_name,
        MAX_DISPLAY_NAME_LEN,
    );
    finish(errors)
}

pub fn validate_login(dto: &LoginDto) -> ValidationResult {
    let mut errors = Vec::new();
    if dto.email.trim().is_empty() {
        errors.push(ValidationError::new("email", "Cannot be empty"));
    }
    if dto.password.is_empty() {
        errors.push(ValidationError::new("password", "Cannot be empty"));
    }
    finish(errors)
}
