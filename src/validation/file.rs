use super::constants::MAX_FILENAME_LEN;
use super::{ValidationError, ValidationResult, check_text, finish};

/// Upload names are plain file names: no directories, no control characters.
pub fn validate_filename(filename: &str) -> ValidationResult {
    let mut errors = Vec::new();
    check_text(&mut errors, "filename", filename, MAX_FILENAME_LEN);
    if filename.contains(['/', '\\']) || filename.chars().any(char::is_control) {
        errors.push(ValidationError::new(
            "filename",
            "Cannot contain path separators or control characters",
        ));
    }
    if matches!(filename.trim(), "." | "..") {
        errors.push(ValidationError::new("filename", "Is not a file name"));
    }
    finish(errors)
}
