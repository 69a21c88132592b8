use actix_web::HttpResponse;

use crate::validation::ValidationError;

/// 400 listing every validation problem.
///
/// `details` holds one `"field: message"` line per error; `fields` the
/// distinct offending fields in order of first appearance, for form highlighting.
pub fn validation_error_response(errors: &[ValidationError]) -> HttpResponse {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    let mut fields: Vec<&str> = Vec::new();
    for e in errors {
        if !fields.contains(&e.field.as_str()) {
            fields.push(&e.field);
        }
    }
    log::debug!("Rejected request: {}", details.join("; "));
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "Validation failed",
        "details": details,
        "fields": fields
    }))
}
