//! Error types for the gridflow service.
//!
//! `AppError` is what the database, storage and auth layers return;
//! `ApiError` is what handlers turn into HTTP responses.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

use crate::combination::CombinationError;

/// Main error type for service operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// Generic not found
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// Operation not allowed in the entity's current state
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Sweep expansion failed against the workflow document
    #[error("Invalid sweep: {0}")]
    Combination(#[from] CombinationError),

    /// Missing or invalid credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Unique constraint or duplicate resource
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Object store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// A remote service (executor, OAuth provider) failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal error (unexpected)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound {
            message: format!("{} {} not found", what, id),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        AppError::InvalidState {
            message: message.into(),
        }
    }
}

/// Error type for API operations (converts to HTTP responses).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16()
        }))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound { message } => ApiError::NotFound(message),
            AppError::InvalidState { message } => ApiError::Conflict(message),
            AppError::Validation(e) => ApiError::BadRequest(e),
            AppError::Combination(e) => ApiError::BadRequest(e.to_string()),
            AppError::Unauthorized(e) => ApiError::Unauthorized(e),
            AppError::Forbidden(e) => ApiError::Forbidden(e),
            AppError::Conflict(e) => ApiError::Conflict(e),
            AppError::Upstream(e) => {
                log::warn!("Upstream error: {}", e);
                ApiError::BadGateway(e)
            }
            AppError::Database(diesel::result::Error::NotFound) => {
                ApiError::NotFound("Resource not found".to_string())
            }
            AppError::Database(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                info,
            )) => {
                log::debug!("Unique violation: {}", info.message());
                ApiError::Conflict("Resource already exists".to_string())
            }
            AppError::Database(e) => {
                log::error!("Database error: {}", e);
                ApiError::InternalServerError("Database error".to_string())
            }
            AppError::Pool(e) => {
                log::error!("Pool error: {}", e);
                ApiError::InternalServerError("Connection pool error".to_string())
            }
            AppError::Storage(e) => {
                log::error!("Storage error: {}", e);
                ApiError::InternalServerError("Storage error".to_string())
            }
            AppError::Internal(e) => {
                log::error!("Internal error: {}", e);
                ApiError::InternalServerError("Internal server error".to_string())
            }
        }
    }
}

/// Result type alias for service operations.
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
