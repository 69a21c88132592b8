use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::User;

/// Input DTO for `POST /auth/register`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterDto {
    /// Unique, case-insensitive.
    pub email: String,
    /// At least 8 characters.
    pub password: String,
    pub display_name: String,
}

/// Input DTO for `POST /auth/login`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

/// A signed-in user as seen by clients.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct UserDto {
    pub id: uuid::Uuid,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    /// True when the account is linked to a Google identity.
    pub google_linked: bool,
    pub created_at: chrono::DateTime<Utc>,
    pub last_login_at: Option<chrono::DateTime<Utc>>,
}

/// Returned by every sign-in endpoint. Send `token` as `Authorization: Bearer <token>`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionDto {
    pub token: String,
    pub expires_at: chrono::DateTime<Utc>,
    pub user: UserDto,
}

/// Authorization URL for Google sign-in, returned by `GET /auth/google/url`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GoogleAuthUrlDto {
    pub url: String,
    /// Opaque value to send back with the callback.
    pub state: String,
}

/// Input DTO for `POST /auth/google/callback`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GoogleCallbackDto {
    pub code: String,
    pub state: String,
}

impl From<User> for UserDto {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            display_name: u.display_name,
            is_admin: u.is_admin,
            google_linked: u.google_sub.is_some(),
            created_at: u.created_at,
            last_login_at: u.last_login_at,
        }
    }
}
