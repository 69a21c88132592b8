use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Notification, NotificationLevel, SiteSetting};

/// A site setting as returned by `GET /settings`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SettingDto {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: chrono::DateTime<Utc>,
}

/// Body of `PUT /admin/settings/{key}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpsertSettingDto {
    pub value: serde_json::Value,
}

/// Input DTO for `POST /admin/notifications`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewNotificationDto {
    pub title: String,
    pub body: String,
    /// Defaults to `Info`.
    #[serde(default = "default_level")]
    pub level: NotificationLevel,
    /// Hidden from users after this instant. Never expires when null.
    pub expires_at: Option<chrono::DateTime<Utc>>,
}

fn default_level() -> NotificationLevel {
    NotificationLevel::Info
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationDto {
    pub id: uuid::Uuid,
    pub title: String,
    pub body: String,
    pub level: NotificationLevel,
    pub created_at: chrono::DateTime<Utc>,
    pub expires_at: Option<chrono::DateTime<Utc>>,
}

/// A notification with the caller's read flag.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserNotificationDto {
    #[serde(flatten)]
    pub notification: NotificationDto,
    pub read: bool,
}

/// Body of `PATCH /admin/users/{id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserDto {
    pub is_admin: bool,
}

impl From<SiteSetting> for SettingDto {
    fn from(s: SiteSetting) -> Self {
        Self {
            key: s.key,
            value: s.value,
            updated_at: s.updated_at,
        }
    }
}

impl From<Notification> for NotificationDto {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            title: n.title,
            body: n.body,
            level: n.level,
            created_at: n.created_at,
            expires_at: n.expires_at,
        }
    }
}
