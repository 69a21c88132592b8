use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::combination::Axes;

#[derive(Identifiable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: uuid::Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: Option<String>,
    /// Google account subject, set once the user signed in with Google.
    pub google_sub: Option<String>,
    pub is_admin: bool,
    pub created_at: chrono::DateTime<Utc>,
    pub last_login_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub display_name: &'a str,
    pub password_hash: Option<String>,
    pub google_sub: Option<&'a str>,
    pub is_admin: bool,
}

#[derive(Identifiable, Queryable, Selectable, Associations, Debug)]
#[diesel(table_name = crate::schema::session, belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Session {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    /// Only the digest of the bearer token is stored.
    pub token_hash: String,
    pub created_at: chrono::DateTime<Utc>,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::session)]
pub struct NewSession<'a> {
    pub user_id: uuid::Uuid,
    pub token_hash: &'a str,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::oauth_state)]
pub struct NewOAuthState<'a> {
    pub state: &'a str,
    pub expires_at: chrono::DateTime<Utc>,
}

#[derive(Identifiable, Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = crate::schema::workflow)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Workflow {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub document: serde_json::Value,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::workflow)]
pub struct NewWorkflow {
    pub owner_id: uuid::Uuid,
    pub name: String,
    pub description: Option<String>,
    pub document: serde_json::Value,
}

/// Partial workflow update; `None` fields are left untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = crate::schema::workflow)]
pub struct WorkflowChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub document: Option<serde_json::Value>,
}

#[derive(Identifiable, Queryable, Selectable, Serialize, Debug, Clone)]
#[diesel(table_name = crate::schema::task)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Task {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    /// Null once the workflow the task was created from is deleted.
    pub workflow_id: Option<uuid::Uuid>,
    pub name: String,
    pub status: StatusKind,
    pub axes: Axes,
    pub total_items: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub created_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub ended_at: Option<chrono::DateTime<Utc>>,
    pub last_updated: chrono::DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::task)]
pub struct NewTask {
    pub owner_id: uuid::Uuid,
    pub workflow_id: Option<uuid::Uuid>,
    pub name: String,
    pub status: StatusKind,
    pub axes: Axes,
    pub total_items: i32,
}

#[derive(Identifiable, Queryable, Selectable, Associations, Serialize, Debug, Clone)]
#[diesel(table_name = crate::schema::task_item, belongs_to(Task))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskItem {
    pub id: uuid::Uuid,
    pub task_id: uuid::Uuid,
    /// Index in generation order of the sweep.
    pub position: i32,
    /// The workflow document with this item's overrides applied.
    pub params: serde_json::Value,
    pub x_value: Option<serde_json::Value>,
    pub y_value: Option<serde_json::Value>,
    pub z_value: Option<serde_json::Value>,
    pub status: StatusKind,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub ended_at: Option<chrono::DateTime<Utc>>,
    pub last_updated: chrono::DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::task_item)]
pub struct NewTaskItem {
    pub task_id: uuid::Uuid,
    pub position: i32,
    pub params: serde_json::Value,
    pub x_value: Option<serde_json::Value>,
    pub y_value: Option<serde_json::Value>,
    pub z_value: Option<serde_json::Value>,
    pub status: StatusKind,
}

#[derive(Identifiable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::stored_file)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoredFile {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub object_key: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub created_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::stored_file)]
pub struct NewStoredFile {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    pub object_key: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: i64,
}

#[derive(Identifiable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::site_setting, primary_key(key))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SiteSetting {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at: chrono::DateTime<Utc>,
    pub updated_by: Option<uuid::Uuid>,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::site_setting)]
pub struct NewSiteSetting<'a> {
    pub key: &'a str,
    pub value: &'a serde_json::Value,
    pub updated_by: Option<uuid::Uuid>,
}

#[derive(Identifiable, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::notification)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Notification {
    pub id: uuid::Uuid,
    pub title: String,
    pub body: String,
    pub level: NotificationLevel,
    pub created_by: Option<uuid::Uuid>,
    pub created_at: chrono::DateTime<Utc>,
    pub expires_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::notification)]
pub struct NewNotification {
    pub title: String,
    pub body: String,
    pub level: NotificationLevel,
    pub created_by: Option<uuid::Uuid>,
    pub expires_at: Option<chrono::DateTime<Utc>>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::schema::notification_read)]
pub struct NewNotificationRead {
    pub user_id: uuid::Uuid,
    pub notification_id: uuid::Uuid,
}

/// Lifecycle of both tasks and their items.
///
/// `Pending` -> `Running` -> `Success` | `Failure`; `Canceled` from any
/// non-terminal state.
#[derive(
    Debug,
    PartialEq,
    Serialize,
    diesel_derive_enum::DbEnum,
    Deserialize,
    Clone,
    Copy,
    Hash,
    Eq,
    ToSchema,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::StatusKind")]
pub enum StatusKind {
    Pending,
    Running,
    Success,
    Failure,
    Canceled,
}

impl StatusKind {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StatusKind::Success | StatusKind::Failure | StatusKind::Canceled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Pending => "pending",
            StatusKind::Running => "running",
            StatusKind::Success => "success",
            StatusKind::Failure => "failure",
            StatusKind::Canceled => "canceled",
        }
    }
}

#[derive(
    Debug, PartialEq, Serialize, diesel_derive_enum::DbEnum, Deserialize, Clone, Copy, Eq, ToSchema,
)]
#[db_enum(existing_type_path = "crate::schema::sql_types::NotificationLevel")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}
