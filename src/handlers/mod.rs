//! HTTP handlers for the gridflow API.
//!
//! This module contains all HTTP handler functions that can be used by both
//! the main application and integration tests.

mod admin;
mod auth;
mod file;
mod health;
pub mod response;
mod task;
mod workflow;

use std::sync::Arc;

use actix_web::{HttpResponse, error, web};
use utoipa::OpenApi;

use crate::{DbPool, config::Config, dtos, executor::ExecutorClient, metrics, storage::ObjectStore};

pub use admin::{
    create_notification, delete_notification, delete_setting, list_my_notifications,
    list_notifications, list_settings, list_users, mark_notification_read, put_setting,
    update_user,
};
pub use auth::{google_callback, google_url, login, logout, me, register};
pub use file::{delete_file, download_file, list_files, persist_upload, upload_file};
pub use health::{health_check, readiness_check};
pub use task::{add_task, cancel_task, get_task, get_task_grid, list_task, retry_task, update_item};
pub use workflow::{
    add_workflow, delete_workflow, get_workflow, list_workflow, list_workflow_nodes,
    update_workflow,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,
    pub executor: ExecutorClient,
    pub store: Arc<dyn ObjectStore>,
    /// Client for outbound calls other than item submission (OAuth).
    pub http: reqwest::Client,
}

impl AppState {
    /// Get a database connection with retry logic.
    pub async fn conn(&self) -> Result<crate::Conn<'_>, actix_web::Error> {
        get_conn_with_retry(
            &self.pool,
            self.config.pool.acquire_retries,
            self.config.pool.retry_delay,
        )
        .await
    }
}

/// Health check response showing service and database status.
#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// Overall service status: "ok" or "degraded"
    pub status: String,
    /// Database connectivity status: "healthy" or "unhealthy"
    pub database: String,
    /// Object store status: "healthy" or "unhealthy"
    pub storage: String,
    /// "configured", or "disabled" when no executor URL is set
    pub executor: String,
    /// Total number of connections in the pool
    pub pool_size: u32,
    /// Number of idle (available) connections in the pool
    pub pool_idle: u32,
}

/// Helper to get a connection from pool with retry logic
pub async fn get_conn_with_retry<'a>(
    pool: &'a DbPool,
    max_retries: u32,
    retry_delay: std::time::Duration,
) -> Result<crate::Conn<'a>, actix_web::Error> {
    let effective_retries = max_retries.max(1);
    let mut last_error = String::new();

    for attempt in 0..effective_retries {
        match pool.get().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                last_error = e.to_string();
                if attempt + 1 < effective_retries {
                    log::warn!(
                        "Failed to acquire connection (attempt {}/{}), retrying in {:?}",
                        attempt + 1,
                        effective_retries,
                        retry_delay
                    );
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    log::error!(
        "Failed to acquire connection after {} attempts: {}",
        effective_retries,
        last_error
    );
    metrics::record_pool_exhausted();
    Err(error::ErrorServiceUnavailable(
        "Database connection unavailable",
    ))
}

/// Serve the generated OpenAPI document.
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}

// =============================================================================
// OpenAPI Documentation
// =============================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness_check,
        workflow::list_workflow,
        workflow::add_workflow,
        workflow::get_workflow,
        workflow::update_workflow,
        workflow::delete_workflow,
        workflow::list_workflow_nodes,
        task::list_task,
        task::add_task,
        task::get_task,
        task::get_task_grid,
        task::cancel_task,
        task::retry_task,
        task::update_item,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        auth::google_url,
        auth::google_callback,
        file::upload_file,
        file::list_files,
        file::download_file,
        file::delete_file,
        admin::list_settings,
        admin::put_setting,
        admin::delete_setting,
        admin::create_notification,
        admin::list_notifications,
        admin::delete_notification,
        admin::list_my_notifications,
        admin::mark_notification_read,
        admin::list_users,
        admin::update_user,
    ),
    components(schemas(
        HealthResponse,
        dtos::NewWorkflowDto,
        dtos::UpdateWorkflowDto,
        dtos::WorkflowSummaryDto,
        dtos::WorkflowDto,
        dtos::NodeDto,
        dtos::NewTaskDto,
        dtos::TaskDto,
        dtos::TaskItemDto,
        dtos::DetailedTaskDto,
        dtos::UpdateItemDto,
        dtos::GridCellDto,
        dtos::GridLayerDto,
        dtos::TaskGridDto,
        dtos::ItemCountDto,
        dtos::RegisterDto,
        dtos::LoginDto,
        dtos::UserDto,
        dtos::SessionDto,
        dtos::GoogleAuthUrlDto,
        dtos::GoogleCallbackDto,
        dtos::FileDto,
        dtos::SettingDto,
        dtos::UpsertSettingDto,
        dtos::NewNotificationDto,
        dtos::NotificationDto,
        dtos::UserNotificationDto,
        dtos::UpdateUserDto,
        crate::models::StatusKind,
        crate::models::NotificationLevel,
        crate::combination::Axes,
        crate::combination::ParamOverride,
    )),
    tags(
        (name = "health", description = "Health and readiness probes. Use GET /health for liveness and GET /ready for readiness."),
        (name = "workflows", description = "Stored workflow documents: JSON objects of nodes, each with an `inputs` object that sweeps override."),
        (name = "tasks", description = "Parameter sweeps over a workflow. A task expands its X/Y/Z axes into one item per combination; the dispatcher submits items to the executor, which reports back on PATCH /task/item/{item_id}."),
        (name = "auth", description = "Accounts and bearer sessions, with password or Google sign-in."),
        (name = "files", description = "Uploaded files kept in the object store."),
        (name = "admin", description = "Site settings, notifications and user management."),
    ),
    info(
        title = "Gridflow API",
        version = "0.1.0",
        description = "Runs parameter sweeps of stored workflows on an external executor and pivots the results into X/Y/Z grids.\n\nAuthenticated endpoints expect `Authorization: Bearer <token>` from one of the sign-in endpoints.",
    )
)]
pub struct ApiDoc;

// =============================================================================
// Route Configuration
// =============================================================================

/// Configure all routes for the application.
/// This can be used by both the main application and integration tests.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check))
        .route("/workflow", web::get().to(list_workflow))
        .route("/workflow", web::post().to(add_workflow))
        .route("/workflow/{workflow_id}", web::get().to(get_workflow))
        .route("/workflow/{workflow_id}", web::patch().to(update_workflow))
        .route("/workflow/{workflow_id}", web::delete().to(delete_workflow))
        .route(
            "/workflow/{workflow_id}/nodes",
            web::get().to(list_workflow_nodes),
        )
        .route("/task", web::get().to(list_task))
        .route("/task", web::post().to(add_task))
        .route("/task/item/{item_id}", web::patch().to(update_item))
        .route("/task/{task_id}", web::get().to(get_task))
        .route("/task/{task_id}", web::delete().to(cancel_task))
        .route("/task/{task_id}/grid", web::get().to(get_task_grid))
        .route("/task/{task_id}/retry", web::post().to(retry_task))
        .route("/auth/register", web::post().to(register))
        .route("/auth/login", web::post().to(login))
        .route("/auth/logout", web::post().to(logout))
        .route("/auth/me", web::get().to(me))
        .route("/auth/google/url", web::get().to(google_url))
        .route("/auth/google/callback", web::post().to(google_callback))
        .route("/files", web::post().to(upload_file))
        .route("/files", web::get().to(list_files))
        .route("/files/{file_id}", web::get().to(download_file))
        .route("/files/{file_id}", web::delete().to(delete_file))
        .route("/settings", web::get().to(list_settings))
        .route("/admin/settings/{key}", web::put().to(put_setting))
        .route("/admin/settings/{key}", web::delete().to(delete_setting))
        .route("/admin/notifications", web::post().to(create_notification))
        .route("/admin/notifications", web::get().to(list_notifications))
        .route(
            "/admin/notifications/{notification_id}",
            web::delete().to(delete_notification),
        )
        .route("/notifications", web::get().to(list_my_notifications))
        .route(
            "/notifications/{notification_id}/read",
            web::post().to(mark_notification_read),
        )
        .route("/admin/users", web::get().to(list_users))
        .route("/admin/users/{user_id}", web::patch().to(update_user))
        .route("/api-docs/openapi.json", web::get().to(openapi_json));
}
