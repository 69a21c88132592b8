use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::{
    auth::{AdminUser, AuthUser},
    db, dtos,
    error::{ApiError, AppError},
    models::NewNotification,
    validation,
};

use super::AppState;
use super::response::validation_error_response;

// =============================================================================
// Site settings
// =============================================================================

#[utoipa::path(
    get,
    path = "/settings",
    summary = "List site settings",
    description = "Public: no sign-in needed. Settings are sorted by key.",
    responses((status = 200, description = "All settings", body = Vec<dtos::SettingDto>)),
    tag = "admin"
)]
pub async fn list_settings(state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let settings = db::list_settings(&mut conn).await.map_err(ApiError::from)?;
    let body: Vec<dtos::SettingDto> = settings.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    put,
    path = "/admin/settings/{key}",
    summary = "Create or replace a setting",
    params(("key" = String, Path, description = "Setting key, `[a-z0-9_.-]`, at most 100 characters")),
    request_body = dtos::UpsertSettingDto,
    responses(
        (status = 200, description = "Stored setting", body = dtos::SettingDto),
        (status = 400, description = "Invalid key or value too large"),
        (status = 403, description = "Not an admin"),
    ),
    tag = "admin"
)]
pub async fn put_setting(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    key: web::Path<String>,
    form: web::Json<dtos::UpsertSettingDto>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) = validation::validate_setting_key(&key, &form.value) {
        return Ok(validation_error_response(&errors));
    }
    let mut conn = state.conn().await?;
    let setting = db::upsert_setting(&mut conn, &key, &form.value, admin.id)
        .await
        .map_err(ApiError::from)?;
    log::info!("Setting {} updated by {}", setting.key, admin.id);
    Ok(HttpResponse::Ok().json(dtos::SettingDto::from(setting)))
}

#[utoipa::path(
    delete,
    path = "/admin/settings/{key}",
    summary = "Delete a setting",
    params(("key" = String, Path, description = "Setting key")),
    responses(
        (status = 204, description = "Setting deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such setting"),
    ),
    tag = "admin"
)]
pub async fn delete_setting(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    key: web::Path<String>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    if !db::delete_setting(&mut conn, &key)
        .await
        .map_err(ApiError::from)?
    {
        return Err(ApiError::from(AppError::not_found("Setting", key.as_str())).into());
    }
    log::info!("Setting {} deleted by {}", key, admin.id);
    Ok(HttpResponse::NoContent().finish())
}

// =============================================================================
// Notifications
// =============================================================================

#[utoipa::path(
    post,
    path = "/admin/notifications",
    summary = "Publish a notification",
    request_body = dtos::NewNotificationDto,
    responses(
        (status = 201, description = "Notification created", body = dtos::NotificationDto),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not an admin"),
    ),
    tag = "admin"
)]
pub async fn create_notification(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    form: web::Json<dtos::NewNotificationDto>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) = validation::validate_new_notification(&form, chrono::Utc::now()) {
        return Ok(validation_error_response(&errors));
    }
    let dto = form.into_inner();

    let mut conn = state.conn().await?;
    let notification = db::insert_notification(
        &mut conn,
        NewNotification {
            title: dto.title.trim().to_string(),
            body: dto.body,
            level: dto.level,
            created_by: Some(admin.id),
            expires_at: dto.expires_at,
        },
    )
    .await
    .map_err(ApiError::from)?;
    Ok(HttpResponse::Created().json(dtos::NotificationDto::from(notification)))
}

#[utoipa::path(
    get,
    path = "/admin/notifications",
    summary = "List all notifications",
    description = "Includes expired notifications, newest first.",
    params(dtos::PaginationDto),
    responses(
        (status = 200, description = "Notifications", body = Vec<dtos::NotificationDto>),
        (status = 403, description = "Not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_notifications(
    state: web::Data<AppState>,
    _admin: AdminUser,
    pagination: web::Query<dtos::PaginationDto>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let pagination = pagination.into_inner().resolve(&state.config);
    let notifications = db::list_notifications(&mut conn, pagination)
        .await
        .map_err(ApiError::from)?;
    let body: Vec<dtos::NotificationDto> = notifications.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    delete,
    path = "/admin/notifications/{notification_id}",
    summary = "Delete a notification",
    params(("notification_id" = Uuid, Path, description = "The UUID of the notification")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such notification"),
    ),
    tag = "admin"
)]
pub async fn delete_notification(
    state: web::Data<AppState>,
    _admin: AdminUser,
    notification_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    if !db::delete_notification(&mut conn, *notification_id)
        .await
        .map_err(ApiError::from)?
    {
        return Err(ApiError::from(AppError::not_found("Notification", *notification_id)).into());
    }
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/notifications",
    summary = "Active notifications",
    description = "Unexpired notifications, newest first, each with the caller's read flag.",
    responses(
        (status = 200, description = "Notifications", body = Vec<dtos::UserNotificationDto>),
        (status = 401, description = "Not signed in"),
    ),
    tag = "admin"
)]
pub async fn list_my_notifications(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let rows = db::list_active_notifications(&mut conn, user.id)
        .await
        .map_err(ApiError::from)?;
    let body: Vec<dtos::UserNotificationDto> = rows
        .into_iter()
        .map(|(n, read)| dtos::UserNotificationDto {
            notification: n.into(),
            read,
        })
        .collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/notifications/{notification_id}/read",
    summary = "Mark a notification read",
    description = "Idempotent.",
    params(("notification_id" = Uuid, Path, description = "The UUID of the notification")),
    responses(
        (status = 204, description = "Marked read"),
        (status = 404, description = "No such notification"),
    ),
    tag = "admin"
)]
pub async fn mark_notification_read(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    notification_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    db::mark_notification_read(&mut conn, user.id, *notification_id)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::NoContent().finish())
}

// =============================================================================
// Users
// =============================================================================

#[utoipa::path(
    get,
    path = "/admin/users",
    summary = "List users",
    description = "`q` filters by a case-insensitive substring of the email or display name.",
    params(dtos::PaginationDto, dtos::NameFilterDto),
    responses(
        (status = 200, description = "Users, oldest first", body = Vec<dtos::UserDto>),
        (status = 403, description = "Not an admin"),
    ),
    tag = "admin"
)]
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
    pagination: web::Query<dtos::PaginationDto>,
    filter: web::Query<dtos::NameFilterDto>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let pagination = pagination.into_inner().resolve(&state.config);
    let users = db::list_users(&mut conn, pagination, filter.into_inner().resolve())
        .await
        .map_err(ApiError::from)?;
    let body: Vec<dtos::UserDto> = users.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    patch,
    path = "/admin/users/{user_id}",
    summary = "Grant or revoke admin",
    description = "Admins cannot revoke their own admin flag.",
    params(("user_id" = Uuid, Path, description = "The UUID of the user")),
    request_body = dtos::UpdateUserDto,
    responses(
        (status = 200, description = "Updated user", body = dtos::UserDto),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Admin tried to demote themself"),
    ),
    tag = "admin"
)]
pub async fn update_user(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    user_id: web::Path<Uuid>,
    form: web::Json<dtos::UpdateUserDto>,
) -> actix_web::Result<HttpResponse> {
    if *user_id == admin.id && !form.is_admin {
        return Err(ApiError::Conflict("Admins cannot revoke their own admin flag".to_string()).into());
    }
    let mut conn = state.conn().await?;
    let user = db::set_admin(&mut conn, *user_id, form.is_admin)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(AppError::not_found("User", *user_id)))?;
    log::info!(
        "User {} admin flag set to {} by {}",
        user.id,
        user.is_admin,
        admin.id
    );
    Ok(HttpResponse::Ok().json(dtos::UserDto::from(user)))
}
