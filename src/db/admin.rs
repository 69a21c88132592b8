use crate::{
    Conn, dtos,
    models::{NewNotification, NewNotificationRead, NewSiteSetting, Notification, SiteSetting},
    schema::{notification, notification_read, site_setting},
};
use diesel::dsl::now;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::DbError;

// =============================================================================
// Site settings
// =============================================================================

pub async fn list_settings<'a>(conn: &mut Conn<'a>) -> Result<Vec<SiteSetting>, DbError> {
    Ok(site_setting::table
        .order(site_setting::key.asc())
        .select(SiteSetting::as_select())
        .load(conn)
        .await?)
}

pub async fn upsert_setting<'a>(
    conn: &mut Conn<'a>,
    key: &str,
    value: &serde_json::Value,
    updated_by: Uuid,
) -> Result<SiteSetting, DbError> {
    let row = NewSiteSetting {
        key,
        value,
        updated_by: Some(updated_by),
    };
    Ok(diesel::insert_into(site_setting::table)
        .values(&row)
        .on_conflict(site_setting::key)
        .do_update()
        .set((&row, site_setting::updated_at.eq(now)))
        .returning(SiteSetting::as_returning())
        .get_result(conn)
        .await?)
}

pub async fn delete_setting<'a>(conn: &mut Conn<'a>, key: &str) -> Result<bool, DbError> {
    let deleted = diesel::delete(site_setting::table.filter(site_setting::key.eq(key)))
        .execute(conn)
        .await?;
    Ok(deleted == 1)
}

// =============================================================================
// Notifications
// =============================================================================

pub async fn insert_notification<'a>(
    conn: &mut Conn<'a>,
    new_notification: NewNotification,
) -> Result<Notification, DbError> {
    Ok(diesel::insert_into(notification::table)
        .values(&new_notification)
        .returning(Notification::as_returning())
        .get_result(conn)
        .await?)
}

/// All notifications, expired ones included, newest first.
pub async fn list_notifications<'a>(
    conn: &mut Conn<'a>,
    pagination: dtos::Pagination,
) -> Result<Vec<Notification>, DbError> {
    Ok(notification::table
        .order(notification::created_at.desc())
        .offset(pagination.offset)
        .limit(pagination.limit)
        .select(Notification::as_select())
        .load(conn)
        .await?)
}

pub async fn delete_notification<'a>(
    conn: &mut Conn<'a>,
    notification_id: Uuid,
) -> Result<bool, DbError> {
    let deleted = diesel::delete(notification::table.filter(notification::id.eq(notification_id)))
        .execute(conn)
        .await?;
    Ok(deleted == 1)
}

/// Unexpired notifications with whether `user_id` has read them, newest first.
pub async fn list_active_notifications<'a>(
    conn: &mut Conn<'a>,
    user_id: Uuid,
) -> Result<Vec<(Notification, bool)>, DbError> {
    let rows: Vec<(Notification, Option<chrono::DateTime<chrono::Utc>>)> = notification::table
        .left_join(
            notification_read::table.on(notification_read::notification_id
                .eq(notification::id)
                .and(notification_read::user_id.eq(user_id))),
        )
        .filter(
            notification::expires_at
                .is_null()
                .or(notification::expires_at.gt(now)),
        )
        .order(notification::created_at.desc())
        .select((
            Notification::as_select(),
            notification_read::read_at.nullable(),
        ))
        .load(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(n, read_at)| (n, read_at.is_some()))
        .collect())
}

/// Mark a notification read for a user. Marking twice is a no-op.
pub async fn mark_notification_read<'a>(
    conn: &mut Conn<'a>,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<(), DbError> {
    let exists = notification::table
        .filter(notification::id.eq(notification_id))
        .select(notification::id)
        .first::<Uuid>(conn)
        .await
        .optional()?
        .is_some();
    if !exists {
        return Err(DbError::not_found("Notification", notification_id));
    }

    diesel::insert_into(notification_read::table)
        .values(&NewNotificationRead {
            user_id,
            notification_id,
        })
        .on_conflict_do_nothing()
        .execute(conn)
        .await?;
    Ok(())
}
