use crate::{
    Conn, dtos,
    models::{NewUser, User},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::DbError;

pub async fn find_user_by_id<'a>(conn: &mut Conn<'a>, user_id: Uuid) -> Result<Option<User>, DbError> {
    use crate::schema::users::dsl::*;
    Ok(users
        .filter(id.eq(user_id))
        .select(User::as_select())
        .first(conn)
        .await
        .optional()?)
}

/// Lookup by email. Emails are stored lowercased.
pub async fn find_user_by_email<'a>(
    conn: &mut Conn<'a>,
    user_email: &str,
) -> Result<Option<User>, DbError> {
    use crate::schema::users::dsl::*;
    Ok(users
        .filter(email.eq(user_email.to_lowercase()))
        .select(User::as_select())
        .first(conn)
        .await
        .optional()?)
}

pub async fn find_user_by_google_sub<'a>(
    conn: &mut Conn<'a>,
    sub: &str,
) -> Result<Option<User>, DbError> {
    use crate::schema::users::dsl::*;
    Ok(users
        .filter(google_sub.eq(sub))
        .select(User::as_select())
        .first(conn)
        .await
        .optional()?)
}

/// Insert a user. A duplicate email surfaces as `AppError::Conflict`.
pub async fn insert_user<'a>(conn: &mut Conn<'a>, new_user: NewUser<'_>) -> Result<User, DbError> {
    use crate::schema::users::dsl::*;
    diesel::insert_into(users)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => DbError::Conflict(format!("Email {} is already registered", new_user.email)),
            other => DbError::Database(other),
        })
}

/// Attach a Google identity to an existing account.
pub async fn link_google_sub<'a>(
    conn: &mut Conn<'a>,
    user_id: Uuid,
    sub: &str,
) -> Result<User, DbError> {
    use crate::schema::users::dsl::*;
    Ok(diesel::update(users.filter(id.eq(user_id)))
        .set(google_sub.eq(sub))
        .returning(User::as_returning())
        .get_result(conn)
        .await?)
}

/// Record a successful sign-in. `grant_admin` only ever promotes.
pub async fn touch_login<'a>(
    conn: &mut Conn<'a>,
    user_id: Uuid,
    grant_admin: bool,
) -> Result<User, DbError> {
    use crate::schema::users::dsl::*;
    use diesel::dsl::now;
    use diesel::sql_types::Bool;
    Ok(diesel::update(users.filter(id.eq(user_id)))
        .set((
            last_login_at.eq(now),
            is_admin.eq(is_admin.or(grant_admin.into_sql::<Bool>())),
        ))
        .returning(User::as_returning())
        .get_result(conn)
        .await?)
}

pub async fn set_admin<'a>(
    conn: &mut Conn<'a>,
    user_id: Uuid,
    admin: bool,
) -> Result<Option<User>, DbError> {
    use crate::schema::users::dsl::*;
    Ok(diesel::update(users.filter(id.eq(user_id)))
        .set(is_admin.eq(admin))
        .returning(User::as_returning())
        .get_result(conn)
        .await
        .optional()?)
}

pub async fn list_users<'a>(
    conn: &mut Conn<'a>,
    pagination: dtos::Pagination,
    email_pattern: Option<String>,
) -> Result<Vec<User>, DbError> {
    use crate::schema::users::dsl::*;

    let mut query = users
        .into_boxed()
        .order(created_at.asc())
        .offset(pagination.offset)
        .limit(pagination.limit);

    if let Some(pattern) = email_pattern {
        query = query.filter(email.ilike(pattern.clone()).or(display_name.ilike(pattern)));
    }

    Ok(query.select(User::as_select()).load(conn).await?)
}
