use crate::{
    Conn,
    models::{NewOAuthState, NewSession, Session, User},
};
use diesel::dsl::now;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::DbError;

pub async fn insert_session<'a>(
    conn: &mut Conn<'a>,
    user_id: Uuid,
    token_hash: &str,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<Session, DbError> {
    use crate::schema::session;
    Ok(diesel::insert_into(session::table)
        .values(&NewSession {
            user_id,
            token_hash,
            expires_at,
        })
        .returning(Session::as_returning())
        .get_result(conn)
        .await?)
}

/// Resolve a token digest to its user, ignoring expired sessions.
pub async fn find_session_user<'a>(
    conn: &mut Conn<'a>,
    token_hash: &str,
) -> Result<Option<User>, DbError> {
    use crate::schema::{session, users};
    Ok(session::table
        .inner_join(users::table)
        .filter(session::token_hash.eq(token_hash))
        .filter(session::expires_at.gt(now))
        .select(User::as_select())
        .first(conn)
        .await
        .optional()?)
}

pub async fn delete_session<'a>(conn: &mut Conn<'a>, token_hash: &str) -> Result<usize, DbError> {
    use crate::schema::session;
    Ok(
        diesel::delete(session::table.filter(session::token_hash.eq(token_hash)))
            .execute(conn)
            .await?,
    )
}

/// Remove expired sessions and OAuth states. Returns `(sessions, states)` deleted.
pub async fn delete_expired_sessions<'a>(conn: &mut Conn<'a>) -> Result<(usize, usize), DbError> {
    use crate::schema::{oauth_state, session};
    let sessions = diesel::delete(session::table.filter(session::expires_at.le(now)))
        .execute(conn)
        .await?;
    let states = diesel::delete(oauth_state::table.filter(oauth_state::expires_at.le(now)))
        .execute(conn)
        .await?;
    Ok((sessions, states))
}

pub async fn insert_oauth_state<'a>(
    conn: &mut Conn<'a>,
    state: &str,
    expires_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), DbError> {
    use crate::schema::oauth_state;
    diesel::insert_into(oauth_state::table)
        .values(&NewOAuthState { state, expires_at })
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete a pending OAuth state. Returns false when it is unknown or expired,
/// so each state can be used at most once.
pub async fn consume_oauth_state<'a>(conn: &mut Conn<'a>, state: &str) -> Result<bool, DbError> {
    use crate::schema::oauth_state;
    let deleted = diesel::delete(
        oauth_state::table
            .filter(oauth_state::state.eq(state))
            .filter(oauth_state::expires_at.gt(now)),
    )
    .execute(conn)
    .await?;
    Ok(deleted == 1)
}
