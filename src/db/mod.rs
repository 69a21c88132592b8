mod admin;
mod file;
mod session;
mod task;
mod task_item;
mod user;
mod workflow;

use crate::Conn;
use diesel_async::RunQueryDsl;
use std::future::Future;
use std::pin::Pin;

pub(crate) type DbError = crate::error::AppError;

pub use admin::{
    delete_notification, delete_setting, insert_notification, list_active_notifications,
    list_notifications, list_settings, mark_notification_read, upsert_setting,
};
pub use file::{delete_file, find_file, insert_file, list_files};
pub use session::{
    consume_oauth_state, delete_expired_sessions, delete_session, find_session_user,
    insert_oauth_state, insert_session,
};
pub use task::{
    ItemCounts, cancel_task, derive_task_status, find_task, insert_task_with_items, list_items,
    list_tasks, refresh_task_status, retry_task,
};
pub use task_item::{
    claim_pending_items, complete_item, count_running_items, fail_item, fail_stale_items,
    find_item,
};
pub use user::{
    find_user_by_email, find_user_by_google_sub, find_user_by_id, insert_user, link_google_sub,
    list_users, set_admin, touch_login,
};
pub use workflow::{delete_workflow, find_workflow, insert_workflow, list_workflows, update_workflow};

/// Execute a closure within a database transaction.
/// Automatically rolls back on error. Commits on success.
/// Callers must wrap their async block with `Box::pin(async move { ... })`.
pub async fn run_in_transaction<'a, T: Send>(
    conn: &mut Conn<'a>,
    f: impl for<'c> FnOnce(
        &'c mut Conn<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<T, DbError>> + Send + 'c>>,
) -> Result<T, DbError> {
    diesel::sql_query("BEGIN").execute(&mut *conn).await?;
    match f(conn).await {
        Ok(val) => {
            diesel::sql_query("COMMIT").execute(&mut *conn).await?;
            Ok(val)
        }
        Err(e) => {
            if let Err(rb_err) = diesel::sql_query("ROLLBACK").execute(&mut *conn).await {
                log::error!("Failed to rollback transaction: {}", rb_err);
            }
            Err(e)
        }
    }
}
