use crate::{DbPool, db};
use actix_web::rt;
use tokio::sync::watch;

/// Periodically deletes expired sessions and OAuth states.
pub async fn session_cleanup_loop(
    pool: DbPool,
    interval: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                log::info!("Session cleanup: shutdown signal received, exiting");
                return;
            }
            _ = rt::time::sleep(interval) => {}
        }

        match pool.get().await {
            Ok(mut conn) => match db::delete_expired_sessions(&mut conn).await {
                Ok((0, 0)) => log::debug!("Session cleanup: nothing expired"),
                Ok((sessions, states)) => log::info!(
                    "Session cleanup: deleted {} sessions and {} OAuth states",
                    sessions,
                    states
                ),
                Err(e) => log::error!("Session cleanup: error: {:?}", e),
            },
            Err(e) => log::error!("Session cleanup: no connection: {}", e),
        }
    }
}
