use crate::{DbPool, db};
use actix_web::rt;
use tokio::sync::watch;

/// Fails items the executor stopped reporting on, and with them their tasks.
pub async fn timeout_loop(
    pool: DbPool,
    interval: std::time::Duration,
    item_timeout: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        // note that obtaining a connection from the pool is also potentially blocking
        if let Ok(mut conn) = pool.get().await {
            match db::fail_stale_items(&mut conn, item_timeout).await {
                Ok(failed) if !failed.is_empty() => {
                    log::warn!(
                        "Timeout worker: {} items timed out, {:?}",
                        failed.len(),
                        failed.iter().map(|i| i.id).collect::<Vec<_>>()
                    );
                }
                Ok(_) => log::debug!("Timeout worker: no stale items"),
                Err(e) => log::error!("Timeout worker: error failing stale items: {:?}", e),
            }
        }
        tokio::select! {
            _ = shutdown.changed() => {
                log::info!("Timeout worker: shutdown signal received, exiting");
                return;
            }
            _ = rt::time::sleep(interval) => {}
        }
    }
}
