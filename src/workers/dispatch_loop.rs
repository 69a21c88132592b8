use crate::{DbPool, db, error::AppError, executor::ExecutorClient, metrics, models::TaskItem};
use actix_web::rt;
use futures_util::future::join_all;
use tokio::sync::watch;

async fn checkout(pool: &DbPool) -> Result<crate::Conn<'_>, AppError> {
    pool.get().await.map_err(|e| AppError::Pool(e.to_string()))
}

/// Claim as many pending items as the running limit allows and submit them
/// to the executor concurrently. Returns the number of items accepted.
///
/// No connection is held while the executor is being called.
pub async fn dispatch_once(
    executor: &ExecutorClient,
    pool: &DbPool,
    max_running: i64,
) -> Result<usize, AppError> {
    let claimed: Vec<TaskItem> = {
        let mut conn = checkout(pool).await?;
        let running = db::count_running_items(&mut conn).await?;
        let free = max_running - running;
        if free <= 0 {
            log::debug!("Dispatch worker: {} items running, at capacity", running);
            return Ok(0);
        }
        db::claim_pending_items(&mut conn, free).await?
    };
    if claimed.is_empty() {
        return Ok(0);
    }
    for _ in &claimed {
        metrics::record_item_transition("pending", "running");
    }
    log::debug!("Dispatch worker: claimed {} items", claimed.len());

    let outcomes = join_all(claimed.iter().map(|item| executor.submit(item))).await;

    let rejected: Vec<(&TaskItem, String)> = claimed
        .iter()
        .zip(outcomes)
        .filter_map(|(item, outcome)| outcome.err().map(|e| (item, e)))
        .collect();
    let accepted = claimed.len() - rejected.len();
    if rejected.is_empty() {
        return Ok(accepted);
    }

    let mut conn = checkout(pool).await?;
    for (item, reason) in rejected {
        log::error!("Dispatch worker: item {} not submitted: {}", item.id, reason);
        match db::fail_item(&mut conn, item.id, &reason).await {
            Ok(true) => {}
            // The executor already reported back.
            Ok(false) => log::debug!("Dispatch worker: item {} already finished", item.id),
            Err(e) => {
                log::error!("Dispatch worker: failed to mark item {} failed: {:?}", item.id, e)
            }
        }
    }
    Ok(accepted)
}

/// Feed pending items to the executor until shutdown.
pub async fn dispatch_loop(
    executor: ExecutorClient,
    pool: DbPool,
    interval: std::time::Duration,
    max_running: i64,
    mut shutdown: watch::Receiver<bool>,
) {
    if !executor.is_configured() {
        log::warn!("Dispatch worker: EXECUTOR_URL not set, items will stay pending");
        return;
    }

    loop {
        let loop_start = std::time::Instant::now();
        let dispatched = match dispatch_once(&executor, &pool, max_running).await {
            Ok(n) => n,
            Err(e) => {
                log::error!("Dispatch worker: {:?}", e);
                0
            }
        };
        metrics::record_dispatch_iteration(loop_start.elapsed().as_secs_f64(), dispatched);

        tokio::select! {
            _ = shutdown.changed() => {
                log::info!("Dispatch worker: shutdown signal received, exiting");
                return;
            }
            _ = rt::time::sleep(interval) => {}
        }
    }
}
