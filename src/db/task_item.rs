use std::collections::BTreeSet;

use crate::{
    Conn, metrics,
    models::{StatusKind, TaskItem},
    schema::task_item::dsl::*,
};
use diesel::dsl::now;
use diesel::prelude::*;
use diesel::sql_types;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::{DbError, refresh_task_status, run_in_transaction};

/// Error recorded on items that stayed running for too long.
pub const TIMEOUT_ERROR: &str = "Timeout";

pub async fn find_item<'a>(conn: &mut Conn<'a>, item_id: Uuid) -> Result<Option<TaskItem>, DbError> {
    Ok(task_item
        .filter(id.eq(item_id))
        .select(TaskItem::as_select())
        .first(conn)
        .await
        .optional()?)
}

pub async fn count_running_items<'a>(conn: &mut Conn<'a>) -> Result<i64, DbError> {
    Ok(task_item
        .filter(status.eq(StatusKind::Running))
        .count()
        .get_result(conn)
        .await?)
}

async fn refresh_tasks<'a>(conn: &mut Conn<'a>, items: &[TaskItem]) -> Result<(), DbError> {
    let task_ids: BTreeSet<Uuid> = items.iter().map(|i| i.task_id).collect();
    for t in task_ids {
        refresh_task_status(conn, t).await?;
    }
    Ok(())
}

/// Claim up to `limit` pending items, oldest first, and mark them running.
///
/// Items are locked with SKIP LOCKED so concurrent dispatchers never claim
/// the same item twice. Marking them running before submission lets the
/// executor report back as soon as it accepts the work.
#[tracing::instrument(name = "claim_pending_items", level = "debug", skip(conn))]
pub async fn claim_pending_items<'a>(
    conn: &mut Conn<'a>,
    limit: i64,
) -> Result<Vec<TaskItem>, DbError> {
    if limit <= 0 {
        return Ok(vec![]);
    }
    run_in_transaction(conn, |conn| {
        Box::pin(async move {
            let ids: Vec<Uuid> = task_item
                .filter(status.eq(StatusKind::Pending))
                .order((created_at.asc(), position.asc()))
                .limit(limit)
                .select(id)
                .for_update()
                .skip_locked()
                .load(conn)
                .await?;

            if ids.is_empty() {
                return Ok(vec![]);
            }

            let claimed: Vec<TaskItem> = diesel::update(
                task_item.filter(id.eq_any(&ids).and(status.eq(StatusKind::Pending))),
            )
            .set((
                status.eq(StatusKind::Running),
                started_at.eq(now),
                last_updated.eq(now),
            ))
            .returning(TaskItem::as_returning())
            .get_results(conn)
            .await?;

            refresh_tasks(conn, &claimed).await?;
            Ok(claimed)
        })
    })
    .await
}

/// Move a running item to a terminal status and refresh its task.
/// Returns `None` when the item is not running.
async fn finish_running_item<'a>(
    conn: &mut Conn<'a>,
    item_id: Uuid,
    new_status: StatusKind,
    new_result: Option<serde_json::Value>,
    new_error: Option<String>,
) -> Result<Option<TaskItem>, DbError> {
    run_in_transaction(conn, |conn| {
        Box::pin(async move {
            let updated: Option<TaskItem> = diesel::update(
                task_item.filter(id.eq(item_id).and(status.eq(StatusKind::Running))),
            )
            .set((
                status.eq(new_status),
                result.eq(new_result),
                error.eq(new_error),
                ended_at.eq(now),
                last_updated.eq(now),
            ))
            .returning(TaskItem::as_returning())
            .get_result(conn)
            .await
            .optional()?;

            if let Some(item) = &updated {
                refresh_task_status(conn, item.task_id).await?;
            }
            Ok(updated)
        })
    })
    .await
}

/// Record the executor's outcome for a running item.
#[tracing::instrument(name = "complete_item", level = "debug", skip(conn, new_result, new_error), fields(item_id = %item_id))]
pub async fn complete_item<'a>(
    conn: &mut Conn<'a>,
    item_id: Uuid,
    new_status: StatusKind,
    new_result: Option<serde_json::Value>,
    new_error: Option<String>,
) -> Result<TaskItem, DbError> {
    match finish_running_item(conn, item_id, new_status, new_result, new_error).await? {
        Some(item) => {
            metrics::record_item_transition("running", new_status.as_str());
            Ok(item)
        }
        None => match find_item(conn, item_id).await? {
            Some(item) => Err(DbError::invalid_state(format!(
                "Item {} is {}, only running items can be updated",
                item_id,
                item.status.as_str()
            ))),
            None => Err(DbError::not_found("Item", item_id)),
        },
    }
}

/// Fail a running item, e.g. after the executor rejected it.
/// Returns false when the item already left the running state.
pub async fn fail_item<'a>(conn: &mut Conn<'a>, item_id: Uuid, reason: &str) -> Result<bool, DbError> {
    let failed = finish_running_item(
        conn,
        item_id,
        StatusKind::Failure,
        None,
        Some(reason.to_string()),
    )
    .await?;
    if failed.is_some() {
        metrics::record_item_transition("running", StatusKind::Failure.as_str());
    }
    Ok(failed.is_some())
}

/// Fail running items without any update for longer than `timeout`.
#[tracing::instrument(name = "fail_stale_items", level = "debug", skip(conn))]
pub async fn fail_stale_items<'a>(
    conn: &mut Conn<'a>,
    timeout: std::time::Duration,
) -> Result<Vec<TaskItem>, DbError> {
    use diesel::pg::data_types::PgInterval;

    let micros = i64::try_from(timeout.as_micros()).unwrap_or(i64::MAX);

    let failed = run_in_transaction(conn, |conn| {
        Box::pin(async move {
            let interval = PgInterval::from_microseconds(micros).into_sql::<sql_types::Interval>();
            let failed: Vec<TaskItem> = diesel::update(
                task_item.filter(
                    status
                        .eq(StatusKind::Running)
                        .and(last_updated.lt(now.into_sql::<sql_types::Timestamptz>() - interval)),
                ),
            )
            .set((
                status.eq(StatusKind::Failure),
                error.eq(TIMEOUT_ERROR),
                ended_at.eq(now),
                last_updated.eq(now),
            ))
            .returning(TaskItem::as_returning())
            .get_results(conn)
            .await?;

            refresh_tasks(conn, &failed).await?;
            Ok(failed)
        })
    })
    .await?;

    if !failed.is_empty() {
        metrics::record_item_timeouts(failed.len());
    }
    Ok(failed)
}
