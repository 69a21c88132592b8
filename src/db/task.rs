use crate::{
    Conn,
    combination::ExpandedItem,
    dtos, metrics,
    models::{NewTask, NewTaskItem, StatusKind, Task, TaskItem},
    schema::{task, task_item},
};
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types;
use diesel_async::RunQueryDsl;
use std::ops::Range;
use uuid::Uuid;

use super::{DbError, run_in_transaction};

/// Rows per INSERT statement, well under the Postgres bind parameter limit.
const ITEM_INSERT_CHUNK: usize = 1000;

/// Bound JSON bytes per INSERT statement.
const ITEM_INSERT_BYTES: usize = 16 * 1024 * 1024;

fn item_bytes(item: &NewTaskItem) -> usize {
    [Some(&item.params), item.x_value.as_ref(), item.y_value.as_ref(), item.z_value.as_ref()]
        .into_iter()
        .flatten()
        .map(|v| v.to_string().len())
        .sum()
}

/// Split rows of the given sizes into consecutive batches holding at most
/// `max_rows` rows and, unless a single row is larger, at most `max_bytes`.
fn insert_batches(sizes: &[usize], max_rows: usize, max_bytes: usize) -> Vec<Range<usize>> {
    let mut batches = Vec::new();
    let (mut start, mut bytes) = (0, 0);
    for (i, size) in sizes.iter().enumerate() {
        if i > start && (i - start == max_rows || bytes + size > max_bytes) {
            batches.push(start..i);
            start = i;
            bytes = 0;
        }
        bytes += size;
    }
    if start < sizes.len() {
        batches.push(start..sizes.len());
    }
    batches
}

/// Insert a task and all of its expanded items atomically.
#[tracing::instrument(name = "insert_task_with_items", level = "debug", skip(conn, new_task, items), fields(items = items.len()))]
pub async fn insert_task_with_items<'a>(
    conn: &mut Conn<'a>,
    new_task: NewTask,
    items: Vec<ExpandedItem>,
) -> Result<Task, DbError> {
    run_in_transaction(conn, |conn| {
        Box::pin(async move {
            let t: Task = diesel::insert_into(task::table)
                .values(&new_task)
                .returning(Task::as_returning())
                .get_result(conn)
                .await?;

            let rows: Vec<NewTaskItem> = items
                .into_iter()
                .map(|i| NewTaskItem {
                    task_id: t.id,
                    position: i.position,
                    params: i.params,
                    x_value: i.x_value,
                    y_value: i.y_value,
                    z_value: i.z_value,
                    status: StatusKind::Pending,
                })
                .collect();

            let sizes: Vec<usize> = rows.iter().map(item_bytes).collect();
            for batch in insert_batches(&sizes, ITEM_INSERT_CHUNK, ITEM_INSERT_BYTES) {
                diesel::insert_into(task_item::table)
                    .values(&rows[batch])
                    .execute(conn)
                    .await?;
            }

            Ok(t)
        })
    })
    .await
}

pub async fn find_task<'a>(conn: &mut Conn<'a>, task_id: Uuid) -> Result<Option<Task>, DbError> {
    Ok(task::table
        .filter(task::id.eq(task_id))
        .select(Task::as_select())
        .first(conn)
        .await
        .optional()?)
}

/// Items of a task in generation order.
pub async fn list_items<'a>(conn: &mut Conn<'a>, task_id: Uuid) -> Result<Vec<TaskItem>, DbError> {
    Ok(task_item::table
        .filter(task_item::task_id.eq(task_id))
        .order(task_item::position.asc())
        .select(TaskItem::as_select())
        .load(conn)
        .await?)
}

/// List tasks, newest first. `owner` restricts to one user's tasks.
pub async fn list_tasks<'a>(
    conn: &mut Conn<'a>,
    owner: Option<Uuid>,
    filter: dtos::TaskFilter,
    pagination: dtos::Pagination,
) -> Result<Vec<Task>, DbError> {
    let mut query = task::table
        .into_boxed()
        .order(task::created_at.desc())
        .offset(pagination.offset)
        .limit(pagination.limit);

    if let Some(o) = owner {
        query = query.filter(task::owner_id.eq(o));
    }
    if let Some(pattern) = filter.name {
        query = query.filter(task::name.ilike(pattern));
    }
    if let Some(s) = filter.status {
        query = query.filter(task::status.eq(s));
    }
    if let Some(w) = filter.workflow_id {
        query = query.filter(task::workflow_id.eq(w));
    }

    Ok(query.select(Task::as_select()).load(conn).await?)
}

/// Per-status item counts of one task.
#[derive(QueryableByName, Debug, Default, Clone, Copy, PartialEq)]
pub struct ItemCounts {
    #[diesel(sql_type = sql_types::BigInt)]
    pub pending: i64,
    #[diesel(sql_type = sql_types::BigInt)]
    pub running: i64,
    #[diesel(sql_type = sql_types::BigInt)]
    pub succeeded: i64,
    #[diesel(sql_type = sql_types::BigInt)]
    pub failed: i64,
    #[diesel(sql_type = sql_types::BigInt)]
    pub canceled: i64,
    /// Items that were started at least once.
    #[diesel(sql_type = sql_types::BigInt)]
    pub started: i64,
}

/// Task status as a function of its items.
///
/// A canceled task stays canceled. While any item is pending or running the
/// task is `Running` once an item has started and `Pending` before. When
/// every item ended, the task succeeded only if every item succeeded.
pub fn derive_task_status(counts: &ItemCounts, current: StatusKind) -> StatusKind {
    if current == StatusKind::Canceled {
        return StatusKind::Canceled;
    }
    if counts.pending + counts.running > 0 {
        if counts.started > 0 || counts.running > 0 {
            StatusKind::Running
        } else {
            StatusKind::Pending
        }
    } else if counts.failed + counts.canceled > 0 {
        StatusKind::Failure
    } else {
        StatusKind::Success
    }
}

async fn count_items<'a>(conn: &mut Conn<'a>, task_id: Uuid) -> Result<ItemCounts, DbError> {
    Ok(diesel::sql_query(
        "SELECT \
            count(*) FILTER (WHERE status = 'pending') AS pending, \
            count(*) FILTER (WHERE status = 'running') AS running, \
            count(*) FILTER (WHERE status = 'success') AS succeeded, \
            count(*) FILTER (WHERE status = 'failure') AS failed, \
            count(*) FILTER (WHERE status = 'canceled') AS canceled, \
            count(*) FILTER (WHERE started_at IS NOT NULL) AS started \
         FROM task_item WHERE task_id = $1",
    )
    .bind::<sql_types::Uuid, _>(task_id)
    .get_result::<ItemCounts>(conn)
    .await?)
}

/// Recompute a task's status and counters from its items.
///
/// Locks the task row; call inside a transaction together with the item
/// transition that triggered it.
#[tracing::instrument(name = "refresh_task_status", level = "debug", skip(conn), fields(task_id = %task_id))]
pub async fn refresh_task_status<'a>(
    conn: &mut Conn<'a>,
    task_id: Uuid,
) -> Result<Option<Task>, DbError> {
    let Some(t) = task::table
        .filter(task::id.eq(task_id))
        .select(Task::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
    else {
        return Ok(None);
    };

    let counts = count_items(conn, task_id).await?;
    let new_status = derive_task_status(&counts, t.status);
    let now = Utc::now();

    let started = if counts.started > 0 {
        t.started_at.or(Some(now))
    } else {
        t.started_at
    };
    let ended = if new_status.is_terminal() {
        t.ended_at.or(Some(now))
    } else {
        None
    };

    let updated = diesel::update(task::table.filter(task::id.eq(task_id)))
        .set((
            task::status.eq(new_status),
            task::succeeded.eq(counts.succeeded as i32),
            task::failed.eq(counts.failed as i32),
            task::started_at.eq(started),
            task::ended_at.eq(ended),
            task::last_updated.eq(now),
        ))
        .returning(Task::as_returning())
        .get_result(conn)
        .await?;

    if new_status != t.status {
        log::debug!(
            "Task {} status {} -> {}",
            task_id,
            t.status.as_str(),
            new_status.as_str()
        );
        if new_status.is_terminal() {
            log::info!(
                "Task {} finished: {} ({} succeeded, {} failed)",
                task_id,
                new_status.as_str(),
                counts.succeeded,
                counts.failed
            );
            metrics::record_task_completed(new_status.as_str());
        }
    }

    Ok(Some(updated))
}

/// Cancel a task: its pending and running items become `Canceled`.
/// Returns the number of items canceled.
pub async fn cancel_task<'a>(conn: &mut Conn<'a>, task_id: Uuid) -> Result<usize, DbError> {
    run_in_transaction(conn, |conn| {
        Box::pin(async move {
            let t: Task = task::table
                .filter(task::id.eq(task_id))
                .select(Task::as_select())
                .for_update()
                .first(conn)
                .await
                .optional()?
                .ok_or_else(|| DbError::not_found("Task", task_id))?;

            if t.status.is_terminal() {
                return Err(DbError::invalid_state(format!(
                    "Task {} is already {}",
                    task_id,
                    t.status.as_str()
                )));
            }

            let now = Utc::now();
            let canceled = diesel::update(
                task_item::table.filter(
                    task_item::task_id
                        .eq(task_id)
                        .and(task_item::status.eq_any(vec![StatusKind::Pending, StatusKind::Running])),
                ),
            )
            .set((
                task_item::status.eq(StatusKind::Canceled),
                task_item::ended_at.eq(now),
                task_item::last_updated.eq(now),
            ))
            .execute(conn)
            .await?;

            diesel::update(task::table.filter(task::id.eq(task_id)))
                .set((
                    task::status.eq(StatusKind::Canceled),
                    task::ended_at.eq(now),
                    task::last_updated.eq(now),
                ))
                .execute(conn)
                .await?;

            metrics::record_task_completed(StatusKind::Canceled.as_str());
            Ok(canceled)
        })
    })
    .await
}

/// Put failed and canceled items of a task back to `Pending`.
/// Returns the number of items requeued.
pub async fn retry_task<'a>(conn: &mut Conn<'a>, task_id: Uuid) -> Result<usize, DbError> {
    run_in_transaction(conn, |conn| {
        Box::pin(async move {
            task::table
                .filter(task::id.eq(task_id))
                .select(task::id)
                .for_update()
                .first::<Uuid>(conn)
                .await
                .optional()?
                .ok_or_else(|| DbError::not_found("Task", task_id))?;

            let requeued = diesel::update(
                task_item::table.filter(
                    task_item::task_id
                        .eq(task_id)
                        .and(task_item::status.eq_any(vec![StatusKind::Failure, StatusKind::Canceled])),
                ),
            )
            .set((
                task_item::status.eq(StatusKind::Pending),
                task_item::result.eq(None::<serde_json::Value>),
                task_item::error.eq(None::<String>),
                task_item::started_at.eq(None::<chrono::DateTime<Utc>>),
                task_item::ended_at.eq(None::<chrono::DateTime<Utc>>),
                task_item::last_updated.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .await?;

            if requeued == 0 {
                return Err(DbError::invalid_state(format!(
                    "Task {} has no failed or canceled items",
                    task_id
                )));
            }

            // Clear a cancel so the status is derived from the items again.
            diesel::update(task::table.filter(task::id.eq(task_id)))
                .set(task::status.eq(StatusKind::Pending))
                .execute(conn)
                .await?;
            refresh_task_status(conn, task_id).await?;

            Ok(requeued)
        })
    })
    .await
}
