use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    combination::{self, Axes, ResultGrid},
    models::{StatusKind, Task, TaskItem},
};

/// Input DTO for `POST /task`: sweep a stored workflow over up to three axes.
///
/// Every axis is a list of candidates, and a candidate is a list of parameter
/// overrides applied together. The task gets one item per combination of
/// candidates (cartesian product of the non-empty axes, X outermost). With
/// no axes at all the task has a single item running the workflow unchanged.
///
/// ## Example
/// ```json
/// {
///   "workflow_id": "0b6f...",
///   "name": "seed x cfg",
///   "axes": {
///     "x": [
///       [{"node_id": "3", "param_key": "seed", "value": 1}],
///       [{"node_id": "3", "param_key": "seed", "value": 2}]
///     ],
///     "y": [
///       [{"node_id": "3", "param_key": "cfg", "value": 6.5}],
///       [{"node_id": "3", "param_key": "cfg", "value": 8.0}]
///     ]
///   }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NewTaskDto {
    /// The workflow to sweep. Must be owned by the caller (or the caller is an admin).
    pub workflow_id: uuid::Uuid,
    /// Human-readable name. Must be non-empty, max 255 characters.
    pub name: String,
    /// Sweep axes. Omitted axes are treated as empty.
    #[serde(default)]
    pub axes: Axes,
}

/// Task representation returned by list and create endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskDto {
    pub id: uuid::Uuid,
    pub owner_id: uuid::Uuid,
    /// Null once the source workflow has been deleted.
    pub workflow_id: Option<uuid::Uuid>,
    pub name: String,
    /// Derived from the items: `Running` once any item started, `Success` when every
    /// item succeeded, `Failure` when all items ended and at least one failed.
    pub status: StatusKind,
    pub axes: Axes,
    /// Number of items the sweep expanded to.
    pub total_items: i32,
    pub succeeded: i32,
    pub failed: i32,
    pub created_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub ended_at: Option<chrono::DateTime<Utc>>,
    pub last_updated: chrono::DateTime<Utc>,
}

/// One combination of the sweep.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct TaskItemDto {
    pub id: uuid::Uuid,
    pub task_id: uuid::Uuid,
    /// Index in generation order.
    pub position: i32,
    /// The workflow document with this item's overrides applied.
    pub params: serde_json::Value,
    /// Candidate of the X axis this item was generated from. Null when X is empty.
    pub x_value: Option<serde_json::Value>,
    pub y_value: Option<serde_json::Value>,
    pub z_value: Option<serde_json::Value>,
    pub status: StatusKind,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub ended_at: Option<chrono::DateTime<Utc>>,
}

/// Full task returned by `GET /task/{id}`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DetailedTaskDto {
    #[serde(flatten)]
    pub task: TaskDto,
    /// Items in generation order.
    pub items: Vec<TaskItemDto>,
}

/// Executor callback payload for `PATCH /task/item/{item_id}`.
///
/// Only `Success` and `Failure` are accepted. `error` is required with `Failure`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateItemDto {
    pub status: StatusKind,
    /// Output of the run, any JSON (e.g. produced file ids).
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// Grid cell: the item that ran the matching combination.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, ToSchema)]
pub struct GridCellDto {
    pub item_id: uuid::Uuid,
    pub position: i32,
    pub status: StatusKind,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// One 2-D grid of a task, for a single Z candidate.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GridLayerDto {
    /// Z candidate of this layer, null when the task has no Z axis.
    pub z_value: Option<serde_json::Value>,
    /// `rows[y][x]`; a null cell has no matching item.
    pub rows: Vec<Vec<Option<GridCellDto>>>,
}

/// Result grid returned by `GET /task/{id}/grid`.
///
/// Rows follow the Y candidates and columns the X candidates; an absent axis
/// contributes a single null header.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TaskGridDto {
    pub task_id: uuid::Uuid,
    pub status: StatusKind,
    pub x_values: Vec<Option<serde_json::Value>>,
    pub y_values: Vec<Option<serde_json::Value>>,
    pub layers: Vec<GridLayerDto>,
}

/// Number of items touched by a cancel or retry.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemCountDto {
    pub task_id: uuid::Uuid,
    pub items: usize,
}

// =============================================================================
// Conversions
// =============================================================================

impl From<Task> for TaskDto {
    fn from(t: Task) -> Self {
        Self {
            id: t.id,
            owner_id: t.owner_id,
            workflow_id: t.workflow_id,
            name: t.name,
            status: t.status,
            axes: t.axes,
            total_items: t.total_items,
            succeeded: t.succeeded,
            failed: t.failed,
            created_at: t.created_at,
            started_at: t.started_at,
            ended_at: t.ended_at,
            last_updated: t.last_updated,
        }
    }
}

impl From<TaskItem> for TaskItemDto {
    fn from(i: TaskItem) -> Self {
        Self {
            id: i.id,
            task_id: i.task_id,
            position: i.position,
            params: i.params,
            x_value: i.x_value,
            y_value: i.y_value,
            z_value: i.z_value,
            status: i.status,
            result: i.result,
            error: i.error,
            created_at: i.created_at,
            started_at: i.started_at,
            ended_at: i.ended_at,
        }
    }
}

impl From<&TaskItem> for GridCellDto {
    fn from(i: &TaskItem) -> Self {
        Self {
            item_id: i.id,
            position: i.position,
            status: i.status,
            result: i.result.clone(),
            error: i.error.clone(),
        }
    }
}

impl TaskGridDto {
    /// Pivot a task's items into its result grid.
    pub fn build(task: &Task, items: &[TaskItem]) -> Self {
        let grid: ResultGrid<&TaskItem> = {
            let refs: Vec<&TaskItem> = items.iter().collect();
            combination::build_grid(&task.axes, &refs, |i| {
                [i.x_value.as_ref(), i.y_value.as_ref(), i.z_value.as_ref()]
            })
        };
        Self {
            task_id: task.id,
            status: task.status,
            x_values: grid.x_values,
            y_values: grid.y_values,
            layers: grid
                .layers
                .into_iter()
                .map(|layer| GridLayerDto {
                    z_value: layer.z_value,
                    rows: layer
                        .rows
                        .into_iter()
                        .map(|row| {
                            row.into_iter()
                                .map(|cell| cell.map(GridCellDto::from))
                                .collect()
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}
