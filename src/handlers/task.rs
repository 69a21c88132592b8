use actix_web::{HttpRequest, HttpResponse, web};
use uuid::Uuid;

use crate::{
    Conn,
    auth::AuthUser,
    combination, db, dtos,
    error::{ApiError, AppError},
    executor::EXECUTOR_TOKEN_HEADER,
    metrics,
    models::{NewTask, StatusKind, Task, User},
    validation,
};

use super::AppState;
use super::response::validation_error_response;
use super::workflow::load_workflow;

async fn load_task<'a>(conn: &mut Conn<'a>, user: &User, task_id: Uuid) -> Result<Task, ApiError> {
    match db::find_task(conn, task_id).await? {
        Some(t) if user.can_access(t.owner_id) => Ok(t),
        _ => Err(AppError::not_found("Task", task_id).into()),
    }
}

#[utoipa::path(
    get,
    path = "/task",
    summary = "List tasks",
    description = "Returns the caller's tasks, newest first (admins see all). Filter by name substring, status and workflow. Default page_size is 50, maximum is 100.",
    params(dtos::PaginationDto, dtos::TaskFilterDto),
    responses(
        (status = 200, description = "Tasks matching the filters", body = Vec<dtos::TaskDto>),
        (status = 401, description = "Not signed in"),
    ),
    tag = "tasks"
)]
pub async fn list_task(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    pagination: web::Query<dtos::PaginationDto>,
    filter: web::Query<dtos::TaskFilterDto>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let pagination = pagination.into_inner().resolve(&state.config);
    let filter = filter.into_inner().resolve();
    let owner = (!user.is_admin).then_some(user.id);

    let tasks = db::list_tasks(&mut conn, owner, filter, pagination)
        .await
        .map_err(ApiError::from)?;
    let body: Vec<dtos::TaskDto> = tasks.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/task",
    summary = "Create sweep task",
    description = "Expand the workflow over the X/Y/Z axes and queue one item per combination, X outermost and Z innermost. The whole task is created in one transaction.

**Overrides:** each candidate is a list of `{node_id, param_key, value}`; `value` replaces `document[node_id].inputs[param_key]` in that item's parameters. Every `node_id` must exist in the workflow.

**Limits:** the product of the non-empty axis lengths must not exceed `MAX_TASK_ITEMS`, and that many copies of the document with their candidates must fit in `MAX_SWEEP_BYTES`.",
    request_body = dtos::NewTaskDto,
    responses(
        (status = 201, description = "Task created with all of its items pending", body = dtos::TaskDto),
        (status = 400, description = "Validation failed. `details` lists every problem found."),
        (status = 404, description = "Workflow not found"),
    ),
    tag = "tasks"
)]
pub async fn add_task(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    form: web::Json<dtos::NewTaskDto>,
) -> actix_web::Result<HttpResponse> {
    let dto = form.into_inner();
    let limits = &state.config.limits;

    let mut conn = state.conn().await?;
    let workflow = load_workflow(&mut conn, &user, dto.workflow_id).await?;

    if let Err(errors) = validation::validate_new_task(&dto, &workflow.document, limits) {
        log::warn!(
            "Task for workflow {} rejected: {} validation errors",
            workflow.id,
            errors.len()
        );
        return Ok(validation_error_response(&errors));
    }

    let items = combination::expand(&workflow.document, &dto.axes, limits.max_task_items)
        .map_err(|e| ApiError::from(AppError::from(e)))?;
    let item_count = items.len();

    let task = db::insert_task_with_items(
        &mut conn,
        NewTask {
            owner_id: user.id,
            workflow_id: Some(workflow.id),
            name: dto.name.trim().to_string(),
            status: StatusKind::Pending,
            axes: dto.axes,
            total_items: item_count as i32,
        },
        items,
    )
    .await
    .map_err(ApiError::from)?;

    metrics::record_task_created(item_count);
    log::info!(
        "Task {} created from workflow {} with {} items",
        task.id,
        workflow.id,
        item_count
    );
    Ok(HttpResponse::Created().json(dtos::TaskDto::from(task)))
}

#[utoipa::path(
    get,
    path = "/task/{task_id}",
    summary = "Get task with items",
    params(("task_id" = Uuid, Path, description = "The UUID of the task")),
    responses(
        (status = 200, description = "Task and its items in generation order", body = dtos::DetailedTaskDto),
        (status = 404, description = "No task with this ID visible to the caller"),
    ),
    tag = "tasks"
)]
pub async fn get_task(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    task_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let task = load_task(&mut conn, &user, *task_id).await?;
    let items = db::list_items(&mut conn, task.id)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(dtos::DetailedTaskDto {
        task: task.into(),
        items: items.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/task/{task_id}/grid",
    summary = "Get result grid",
    description = "Pivot the items into `layers[z].rows[y][x]`, following the order of the task's axis candidates. Cells carry the item status and result, so a partially finished task yields a partially filled grid.",
    params(("task_id" = Uuid, Path, description = "The UUID of the task")),
    responses(
        (status = 200, description = "The result grid", body = dtos::TaskGridDto),
        (status = 404, description = "No task with this ID visible to the caller"),
    ),
    tag = "tasks"
)]
pub async fn get_task_grid(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    task_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let task = load_task(&mut conn, &user, *task_id).await?;
    let items = db::list_items(&mut conn, task.id)
        .await
        .map_err(ApiError::from)?;
    Ok(HttpResponse::Ok().json(dtos::TaskGridDto::build(&task, &items)))
}

#[utoipa::path(
    delete,
    path = "/task/{task_id}",
    summary = "Cancel task",
    description = "Pending and running items become `Canceled` and the task ends as `Canceled`. Late executor callbacks for canceled items are rejected with 409.",
    params(("task_id" = Uuid, Path, description = "The UUID of the task")),
    responses(
        (status = 200, description = "Task canceled", body = dtos::ItemCountDto),
        (status = 404, description = "No task with this ID visible to the caller"),
        (status = 409, description = "Task already finished"),
    ),
    tag = "tasks"
)]
pub async fn cancel_task(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    task_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let task = load_task(&mut conn, &user, *task_id).await?;
    let canceled = db::cancel_task(&mut conn, task.id)
        .await
        .map_err(ApiError::from)?;
    log::info!("Task {} canceled by {}, {} items", task.id, user.id, canceled);
    Ok(HttpResponse::Ok().json(dtos::ItemCountDto {
        task_id: task.id,
        items: canceled,
    }))
}

#[utoipa::path(
    post,
    path = "/task/{task_id}/retry",
    summary = "Retry failed items",
    description = "Failed and canceled items go back to `Pending` with their result and error cleared; the task status is derived from its items again.",
    params(("task_id" = Uuid, Path, description = "The UUID of the task")),
    responses(
        (status = 200, description = "Items requeued", body = dtos::ItemCountDto),
        (status = 404, description = "No task with this ID visible to the caller"),
        (status = 409, description = "Nothing to retry"),
    ),
    tag = "tasks"
)]
pub async fn retry_task(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    task_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let task = load_task(&mut conn, &user, *task_id).await?;
    let requeued = db::retry_task(&mut conn, task.id)
        .await
        .map_err(ApiError::from)?;
    log::info!("Task {}: {} items requeued", task.id, requeued);
    Ok(HttpResponse::Ok().json(dtos::ItemCountDto {
        task_id: task.id,
        items: requeued,
    }))
}

#[utoipa::path(
    patch,
    path = "/task/item/{item_id}",
    summary = "Report item outcome (executor callback)",
    description = "Called by the executor at the `callback` URL it received with the item. Requires the `X-Executor-Token` header.

**Only `Success` and `Failure` are valid.** `Failure` requires `error`. Only `Running` items can be updated; the parent task status is recomputed in the same transaction.",
    params(
        ("item_id" = Uuid, Path, description = "The UUID of the item"),
        ("X-Executor-Token" = String, Header, description = "Shared executor secret"),
    ),
    request_body = dtos::UpdateItemDto,
    responses(
        (status = 200, description = "Item updated", body = dtos::TaskItemDto),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Missing or wrong executor token"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item is not running"),
    ),
    tag = "tasks"
)]
pub async fn update_item(
    req: HttpRequest,
    state: web::Data<AppState>,
    item_id: web::Path<Uuid>,
    form: web::Json<dtos::UpdateItemDto>,
) -> actix_web::Result<HttpResponse> {
    let presented = req
        .headers()
        .get(EXECUTOR_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if !state.executor.accepts_token(presented) {
        return Err(ApiError::Unauthorized("Invalid executor token".to_string()).into());
    }

    if let Err(errors) = validation::validate_update_item(&form) {
        return Ok(validation_error_response(&errors));
    }
    let dto = form.into_inner();

    let mut conn = state.conn().await?;
    let item = db::complete_item(&mut conn, *item_id, dto.status, dto.result, dto.error)
        .await
        .map_err(ApiError::from)?;
    log::debug!("Item {} reported {}", item.id, item.status.as_str());
    Ok(HttpResponse::Ok().json(dtos::TaskItemDto::from(item)))
}
