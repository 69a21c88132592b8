use actix_web::{HttpResponse, web};
use uuid::Uuid;

use crate::{
    Conn,
    auth::AuthUser,
    db, dtos,
    error::{ApiError, AppError},
    models::{NewWorkflow, User, Workflow, WorkflowChanges},
    validation,
};

use super::AppState;
use super::response::validation_error_response;

/// Load a workflow the user may access. Other users' workflows are reported
/// as missing.
pub(super) async fn load_workflow<'a>(
    conn: &mut Conn<'a>,
    user: &User,
    workflow_id: Uuid,
) -> Result<Workflow, ApiError> {
    match db::find_workflow(conn, workflow_id).await? {
        Some(w) if user.can_access(w.owner_id) => Ok(w),
        _ => Err(AppError::not_found("Workflow", workflow_id).into()),
    }
}

#[utoipa::path(
    get,
    path = "/workflow",
    summary = "List workflows",
    description = "Returns the caller's workflows, newest first, without their documents. Admins see every workflow. `q` filters by a case-insensitive name substring.",
    params(dtos::PaginationDto, dtos::NameFilterDto),
    responses(
        (status = 200, description = "Workflows matching the filter", body = Vec<dtos::WorkflowSummaryDto>),
        (status = 401, description = "Not signed in"),
    ),
    tag = "workflows"
)]
pub async fn list_workflow(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    pagination: web::Query<dtos::PaginationDto>,
    filter: web::Query<dtos::NameFilterDto>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let pagination = pagination.into_inner().resolve(&state.config);
    let owner = (!user.is_admin).then_some(user.id);

    let workflows = db::list_workflows(&mut conn, owner, filter.into_inner().resolve(), pagination)
        .await
        .map_err(ApiError::from)?;
    let body: Vec<dtos::WorkflowSummaryDto> = workflows.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

#[utoipa::path(
    post,
    path = "/workflow",
    summary = "Create workflow",
    description = "Store a workflow document. The document must be a JSON object mapping node ids to node objects; a node's `inputs` object holds the parameters a sweep can override.",
    request_body = dtos::NewWorkflowDto,
    responses(
        (status = 201, description = "Workflow created", body = dtos::WorkflowDto),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not signed in"),
    ),
    tag = "workflows"
)]
pub async fn add_workflow(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    form: web::Json<dtos::NewWorkflowDto>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) =
        validation::validate_new_workflow(&form, state.config.limits.max_document_bytes)
    {
        return Ok(validation_error_response(&errors));
    }
    let dto = form.into_inner();

    let mut conn = state.conn().await?;
    let workflow = db::insert_workflow(
        &mut conn,
        NewWorkflow {
            owner_id: user.id,
            name: dto.name.trim().to_string(),
            description: dto.description,
            document: dto.document,
        },
    )
    .await
    .map_err(ApiError::from)?;

    log::info!("Workflow {} created by {}", workflow.id, user.id);
    Ok(HttpResponse::Created().json(dtos::WorkflowDto::from(workflow)))
}

#[utoipa::path(
    get,
    path = "/workflow/{workflow_id}",
    summary = "Get workflow",
    params(("workflow_id" = Uuid, Path, description = "The UUID of the workflow")),
    responses(
        (status = 200, description = "Workflow with its document", body = dtos::WorkflowDto),
        (status = 404, description = "No workflow with this ID visible to the caller"),
    ),
    tag = "workflows"
)]
pub async fn get_workflow(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    workflow_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let workflow = load_workflow(&mut conn, &user, *workflow_id).await?;
    Ok(HttpResponse::Ok().json(dtos::WorkflowDto::from(workflow)))
}

#[utoipa::path(
    patch,
    path = "/workflow/{workflow_id}",
    summary = "Update workflow",
    description = "Partial update: omitted fields are left unchanged. Existing tasks keep the parameters they were expanded with.",
    params(("workflow_id" = Uuid, Path, description = "The UUID of the workflow")),
    request_body = dtos::UpdateWorkflowDto,
    responses(
        (status = 200, description = "Updated workflow", body = dtos::WorkflowDto),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No workflow with this ID visible to the caller"),
    ),
    tag = "workflows"
)]
pub async fn update_workflow(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    workflow_id: web::Path<Uuid>,
    form: web::Json<dtos::UpdateWorkflowDto>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) =
        validation::validate_update_workflow(&form, state.config.limits.max_document_bytes)
    {
        return Ok(validation_error_response(&errors));
    }
    let dto = form.into_inner();

    let mut conn = state.conn().await?;
    load_workflow(&mut conn, &user, *workflow_id).await?;

    let changes = WorkflowChanges {
        name: dto.name.map(|n| n.trim().to_string()),
        description: dto.description,
        document: dto.document,
    };
    let updated = db::update_workflow(&mut conn, *workflow_id, changes)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::from(AppError::not_found("Workflow", *workflow_id)))?;
    Ok(HttpResponse::Ok().json(dtos::WorkflowDto::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/workflow/{workflow_id}",
    summary = "Delete workflow",
    description = "Tasks created from the workflow are kept, with `workflow_id` set to null.",
    params(("workflow_id" = Uuid, Path, description = "The UUID of the workflow")),
    responses(
        (status = 204, description = "Workflow deleted"),
        (status = 404, description = "No workflow with this ID visible to the caller"),
    ),
    tag = "workflows"
)]
pub async fn delete_workflow(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    workflow_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    load_workflow(&mut conn, &user, *workflow_id).await?;
    db::delete_workflow(&mut conn, *workflow_id)
        .await
        .map_err(ApiError::from)?;
    log::info!("Workflow {} deleted by {}", workflow_id, user.id);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/workflow/{workflow_id}/nodes",
    summary = "List workflow nodes",
    description = "Node ids of the document with their `class_type` and input keys, sorted by node id. Use these as `node_id`/`param_key` when building sweep axes.",
    params(("workflow_id" = Uuid, Path, description = "The UUID of the workflow")),
    responses(
        (status = 200, description = "Nodes of the workflow", body = Vec<dtos::NodeDto>),
        (status = 404, description = "No workflow with this ID visible to the caller"),
    ),
    tag = "workflows"
)]
pub async fn list_workflow_nodes(
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
    workflow_id: web::Path<Uuid>,
) -> actix_web::Result<HttpResponse> {
    let mut conn = state.conn().await?;
    let workflow = load_workflow(&mut conn, &user, *workflow_id).await?;
    Ok(HttpResponse::Ok().json(dtos::NodeDto::list(&workflow.document)))
}
