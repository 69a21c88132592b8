use crate::{
    Conn, dtos,
    models::{NewWorkflow, Workflow, WorkflowChanges},
};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::DbError;

pub async fn insert_workflow<'a>(
    conn: &mut Conn<'a>,
    new_workflow: NewWorkflow,
) -> Result<Workflow, DbError> {
    use crate::schema::workflow::dsl::*;
    Ok(diesel::insert_into(workflow)
        .values(&new_workflow)
        .returning(Workflow::as_returning())
        .get_result(conn)
        .await?)
}

pub async fn find_workflow<'a>(
    conn: &mut Conn<'a>,
    workflow_id: Uuid,
) -> Result<Option<Workflow>, DbError> {
    use crate::schema::workflow::dsl::*;
    Ok(workflow
        .filter(id.eq(workflow_id))
        .select(Workflow::as_select())
        .first(conn)
        .await
        .optional()?)
}

/// List workflows, newest first. `owner` restricts to one user's workflows.
pub async fn list_workflows<'a>(
    conn: &mut Conn<'a>,
    owner: Option<Uuid>,
    name_pattern: Option<String>,
    pagination: dtos::Pagination,
) -> Result<Vec<Workflow>, DbError> {
    use crate::schema::workflow::dsl::*;

    let mut query = workflow
        .into_boxed()
        .order(created_at.desc())
        .offset(pagination.offset)
        .limit(pagination.limit);

    if let Some(o) = owner {
        query = query.filter(owner_id.eq(o));
    }
    if let Some(pattern) = name_pattern {
        query = query.filter(name.ilike(pattern));
    }

    Ok(query.select(Workflow::as_select()).load(conn).await?)
}

pub async fn update_workflow<'a>(
    conn: &mut Conn<'a>,
    workflow_id: Uuid,
    changes: WorkflowChanges,
) -> Result<Option<Workflow>, DbError> {
    use crate::schema::workflow::dsl::*;
    use diesel::dsl::now;
    Ok(diesel::update(workflow.filter(id.eq(workflow_id)))
        .set((&changes, updated_at.eq(now)))
        .returning(Workflow::as_returning())
        .get_result(conn)
        .await
        .optional()?)
}

/// Tasks created from the workflow keep their items; their `workflow_id` is nulled.
pub async fn delete_workflow<'a>(conn: &mut Conn<'a>, workflow_id: Uuid) -> Result<bool, DbError> {
    use crate::schema::workflow::dsl::*;
    let deleted = diesel::delete(workflow.filter(id.eq(workflow_id)))
        .execute(conn)
        .await?;
    Ok(deleted == 1)
}
