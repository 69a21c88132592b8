use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use gridflow::dtos::{DetailedTaskDto, SessionDto, TaskDto, TaskItemDto, WorkflowDto};
use gridflow::executor::EXECUTOR_TOKEN_HEADER;
use gridflow::models::StatusKind;

use super::builders::{task_json, workflow_json};
use super::state::EXECUTOR_TOKEN;

pub const TEST_PASSWORD: &str = "correct horse battery";

/// Attach a bearer token to a request.
pub fn authed(req: TestRequest, token: &str) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {}", token)))
}

/// Call the service and return the status with the body parsed as JSON
/// (`Null` for empty or non-JSON bodies).
pub async fn call_json<S, B>(app: &S, req: Request) -> (StatusCode, serde_json::Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let bytes = test::read_body(resp).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, body)
}

/// POST /auth/register, assert 201, return the session.
pub async fn register_ok<S, B>(app: &S, email: &str) -> SessionDto
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = TestRequest::post()
        .uri("/auth/register")
        .set_json(serde_json::json!({
            "email": email,
            "password": TEST_PASSWORD,
            "display_name": "Test User"
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "register {} should succeed", email);
    test::read_body_json(resp).await
}

/// POST /workflow with the sample document, assert 201.
pub async fn create_workflow_ok<S, B>(app: &S, token: &str, name: &str) -> WorkflowDto
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = authed(TestRequest::post().uri("/workflow"), token)
        .set_json(workflow_json(name))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED, "POST /workflow should return 201");
    test::read_body_json(resp).await
}

/// POST /task sweeping `workflow_id` over `axes`, assert 201.
pub async fn create_task_ok<S, B>(
    app: &S,
    token: &str,
    workflow_id: uuid::Uuid,
    axes: serde_json::Value,
) -> TaskDto
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = authed(TestRequest::post().uri("/task"), token)
        .set_json(task_json(workflow_id, "sweep", axes))
        .to_request();
    let (status, body) = call_json(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "POST /task failed: {}", body);
    serde_json::from_value(body).expect("TaskDto")
}

/// GET /task/{id}, assert 200.
pub async fn get_task_ok<S, B>(app: &S, token: &str, task_id: uuid::Uuid) -> DetailedTaskDto
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = authed(TestRequest::get().uri(&format!("/task/{}", task_id)), token).to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "GET /task/{} failed", task_id);
    test::read_body_json(resp).await
}

/// Assert a task has the expected status.
pub async fn assert_task_status<S, B>(
    app: &S,
    token: &str,
    task_id: uuid::Uuid,
    expected: StatusKind,
    msg: &str,
) where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let task = get_task_ok(app, token, task_id).await;
    assert_eq!(task.task.status, expected, "{}", msg);
}

/// PATCH /task/item/{id} the way the executor does.
pub async fn report_item<S, B>(
    app: &S,
    item_id: uuid::Uuid,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = TestRequest::patch()
        .uri(&format!("/task/item/{}", item_id))
        .insert_header((EXECUTOR_TOKEN_HEADER, EXECUTOR_TOKEN))
        .set_json(body)
        .to_request();
    call_json(app, req).await
}

/// Claim every pending item (Pending -> Running) directly in the database.
pub async fn claim_all(state: &gridflow::handlers::AppState) -> Vec<TaskItemDto> {
    let mut conn = state.pool.get().await.unwrap();
    gridflow::db::claim_pending_items(&mut conn, 1000)
        .await
        .unwrap()
        .into_iter()
        .map(Into::into)
        .collect()
}
