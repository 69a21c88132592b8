use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use gridflow::models::StatusKind;
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_callback_requires_executor_token() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    create_task_ok(&app, &session.token, wf.id, json!({})).await;
    let item = claim_all(&state).await.remove(0);

    let uri = format!("/task/item/{}", item.id);
    let req = TestRequest::patch()
        .uri(&uri)
        .set_json(success_report(json!({})))
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = TestRequest::patch()
        .uri(&uri)
        .insert_header((gridflow::executor::EXECUTOR_TOKEN_HEADER, "wrong"))
        .set_json(success_report(json!({})))
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = authed(TestRequest::patch().uri(&uri), &session.token)
        .set_json(success_report(json!({})))
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED, "a user session is not an executor token");
}

#[tokio::test]
async fn test_callback_completes_task() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    let task = create_task_ok(&app, &session.token, wf.id, json!({"x": seed_axis(&[1, 2])})).await;

    let items = claim_all(&state).await;
    assert_task_status(&app, &session.token, task.id, StatusKind::Running, "claimed").await;

    let (status, body) = report_item(&app, items[0].id, success_report(json!(["f1"]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Success");
    assert_eq!(body["result"], json!(["f1"]));
    assert!(body["ended_at"].is_string());

    let detailed = get_task_ok(&app, &session.token, task.id).await;
    assert_eq!(detailed.task.status, StatusKind::Running);
    assert_eq!(detailed.task.succeeded, 1);

    let (status, _) = report_item(&app, items[1].id, success_report(json!(["f2"]))).await;
    assert_eq!(status, StatusCode::OK);

    let detailed = get_task_ok(&app, &session.token, task.id).await;
    assert_eq!(detailed.task.status, StatusKind::Success);
    assert_eq!(detailed.task.succeeded, 2);
    assert_eq!(detailed.task.failed, 0);
    assert!(detailed.task.started_at.is_some());
    assert!(detailed.task.ended_at.is_some());
}

#[tokio::test]
async fn test_any_failure_fails_task() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    let task = create_task_ok(&app, &session.token, wf.id, json!({"x": seed_axis(&[1, 2])})).await;
    let items = claim_all(&state).await;

    let (status, _) = report_item(&app, items[0].id, failure_report("out of memory")).await;
    assert_eq!(status, StatusCode::OK);
    assert_task_status(&app, &session.token, task.id, StatusKind::Running, "one item left").await;

    report_item(&app, items[1].id, success_report(json!({}))).await;
    let detailed = get_task_ok(&app, &session.token, task.id).await;
    assert_eq!(detailed.task.status, StatusKind::Failure);
    assert_eq!(detailed.task.succeeded, 1);
    assert_eq!(detailed.task.failed, 1);
    let failed = detailed.items.iter().find(|i| i.id == items[0].id).unwrap();
    assert_eq!(failed.error.as_deref(), Some("out of memory"));
}

#[tokio::test]
async fn test_callback_validation() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    create_task_ok(&app, &session.token, wf.id, json!({})).await;
    let item = claim_all(&state).await.remove(0);

    let (status, _) = report_item(&app, item.id, json!({"status": "Failure"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "failure needs an error");

    let (status, _) = report_item(&app, item.id, json!({"status": "Running"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "only terminal outcomes");

    let (status, _) = report_item(&app, uuid::Uuid::new_v4(), success_report(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_callback_rejects_items_not_running() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    let task = create_task_ok(&app, &session.token, wf.id, json!({"x": seed_axis(&[1, 2])})).await;

    let pending = get_task_ok(&app, &session.token, task.id).await.items.remove(0);
    let (status, _) = report_item(&app, pending.id, success_report(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT, "pending items were never dispatched");

    let items = claim_all(&state).await;
    let (status, _) = report_item(&app, items[0].id, success_report(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = report_item(&app, items[0].id, failure_report("late")).await;
    assert_eq!(status, StatusCode::CONFLICT, "terminal items cannot change");

    let req = authed(TestRequest::delete().uri(&format!("/task/{}", task.id)), &session.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = report_item(&app, items[1].id, success_report(json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT, "late callback for a canceled item");
    assert_task_status(&app, &session.token, task.id, StatusKind::Canceled, "cancel sticks").await;
}
