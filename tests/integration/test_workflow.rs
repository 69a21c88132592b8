use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use gridflow::dtos::{NodeDto, WorkflowSummaryDto};
use serde_json::json;

use crate::common::*;

#[tokio::test]
async fn test_workflow_requires_auth() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);

    let req = TestRequest::get().uri("/workflow").to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = authed(TestRequest::get().uri("/workflow"), "not-a-session").to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_workflow_crud() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;

    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    assert_eq!(wf.name, "txt2img");
    assert_eq!(wf.owner_id, session.user.id);
    assert_eq!(wf.document, sample_document());

    let req = authed(TestRequest::patch().uri(&format!("/workflow/{}", wf.id)), &session.token)
        .set_json(json!({"name": "renamed"}))
        .to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "renamed");
    assert_eq!(body["document"], sample_document(), "document unchanged");

    let req = authed(TestRequest::get().uri("/workflow"), &session.token).to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let list: Vec<WorkflowSummaryDto> = serde_json::from_value(body).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "renamed");

    let req = authed(TestRequest::delete().uri(&format!("/workflow/{}", wf.id)), &session.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let req = authed(TestRequest::get().uri(&format!("/workflow/{}", wf.id)), &session.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_workflow_nodes() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;

    let req = authed(
        TestRequest::get().uri(&format!("/workflow/{}/nodes", wf.id)),
        &session.token,
    )
    .to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    let nodes: Vec<NodeDto> = serde_json::from_value(body).unwrap();
    let ids: Vec<&str> = nodes.iter().map(|n| n.node_id.as_str()).collect();
    assert_eq!(ids, vec!["3", "4", "6"]);
    assert_eq!(nodes[0].class_type.as_deref(), Some("KSampler"));
    assert_eq!(nodes[0].input_keys, vec!["cfg", "model", "seed", "steps"]);
}

#[tokio::test]
async fn test_workflow_rejects_non_object_document() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;

    let req = authed(TestRequest::post().uri("/workflow"), &session.token)
        .set_json(json!({"name": "", "document": [1, 2, 3]}))
        .to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation failed");
    assert!(
        body["details"].as_array().unwrap().len() >= 2,
        "name and document errors are both reported: {}",
        body
    );
}

#[tokio::test]
async fn test_workflows_are_private() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let owner = register_ok(&app, "owner@example.com").await;
    let other = register_ok(&app, "other@example.com").await;
    let admin = register_ok(&app, ADMIN_EMAIL).await;
    assert!(admin.user.is_admin);

    let wf = create_workflow_ok(&app, &owner.token, "mine").await;

    let req = authed(TestRequest::get().uri(&format!("/workflow/{}", wf.id)), &other.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND, "other users cannot see it");

    let req = authed(TestRequest::get().uri("/workflow"), &other.token).to_request();
    let (_, body) = call_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let req = authed(TestRequest::get().uri(&format!("/workflow/{}", wf.id)), &admin.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::OK, "admins can see every workflow");
}

#[tokio::test]
async fn test_deleting_workflow_keeps_tasks() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    let task = create_task_ok(&app, &session.token, wf.id, json!({"x": seed_axis(&[1, 2])})).await;

    let req = authed(TestRequest::delete().uri(&format!("/workflow/{}", wf.id)), &session.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let detailed = get_task_ok(&app, &session.token, task.id).await;
    assert_eq!(detailed.task.workflow_id, None);
    assert_eq!(detailed.items.len(), 2);
}
