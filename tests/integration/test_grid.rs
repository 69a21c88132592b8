use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use gridflow::dtos::TaskGridDto;
use gridflow::models::StatusKind;
use serde_json::json;

use crate::common::*;

async fn fetch_grid<S, B>(app: &S, token: &str, task_id: uuid::Uuid) -> TaskGridDto
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: actix_web::body::MessageBody,
{
    let req = authed(TestRequest::get().uri(&format!("/task/{}/grid", task_id)), token).to_request();
    let (status, body) = call_json(app, req).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_grid_layout_follows_axes() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    let task = create_task_ok(
        &app,
        &session.token,
        wf.id,
        json!({"x": seed_axis(&[1, 2, 3]), "y": cfg_axis(&[6.5, 8.0])}),
    )
    .await;

    let grid = fetch_grid(&app, &session.token, task.id).await;
    assert_eq!(grid.x_values.len(), 3);
    assert_eq!(grid.y_values.len(), 2);
    assert_eq!(grid.layers.len(), 1, "no Z axis gives one layer");
    assert_eq!(grid.layers[0].z_value, None);

    let rows = &grid.layers[0].rows;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.len() == 3));

    let detailed = get_task_ok(&app, &session.token, task.id).await;
    for (y, row) in rows.iter().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            let cell = cell.as_ref().expect("every combination has an item");
            let item = detailed.items.iter().find(|i| i.id == cell.item_id).unwrap();
            assert_eq!(item.position as usize, x * 2 + y);
            assert_eq!(item.x_value, grid.x_values[x]);
            assert_eq!(item.y_value, grid.y_values[y]);
            assert_eq!(cell.status, StatusKind::Pending);
        }
    }
}

#[tokio::test]
async fn test_grid_fills_in_as_items_finish() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;
    let wf = create_workflow_ok(&app, &session.token, "txt2img").await;
    let task = create_task_ok(
        &app,
        &session.token,
        wf.id,
        json!({"x": seed_axis(&[1, 2]), "z": cfg_axis(&[5.0, 9.0])}),
    )
    .await;

    let claimed = claim_all(&state).await;
    assert_eq!(claimed.len(), 4);
    let first = claimed.iter().find(|i| i.position == 0).unwrap();
    let (status, _) = report_item(&app, first.id, success_report(json!({"image": "a.png"}))).await;
    assert_eq!(status, StatusCode::OK);

    let grid = fetch_grid(&app, &session.token, task.id).await;
    assert_eq!(grid.status, StatusKind::Running);
    assert_eq!(grid.y_values, vec![None], "absent axis has a single null header");
    assert_eq!(grid.layers.len(), 2, "one layer per Z candidate");
    assert!(grid.layers.iter().all(|l| l.z_value.is_some()));

    let done = grid.layers[0].rows[0][0].as_ref().unwrap();
    assert_eq!(done.item_id, first.id);
    assert_eq!(done.status, StatusKind::Success);
    assert_eq!(done.result, Some(json!({"image": "a.png"})));

    let waiting = grid.layers[1].rows[0][1].as_ref().unwrap();
    assert_eq!(waiting.status, StatusKind::Running);
    assert_eq!(waiting.result, None);
}
