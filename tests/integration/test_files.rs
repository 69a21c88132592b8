use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use gridflow::dtos::FileDto;
use gridflow::handlers::persist_upload;
use gridflow::models::NewStoredFile;
use gridflow::storage::object_key;

use crate::common::*;

fn upload(token: &str, filename: &str, body: &'static [u8]) -> TestRequest {
    authed(
        TestRequest::post().uri(&format!("/files?filename={}", filename)),
        token,
    )
    .set_payload(body)
}

#[tokio::test]
async fn test_upload_download_delete() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;

    let req = upload(&session.token, "grid.png", b"\x89PNG fake image").to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let file: FileDto = serde_json::from_value(body).unwrap();
    assert_eq!(file.filename, "grid.png");
    assert_eq!(file.content_type, "image/png", "guessed from the name");
    assert_eq!(file.size_bytes, 15);

    let req = authed(TestRequest::get().uri(&format!("/files/{}", file.id)), &session.token)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
    let disposition = resp
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("grid.png"), "{}", disposition);
    let bytes = test::read_body(resp).await;
    assert_eq!(&bytes[..], b"\x89PNG fake image");

    let req = authed(TestRequest::get().uri("/files"), &session.token).to_request();
    let (_, body) = call_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let req = authed(TestRequest::delete().uri(&format!("/files/{}", file.id)), &session.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let req = authed(TestRequest::get().uri(&format!("/files/{}", file.id)), &session.token)
        .to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let object = state
        .store
        .get(&gridflow::storage::object_key(session.user.id, file.id))
        .await
        .unwrap();
    assert!(object.is_none(), "stored object removed too");
}

#[tokio::test]
async fn test_upload_keeps_explicit_content_type() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;

    let req = upload(&session.token, "result", br#"{"ok":true}"#)
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .to_request();
    let (status, body) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["content_type"], "application/json");

    let req = upload(&session.token, "blob", b"raw")
        .insert_header((header::CONTENT_TYPE, "application/octet-stream"))
        .to_request();
    let (_, body) = call_json(&app, req).await;
    assert_eq!(body["content_type"], "application/octet-stream");
}

#[tokio::test]
async fn test_upload_limits() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let session = register_ok(&app, "ada@example.com").await;

    static BIG: [u8; 2048] = [7u8; 2048];
    let req = upload(&session.token, "big.bin", &BIG).to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let req = upload(&session.token, "empty.txt", b"").to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = upload(&session.token, "..", b"data").to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = upload(&session.token, "a%2Fb.txt", b"data").to_request();
    let (status, _) = call_json(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "no path separators");

    let req = authed(TestRequest::get().uri("/files"), &session.token).to_request();
    let (_, body) = call_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_files_are_private() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);
    let owner = register_ok(&app, "owner@example.com").await;
    let other = register_ok(&app, "other@example.com").await;
    let admin = register_ok(&app, ADMIN_EMAIL).await;

    let req = upload(&owner.token, "notes.txt", b"secret").to_request();
    let (_, body) = call_json(&app, req).await;
    let file: FileDto = serde_json::from_value(body).unwrap();

    for req in [
        TestRequest::get().uri(&format!("/files/{}", file.id)),
        TestRequest::delete().uri(&format!("/files/{}", file.id)),
    ] {
        let (status, _) = call_json(&app, authed(req, &other.token).to_request()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let req = authed(TestRequest::get().uri("/files"), &other.token).to_request();
    let (_, body) = call_json(&app, req).await;
    assert_eq!(body.as_array().unwrap().len(), 0);

    let req = authed(TestRequest::get().uri(&format!("/files/{}", file.id)), &admin.token)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK, "admins can read any file");
}

#[tokio::test]
async fn test_upload_stores_nothing_without_a_record() {
    let test_db = setup_test_db_with_pool(1, std::time::Duration::from_millis(200)).await;
    let mut config = test_config();
    config.pool.acquire_retries = 1;
    let state = create_state_with_config(test_db.pool.clone(), config);

    let owner = uuid::Uuid::new_v4();
    let new_file = |id| NewStoredFile {
        id,
        owner_id: owner,
        object_key: String::new(),
        filename: "grid.png".to_string(),
        content_type: "image/png".to_string(),
        size_bytes: 4,
    };

    let held = state.pool.get().await.unwrap();
    let file_id = uuid::Uuid::new_v4();
    let err = persist_upload(&state, new_file(file_id), b"data").await.unwrap_err();
    assert_eq!(
        err.as_response_error().status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
    assert!(
        !state.config.storage.root.join(owner.to_string()).exists(),
        "nothing written while the pool is exhausted"
    );
    drop(held);

    // Unknown owner: the row is rejected and the written object removed.
    let file_id = uuid::Uuid::new_v4();
    assert!(persist_upload(&state, new_file(file_id), b"data").await.is_err());
    let object = state.store.get(&object_key(owner, file_id)).await.unwrap();
    assert!(object.is_none());
}
