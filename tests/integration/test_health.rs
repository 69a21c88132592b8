use crate::common::*;

#[tokio::test]
async fn test_health_check() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);

    let req = actix_web::test::TestRequest::get()
        .uri("/health")
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["storage"], "healthy");
    assert_eq!(body["executor"], "disabled");
}

#[tokio::test]
async fn test_health_degraded_without_storage() {
    let (_g, state) = setup_test_app().await;
    std::fs::remove_dir_all(&state.config.storage.root).unwrap();
    let app = test_service!(state);

    let req = actix_web::test::TestRequest::get()
        .uri("/health")
        .to_request();
    let (status, body) = call_json(&app, req).await;

    assert_eq!(status, actix_web::http::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "healthy");
    assert_eq!(body["storage"], "unhealthy");
}

#[tokio::test]
async fn test_readiness_check() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);

    let req = actix_web::test::TestRequest::get()
        .uri("/ready")
        .to_request();
    let resp = actix_web::test::call_service(&app, req).await;

    assert!(resp.status().is_success());

    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let (_g, state) = setup_test_app().await;
    let app = test_service!(state);

    let req = actix_web::test::TestRequest::get()
        .uri("/api-docs/openapi.json")
        .to_request();
    let (status, body) = call_json(&app, req).await;

    assert_eq!(status, actix_web::http::StatusCode::OK);
    let paths = body["paths"].as_object().expect("paths object");
    for path in ["/task", "/task/{task_id}/grid", "/workflow", "/auth/login", "/files"] {
        assert!(paths.contains_key(path), "missing {}", path);
    }
}
