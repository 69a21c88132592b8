use gridflow::DbPool;
use gridflow::config::{Config, GoogleOAuthConfig};
use gridflow::executor::ExecutorClient;
use gridflow::handlers::AppState;
use gridflow::storage::LocalObjectStore;
use std::sync::Arc;

use super::setup::{TestApp, setup_test_db};

pub const EXECUTOR_TOKEN: &str = "test-executor-token";
pub const ADMIN_EMAIL: &str = "admin@gridflow.test";

/// Test configuration: no executor, fast password hashing, small limits.
pub fn test_config() -> Config {
    let mut config = Config::with_defaults("", "http://localhost:8080");
    config.pool.max_size = 5;
    config.pool.retry_delay = std::time::Duration::from_millis(50);
    config.executor.token = EXECUTOR_TOKEN.to_string();
    config.executor.request_timeout = std::time::Duration::from_secs(2);
    config.auth.password_iterations = 10;
    config.auth.admin_emails = vec![ADMIN_EMAIL.to_string()];
    config.limits.max_task_items = 50;
    config.storage.max_upload_bytes = 1024;
    config.storage.root =
        std::env::temp_dir().join(format!("gridflow-test-{}", uuid::Uuid::new_v4()));
    config
}

/// Google endpoints pointing at a local mock server.
pub fn google_config(base_url: &str) -> GoogleOAuthConfig {
    GoogleOAuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        redirect_uri: "http://localhost:8080/auth/google/done".to_string(),
        auth_url: "https://accounts.google.test/o/oauth2/v2/auth".to_string(),
        token_url: format!("{}/token", base_url),
        userinfo_url: format!("{}/userinfo", base_url),
        retries: 3,
        retry_delay: std::time::Duration::from_millis(10),
        state_ttl: std::time::Duration::from_secs(600),
    }
}

pub fn create_state_with_config(pool: DbPool, config: Config) -> AppState {
    std::fs::create_dir_all(&config.storage.root).expect("storage root");
    let executor = ExecutorClient::new(&config).expect("executor client");
    AppState {
        pool,
        store: Arc::new(LocalObjectStore::new(config.storage.root.clone())),
        executor,
        http: reqwest::Client::new(),
        config: Arc::new(config),
    }
}

pub fn create_test_state(pool: DbPool) -> AppState {
    create_state_with_config(pool, test_config())
}

/// Database + state. Keep the TestApp alive (`_g` pattern) for the whole test.
pub async fn setup_test_app() -> (TestApp, AppState) {
    let test_app = setup_test_db().await;
    let state = create_test_state(test_app.pool.clone());
    (test_app, state)
}

/// Like `setup_test_app`, with a customised configuration.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut Config)) -> (TestApp, AppState) {
    let test_app = setup_test_db().await;
    let mut config = test_config();
    configure(&mut config);
    let state = create_state_with_config(test_app.pool.clone(), config);
    (test_app, state)
}
