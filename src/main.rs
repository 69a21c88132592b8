use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use actix_web_prometheus::PrometheusMetricsBuilder;
use gridflow::{
    config::Config,
    executor::ExecutorClient,
    handlers::{AppState, configure_routes},
    initialize_db_pool, metrics, run_migrations,
    storage::LocalObjectStore,
    telemetry, workers,
};
use tokio::sync::watch;

fn startup_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_logging();

    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        log::warn!("A rustls crypto provider was already installed");
    }

    let config = Config::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        startup_error(e)
    })?;
    let config = Arc::new(config);
    log::info!("Using public url {}", &config.host_url);

    let database_url = config.database_url.clone();
    let applied = tokio::task::spawn_blocking(move || run_migrations(&database_url))
        .await
        .map_err(startup_error)?
        .map_err(startup_error)?;
    log::info!("Applied {} pending migrations", applied);

    let pool = initialize_db_pool(&config).await.map_err(startup_error)?;
    metrics::init_metrics();

    let executor = ExecutorClient::new(&config).map_err(startup_error)?;
    let http = reqwest::Client::builder()
        .timeout(config.executor.request_timeout)
        .build()
        .map_err(startup_error)?;
    tokio::fs::create_dir_all(&config.storage.root).await?;
    let store = Arc::new(LocalObjectStore::new(config.storage.root.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let dispatch_handle = actix_web::rt::spawn(workers::dispatch_loop(
        executor.clone(),
        pool.clone(),
        config.worker.dispatch_interval,
        config.worker.max_running_items,
        shutdown_rx.clone(),
    ));
    let timeout_handle = actix_web::rt::spawn(workers::timeout_loop(
        pool.clone(),
        config.worker.timeout_check_interval,
        config.worker.item_timeout,
        shutdown_rx.clone(),
    ));
    let cleanup_handle = actix_web::rt::spawn(workers::session_cleanup_loop(
        pool.clone(),
        config.worker.session_cleanup_interval,
        shutdown_rx,
    ));

    let prometheus = PrometheusMetricsBuilder::new("api")
        .endpoint("/metrics")
        .registry(metrics::REGISTRY.clone())
        .build()
        .map_err(startup_error)?;

    let app_data = AppState {
        pool,
        config: config.clone(),
        executor,
        store,
        http,
    };

    let port = config.port;
    log::info!("starting HTTP server at http://0.0.0.0:{port}");
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_data.clone()))
            .wrap(prometheus.clone())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", port))?
    .run();

    let result = server.await;

    log::info!("HTTP server stopped, shutting down workers");
    let _ = shutdown_tx.send(true);
    for handle in [dispatch_handle, timeout_handle, cleanup_handle] {
        if let Err(e) = handle.await {
            log::error!("Worker exited abnormally: {}", e);
        }
    }
    result
}
