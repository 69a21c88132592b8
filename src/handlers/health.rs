use actix_web::{HttpResponse, web};
use diesel_async::RunQueryDsl;

use super::{AppState, HealthResponse};

async fn database_reachable(state: &AppState) -> bool {
    match state.pool.get().await {
        Ok(mut conn) => match diesel::sql_query("SELECT 1").execute(&mut conn).await {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Health check: probe query failed: {}", e);
                false
            }
        },
        Err(e) => {
            log::warn!("Health check: database connection failed: {}", e);
            false
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    summary = "Health check",
    description = "Runs a probe query, checks the object store and returns pool statistics. Returns 200 if both answer, 503 otherwise. Use this for liveness probes.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is degraded, database or storage unavailable", body = HealthResponse),
    ),
    tag = "health"
)]
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let pool_state = state.pool.state();
    let database_ok = database_reachable(&state).await;
    let storage_ok = match state.store.check().await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Health check: object store unavailable: {}", e);
            false
        }
    };
    let healthy = database_ok && storage_ok;
    let label = |ok: bool| if ok { "healthy" } else { "unhealthy" }.to_string();

    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" }.to_string(),
        database: label(database_ok),
        storage: label(storage_ok),
        executor: if state.executor.is_configured() {
            "configured"
        } else {
            "disabled"
        }
        .to_string(),
        pool_size: pool_state.connections,
        pool_idle: pool_state.idle_connections,
    };

    if healthy {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[utoipa::path(
    get,
    path = "/ready",
    summary = "Readiness check",
    description = "Stricter than /health: also fails when every pool connection is in use. Use this for readiness probes.",
    responses(
        (status = 200, description = "Service is ready to accept traffic"),
        (status = 503, description = "Pool exhausted or database unreachable"),
    ),
    tag = "health"
)]
pub async fn readiness_check(state: web::Data<AppState>) -> HttpResponse {
    let pool_state = state.pool.state();

    if pool_state.idle_connections == 0 && pool_state.connections >= state.config.pool.max_size {
        return HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "not_ready",
            "reason": "connection pool exhausted"
        }));
    }

    if database_reachable(&state).await {
        HttpResponse::Ok().json(serde_json::json!({"status": "ready"}))
    } else {
        HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "not_ready",
            "reason": "cannot reach database"
        }))
    }
}
