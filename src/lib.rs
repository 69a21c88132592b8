pub mod auth;
pub mod combination;
pub mod config;
pub mod db;
pub mod dtos;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod schema;
pub mod storage;
pub mod telemetry;
pub mod validation;
pub mod workers;

use diesel::{ConnectionError, ConnectionResult};
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::{AsyncDieselConnectionManager, ManagerConfig};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::config::Config;

/// Short-hand for the database pool type to use throughout the app.
pub type DbPool = Pool<AsyncPgConnection>;

pub type Conn<'a> = PooledConnection<'a, AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Build the shared connection pool. With `DATABASE_TLS` set, connections are
/// opened through rustls using the platform certificate store.
pub async fn initialize_db_pool(config: &Config) -> Result<DbPool, String> {
    let manager = if config.pool.tls {
        let mut manager_config = ManagerConfig::default();
        manager_config.custom_setup = Box::new(establish_tls_connection);
        AsyncDieselConnectionManager::<AsyncPgConnection>::new_with_config(
            &config.database_url,
            manager_config,
        )
    } else {
        AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url)
    };

    Pool::builder()
        .max_size(config.pool.max_size)
        .min_idle(Some(config.pool.min_idle))
        .max_lifetime(Some(config.pool.max_lifetime))
        .idle_timeout(Some(config.pool.idle_timeout))
        .connection_timeout(config.pool.connection_timeout)
        .build(manager)
        .await
        .map_err(|e| format!("Failed to create database pool: {}", e))
}

fn establish_tls_connection(url: &str) -> BoxFuture<'_, ConnectionResult<AsyncPgConnection>> {
    async move {
        use rustls_platform_verifier::ConfigVerifierExt;

        let rustls_config = rustls::ClientConfig::with_platform_verifier();
        let tls = tokio_postgres_rustls::MakeRustlsConnect::new(rustls_config);
        let (client, connection) = tokio_postgres::connect(url, tls)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        AsyncPgConnection::try_from_client_and_connection(client, connection).await
    }
    .boxed()
}

/// Apply pending embedded migrations over a blocking connection.
///
/// Call from `spawn_blocking`; diesel's migration harness is synchronous.
pub fn run_migrations(database_url: &str) -> Result<usize, String> {
    use diesel::Connection;

    let mut conn = diesel::PgConnection::establish(database_url)
        .map_err(|e| format!("Failed to connect for migrations: {}", e))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Failed to run migrations: {}", e))?;
    Ok(applied.len())
}
