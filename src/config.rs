//! Application configuration management.
//!
//! Provides typed configuration loaded from environment variables with validation.

use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL database connection URL
    pub database_url: String,

    /// Public URL of this service, used to build executor callbacks
    pub host_url: String,

    /// Server port to bind to
    pub port: u16,

    /// Database connection pool settings
    pub pool: PoolConfig,

    /// Pagination settings
    pub pagination: PaginationConfig,

    /// Background loop settings
    pub worker: WorkerConfig,

    /// Remote executor receiving task items
    pub executor: ExecutorConfig,

    /// Sessions, admins and Google sign-in
    pub auth: AuthConfig,

    /// Object storage for uploaded files
    pub storage: StorageConfig,

    /// Payload and sweep size limits
    pub limits: LimitsConfig,
}

/// Database connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,

    /// Minimum number of idle connections to maintain
    pub min_idle: u32,

    /// Maximum lifetime of a connection
    pub max_lifetime: Duration,

    /// Idle timeout for connections
    pub idle_timeout: Duration,

    /// Connection acquisition timeout
    pub connection_timeout: Duration,

    /// Number of retries when acquiring a connection
    pub acquire_retries: u32,

    /// Delay between retry attempts
    pub retry_delay: Duration,

    /// Connect to Postgres over TLS (platform certificate verifier)
    pub tls: bool,
}

/// Pagination configuration.
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Default number of items per page
    pub default_per_page: i64,

    /// Maximum allowed items per page
    pub max_per_page: i64,
}

/// Worker loop configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Interval between dispatch loop iterations
    pub dispatch_interval: Duration,

    /// Interval for the item timeout check loop
    pub timeout_check_interval: Duration,

    /// Running items silent for longer than this are failed
    pub item_timeout: Duration,

    /// Upper bound of items running on the executor at once
    pub max_running_items: i64,

    /// Interval for expired session cleanup
    pub session_cleanup_interval: Duration,
}

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Endpoint items are submitted to. Dispatch is disabled when unset.
    pub url: Option<String>,

    /// Shared secret the executor sends back in `X-Executor-Token`
    pub token: String,

    /// Timeout of a single submit request
    pub request_timeout: Duration,
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of a session token
    pub session_ttl: Duration,

    /// Emails granted the admin role on registration or sign-in
    pub admin_emails: Vec<String>,

    /// Digest rounds for password hashing
    pub password_iterations: u32,

    /// Google OAuth client, absent when Google sign-in is disabled
    pub google: Option<GoogleOAuthConfig>,
}

/// Google OAuth client configuration.
#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,

    /// Attempts for the token exchange
    pub retries: u32,

    /// Base delay between attempts, multiplied by the attempt number
    pub retry_delay: Duration,

    /// Lifetime of a pending `state` value
    pub state_ttl: Duration,
}

/// Object storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory of the local object store
    pub root: PathBuf,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,
}

/// Size limits for user payloads.
#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum number of items a single sweep may expand to
    pub max_task_items: usize,

    /// Maximum serialized size of a workflow document
    pub max_document_bytes: usize,

    /// Maximum estimated size of all items of one sweep
    pub max_sweep_bytes: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            min_idle: 2,
            max_lifetime: Duration::from_secs(60 * 60 * 24), // 24 hours
            idle_timeout: Duration::from_secs(60 * 2),       // 2 minutes
            connection_timeout: Duration::from_secs(30),
            acquire_retries: 3,
            retry_delay: Duration::from_millis(100),
            tls: false,
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_per_page: 50,
            max_per_page: 100,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_secs(1),
            timeout_check_interval: Duration::from_secs(5),
            item_timeout: Duration::from_secs(60 * 10),
            max_running_items: 4,
            session_cleanup_interval: Duration::from_secs(60 * 10),
        }
    }
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: String::new(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(60 * 60 * 24 * 30), // 30 days
            admin_emails: vec![],
            password_iterations: 10_000,
            google: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./data/objects"),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_task_items: 1000,
            max_document_bytes: 1024 * 1024,
            max_sweep_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Configuration loading error.
#[derive(Debug)]
pub struct ConfigError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Configuration error for '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string
    /// - `HOST_URL`: Public URL of this service
    ///
    /// Optional environment variables:
    /// - `PORT`: Server port (default: 8085)
    /// - `POOL_MAX_SIZE`: Max pool connections (default: 10)
    /// - `POOL_MIN_IDLE`: Min idle connections (default: 2)
    /// - `POOL_ACQUIRE_RETRIES`: Connection acquire retries (default: 3)
    /// - `POOL_TIMEOUT_SECS`: Connection acquire timeout (default: 30)
    /// - `DATABASE_TLS`: Connect over TLS (default: 0)
    /// - `PAGINATION_DEFAULT`: Default items per page (default: 50)
    /// - `PAGINATION_MAX`: Max items per page (default: 100)
    /// - `DISPATCH_INTERVAL_MS`: Dispatch loop interval in ms (default: 1000)
    /// - `ITEM_TIMEOUT_SECS`: Silence before a running item fails (default: 600)
    /// - `MAX_RUNNING_ITEMS`: Items running on the executor at once (default: 4)
    /// - `EXECUTOR_URL`: Executor submit endpoint (dispatch disabled when unset)
    /// - `EXECUTOR_TOKEN`: Shared secret for executor callbacks (required with `EXECUTOR_URL`)
    /// - `EXECUTOR_TIMEOUT_SECS`: Submit request timeout (default: 10)
    /// - `SESSION_TTL_SECS`: Session lifetime (default: 2592000)
    /// - `ADMIN_EMAILS`: Comma-separated admin emails
    /// - `PASSWORD_ITERATIONS`: Password digest rounds (default: 10000)
    /// - `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URI`: enable Google sign-in
    /// - `OAUTH_RETRIES`: Token exchange attempts (default: 3)
    /// - `STORAGE_ROOT`: Object store directory (default: ./data/objects)
    /// - `MAX_UPLOAD_BYTES`: Upload size limit (default: 20MiB)
    /// - `MAX_TASK_ITEMS`: Sweep size limit (default: 1000)
    /// - `MAX_DOCUMENT_BYTES`: Workflow document size limit (default: 1MiB)
    /// - `MAX_SWEEP_BYTES`: Size limit of one sweep's items (default: 64MiB)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required_env("DATABASE_URL")?;
        let host_url = required_env("HOST_URL")?;

        let port = parse_env_or("PORT", 8085)?;

        let pool = PoolConfig {
            max_size: parse_env_or("POOL_MAX_SIZE", 10)?,
            min_idle: parse_env_or("POOL_MIN_IDLE", 2)?,
            acquire_retries: parse_env_or("POOL_ACQUIRE_RETRIES", 3)?,
            connection_timeout: Duration::from_secs(parse_env_or("POOL_TIMEOUT_SECS", 30)?),
            tls: parse_env_or("DATABASE_TLS", 0)? != 0,
            ..Default::default()
        };

        let pagination = PaginationConfig {
            default_per_page: parse_env_or("PAGINATION_DEFAULT", 50)?,
            max_per_page: parse_env_or("PAGINATION_MAX", 100)?,
        };

        let worker = WorkerConfig {
            dispatch_interval: Duration::from_millis(parse_env_or("DISPATCH_INTERVAL_MS", 1000)?),
            item_timeout: Duration::from_secs(parse_env_or("ITEM_TIMEOUT_SECS", 600)?),
            max_running_items: parse_env_or("MAX_RUNNING_ITEMS", 4)?,
            ..Default::default()
        };

        let executor = ExecutorConfig {
            url: std::env::var("EXECUTOR_URL").ok().filter(|u| !u.is_empty()),
            token: std::env::var("EXECUTOR_TOKEN").unwrap_or_default(),
            request_timeout: Duration::from_secs(parse_env_or("EXECUTOR_TIMEOUT_SECS", 10)?),
        };

        let google = match (
            std::env::var("GOOGLE_CLIENT_ID"),
            std::env::var("GOOGLE_CLIENT_SECRET"),
        ) {
            (Ok(client_id), Ok(client_secret)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                redirect_uri: std::env::var("GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|_| format!("{}/auth/google/callback", host_url)),
                auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                userinfo_url: "https://openidconnect.googleapis.com/v1/userinfo".to_string(),
                retries: parse_env_or("OAUTH_RETRIES", 3)?,
                retry_delay: Duration::from_millis(parse_env_or("OAUTH_RETRY_DELAY_MS", 500)?),
                state_ttl: Duration::from_secs(60 * 10),
            }),
            _ => None,
        };

        let auth = AuthConfig {
            session_ttl: Duration::from_secs(parse_env_or("SESSION_TTL_SECS", 60 * 60 * 24 * 30)?),
            admin_emails: parse_list_env("ADMIN_EMAILS")
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            password_iterations: parse_env_or("PASSWORD_ITERATIONS", 10_000)?,
            google,
        };

        let storage = StorageConfig {
            root: std::env::var("STORAGE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| StorageConfig::default().root),
            max_upload_bytes: parse_env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        };

        let limits = LimitsConfig {
            max_task_items: parse_env_or("MAX_TASK_ITEMS", 1000)?,
            max_document_bytes: parse_env_or("MAX_DOCUMENT_BYTES", 1024 * 1024)?,
            max_sweep_bytes: parse_env_or("MAX_SWEEP_BYTES", 64 * 1024 * 1024)?,
        };

        let config = Self {
            database_url,
            host_url,
            port,
            pool,
            pagination,
            worker,
            executor,
            auth,
            storage,
            limits,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.is_empty() {
            return Err(invalid("DATABASE_URL", "Cannot be empty"));
        }

        if !self.host_url.starts_with("http://") && !self.host_url.starts_with("https://") {
            return Err(invalid("HOST_URL", "Must start with http:// or https://"));
        }

        if self.pool.max_size == 0 {
            return Err(invalid("POOL_MAX_SIZE", "Must be greater than 0"));
        }

        if self.pool.min_idle > self.pool.max_size {
            return Err(invalid(
                "POOL_MIN_IDLE",
                "Cannot be greater than POOL_MAX_SIZE",
            ));
        }

        if self.pagination.max_per_page <= 0 {
            return Err(invalid("PAGINATION_MAX", "Must be greater than 0"));
        }

        if self.pagination.default_per_page > self.pagination.max_per_page {
            return Err(invalid(
                "PAGINATION_DEFAULT",
                "Cannot be greater than PAGINATION_MAX",
            ));
        }

        if self.worker.max_running_items <= 0 {
            return Err(invalid("MAX_RUNNING_ITEMS", "Must be greater than 0"));
        }

        if self.executor.url.is_some() && self.executor.token.is_empty() {
            return Err(invalid(
                "EXECUTOR_TOKEN",
                "Required when EXECUTOR_URL is set",
            ));
        }

        if self.auth.password_iterations == 0 {
            return Err(invalid("PASSWORD_ITERATIONS", "Must be greater than 0"));
        }

        if let Some(google) = &self.auth.google
            && google.retries == 0
        {
            return Err(invalid("OAUTH_RETRIES", "Must be greater than 0"));
        }

        if self.limits.max_task_items == 0 {
            return Err(invalid("MAX_TASK_ITEMS", "Must be greater than 0"));
        }

        if self.limits.max_sweep_bytes < self.limits.max_document_bytes {
            return Err(invalid(
                "MAX_SWEEP_BYTES",
                "Must be at least MAX_DOCUMENT_BYTES",
            ));
        }

        Ok(())
    }

    /// Configuration with every optional setting at its default.
    pub fn with_defaults(database_url: impl Into<String>, host_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host_url: host_url.into(),
            port: 8085,
            pool: PoolConfig::default(),
            pagination: PaginationConfig::default(),
            worker: WorkerConfig::default(),
            executor: ExecutorConfig::default(),
            auth: AuthConfig::default(),
            storage: StorageConfig::default(),
            limits: LimitsConfig::default(),
        }
    }

    /// Whether `email` is configured as an admin address.
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.auth.admin_emails.iter().any(|e| *e == email)
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError {
        field: field.to_string(),
        message: message.to_string(),
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| invalid(name, "Required environment variable not set"))
}

/// Parse an environment variable or return a default value.
fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val.parse().map_err(|_| ConfigError {
            field: name.to_string(),
            message: format!("Invalid value '{}', expected a valid number", val),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a comma-separated environment variable, skipping blank entries.
fn parse_list_env(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|s| {
            s.split(',')
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
