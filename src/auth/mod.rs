//! Accounts, bearer sessions and Google sign-in.
//!
//! A session token is handed to the client once; the database only keeps its
//! SHA-256 digest, so a leaked table does not leak usable tokens.

pub mod google;
pub mod password;

use actix_web::{FromRequest, HttpRequest, dev::Payload, http::header, web};
use futures_util::future::LocalBoxFuture;
use sha2::{Digest, Sha256};

use crate::{
    Conn,
    config::Config,
    db,
    dtos::SessionDto,
    error::{ApiError, AppError},
    handlers::AppState,
    models::{NewUser, User},
};

/// New random bearer token: 256 bits, hex encoded.
pub fn generate_token() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Bearer token from the `Authorization` header, if any.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Record the login and open a new session for `user`.
pub async fn open_session<'a>(
    conn: &mut Conn<'a>,
    config: &Config,
    user: &User,
) -> Result<SessionDto, AppError> {
    let grant_admin = config.is_admin_email(&user.email);
    let user = db::touch_login(conn, user.id, grant_admin).await?;

    let token = generate_token();
    let ttl = chrono::Duration::from_std(config.auth.session_ttl)
        .map_err(|e| AppError::Internal(format!("Invalid session TTL: {}", e)))?;
    let session = db::insert_session(conn, user.id, &hash_token(&token), chrono::Utc::now() + ttl)
        .await?;

    Ok(SessionDto {
        token,
        expires_at: session.expires_at,
        user: user.into(),
    })
}

/// Find or create the local account for a Google identity.
///
/// Lookup goes by subject first, then by email, linking the subject to an
/// existing password account on first Google sign-in.
pub async fn resolve_google_user<'a>(
    conn: &mut Conn<'a>,
    config: &Config,
    identity: &google::GoogleUser,
) -> Result<User, AppError> {
    if let Some(user) = db::find_user_by_google_sub(conn, &identity.sub).await? {
        return Ok(user);
    }
    if !identity.email_verified {
        return Err(AppError::Unauthorized(
            "Google account email is not verified".to_string(),
        ));
    }
    if let Some(user) = db::find_user_by_email(conn, &identity.email).await? {
        log::info!("Linking Google account to user {}", user.id);
        return db::link_google_sub(conn, user.id, &identity.sub).await;
    }

    let email = identity.email.to_lowercase();
    let display_name = identity
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.clone());
    let user = db::insert_user(
        conn,
        NewUser {
            email: &email,
            display_name: &display_name,
            password_hash: None,
            google_sub: Some(&identity.sub),
            is_admin: config.is_admin_email(&email),
        },
    )
    .await?;
    log::info!("Created user {} from Google sign-in", user.id);
    Ok(user)
}

async fn authenticate(req: HttpRequest) -> Result<User, ApiError> {
    let token = bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?
        .to_string();
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::InternalServerError("App state not configured".to_string()))?;

    let mut conn = state
        .conn()
        .await
        .map_err(|_| ApiError::InternalServerError("Database connection unavailable".to_string()))?;
    db::find_session_user(&mut conn, &hash_token(&token))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))
}

/// The signed-in user. Rejects the request with 401 otherwise.
pub struct AuthUser(pub User);

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move { authenticate(req).await.map(AuthUser) })
    }
}

/// A signed-in admin. Rejects with 401 when signed out and 403 for non-admins.
pub struct AdminUser(pub User);

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let user = authenticate(req).await?;
            if !user.is_admin {
                return Err(ApiError::Forbidden("Admin access required".to_string()));
            }
            Ok(AdminUser(user))
        })
    }
}

impl User {
    /// Whether `owner_id` is this user's or the user is an admin.
    pub fn can_access(&self, owner_id: uuid::Uuid) -> bool {
        self.is_admin || self.id == owner_id
    }
}
