use actix_web::{HttpRequest, HttpResponse, web};

use crate::{
    auth::{self, AuthUser, google, password},
    db, dtos,
    error::{ApiError, AppError},
    metrics,
    models::NewUser,
    validation,
};

use super::AppState;
use super::response::validation_error_response;

#[utoipa::path(
    post,
    path = "/auth/register",
    summary = "Register with email and password",
    description = "Creates the account and signs it in. Emails are case-insensitive; addresses listed in `ADMIN_EMAILS` become admins.",
    request_body = dtos::RegisterDto,
    responses(
        (status = 201, description = "Account created, session opened", body = dtos::SessionDto),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered"),
    ),
    tag = "auth"
)]
pub async fn register(
    state: web::Data<AppState>,
    form: web::Json<dtos::RegisterDto>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) = validation::validate_register(&form) {
        return Ok(validation_error_response(&errors));
    }
    let dto = form.into_inner();
    let email = dto.email.trim().to_lowercase();
    let digest = password::hash_password(&dto.password, state.config.auth.password_iterations);

    let mut conn = state.conn().await?;
    let user = db::insert_user(
        &mut conn,
        NewUser {
            email: &email,
            display_name: dto.display_name.trim(),
            password_hash: Some(digest),
            google_sub: None,
            is_admin: state.config.is_admin_email(&email),
        },
    )
    .await
    .map_err(ApiError::from)?;
    log::info!("User {} registered", user.id);

    let session = auth::open_session(&mut conn, &state.config, &user)
        .await
        .map_err(ApiError::from)?;
    metrics::record_login("password", "registered");
    Ok(HttpResponse::Created().json(session))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    summary = "Sign in with email and password",
    request_body = dtos::LoginDto,
    responses(
        (status = 200, description = "Session opened", body = dtos::SessionDto),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Wrong email or password"),
    ),
    tag = "auth"
)]
pub async fn login(
    state: web::Data<AppState>,
    form: web::Json<dtos::LoginDto>,
) -> actix_web::Result<HttpResponse> {
    if let Err(errors) = validation::validate_login(&form) {
        return Ok(validation_error_response(&errors));
    }
    let dto = form.into_inner();

    let mut conn = state.conn().await?;
    let user = db::find_user_by_email(&mut conn, dto.email.trim())
        .await
        .map_err(ApiError::from)?;

    // Google-only accounts have no password and can never match.
    let user = match user {
        Some(u)
            if u.password_hash
                .as_deref()
                .is_some_and(|h| password::verify_password(&dto.password, h)) =>
        {
            u
        }
        _ => {
            metrics::record_login("password", "failure");
            return Err(ApiError::Unauthorized("Invalid email or password".to_string()).into());
        }
    };

    let session = auth::open_session(&mut conn, &state.config, &user)
        .await
        .map_err(ApiError::from)?;
    metrics::record_login("password", "success");
    Ok(HttpResponse::Ok().json(session))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    summary = "End the current session",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 401, description = "Not signed in"),
    ),
    tag = "auth"
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    AuthUser(user): AuthUser,
) -> actix_web::Result<HttpResponse> {
    let token = auth::bearer_token(&req)
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
    let mut conn = state.conn().await?;
    db::delete_session(&mut conn, &auth::hash_token(token))
        .await
        .map_err(ApiError::from)?;
    log::debug!("User {} signed out", user.id);
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/auth/me",
    summary = "Current user",
    responses(
        (status = 200, description = "The signed-in user", body = dtos::UserDto),
        (status = 401, description = "Not signed in"),
    ),
    tag = "auth"
)]
pub async fn me(AuthUser(user): AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(dtos::UserDto::from(user))
}

fn google_config(state: &AppState) -> Result<&crate::config::GoogleOAuthConfig, ApiError> {
    state
        .config
        .auth
        .google
        .as_ref()
        .ok_or_else(|| ApiError::NotFound("Google sign-in is not configured".to_string()))
}

#[utoipa::path(
    get,
    path = "/auth/google/url",
    summary = "Start Google sign-in",
    description = "Returns the Google consent URL. The embedded `state` is single-use and expires after `GOOGLE_STATE_TTL_SECS`.",
    responses(
        (status = 200, description = "Authorization URL", body = dtos::GoogleAuthUrlDto),
        (status = 404, description = "Google sign-in is not configured"),
    ),
    tag = "auth"
)]
pub async fn google_url(state: web::Data<AppState>) -> actix_web::Result<HttpResponse> {
    let cfg = google_config(&state)?;
    let oauth_state = auth::generate_token();
    let url = google::authorization_url(cfg, &oauth_state).map_err(ApiError::from)?;
    let ttl = chrono::Duration::from_std(cfg.state_ttl)
        .map_err(|e| ApiError::from(AppError::Internal(e.to_string())))?;

    let mut conn = state.conn().await?;
    db::insert_oauth_state(&mut conn, &oauth_state, chrono::Utc::now() + ttl)
        .await
        .map_err(ApiError::from)?;

    Ok(HttpResponse::Ok().json(dtos::GoogleAuthUrlDto {
        url,
        state: oauth_state,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/google/callback",
    summary = "Finish Google sign-in",
    description = "Consumes the `state`, exchanges the `code` with Google and opens a session. The account is matched by Google subject, then by verified email; otherwise a new account is created.",
    request_body = dtos::GoogleCallbackDto,
    responses(
        (status = 200, description = "Session opened", body = dtos::SessionDto),
        (status = 401, description = "Unknown or expired state, or code rejected by Google"),
        (status = 404, description = "Google sign-in is not configured"),
        (status = 502, description = "Google could not be reached"),
    ),
    tag = "auth"
)]
pub async fn google_callback(
    state: web::Data<AppState>,
    form: web::Json<dtos::GoogleCallbackDto>,
) -> actix_web::Result<HttpResponse> {
    let cfg = google_config(&state)?;
    let dto = form.into_inner();

    {
        let mut conn = state.conn().await?;
        if !db::consume_oauth_state(&mut conn, &dto.state)
            .await
            .map_err(ApiError::from)?
        {
            metrics::record_login("google", "failure");
            return Err(ApiError::Unauthorized("Invalid or expired state".to_string()).into());
        }
    }

    // No pooled connection is held during the calls to Google.
    let identity = async {
        let access_token = google::exchange_code(&state.http, cfg, &dto.code).await?;
        let identity = google::fetch_user(&state.http, cfg, &access_token).await?;
        Ok::<_, AppError>(identity)
    }
    .await
    .map_err(|e| {
        metrics::record_login("google", "failure");
        ApiError::from(e)
    })?;

    let mut conn = state.conn().await?;
    let user = auth::resolve_google_user(&mut conn, &state.config, &identity)
        .await
        .map_err(ApiError::from)?;
    let session = auth::open_session(&mut conn, &state.config, &user)
        .await
        .map_err(ApiError::from)?;
    metrics::record_login("google", "success");
    Ok(HttpResponse::Ok().json(session))
}
