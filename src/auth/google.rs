//! Google OAuth 2.0 authorization code flow.

use serde::Deserialize;

use crate::{config::GoogleOAuthConfig, error::AppError, metrics};

/// Identity returned by the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUser {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// URL the browser is sent to for consent.
pub fn authorization_url(cfg: &GoogleOAuthConfig, state: &str) -> Result<String, AppError> {
    let url = reqwest::Url::parse_with_params(
        &cfg.auth_url,
        &[
            ("client_id", cfg.client_id.as_str()),
            ("redirect_uri", cfg.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "openid email profile"),
            ("state", state),
            ("access_type", "online"),
            ("prompt", "select_account"),
        ],
    )
    .map_err(|e| AppError::Internal(format!("Invalid GOOGLE_AUTH_URL: {}", e)))?;
    Ok(url.to_string())
}

/// Send a request, retrying transport errors and 5xx responses with linear backoff.
async fn send_with_retry<F>(
    cfg: &GoogleOAuthConfig,
    what: &str,
    build: F,
) -> Result<reqwest::Response, AppError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let attempts = cfg.retries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match build().send().await {
            Ok(resp) if resp.status().is_server_error() => {
                last_error = format!("{} returned {}", what, resp.status());
            }
            Ok(resp) => return Ok(resp),
            Err(e) => {
                last_error = format!("{} request failed: {}", what, e);
            }
        }
        if attempt < attempts {
            log::warn!(
                "{} (attempt {}/{}), retrying in {:?}",
                last_error,
                attempt,
                attempts,
                cfg.retry_delay * attempt
            );
            metrics::record_oauth_retry();
            tokio::time::sleep(cfg.retry_delay * attempt).await;
        }
    }

    Err(AppError::Upstream(last_error))
}

/// Exchange an authorization code for an access token.
pub async fn exchange_code(
    client: &reqwest::Client,
    cfg: &GoogleOAuthConfig,
    code: &str,
) -> Result<String, AppError> {
    let form = [
        ("code", code),
        ("client_id", cfg.client_id.as_str()),
        ("client_secret", cfg.client_secret.as_str()),
        ("redirect_uri", cfg.redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];
    let resp = send_with_retry(cfg, "Token exchange", || {
        client.post(&cfg.token_url).form(&form)
    })
    .await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        log::debug!("Token exchange rejected with {}: {}", status, body);
        return Err(AppError::Unauthorized(
            "Google rejected the authorization code".to_string(),
        ));
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("Invalid token response: {}", e)))?;
    Ok(token.access_token)
}

pub async fn fetch_user(
    client: &reqwest::Client,
    cfg: &GoogleOAuthConfig,
    access_token: &str,
) -> Result<GoogleUser, AppError> {
    let resp = send_with_retry(cfg, "Userinfo", || {
        client.get(&cfg.userinfo_url).bearer_auth(access_token)
    })
    .await?;

    if !resp.status().is_success() {
        return Err(AppError::Upstream(format!(
            "Userinfo returned {}",
            resp.status()
        )));
    }

    resp.json()
        .await
        .map_err(|e| AppError::Upstream(format!("Invalid userinfo response: {}", e)))
}
