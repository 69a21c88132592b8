//! Client for the external executor that runs task items.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, metrics, models::TaskItem};

/// Header carrying the shared executor secret, on submissions and callbacks.
pub const EXECUTOR_TOKEN_HEADER: &str = "X-Executor-Token";

/// Body POSTed to the executor for every item.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitItemDto {
    pub item_id: Uuid,
    pub task_id: Uuid,
    /// Workflow document with the item's overrides applied.
    pub params: serde_json::Value,
    /// Where the executor reports the outcome with `PATCH`.
    pub callback: String,
}

#[derive(Clone)]
pub struct ExecutorClient {
    client: reqwest::Client,
    url: Option<String>,
    token: String,
    host_url: String,
}

impl ExecutorClient {
    pub fn new(config: &Config) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(config.executor.request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            client,
            url: config.executor.url.clone(),
            token: config.executor.token.clone(),
            host_url: config.host_url.trim_end_matches('/').to_string(),
        })
    }

    /// Dispatch is disabled when no executor URL is configured.
    pub fn is_configured(&self) -> bool {
        self.url.is_some()
    }

    pub fn callback_url(&self, item_id: Uuid) -> String {
        format!("{}/task/item/{}", self.host_url, item_id)
    }

    /// Whether a callback presented the configured secret.
    pub fn accepts_token(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(t) if !self.token.is_empty() => {
                crate::auth::password::constant_time_eq(t.as_bytes(), self.token.as_bytes())
            }
            _ => false,
        }
    }

    /// Hand one item to the executor. Any non-2xx answer is an error.
    pub async fn submit(&self, item: &TaskItem) -> Result<(), String> {
        let url = self
            .url
            .as_deref()
            .ok_or_else(|| "No executor configured".to_string())?;
        let body = SubmitItemDto {
            item_id: item.id,
            task_id: item.task_id,
            params: item.params.clone(),
            callback: self.callback_url(item.id),
        };

        let start = Instant::now();
        let outcome = self
            .client
            .post(url)
            .header(EXECUTOR_TOKEN_HEADER, &self.token)
            .json(&body)
            .send()
            .await;
        let elapsed = start.elapsed().as_secs_f64();

        let response = match outcome {
            Ok(r) => r,
            Err(e) => {
                metrics::record_executor_submission("error", elapsed);
                return Err(format!("Executor request failed: {}", e));
            }
        };

        if response.status().is_success() {
            metrics::record_executor_submission("accepted", elapsed);
            Ok(())
        } else {
            metrics::record_executor_submission("rejected", elapsed);
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            log::error!("Executor rejected item {}: {} {}", item.id, status, text);
            Err(format!("Executor rejected item with status {}", status))
        }
    }
}
