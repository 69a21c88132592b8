use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::{config::Config, models::StatusKind};

/// Resolved pagination parameters ready for DB queries.
#[derive(Debug, Clone, Copy)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

/// Pagination parameters for list endpoints.
#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
pub struct PaginationDto {
    /// Page number (0-indexed). Defaults to 0.
    pub page: Option<i64>,
    /// Number of items per page. Defaults to 50, maximum 100. Values above the max are clamped.
    pub page_size: Option<i64>,
}

impl PaginationDto {
    /// Resolve raw query params into validated offset + limit, enforcing config limits.
    pub fn resolve(self, config: &Config) -> Pagination {
        let mut page_size = self.page_size.unwrap_or(config.pagination.default_per_page);
        if page_size > config.pagination.max_per_page {
            page_size = config.pagination.max_per_page;
        }
        if page_size <= 0 {
            page_size = config.pagination.default_per_page;
        }

        let mut page = self.page.unwrap_or(0).max(0);

        // Prevent overflow when computing offset = page * page_size
        if page > i64::MAX / page_size {
            page = i64::MAX / page_size;
        }

        Pagination {
            offset: page.saturating_mul(page_size),
            limit: page_size,
        }
    }
}

/// Filter parameters for task listing. Combined with AND logic.
#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
pub struct TaskFilterDto {
    /// Filter by task name (substring match, case-insensitive).
    pub name: Option<String>,
    /// Filter by task status. Example: "Running", "Pending", "Success".
    pub status: Option<StatusKind>,
    /// Filter by the workflow the task was created from.
    pub workflow_id: Option<uuid::Uuid>,
}

/// Resolved task filter with escaped values ready for DB queries.
pub struct TaskFilter {
    pub name: Option<String>,
    pub status: Option<StatusKind>,
    pub workflow_id: Option<uuid::Uuid>,
}

impl TaskFilterDto {
    pub fn resolve(self) -> TaskFilter {
        TaskFilter {
            name: non_blank_pattern(self.name),
            status: self.status,
            workflow_id: self.workflow_id,
        }
    }
}

/// Filter by name substring, used by workflow and user listings.
#[derive(Debug, Serialize, Deserialize, Default, IntoParams)]
pub struct NameFilterDto {
    /// Substring to search for (case-insensitive).
    pub q: Option<String>,
}

impl NameFilterDto {
    /// `ILIKE` pattern, `None` when no filtering is requested.
    pub fn resolve(self) -> Option<String> {
        non_blank_pattern(self.q)
    }
}

fn non_blank_pattern(input: Option<String>) -> Option<String> {
    input
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", super::escape_like_pattern(&s)))
}
