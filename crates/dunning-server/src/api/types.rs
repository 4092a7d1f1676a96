//! Response envelopes and query helpers shared by all handlers.

use axum::Json;
use axum::http::StatusCode;
use dunning_core::repository::{PaginatedResult, Pagination};
use serde::Serialize;

/// Successful response body: `{success: true, data, message?, pagination?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageInfo>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            pagination: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::new(data))
}

pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::new(data)))
}

pub fn paged<T: Serialize>(result: PaginatedResult<T>) -> Json<ApiResponse<Vec<T>>> {
    let pagination = PageInfo {
        page: result.page(),
        limit: result.limit,
        total: result.total,
        total_pages: result.total_pages(),
    };
    Json(ApiResponse {
        success: true,
        data: result.items,
        message: None,
        pagination: Some(pagination),
    })
}

/// Page selection from raw query values. Unparseable or out-of-range
/// values fall back to page 1 and `default_limit`; the limit is capped
/// at [`Pagination::MAX_LIMIT`].
pub fn page_of(page: Option<&str>, limit: Option<&str>, default_limit: u64) -> Pagination {
    let page = page
        .and_then(|p| p.trim().parse::<u64>().ok())
        .filter(|p| *p >= 1)
        .unwrap_or(1);
    let limit = limit
        .and_then(|l| l.trim().parse::<u64>().ok())
        .filter(|l| *l >= 1)
        .unwrap_or(default_limit);
    Pagination::page(page, limit)
}

/// Lenient numeric query value; anything unparseable reads as absent.
pub fn number_of<N: std::str::FromStr>(raw: Option<&str>) -> Option<N> {
    raw.and_then(|v| v.trim().parse().ok())
}

/// `"true"` / `"false"`; anything else reads as absent.
pub fn flag_of(raw: Option<&str>) -> Option<bool> {
    match raw {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Treat an empty query value as absent.
pub fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
