use crate::{
    errors::{ApiError, ServiceError},
    ApiResponse, PaginatedResponse,
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;
use uuid::Uuid;
use validator::Validate;

/// 200 with the standard envelope
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// 201 with the standard envelope
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validate request input
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input
        .validate()
        .map_err(|e| ApiError::ValidationError(format!("Validation failed: {}", e)))
}

/// Map service errors to API errors
pub fn map_service_error(err: ServiceError) -> ApiError {
    ApiError::ServiceError(err)
}

/// Parses a comma separated id list such as `?value_ids=a,b,c`.
pub fn parse_id_list(raw: &str) -> Result<Vec<Uuid>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            Uuid::parse_str(part).map_err(|_| ApiError::BadRequest {
                message: format!("'{}' is not a valid id", part),
            })
        })
        .collect()
}

/// Pagination parameters for list operations
#[derive(Debug, Deserialize, Serialize, IntoParams)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn default_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

/// Largest row offset a page may start at; SQL offsets are signed 64-bit.
const MAX_OFFSET: u64 = i64::MAX as u64;

impl PaginationParams {
    /// Page and page size after clamping to `1..=max_per_page`. The page is
    /// capped so that `(page - 1) * per_page` stays a valid offset.
    pub fn clamped(&self, max_per_page: u64) -> (u64, u64) {
        let per_page = self.per_page.clamp(1, max_per_page.max(1));
        let last_page = MAX_OFFSET / per_page + 1;
        (self.page.clamp(1, last_page), per_page)
    }
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total.div_ceil(limit)
        };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }

    /// Cuts one page out of an already materialised result set.
    pub fn from_all(all: Vec<T>, page: u64, limit: u64) -> Self {
        let total = all.len() as u64;
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let items = all
            .into_iter()
            .skip(usize::try_from(skip).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        Self::new(items, total, page, limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn id_list_skips_blank_segments() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let parsed = parse_id_list(&format!("{}, ,{},", a, b)).unwrap();
        assert_eq!(parsed, vec![a, b]);
    }

    #[test]
    fn id_list_rejects_garbage() {
        assert_matches!(parse_id_list("nope"), Err(ApiError::BadRequest { .. }));
    }

    #[test]
    fn pagination_is_clamped() {
        let params = PaginationParams {
            page: 0,
            per_page: 10_000,
        };
        assert_eq!(params.clamped(100), (1, 100));
        assert_eq!(PaginationParams::default().clamped(100), (1, 20));
    }

    #[test]
    fn huge_pages_do_not_overflow() {
        let params = PaginationParams {
            page: u64::MAX,
            per_page: 100,
        };
        let (page, per_page) = params.clamped(100);
        assert!((page - 1).checked_mul(per_page).is_some_and(|o| o <= i64::MAX as u64));

        let far = PaginatedResponse::from_all(vec![1u32, 2, 3], u64::MAX, 100);
        assert!(far.items.is_empty());
        assert_eq!(far.total, 3);
        assert_eq!(far.total_pages, 1);
    }

    #[test]
    fn in_memory_page_reports_totals() {
        let page = PaginatedResponse::from_all((1..=7).collect::<Vec<u32>>(), 2, 3);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total, 7);
        assert_eq!(page.total_pages, 3);

        let past_end = PaginatedResponse::from_all(vec![1u32], 5, 3);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 1);
    }
}
