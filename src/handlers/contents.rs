use super::common::{
    created_response, map_service_error, parse_id_list, success_response, validate_input,
    PaginationParams,
};
use crate::{
    entities::ContentRecord,
    errors::ApiError,
    services::{
        content_assignments::AssignAttributesInput,
        contents::{CreateContentInput, UpdateContentInput},
    },
    AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

pub fn contents_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_contents).post(create_content))
        .route("/:id", get(get_content).put(update_content))
        .route(
            "/:id/attributes",
            get(get_content_attributes).put(assign_content_attributes),
        )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ContentListQuery {
    /// Restrict to one category
    pub category_id: Option<Uuid>,
    /// Comma separated attribute value ids; values of one attribute are
    /// alternatives, different attributes must all match
    pub value_ids: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl ContentListQuery {
    fn pagination(&self) -> PaginationParams {
        let defaults = PaginationParams::default();
        PaginationParams {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Content listing, faceted when `value_ids` is given
#[utoipa::path(
    get,
    path = "/api/v1/contents",
    params(ContentListQuery),
    responses(
        (status = 200, description = "Page of content items", body = PaginatedResponse<ContentRecord>),
        (status = 400, description = "Malformed or unknown value id", body = crate::errors::ErrorResponse),
    ),
    tag = "contents"
)]
pub async fn list_contents(
    State(state): State<AppState>,
    Query(query): Query<ContentListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = query.pagination().clamped(state.config.api_max_page_size);

    let value_ids = match query.value_ids.as_deref() {
        Some(raw) => parse_id_list(raw)?,
        None => Vec::new(),
    };

    if value_ids.is_empty() {
        let (items, total) = state
            .services
            .contents
            .list(query.category_id, page, per_page)
            .await
            .map_err(map_service_error)?;
        return Ok(success_response(PaginatedResponse::new(
            items, total, page, per_page,
        )));
    }

    let mut matches = state
        .services
        .assignments
        .facet(&value_ids)
        .await
        .map_err(map_service_error)?;
    if let Some(category_id) = query.category_id {
        matches.retain(|content| content.category_id == category_id);
    }
    Ok(success_response(PaginatedResponse::from_all(
        matches, page, per_page,
    )))
}

#[utoipa::path(
    post,
    path = "/api/v1/contents",
    request_body = CreateContentInput,
    responses(
        (status = 201, description = "Content created", body = ContentRecord),
        (status = 400, description = "Invalid input or selection", body = crate::errors::ErrorResponse),
    ),
    tag = "contents"
)]
pub async fn create_content(
    State(state): State<AppState>,
    Json(payload): Json<CreateContentInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let content = state
        .services
        .contents
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(content))
}

#[utoipa::path(
    get,
    path = "/api/v1/contents/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "Content found", body = ContentRecord),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    tag = "contents"
)]
pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state
        .services
        .contents
        .get(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(content))
}

#[utoipa::path(
    put,
    path = "/api/v1/contents/{id}",
    params(("id" = Uuid, Path, description = "Content id")),
    request_body = UpdateContentInput,
    responses(
        (status = 200, description = "Content updated", body = ContentRecord),
        (status = 400, description = "Invalid input or selection", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version mismatch", body = crate::errors::ErrorResponse),
    ),
    tag = "contents"
)]
pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContentInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let content = state
        .services
        .contents
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(content))
}

/// Selected values of a content item grouped by attribute
#[utoipa::path(
    get,
    path = "/api/v1/contents/{id}/attributes",
    params(("id" = Uuid, Path, description = "Content id")),
    responses(
        (status = 200, description = "Current selection", body = Vec<crate::services::content_assignments::ContentAttributeView>),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
    ),
    tag = "contents"
)]
pub async fn get_content_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let selection = state
        .services
        .assignments
        .by_content(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(selection))
}

/// Replaces the content item's whole attribute selection
#[utoipa::path(
    put,
    path = "/api/v1/contents/{id}/attributes",
    params(("id" = Uuid, Path, description = "Content id")),
    request_body = AssignAttributesInput,
    responses(
        (status = 200, description = "Selection replaced", body = Vec<crate::services::content_assignments::ContentAttributeView>),
        (status = 400, description = "Selection violates category or model rules", body = crate::errors::ErrorResponse),
        (status = 404, description = "Content not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version mismatch", body = crate::errors::ErrorResponse),
    ),
    tag = "contents"
)]
pub async fn assign_content_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignAttributesInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let selection = state
        .services
        .assignments
        .assign(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(selection))
}
