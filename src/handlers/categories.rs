use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::{
        categories::{CreateCategoryInput, UpdateCategoryInput},
        category_bindings::SetBindingsInput,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

/// Routes for the category tree and its attribute bindings
pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/tree", get(get_category_tree))
        .route(
            "/:id",
            get(get_category)
                .put(update_category)
                .delete(delete_category),
        )
        .route(
            "/:id/attributes",
            get(get_category_attributes).put(set_category_attributes),
        )
}

/// Flat list of all categories
#[utoipa::path(
    get,
    path = "/api/v1/categories",
    responses(
        (status = 200, description = "Categories ordered by sort", body = Vec<crate::entities::CategoryModel>),
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .services
        .categories
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(categories))
}

/// Whole category forest
#[utoipa::path(
    get,
    path = "/api/v1/categories/tree",
    responses(
        (status = 200, description = "Root categories with nested children", body = Vec<crate::taxonomy::CategoryTreeNode>),
    ),
    tag = "categories"
)]
pub async fn get_category_tree(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let tree = state
        .services
        .categories
        .tree()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(tree))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    request_body = CreateCategoryInput,
    responses(
        (status = 201, description = "Category created", body = crate::entities::CategoryModel),
        (status = 400, description = "Invalid input or unknown parent", body = crate::errors::ErrorResponse),
        (status = 409, description = "Slug already in use", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .categories
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(category))
}

/// One category with its parent and direct children
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category found", body = crate::services::categories::CategoryDetail),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .categories
        .find_one(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = UpdateCategoryInput,
    responses(
        (status = 200, description = "Category updated", body = crate::entities::CategoryModel),
        (status = 400, description = "Move would create a cycle or exceed the depth limit", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let category = state
        .services
        .categories
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(category))
}

#[utoipa::path(
    delete,
    path = "/api/v1/categories/{id}",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Category still has children or content", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .categories
        .remove(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Attributes bound to the category with their enabled values
#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}/attributes",
    params(("id" = Uuid, Path, description = "Category id")),
    responses(
        (status = 200, description = "Allowed attributes", body = Vec<crate::services::category_bindings::AllowedAttribute>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn get_category_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let allowed = state
        .services
        .bindings
        .get_allowed_attributes(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(allowed))
}

/// Replaces the category's binding set as a whole
#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}/attributes",
    params(("id" = Uuid, Path, description = "Category id")),
    request_body = SetBindingsInput,
    responses(
        (status = 200, description = "Bindings replaced", body = Vec<crate::services::category_bindings::AllowedAttribute>),
        (status = 400, description = "Binding set rejected", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version mismatch", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn set_category_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetBindingsInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let allowed = state
        .services
        .bindings
        .set_bindings(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(allowed))
}
