use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::attributes::{
        CreateAttributeInput, CreateAttributeValueInput, UpdateAttributeInput,
        UpdateAttributeValueInput,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use uuid::Uuid;

/// Routes for the attribute dictionary
pub fn attributes_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_attributes).post(create_attribute))
        .route(
            "/:id",
            get(get_attribute)
                .put(update_attribute)
                .delete(delete_attribute),
        )
        .route("/:id/deactivate", post(deactivate_attribute))
        .route(
            "/:id/values",
            get(list_attribute_values).post(create_attribute_value),
        )
}

/// Routes addressing a single dictionary value
pub fn attribute_values_routes() -> Router<AppState> {
    Router::new().route(
        "/:id",
        put(update_attribute_value).delete(delete_attribute_value),
    )
}

/// Active attributes
#[utoipa::path(
    get,
    path = "/api/v1/attributes",
    responses(
        (status = 200, description = "Active attributes ordered by sort", body = Vec<crate::entities::AttributeModel>),
    ),
    tag = "attributes"
)]
pub async fn list_attributes(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let attributes = state
        .services
        .attributes
        .list_active()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(attributes))
}

#[utoipa::path(
    post,
    path = "/api/v1/attributes",
    request_body = CreateAttributeInput,
    responses(
        (status = 201, description = "Attribute created", body = crate::entities::AttributeModel),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already in use", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn create_attribute(
    State(state): State<AppState>,
    Json(payload): Json<CreateAttributeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let attribute = state
        .services
        .attributes
        .create_attribute(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(attribute))
}

#[utoipa::path(
    get,
    path = "/api/v1/attributes/{id}",
    params(("id" = Uuid, Path, description = "Attribute id")),
    responses(
        (status = 200, description = "Attribute found", body = crate::entities::AttributeModel),
        (status = 404, description = "Attribute not found", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn get_attribute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let attribute = state
        .services
        .attributes
        .get_attribute(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(attribute))
}

#[utoipa::path(
    put,
    path = "/api/v1/attributes/{id}",
    params(("id" = Uuid, Path, description = "Attribute id")),
    request_body = UpdateAttributeInput,
    responses(
        (status = 200, description = "Attribute updated", body = crate::entities::AttributeModel),
        (status = 404, description = "Attribute not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Switching to single would orphan existing selections", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn update_attribute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAttributeInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let attribute = state
        .services
        .attributes
        .update_attribute(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(attribute))
}

/// Hard delete; refused while bindings, models or content still reference it
#[utoipa::path(
    delete,
    path = "/api/v1/attributes/{id}",
    params(("id" = Uuid, Path, description = "Attribute id")),
    responses(
        (status = 204, description = "Attribute deleted"),
        (status = 404, description = "Attribute not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Attribute still referenced", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn delete_attribute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .attributes
        .delete_attribute(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

#[utoipa::path(
    post,
    path = "/api/v1/attributes/{id}/deactivate",
    params(("id" = Uuid, Path, description = "Attribute id")),
    responses(
        (status = 200, description = "Attribute deactivated", body = crate::entities::AttributeModel),
        (status = 404, description = "Attribute not found", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn deactivate_attribute(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let attribute = state
        .services
        .attributes
        .deactivate(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(attribute))
}

#[utoipa::path(
    get,
    path = "/api/v1/attributes/{id}/values",
    params(("id" = Uuid, Path, description = "Attribute id")),
    responses(
        (status = 200, description = "Values of the attribute", body = Vec<crate::entities::AttributeValueModel>),
        (status = 404, description = "Attribute not found", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn list_attribute_values(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let values = state
        .services
        .attributes
        .list_values(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(values))
}

#[utoipa::path(
    post,
    path = "/api/v1/attributes/{id}/values",
    params(("id" = Uuid, Path, description = "Attribute id")),
    request_body = CreateAttributeValueInput,
    responses(
        (status = 201, description = "Value created", body = crate::entities::AttributeValueModel),
        (status = 404, description = "Attribute not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Value already exists for this attribute", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn create_attribute_value(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateAttributeValueInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let value = state
        .services
        .attributes
        .create_value(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(value))
}

#[utoipa::path(
    put,
    path = "/api/v1/attribute-values/{id}",
    params(("id" = Uuid, Path, description = "Attribute value id")),
    request_body = UpdateAttributeValueInput,
    responses(
        (status = 200, description = "Value updated", body = crate::entities::AttributeValueModel),
        (status = 404, description = "Value not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Value already exists for this attribute", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn update_attribute_value(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAttributeValueInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let value = state
        .services
        .attributes
        .update_value(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(value))
}

#[utoipa::path(
    delete,
    path = "/api/v1/attribute-values/{id}",
    params(("id" = Uuid, Path, description = "Attribute value id")),
    responses(
        (status = 204, description = "Value deleted"),
        (status = 404, description = "Value not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Value still referenced", body = crate::errors::ErrorResponse),
    ),
    tag = "attributes"
)]
pub async fn delete_attribute_value(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .attributes
        .delete_value(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
