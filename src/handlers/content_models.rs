use super::common::{
    created_response, map_service_error, no_content_response, success_response, validate_input,
};
use crate::{
    errors::ApiError,
    services::content_models::{
        CreateContentModelInput, ReplaceModelAttributesInput, UpdateContentModelInput,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use uuid::Uuid;

pub fn content_models_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_content_models).post(create_content_model))
        .route(
            "/:id",
            get(get_content_model)
                .put(update_content_model)
                .delete(delete_content_model),
        )
        .route("/:id/attribute-values", put(replace_model_attributes))
}

#[utoipa::path(
    get,
    path = "/api/v1/content-models",
    responses(
        (status = 200, description = "Content models", body = Vec<crate::entities::ContentModelRecord>),
    ),
    tag = "content-models"
)]
pub async fn list_content_models(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let models = state
        .services
        .content_models
        .list()
        .await
        .map_err(map_service_error)?;
    Ok(success_response(models))
}

#[utoipa::path(
    post,
    path = "/api/v1/content-models",
    request_body = CreateContentModelInput,
    responses(
        (status = 201, description = "Model created with its attributes", body = crate::services::content_models::ContentModelDetail),
        (status = 400, description = "Unknown attribute or foreign preset", body = crate::errors::ErrorResponse),
    ),
    tag = "content-models"
)]
pub async fn create_content_model(
    State(state): State<AppState>,
    Json(payload): Json<CreateContentModelInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let model = state
        .services
        .content_models
        .create(payload)
        .await
        .map_err(map_service_error)?;
    Ok(created_response(model))
}

/// Model with every attribute's values merged with the model's presets
#[utoipa::path(
    get,
    path = "/api/v1/content-models/{id}",
    params(("id" = Uuid, Path, description = "Content model id")),
    responses(
        (status = 200, description = "Model with merged values", body = crate::services::content_models::ContentModelDetail),
        (status = 404, description = "Model not found", body = crate::errors::ErrorResponse),
    ),
    tag = "content-models"
)]
pub async fn get_content_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .services
        .content_models
        .get_attributes_with_values(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

#[utoipa::path(
    put,
    path = "/api/v1/content-models/{id}",
    params(("id" = Uuid, Path, description = "Content model id")),
    request_body = UpdateContentModelInput,
    responses(
        (status = 200, description = "Model metadata updated", body = crate::entities::ContentModelRecord),
        (status = 404, description = "Model not found", body = crate::errors::ErrorResponse),
    ),
    tag = "content-models"
)]
pub async fn update_content_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateContentModelInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let model = state
        .services
        .content_models
        .update(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(model))
}

/// Replaces the model's attribute set and value presets as a whole
#[utoipa::path(
    put,
    path = "/api/v1/content-models/{id}/attribute-values",
    params(("id" = Uuid, Path, description = "Content model id")),
    request_body = ReplaceModelAttributesInput,
    responses(
        (status = 200, description = "Attribute set replaced", body = crate::services::content_models::ContentModelDetail),
        (status = 400, description = "Unknown attribute or foreign preset", body = crate::errors::ErrorResponse),
        (status = 404, description = "Model not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Version mismatch", body = crate::errors::ErrorResponse),
    ),
    tag = "content-models"
)]
pub async fn replace_model_attributes(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReplaceModelAttributesInput>,
) -> Result<impl IntoResponse, ApiError> {
    validate_input(&payload)?;
    let detail = state
        .services
        .content_models
        .replace_attributes(id, payload)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(detail))
}

#[utoipa::path(
    delete,
    path = "/api/v1/content-models/{id}",
    params(("id" = Uuid, Path, description = "Content model id")),
    responses(
        (status = 204, description = "Model deleted"),
        (status = 404, description = "Model not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Model still linked from a category", body = crate::errors::ErrorResponse),
    ),
    tag = "content-models"
)]
pub async fn delete_content_model(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .content_models
        .delete(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}
