use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{attributes, categories, content_models, contents};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Taxonomy API",
        version = "1.0.0",
        description = r#"
# Taxonomy API

Administrative API for a content taxonomy: a category tree, a dictionary of
attributes and their values, per-category attribute bindings, reusable
content models and the attribute selections of individual content items.

## Replace semantics

Binding sets, model attribute sets and content selections are replaced as a
whole. Each replace accepts an optional `expected_version`; a mismatch fails
with `409 Conflict` and nothing is written.

## Error Handling

Errors share one body shape:

```json
{
  "error": "Bad Request",
  "message": "Validation error: attribute 'size' allows a single value",
  "request_id": "4f1c...",
  "timestamp": "2025-03-01T00:00:00Z"
}
```

## Pagination

`GET /contents` accepts `page` (default 1) and `per_page` (default 20,
capped by server configuration).
"#,
        contact(name = "Taxonomy API maintainers"),
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server")
    ),
    tags(
        (name = "categories", description = "Category tree and attribute bindings"),
        (name = "attributes", description = "Attribute dictionary"),
        (name = "content-models", description = "Reusable attribute sets with value presets"),
        (name = "contents", description = "Content items and their attribute selections"),
        (name = "health", description = "Service health")
    ),
    paths(
        categories::list_categories,
        categories::get_category_tree,
        categories::create_category,
        categories::get_category,
        categories::update_category,
        categories::delete_category,
        categories::get_category_attributes,
        categories::set_category_attributes,
        attributes::list_attributes,
        attributes::create_attribute,
        attributes::get_attribute,
        attributes::update_attribute,
        attributes::delete_attribute,
        attributes::deactivate_attribute,
        attributes::list_attribute_values,
        attributes::create_attribute_value,
        attributes::update_attribute_value,
        attributes::delete_attribute_value,
        content_models::list_content_models,
        content_models::create_content_model,
        content_models::get_content_model,
        content_models::update_content_model,
        content_models::replace_model_attributes,
        content_models::delete_content_model,
        contents::list_contents,
        contents::create_content,
        contents::get_content,
        contents::update_content,
        contents::get_content_attributes,
        contents::assign_content_attributes,
        crate::health_check,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::entities::SelectionMode,
            crate::entities::CategoryModel,
            crate::entities::AttributeModel,
            crate::entities::AttributeValueModel,
            crate::entities::ContentModelRecord,
            crate::entities::ContentRecord,
            crate::taxonomy::CategoryTreeNode,
            crate::taxonomy::BindingInput,
            crate::taxonomy::ValuePresetInput,
            crate::taxonomy::MergedValue,
            crate::services::categories::CreateCategoryInput,
            crate::services::categories::UpdateCategoryInput,
            crate::services::categories::CategoryDetail,
            crate::services::category_bindings::SetBindingsInput,
            crate::services::category_bindings::AllowedAttribute,
            crate::services::category_bindings::AllowedValue,
            crate::services::attributes::CreateAttributeInput,
            crate::services::attributes::UpdateAttributeInput,
            crate::services::attributes::CreateAttributeValueInput,
            crate::services::attributes::UpdateAttributeValueInput,
            crate::services::content_models::CreateContentModelInput,
            crate::services::content_models::UpdateContentModelInput,
            crate::services::content_models::ReplaceModelAttributesInput,
            crate::services::content_models::ContentModelDetail,
            crate::services::content_models::ModelAttributeView,
            crate::services::contents::CreateContentInput,
            crate::services::contents::UpdateContentInput,
            crate::services::content_assignments::AssignAttributesInput,
            crate::services::content_assignments::ContentAttributeView,
            crate::services::content_assignments::SelectedValue,
            crate::HealthStatus,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
