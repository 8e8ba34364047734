use crate::{
    db,
    entities::{
        attribute, attribute_value, category_attribute, category_attribute_value,
        content_attribute_value, model_attribute, model_attribute_value, Attribute, AttributeModel,
        AttributeValue, AttributeValueModel, CategoryAttribute, CategoryAttributeValue,
        ContentAttributeValue, ModelAttribute, ModelAttributeValue, SelectionMode,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::required_text,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

static CODE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

/// Attribute and attribute value dictionary
#[derive(Clone)]
pub struct AttributeService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl AttributeService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates an attribute; `code` is unique and never changes afterwards
    #[instrument(skip(self))]
    pub async fn create_attribute(
        &self,
        input: CreateAttributeInput,
    ) -> Result<AttributeModel, ServiceError> {
        let name = required_text("name", &input.name)?;
        let code = input.code.trim().to_string();
        if !CODE_PATTERN.is_match(&code) {
            return Err(ServiceError::ValidationError(format!(
                "attribute code '{}' must start with a lowercase letter and contain only a-z, 0-9 and _",
                code
            )));
        }

        let taken = Attribute::find()
            .filter(attribute::Column::Code.eq(code.as_str()))
            .count(&*self.db)
            .await?;
        if taken > 0 {
            return Err(ServiceError::Conflict(duplicate_code(&code)));
        }

        let now = Utc::now();
        let attribute = attribute::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            code: Set(code.clone()),
            description: Set(input.description),
            selection_mode: Set(input.selection_mode),
            is_active: Set(input.is_active),
            sort: Set(input.sort),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let attribute = attribute
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::on_duplicate(e, || duplicate_code(&code)))?;

        self.event_sender
            .send_or_log(Event::AttributeCreated(attribute.id))
            .await;

        info!(attribute_id = %attribute.id, code = %attribute.code, "Created attribute");
        Ok(attribute)
    }

    #[instrument(skip(self))]
    pub async fn get_attribute(&self, id: Uuid) -> Result<AttributeModel, ServiceError> {
        Attribute::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Attribute", id))
    }

    /// Active attributes ordered by sort
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<AttributeModel>, ServiceError> {
        Attribute::find()
            .filter(attribute::Column::IsActive.eq(true))
            .order_by_asc(attribute::Column::Sort)
            .order_by_asc(attribute::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn update_attribute(
        &self,
        id: Uuid,
        input: UpdateAttributeInput,
    ) -> Result<AttributeModel, ServiceError> {
        let attribute = self.get_attribute(id).await?;

        if input.selection_mode == Some(SelectionMode::Single)
            && attribute.selection_mode == SelectionMode::Multi
        {
            self.ensure_no_multi_selections(id).await?;
        }

        let mut active: attribute::ActiveModel = attribute.into();
        if let Some(name) = input.name.as_deref() {
            active.name = Set(required_text("name", name)?);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(mode) = input.selection_mode {
            active.selection_mode = Set(mode);
        }
        if let Some(sort) = input.sort {
            active.sort = Set(sort);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let attribute = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::AttributeUpdated(id))
            .await;

        info!(attribute_id = %id, "Updated attribute");
        Ok(attribute)
    }

    /// Soft-disables an attribute; existing references stay intact
    #[instrument(skip(self))]
    pub async fn deactivate(&self, id: Uuid) -> Result<AttributeModel, ServiceError> {
        let attribute = self.get_attribute(id).await?;
        let mut active: attribute::ActiveModel = attribute.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let attribute = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::AttributeDeactivated(id))
            .await;

        info!(attribute_id = %id, "Deactivated attribute");
        Ok(attribute)
    }

    /// Hard delete of an unreferenced attribute and all of its values
    #[instrument(skip(self))]
    pub async fn delete_attribute(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_attribute(id).await?;

        let txn = db::begin(&self.db, "attribute.delete").await?;
        let result: Result<usize, ServiceError> = async {
            let value_ids: Vec<Uuid> = AttributeValue::find()
                .select_only()
                .column(attribute_value::Column::Id)
                .filter(attribute_value::Column::AttributeId.eq(id))
                .into_tuple()
                .all(&txn)
                .await?;

            let bindings = CategoryAttribute::find()
                .filter(category_attribute::Column::AttributeId.eq(id))
                .count(&txn)
                .await?;
            if bindings > 0 {
                return Err(ServiceError::Conflict(format!(
                    "attribute {} is bound to {} categories",
                    id, bindings
                )));
            }
            let models = ModelAttribute::find()
                .filter(model_attribute::Column::AttributeId.eq(id))
                .count(&txn)
                .await?;
            if models > 0 {
                return Err(ServiceError::Conflict(format!(
                    "attribute {} is part of {} content models",
                    id, models
                )));
            }
            if let Some(usage) = value_usage(&txn, &value_ids).await? {
                return Err(ServiceError::Conflict(format!(
                    "attribute {} has values still referenced by {}",
                    id, usage
                )));
            }

            AttributeValue::delete_many()
                .filter(attribute_value::Column::AttributeId.eq(id))
                .exec(&txn)
                .await?;
            Attribute::delete_by_id(id).exec(&txn).await?;
            Ok(value_ids.len())
        }
        .await;
        let values = db::finish(txn, "attribute.delete", result).await?;

        self.event_sender
            .send_or_log(Event::AttributeDeleted(id))
            .await;

        info!(attribute_id = %id, values, "Deleted attribute");
        Ok(())
    }

    /// Appends a value under an attribute
    #[instrument(skip(self))]
    pub async fn create_value(
        &self,
        attribute_id: Uuid,
        input: CreateAttributeValueInput,
    ) -> Result<AttributeValueModel, ServiceError> {
        self.get_attribute(attribute_id).await?;
        let text = required_text("value", &input.value)?;
        self.ensure_unique_value(attribute_id, &text, None).await?;

        let sort = match input.sort {
            Some(sort) => sort,
            None => AttributeValue::find()
                .filter(attribute_value::Column::AttributeId.eq(attribute_id))
                .order_by_desc(attribute_value::Column::Sort)
                .one(&*self.db)
                .await?
                .map_or(0, |last| last.sort.saturating_add(1)),
        };

        let now = Utc::now();
        let value = attribute_value::ActiveModel {
            id: Set(Uuid::new_v4()),
            attribute_id: Set(attribute_id),
            value: Set(text.clone()),
            sort: Set(sort),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let value = value
            .insert(&*self.db)
            .await
            .map_err(|e| ServiceError::on_duplicate(e, || duplicate_value(attribute_id, &text)))?;

        self.event_sender
            .send_or_log(Event::AttributeValueCreated {
                attribute_id,
                value_id: value.id,
            })
            .await;

        info!(%attribute_id, value_id = %value.id, "Created attribute value");
        Ok(value)
    }

    #[instrument(skip(self))]
    pub async fn get_value(&self, id: Uuid) -> Result<AttributeValueModel, ServiceError> {
        AttributeValue::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Attribute value", id))
    }

    /// All values of an attribute ordered by sort
    #[instrument(skip(self))]
    pub async fn list_values(
        &self,
        attribute_id: Uuid,
    ) -> Result<Vec<AttributeValueModel>, ServiceError> {
        self.get_attribute(attribute_id).await?;
        AttributeValue::find()
            .filter(attribute_value::Column::AttributeId.eq(attribute_id))
            .order_by_asc(attribute_value::Column::Sort)
            .order_by_asc(attribute_value::Column::Value)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn update_value(
        &self,
        id: Uuid,
        input: UpdateAttributeValueInput,
    ) -> Result<AttributeValueModel, ServiceError> {
        let value = self.get_value(id).await?;
        let attribute_id = value.attribute_id;
        let mut active: attribute_value::ActiveModel = value.into();

        let text = match input.value.as_deref() {
            Some(text) => {
                let text = required_text("value", text)?;
                self.ensure_unique_value(attribute_id, &text, Some(id)).await?;
                active.value = Set(text.clone());
                Some(text)
            }
            None => None,
        };
        if let Some(sort) = input.sort {
            active.sort = Set(sort);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let value = active.update(&*self.db).await.map_err(|e| {
            ServiceError::on_duplicate(e, || {
                duplicate_value(attribute_id, text.as_deref().unwrap_or_default())
            })
        })?;

        self.event_sender
            .send_or_log(Event::AttributeValueUpdated(id))
            .await;

        Ok(value)
    }

    #[instrument(skip(self))]
    pub async fn deactivate_value(&self, id: Uuid) -> Result<AttributeValueModel, ServiceError> {
        self.update_value(
            id,
            UpdateAttributeValueInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    /// Hard delete; rejected while any binding, model or content refers to the value
    #[instrument(skip(self))]
    pub async fn delete_value(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get_value(id).await?;

        let txn = db::begin(&self.db, "attribute_value.delete").await?;
        let result: Result<(), ServiceError> = async {
            if let Some(usage) = value_usage(&txn, &[id]).await? {
                warn!(value_id = %id, usage, "Refusing to delete referenced attribute value");
                return Err(ServiceError::Conflict(format!(
                    "attribute value {} is still referenced by {}",
                    id, usage
                )));
            }
            AttributeValue::delete_by_id(id).exec(&txn).await?;
            Ok(())
        }
        .await;
        db::finish(txn, "attribute_value.delete", result).await?;

        self.event_sender
            .send_or_log(Event::AttributeValueDeleted(id))
            .await;

        info!(value_id = %id, "Deleted attribute value");
        Ok(())
    }

    async fn ensure_unique_value(
        &self,
        attribute_id: Uuid,
        text: &str,
        current: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = AttributeValue::find()
            .filter(attribute_value::Column::AttributeId.eq(attribute_id))
            .filter(attribute_value::Column::Value.eq(text));
        if let Some(current) = current {
            query = query.filter(attribute_value::Column::Id.ne(current));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(ServiceError::Conflict(duplicate_value(attribute_id, text)));
        }
        Ok(())
    }

    /// A MULTI attribute may only become SINGLE once no content holds two of its values.
    async fn ensure_no_multi_selections(&self, attribute_id: Uuid) -> Result<(), ServiceError> {
        let value_ids: Vec<Uuid> = AttributeValue::find()
            .select_only()
            .column(attribute_value::Column::Id)
            .filter(attribute_value::Column::AttributeId.eq(attribute_id))
            .into_tuple()
            .all(&*self.db)
            .await?;
        if value_ids.is_empty() {
            return Ok(());
        }

        let holders: Vec<Uuid> = ContentAttributeValue::find()
            .select_only()
            .column(content_attribute_value::Column::ContentId)
            .filter(content_attribute_value::Column::AttributeValueId.is_in(value_ids))
            .into_tuple()
            .all(&*self.db)
            .await?;

        let mut per_content: HashMap<Uuid, usize> = HashMap::new();
        for content_id in holders {
            *per_content.entry(content_id).or_default() += 1;
        }
        let offenders = per_content.values().filter(|&&n| n > 1).count();
        if offenders > 0 {
            return Err(ServiceError::Conflict(format!(
                "{} content items hold several values of attribute {}; it cannot become single-select",
                offenders, attribute_id
            )));
        }
        Ok(())
    }
}

fn duplicate_code(code: &str) -> String {
    format!("attribute code '{}' is already in use", code)
}

fn duplicate_value(attribute_id: Uuid, text: &str) -> String {
    format!("value '{}' already exists for attribute {}", text, attribute_id)
}

/// Names the first kind of row that still references one of `value_ids`.
async fn value_usage<C: ConnectionTrait>(
    conn: &C,
    value_ids: &[Uuid],
) -> Result<Option<&'static str>, ServiceError> {
    if value_ids.is_empty() {
        return Ok(None);
    }

    let allowed = CategoryAttributeValue::find()
        .filter(category_attribute_value::Column::AttributeValueId.is_in(value_ids.to_vec()))
        .count(conn)
        .await?;
    if allowed > 0 {
        return Ok(Some("category bindings"));
    }

    let presets = ModelAttributeValue::find()
        .filter(model_attribute_value::Column::AttributeValueId.is_in(value_ids.to_vec()))
        .count(conn)
        .await?;
    if presets > 0 {
        return Ok(Some("content model presets"));
    }

    let assignments = ContentAttributeValue::find()
        .filter(content_attribute_value::Column::AttributeValueId.is_in(value_ids.to_vec()))
        .count(conn)
        .await?;
    if assignments > 0 {
        return Ok(Some("content assignments"));
    }

    Ok(None)
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAttributeInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub description: Option<String>,
    pub selection_mode: SelectionMode,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// `code` is deliberately absent: it cannot change after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateAttributeInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub selection_mode: Option<SelectionMode>,
    pub sort: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateAttributeValueInput {
    #[validate(length(min = 1, max = 255))]
    pub value: String,
    /// Appended after the current last value when absent
    pub sort: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateAttributeValueInput {
    #[validate(length(min = 1, max = 255))]
    pub value: Option<String>,
    pub sort: Option<i32>,
    pub is_active: Option<bool>,
}
