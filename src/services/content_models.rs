use crate::{
    db,
    entities::{
        attribute, attribute_value, category, content_model, model_attribute,
        model_attribute_value, Attribute, AttributeValue, Category, ContentModel,
        ContentModelRecord, ModelAttribute, ModelAttributeValue, SelectionMode,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{bump_version, required_text},
    taxonomy::{merge_model_values, validate_model_set, Dictionary, MergedValue, ValuePresetInput},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Reusable attribute/value templates
#[derive(Clone)]
pub struct ContentModelService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ContentModelService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a model with its attribute set and presets, all or nothing
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        input: CreateContentModelInput,
    ) -> Result<ContentModelDetail, ServiceError> {
        let name = required_text("name", &input.name)?;

        let txn = db::begin(&self.db, "content_model.create").await?;
        let result: Result<ContentModelRecord, ServiceError> = async {
            let dictionary = load_dictionary(&txn, &input.attribute_ids, &input.presets).await?;
            validate_model_set(&dictionary, &input.attribute_ids, &input.presets)?;

            let now = Utc::now();
            let model = content_model::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(name),
                description: Set(input.description.clone()),
                sort: Set(input.sort),
                is_active: Set(input.is_active),
                version: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
            insert_members(&txn, model.id, &input.attribute_ids, &input.presets).await?;
            Ok(model)
        }
        .await;
        let model = db::finish(txn, "content_model.create", result).await?;

        self.event_sender
            .send_or_log(Event::ContentModelCreated(model.id))
            .await;

        info!(model_id = %model.id, attributes = input.attribute_ids.len(), "Created content model");
        self.get_attributes_with_values(model.id).await
    }

    /// Updates name, description, sort and active flag
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateContentModelInput,
    ) -> Result<ContentModelRecord, ServiceError> {
        let model = self.get(id).await?;
        let mut active: content_model::ActiveModel = model.into();

        if let Some(name) = input.name.as_deref() {
            active.name = Set(required_text("name", name)?);
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(sort) = input.sort {
            active.sort = Set(sort);
        }
        if let Some(is_active) = input.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let model = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::ContentModelUpdated {
                model_id: id,
                version: model.version,
            })
            .await;

        Ok(model)
    }

    /// Replaces the attribute set and presets in one transaction
    #[instrument(skip(self))]
    pub async fn replace_attributes(
        &self,
        id: Uuid,
        input: ReplaceModelAttributesInput,
    ) -> Result<ContentModelDetail, ServiceError> {
        let txn = db::begin(&self.db, "content_model.replace_attributes").await?;
        let result: Result<i32, ServiceError> = async {
            bump_version::<ContentModel, _>(
                &txn,
                "Content model",
                content_model::Column::Id,
                content_model::Column::Version,
                content_model::Column::UpdatedAt,
                id,
                input.expected_version,
            )
            .await?;

            let dictionary = load_dictionary(&txn, &input.attribute_ids, &input.presets).await?;
            validate_model_set(&dictionary, &input.attribute_ids, &input.presets)?;

            ModelAttributeValue::delete_many()
                .filter(model_attribute_value::Column::ModelId.eq(id))
                .exec(&txn)
                .await?;
            ModelAttribute::delete_many()
                .filter(model_attribute::Column::ModelId.eq(id))
                .exec(&txn)
                .await?;
            insert_members(&txn, id, &input.attribute_ids, &input.presets).await?;

            ContentModel::find_by_id(id)
                .one(&txn)
                .await?
                .map(|m| m.version)
                .ok_or_else(|| ServiceError::not_found("Content model", id))
        }
        .await;
        let version = db::finish(txn, "content_model.replace_attributes", result).await?;

        self.event_sender
            .send_or_log(Event::ContentModelUpdated {
                model_id: id,
                version,
            })
            .await;

        info!(model_id = %id, version, "Replaced content model attributes");
        self.get_attributes_with_values(id).await
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<ContentModelRecord>, ServiceError> {
        ContentModel::find()
            .order_by_asc(content_model::Column::Sort)
            .order_by_asc(content_model::Column::Name)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ContentModelRecord, ServiceError> {
        ContentModel::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Content model", id))
    }

    /// The model with every dictionary value of its attributes and the
    /// effective enabled/sort preset of each
    #[instrument(skip(self))]
    pub async fn get_attributes_with_values(
        &self,
        id: Uuid,
    ) -> Result<ContentModelDetail, ServiceError> {
        let model = self.get(id).await?;

        let attribute_ids: Vec<Uuid> = ModelAttribute::find()
            .filter(model_attribute::Column::ModelId.eq(id))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|m| m.attribute_id)
            .collect();
        if attribute_ids.is_empty() {
            return Ok(ContentModelDetail {
                model,
                attributes: Vec::new(),
            });
        }

        let attributes = Attribute::find()
            .filter(attribute::Column::Id.is_in(attribute_ids.clone()))
            .order_by_asc(attribute::Column::Sort)
            .order_by_asc(attribute::Column::Code)
            .all(&*self.db)
            .await?;

        let mut values_by_attribute: HashMap<Uuid, Vec<attribute_value::Model>> = HashMap::new();
        for value in AttributeValue::find()
            .filter(attribute_value::Column::AttributeId.is_in(attribute_ids))
            .all(&*self.db)
            .await?
        {
            values_by_attribute
                .entry(value.attribute_id)
                .or_default()
                .push(value);
        }

        let presets = ModelAttributeValue::find()
            .filter(model_attribute_value::Column::ModelId.eq(id))
            .all(&*self.db)
            .await?;

        let attributes = attributes
            .into_iter()
            .map(|attribute| {
                let values = values_by_attribute.remove(&attribute.id).unwrap_or_default();
                ModelAttributeView {
                    attribute_id: attribute.id,
                    code: attribute.code,
                    name: attribute.name,
                    selection_mode: attribute.selection_mode,
                    sort: attribute.sort,
                    values: merge_model_values(&values, &presets),
                }
            })
            .collect();

        Ok(ContentModelDetail { model, attributes })
    }

    /// Deletes a model no category links to
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        self.get(id).await?;

        let txn = db::begin(&self.db, "content_model.delete").await?;
        let result: Result<(), ServiceError> = async {
            let linked = Category::find()
                .filter(category::Column::ContentModelId.eq(id))
                .count(&txn)
                .await?;
            if linked > 0 {
                return Err(ServiceError::Conflict(format!(
                    "content model {} is linked by {} categories",
                    id, linked
                )));
            }

            ModelAttributeValue::delete_many()
                .filter(model_attribute_value::Column::ModelId.eq(id))
                .exec(&txn)
                .await?;
            ModelAttribute::delete_many()
                .filter(model_attribute::Column::ModelId.eq(id))
                .exec(&txn)
                .await?;
            ContentModel::delete_by_id(id).exec(&txn).await?;
            Ok(())
        }
        .await;
        db::finish(txn, "content_model.delete", result).await?;

        self.event_sender
            .send_or_log(Event::ContentModelDeleted(id))
            .await;

        info!(model_id = %id, "Deleted content model");
        Ok(())
    }
}

async fn insert_members(
    txn: &DatabaseTransaction,
    model_id: Uuid,
    attribute_ids: &[Uuid],
    presets: &[ValuePresetInput],
) -> Result<(), ServiceError> {
    if !attribute_ids.is_empty() {
        ModelAttribute::insert_many(attribute_ids.iter().map(|attribute_id| {
            model_attribute::ActiveModel {
                id: Set(Uuid::new_v4()),
                model_id: Set(model_id),
                attribute_id: Set(*attribute_id),
            }
        }))
        .exec(txn)
        .await?;
    }
    if !presets.is_empty() {
        ModelAttributeValue::insert_many(presets.iter().map(|preset| {
            model_attribute_value::ActiveModel {
                id: Set(Uuid::new_v4()),
                model_id: Set(model_id),
                attribute_value_id: Set(preset.attribute_value_id),
                is_enabled: Set(preset.is_enabled),
                sort: Set(preset.sort),
            }
        }))
        .exec(txn)
        .await?;
    }
    Ok(())
}

async fn load_dictionary<C: ConnectionTrait>(
    conn: &C,
    attribute_ids: &[Uuid],
    presets: &[ValuePresetInput],
) -> Result<Dictionary, ServiceError> {
    let value_ids: BTreeSet<Uuid> = presets.iter().map(|p| p.attribute_value_id).collect();
    let values = if value_ids.is_empty() {
        Vec::new()
    } else {
        AttributeValue::find()
            .filter(attribute_value::Column::Id.is_in(value_ids))
            .all(conn)
            .await?
    };

    let owner_ids: BTreeSet<Uuid> = attribute_ids
        .iter()
        .copied()
        .chain(values.iter().map(|v| v.attribute_id))
        .collect();
    let attributes = if owner_ids.is_empty() {
        Vec::new()
    } else {
        Attribute::find()
            .filter(attribute::Column::Id.is_in(owner_ids))
            .all(conn)
            .await?
    };

    Ok(Dictionary::new(attributes, values))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateContentModelInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub attribute_ids: Vec<Uuid>,
    #[serde(default)]
    pub presets: Vec<ValuePresetInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateContentModelInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub sort: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReplaceModelAttributesInput {
    #[serde(default)]
    pub attribute_ids: Vec<Uuid>,
    #[serde(default)]
    pub presets: Vec<ValuePresetInput>,
    /// Fails with 409 when the model's version differs
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ModelAttributeView {
    pub attribute_id: Uuid,
    pub code: String,
    pub name: String,
    pub selection_mode: SelectionMode,
    pub sort: i32,
    pub values: Vec<MergedValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentModelDetail {
    #[serde(flatten)]
    pub model: ContentModelRecord,
    pub attributes: Vec<ModelAttributeView>,
}
