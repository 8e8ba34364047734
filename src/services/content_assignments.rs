use crate::{
    db,
    entities::{
        attribute, attribute_value, category_attribute, category_attribute_value, content,
        content_attribute_value, model_attribute, model_attribute_value, Attribute,
        AttributeValue, Category, CategoryAttribute, CategoryAttributeValue, CategoryModel,
        Content, ContentAttributeValue, ContentModel, ContentRecord, ModelAttribute,
        ModelAttributeValue, SelectionMode,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::bump_version,
    taxonomy::{
        check_governance, group_selection, AllowedBinding, Dictionary, Governance, ModelGate,
        Selection,
    },
};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Concrete attribute selections of content items
#[derive(Clone)]
pub struct ContentAssignmentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ContentAssignmentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Validates and atomically replaces every attribute value of a content item
    #[instrument(skip(self))]
    pub async fn assign(
        &self,
        content_id: Uuid,
        input: AssignAttributesInput,
    ) -> Result<Vec<ContentAttributeView>, ServiceError> {
        let txn = db::begin(&self.db, "content.assign").await?;
        let result: Result<usize, ServiceError> = async {
            bump_version::<Content, _>(
                &txn,
                "Content",
                content::Column::Id,
                content::Column::Version,
                content::Column::UpdatedAt,
                content_id,
                input.expected_version,
            )
            .await?;

            let content = Content::find_by_id(content_id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Content", content_id))?;
            let category = lock_category(&txn, content.category_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Category", content.category_id))?;

            let selection =
                validate_selection(&txn, &category, &input.attribute_value_ids).await?;
            replace_relations(&txn, content_id, &selection).await
        }
        .await;
        let value_count = db::finish(txn, "content.assign", result).await?;

        self.event_sender
            .send_or_log(Event::ContentAttributesAssigned {
                content_id,
                value_count,
                timestamp: Utc::now(),
            })
            .await;

        info!(%content_id, value_count, "Assigned content attributes");
        self.by_content(content_id).await
    }

    /// Attribute → selected values of one content item
    #[instrument(skip(self))]
    pub async fn by_content(
        &self,
        content_id: Uuid,
    ) -> Result<Vec<ContentAttributeView>, ServiceError> {
        Content::find_by_id(content_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Content", content_id))?;

        let value_ids: Vec<Uuid> = ContentAttributeValue::find()
            .select_only()
            .column(content_attribute_value::Column::AttributeValueId)
            .filter(content_attribute_value::Column::ContentId.eq(content_id))
            .into_tuple()
            .all(&*self.db)
            .await?;
        if value_ids.is_empty() {
            return Ok(Vec::new());
        }

        let values = AttributeValue::find()
            .filter(attribute_value::Column::Id.is_in(value_ids))
            .order_by_asc(attribute_value::Column::Sort)
            .order_by_asc(attribute_value::Column::Value)
            .all(&*self.db)
            .await?;
        let attribute_ids: BTreeSet<Uuid> = values.iter().map(|v| v.attribute_id).collect();
        let attributes = Attribute::find()
            .filter(attribute::Column::Id.is_in(attribute_ids))
            .order_by_asc(attribute::Column::Sort)
            .order_by_asc(attribute::Column::Code)
            .all(&*self.db)
            .await?;

        let mut grouped: HashMap<Uuid, Vec<SelectedValue>> = HashMap::new();
        for value in values {
            grouped
                .entry(value.attribute_id)
                .or_default()
                .push(SelectedValue {
                    attribute_value_id: value.id,
                    value: value.value,
                });
        }

        Ok(attributes
            .into_iter()
            .map(|attribute| ContentAttributeView {
                values: grouped.remove(&attribute.id).unwrap_or_default(),
                attribute_id: attribute.id,
                code: attribute.code,
                name: attribute.name,
                selection_mode: attribute.selection_mode,
            })
            .collect())
    }

    /// Active content items holding one attribute value
    #[instrument(skip(self))]
    pub async fn by_attribute_value(
        &self,
        value_id: Uuid,
    ) -> Result<Vec<ContentRecord>, ServiceError> {
        AttributeValue::find_by_id(value_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Attribute value", value_id))?;

        let content_ids = holders_of(&*self.db, &[value_id]).await?;
        active_contents(&*self.db, content_ids).await
    }

    /// Faceted listing: a content item matches when, for every attribute
    /// named by `value_ids`, it holds at least one of that attribute's values
    #[instrument(skip(self))]
    pub async fn facet(&self, value_ids: &[Uuid]) -> Result<Vec<ContentRecord>, ServiceError> {
        let unique: BTreeSet<Uuid> = value_ids.iter().copied().collect();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let values = AttributeValue::find()
            .filter(attribute_value::Column::Id.is_in(unique.iter().copied()))
            .all(&*self.db)
            .await?;
        if let Some(missing) = unique.iter().find(|id| !values.iter().any(|v| v.id == **id)) {
            return Err(ServiceError::ValidationError(format!(
                "attribute value {} does not exist",
                missing
            )));
        }

        let mut groups: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for value in &values {
            groups.entry(value.attribute_id).or_default().push(value.id);
        }

        let mut matching: Option<HashSet<Uuid>> = None;
        for group in groups.values() {
            let holders: HashSet<Uuid> = holders_of(&*self.db, group).await?.into_iter().collect();
            matching = Some(match matching {
                Some(current) => current.intersection(&holders).copied().collect(),
                None => holders,
            });
            if matching.as_ref().is_some_and(HashSet::is_empty) {
                break;
            }
        }

        let ids = matching.unwrap_or_default().into_iter().collect();
        debug!(groups = groups.len(), "Resolved facet filter");
        active_contents(&*self.db, ids).await
    }
}

/// Reads a category under a shared row lock, so its bindings and content
/// model link cannot be replaced until the surrounding transaction ends.
pub(crate) async fn lock_category<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<Option<CategoryModel>, ServiceError> {
    Category::find_by_id(id)
        .lock_shared()
        .one(conn)
        .await
        .map_err(Into::into)
}

/// Runs the full rule set for `value_ids` against `category` without writing.
/// Inside a transaction, `category` should come from [`lock_category`].
pub(crate) async fn validate_selection<C: ConnectionTrait>(
    conn: &C,
    category: &CategoryModel,
    value_ids: &[Uuid],
) -> Result<Selection, ServiceError> {
    let governance = load_governance(conn, category).await?;

    let requested: BTreeSet<Uuid> = value_ids.iter().copied().collect();
    let values = if requested.is_empty() {
        Vec::new()
    } else {
        AttributeValue::find()
            .filter(attribute_value::Column::Id.is_in(requested))
            .all(conn)
            .await?
    };
    let attribute_ids: BTreeSet<Uuid> = values
        .iter()
        .map(|v| v.attribute_id)
        .chain(governance.bindings.iter().map(|b| b.attribute_id))
        .collect();
    let attributes = if attribute_ids.is_empty() {
        Vec::new()
    } else {
        Attribute::find()
            .filter(attribute::Column::Id.is_in(attribute_ids))
            .all(conn)
            .await?
    };

    let dictionary = Dictionary::new(attributes, values);
    let selection = group_selection(&dictionary, value_ids)?;
    check_governance(&dictionary, &governance, &selection)?;
    Ok(selection)
}

async fn load_governance<C: ConnectionTrait>(
    conn: &C,
    category: &CategoryModel,
) -> Result<Governance, ServiceError> {
    let bindings = CategoryAttribute::find()
        .filter(category_attribute::Column::CategoryId.eq(category.id))
        .all(conn)
        .await?;

    let mut enabled: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    if !bindings.is_empty() {
        let rows = CategoryAttributeValue::find()
            .filter(
                category_attribute_value::Column::BindingId
                    .is_in(bindings.iter().map(|b| b.id).collect::<Vec<_>>()),
            )
            .filter(category_attribute_value::Column::IsEnabled.eq(true))
            .all(conn)
            .await?;
        for row in rows {
            enabled
                .entry(row.binding_id)
                .or_default()
                .insert(row.attribute_value_id);
        }
    }

    let bindings = bindings
        .into_iter()
        .map(|binding| AllowedBinding {
            attribute_id: binding.attribute_id,
            is_required: binding.is_required,
            enabled_values: enabled.remove(&binding.id).unwrap_or_default(),
        })
        .collect();

    let model = match category.content_model_id {
        Some(model_id) => {
            ContentModel::find_by_id(model_id)
                .lock_shared()
                .one(conn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Content model", model_id))?;
            let attribute_ids = ModelAttribute::find()
                .filter(model_attribute::Column::ModelId.eq(model_id))
                .all(conn)
                .await?
                .into_iter()
                .map(|m| m.attribute_id)
                .collect();
            let disabled_values = ModelAttributeValue::find()
                .filter(model_attribute_value::Column::ModelId.eq(model_id))
                .filter(model_attribute_value::Column::IsEnabled.eq(false))
                .all(conn)
                .await?
                .into_iter()
                .map(|p| p.attribute_value_id)
                .collect();
            Some(ModelGate {
                attribute_ids,
                disabled_values,
            })
        }
        None => None,
    };

    Ok(Governance { bindings, model })
}

/// Delete-then-insert of a content item's relation rows. Callers own the transaction.
pub(crate) async fn replace_relations<C: ConnectionTrait>(
    conn: &C,
    content_id: Uuid,
    selection: &Selection,
) -> Result<usize, ServiceError> {
    ContentAttributeValue::delete_many()
        .filter(content_attribute_value::Column::ContentId.eq(content_id))
        .exec(conn)
        .await?;

    let rows: Vec<content_attribute_value::ActiveModel> = selection
        .values()
        .flatten()
        .map(|value_id| content_attribute_value::ActiveModel {
            id: Set(Uuid::new_v4()),
            content_id: Set(content_id),
            attribute_value_id: Set(*value_id),
        })
        .collect();
    let count = rows.len();
    if count > 0 {
        ContentAttributeValue::insert_many(rows).exec(conn).await?;
    }
    Ok(count)
}

/// Currently assigned value ids of a content item.
pub(crate) async fn current_value_ids<C: ConnectionTrait>(
    conn: &C,
    content_id: Uuid,
) -> Result<Vec<Uuid>, ServiceError> {
    ContentAttributeValue::find()
        .select_only()
        .column(content_attribute_value::Column::AttributeValueId)
        .filter(content_attribute_value::Column::ContentId.eq(content_id))
        .into_tuple()
        .all(conn)
        .await
        .map_err(Into::into)
}

async fn holders_of<C: ConnectionTrait>(
    conn: &C,
    value_ids: &[Uuid],
) -> Result<Vec<Uuid>, ServiceError> {
    ContentAttributeValue::find()
        .select_only()
        .column(content_attribute_value::Column::ContentId)
        .filter(content_attribute_value::Column::AttributeValueId.is_in(value_ids.to_vec()))
        .distinct()
        .into_tuple()
        .all(conn)
        .await
        .map_err(Into::into)
}

async fn active_contents<C: ConnectionTrait>(
    conn: &C,
    ids: Vec<Uuid>,
) -> Result<Vec<ContentRecord>, ServiceError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Content::find()
        .filter(content::Column::Id.is_in(ids))
        .filter(content::Column::IsActive.eq(true))
        .order_by_asc(content::Column::Sort)
        .order_by_desc(content::Column::CreatedAt)
        .all(conn)
        .await
        .map_err(Into::into)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssignAttributesInput {
    pub attribute_value_ids: Vec<Uuid>,
    /// Fails with 409 when the content's version differs
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectedValue {
    pub attribute_value_id: Uuid,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ContentAttributeView {
    pub attribute_id: Uuid,
    pub code: String,
    pub name: String,
    pub selection_mode: SelectionMode,
    pub values: Vec<SelectedValue>,
}
