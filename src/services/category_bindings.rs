use crate::{
    db,
    entities::{
        attribute, attribute_value, category, category_attribute, category_attribute_value,
        Attribute, AttributeValue, Category, CategoryAttribute, CategoryAttributeValue,
        SelectionMode,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::bump_version,
    taxonomy::{validate_binding_set, BindingInput, Dictionary},
};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Per-category attribute bindings and their allowed value subsets
#[derive(Clone)]
pub struct CategoryBindingService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CategoryBindingService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Replaces the category's whole binding set in one transaction.
    ///
    /// The category row's version is bumped before the old rows are deleted,
    /// so concurrent replaces against one category run one after the other.
    #[instrument(skip(self, input), fields(bindings = input.bindings.len()))]
    pub async fn set_bindings(
        &self,
        category_id: Uuid,
        input: SetBindingsInput,
    ) -> Result<Vec<AllowedAttribute>, ServiceError> {
        let txn = db::begin(&self.db, "category.set_bindings").await?;
        let result: Result<i32, ServiceError> = async {
            bump_version::<Category, _>(
                &txn,
                "Category",
                category::Column::Id,
                category::Column::Version,
                category::Column::UpdatedAt,
                category_id,
                input.expected_version,
            )
            .await?;

            let dictionary = load_dictionary(&txn, &input.bindings).await?;
            validate_binding_set(&dictionary, &input.bindings)?;

            replace_binding_rows(&txn, category_id, &input.bindings).await?;

            Category::find_by_id(category_id)
                .select_only()
                .column(category::Column::Version)
                .into_tuple::<i32>()
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Category", category_id))
        }
        .await;
        let version = db::finish(txn, "category.set_bindings", result).await?;

        self.event_sender
            .send_or_log(Event::CategoryBindingsReplaced {
                category_id,
                version,
                attribute_count: input.bindings.len(),
            })
            .await;

        info!(%category_id, version, "Replaced category bindings");
        self.get_allowed_attributes(category_id).await
    }

    /// The bound attributes of a category with their enabled values
    #[instrument(skip(self))]
    pub async fn get_allowed_attributes(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<AllowedAttribute>, ServiceError> {
        Category::find_by_id(category_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", category_id))?;

        allowed_attributes(&*self.db, category_id).await
    }
}

/// Delete-then-insert of a category's binding rows. Callers own the transaction.
async fn replace_binding_rows<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
    bindings: &[BindingInput],
) -> Result<(), ServiceError> {
    let old_bindings: Vec<Uuid> = CategoryAttribute::find()
        .select_only()
        .column(category_attribute::Column::Id)
        .filter(category_attribute::Column::CategoryId.eq(category_id))
        .into_tuple()
        .all(conn)
        .await?;
    if !old_bindings.is_empty() {
        CategoryAttributeValue::delete_many()
            .filter(category_attribute_value::Column::BindingId.is_in(old_bindings))
            .exec(conn)
            .await?;
        CategoryAttribute::delete_many()
            .filter(category_attribute::Column::CategoryId.eq(category_id))
            .exec(conn)
            .await?;
    }

    let mut binding_rows = Vec::with_capacity(bindings.len());
    let mut value_rows = Vec::new();
    for binding in bindings {
        let binding_id = Uuid::new_v4();
        binding_rows.push(category_attribute::ActiveModel {
            id: Set(binding_id),
            category_id: Set(category_id),
            attribute_id: Set(binding.attribute_id),
            is_required: Set(binding.required),
            sort: Set(binding.sort),
        });
        for (position, value_id) in binding.value_ids.iter().enumerate() {
            value_rows.push(category_attribute_value::ActiveModel {
                id: Set(Uuid::new_v4()),
                binding_id: Set(binding_id),
                attribute_value_id: Set(*value_id),
                is_enabled: Set(true),
                sort: Set(i32::try_from(position).unwrap_or(i32::MAX)),
            });
        }
    }
    if !binding_rows.is_empty() {
        CategoryAttribute::insert_many(binding_rows).exec(conn).await?;
    }
    if !value_rows.is_empty() {
        CategoryAttributeValue::insert_many(value_rows)
            .exec(conn)
            .await?;
    }
    Ok(())
}

/// Read path shared with the content side.
pub(crate) async fn allowed_attributes<C: ConnectionTrait>(
    conn: &C,
    category_id: Uuid,
) -> Result<Vec<AllowedAttribute>, ServiceError> {
    let bindings = CategoryAttribute::find()
        .filter(category_attribute::Column::CategoryId.eq(category_id))
        .all(conn)
        .await?;
    if bindings.is_empty() {
        return Ok(Vec::new());
    }

    let attribute_ids: Vec<Uuid> = bindings.iter().map(|b| b.attribute_id).collect();
    let attributes: HashMap<Uuid, attribute::Model> = Attribute::find()
        .filter(attribute::Column::Id.is_in(attribute_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    let binding_ids: Vec<Uuid> = bindings.iter().map(|b| b.id).collect();
    let allowed = CategoryAttributeValue::find()
        .filter(category_attribute_value::Column::BindingId.is_in(binding_ids))
        .filter(category_attribute_value::Column::IsEnabled.eq(true))
        .order_by_asc(category_attribute_value::Column::Sort)
        .all(conn)
        .await?;

    let value_ids: Vec<Uuid> = allowed.iter().map(|a| a.attribute_value_id).collect();
    let values: HashMap<Uuid, attribute_value::Model> = if value_ids.is_empty() {
        HashMap::new()
    } else {
        AttributeValue::find()
            .filter(attribute_value::Column::Id.is_in(value_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|v| (v.id, v))
            .collect()
    };

    let mut per_binding: HashMap<Uuid, Vec<AllowedValue>> = HashMap::new();
    for row in allowed {
        if let Some(value) = values.get(&row.attribute_value_id) {
            per_binding
                .entry(row.binding_id)
                .or_default()
                .push(AllowedValue {
                    attribute_value_id: value.id,
                    value: value.value.clone(),
                    sort: row.sort,
                    is_active: value.is_active,
                });
        }
    }

    let mut out: Vec<(i32, AllowedAttribute)> = bindings
        .into_iter()
        .filter_map(|binding| {
            let attribute = attributes.get(&binding.attribute_id)?;
            Some((
                attribute.sort,
                AllowedAttribute {
                    binding_id: binding.id,
                    attribute_id: attribute.id,
                    code: attribute.code.clone(),
                    name: attribute.name.clone(),
                    selection_mode: attribute.selection_mode,
                    required: binding.is_required,
                    sort: binding.sort,
                    values: per_binding.remove(&binding.id).unwrap_or_default(),
                },
            ))
        })
        .collect();
    out.sort_by(|(a_sort, a), (b_sort, b)| {
        a.sort
            .cmp(&b.sort)
            .then(a_sort.cmp(b_sort))
            .then_with(|| a.code.cmp(&b.code))
    });

    Ok(out.into_iter().map(|(_, attribute)| attribute).collect())
}

async fn load_dictionary<C: ConnectionTrait>(
    conn: &C,
    bindings: &[BindingInput],
) -> Result<Dictionary, ServiceError> {
    let attribute_ids: BTreeSet<Uuid> = bindings.iter().map(|b| b.attribute_id).collect();
    let value_ids: BTreeSet<Uuid> = bindings
        .iter()
        .flat_map(|b| b.value_ids.iter().copied())
        .collect();

    let values = if value_ids.is_empty() {
        Vec::new()
    } else {
        AttributeValue::find()
            .filter(attribute_value::Column::Id.is_in(value_ids))
            .all(conn)
            .await?
    };

    // Owners of foreign values are loaded too so errors can name them.
    let owner_ids: BTreeSet<Uuid> = attribute_ids
        .into_iter()
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

/// Full replacement binding set for one category.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct SetBindingsInput {
    pub bindings: Vec<BindingInput>,
    /// Fails with 409 when the category's version differs
    pub expected_version: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AllowedValue {
    pub attribute_value_id: Uuid,
    pub value: String,
    pub sort: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AllowedAttribute {
    pub binding_id: Uuid,
    pub attribute_id: Uuid,
    pub code: String,
    pub name: String,
    pub selection_mode: SelectionMode,
    pub required: bool,
    pub sort: i32,
    pub values: Vec<AllowedValue>,
}

impl AllowedAttribute {
    /// Back to the input shape, for round-trip comparisons.
    pub fn to_binding_input(&self) -> BindingInput {
        BindingInput {
            attribute_id: self.attribute_id,
            value_ids: self.values.iter().map(|v| v.attribute_value_id).collect(),
            required: self.required,
            sort: self.sort,
        }
    }
}
