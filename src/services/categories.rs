use crate::{
    config::DEFAULT_MAX_CATEGORY_DEPTH,
    db,
    entities::{
        category, category_attribute, category_attribute_value, content, Category,
        CategoryAttribute, CategoryAttributeValue, CategoryModel, Content, ContentModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::required_text,
    taxonomy::{
        build_tree, fallback_slug, is_valid_slug, normalize_parent_id, slugify, CategoryTreeNode,
        ParentIndex,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Category tree store
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    max_depth: usize,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db,
            event_sender,
            max_depth: DEFAULT_MAX_CATEGORY_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Creates a category under an existing parent, or as a root
    #[instrument(skip(self))]
    pub async fn create(&self, input: CreateCategoryInput) -> Result<CategoryModel, ServiceError> {
        let name = required_text("name", &input.name)?;
        let parent_id = normalize_parent_id(input.parent_id);
        let id = Uuid::new_v4();

        let txn = db::begin(&self.db, "category.create").await?;
        let result: Result<CategoryModel, ServiceError> = async {
            if let Some(parent_id) = parent_id {
                lock_categories(&txn, vec![parent_id]).await?;
                let index = parent_index(&txn).await?;
                if !index.contains(parent_id) {
                    return Err(ServiceError::ValidationError(format!(
                        "parent category {} does not exist",
                        parent_id
                    )));
                }
                let depth = index.depth(parent_id) + 1;
                if depth > self.max_depth {
                    return Err(ServiceError::ValidationError(format!(
                        "category would sit at depth {}, deeper than the limit of {}",
                        depth, self.max_depth
                    )));
                }
            }

            let slug = resolve_slug(&txn, input.slug.as_deref(), &name, id, false).await?;
            if let Some(model_id) = input.content_model_id {
                ensure_content_model(&txn, model_id).await?;
            }

            let now = Utc::now();
            category::ActiveModel {
                id: Set(id),
                name: Set(name),
                slug: Set(slug.clone()),
                description: Set(input.description),
                parent_id: Set(parent_id),
                content_model_id: Set(input.content_model_id),
                sort: Set(input.sort),
                is_active: Set(input.is_active),
                version: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| ServiceError::on_duplicate(e, || slug_taken(&slug)))
        }
        .await;
        let category = db::finish(txn, "category.create", result).await?;

        self.event_sender
            .send_or_log(Event::CategoryCreated(category.id))
            .await;

        info!(category_id = %category.id, slug = %category.slug, "Created category");
        Ok(category)
    }

    /// Flat listing: sort ascending, newest first within a sort value
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CategoryModel>, ServiceError> {
        Category::find()
            .order_by_asc(category::Column::Sort)
            .order_by_desc(category::Column::CreatedAt)
            .all(&*self.db)
            .await
            .map_err(Into::into)
    }

    /// Nested view of every category
    #[instrument(skip(self))]
    pub async fn tree(&self) -> Result<Vec<CategoryTreeNode>, ServiceError> {
        let categories = Category::find().all(&*self.db).await?;
        Ok(build_tree(categories))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<CategoryModel, ServiceError> {
        Category::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }

    /// A category with its parent and direct children
    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<CategoryDetail, ServiceError> {
        let category = self.get(id).await?;

        let parent = match category.parent_id {
            Some(parent_id) => Category::find_by_id(parent_id).one(&*self.db).await?,
            None => None,
        };
        let children = Category::find()
            .filter(category::Column::ParentId.eq(id))
            .order_by_asc(category::Column::Sort)
            .order_by_desc(category::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok(CategoryDetail {
            category,
            parent,
            children,
        })
    }

    /// Applies a partial update; re-parenting is checked for cycles and depth
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<CategoryModel, ServiceError> {
        let new_parent = input.parent_id.map(normalize_parent_id);

        let txn = db::begin(&self.db, "category.update").await?;
        let result: Result<CategoryModel, ServiceError> = async {
            // The moved node, the new parent and the parent's ancestors are
            // locked so a concurrent move cannot close a loop behind our check.
            let mut locked = vec![id];
            if let Some(Some(parent_id)) = new_parent {
                locked.push(parent_id);
                locked.extend(parent_index(&txn).await?.ancestors(parent_id));
            }
            lock_categories(&txn, locked).await?;

            let category = Category::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Category", id))?;
            let mut active: category::ActiveModel = category.clone().into();

            let name = match input.name.as_deref() {
                Some(name) => {
                    let name = required_text("name", name)?;
                    active.name = Set(name.clone());
                    name
                }
                None => category.name.clone(),
            };

            let mut slug = category.slug.clone();
            if let Some(requested) = input.slug.as_deref() {
                slug = resolve_slug(&txn, Some(requested), &name, id, true).await?;
                active.slug = Set(slug.clone());
            }

            if let Some(parent_id) = new_parent {
                if let Some(parent_id) = parent_id {
                    self.check_move(&txn, id, parent_id).await?;
                }
                active.parent_id = Set(parent_id);
            }

            if let Some(content_model_id) = input.content_model_id {
                if let Some(model_id) = content_model_id {
                    ensure_content_model(&txn, model_id).await?;
                }
                active.content_model_id = Set(content_model_id);
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

            active
                .update(&txn)
                .await
                .map_err(|e| ServiceError::on_duplicate(e, || slug_taken(&slug)))
        }
        .await;
        let category = db::finish(txn, "category.update", result).await?;

        self.event_sender
            .send_or_log(Event::CategoryUpdated(id))
            .await;

        info!(category_id = %id, "Updated category");
        Ok(category)
    }

    /// Deletes a leaf category together with its attribute bindings
    #[instrument(skip(self))]
    pub async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let txn = db::begin(&self.db, "category.remove").await?;
        let result: Result<(), ServiceError> = async {
            lock_categories(&txn, vec![id]).await?;
            Category::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Category", id))?;

            let children = Category::find()
                .filter(category::Column::ParentId.eq(id))
                .count(&txn)
                .await?;
            if children > 0 {
                warn!(category_id = %id, children, "Refusing to delete category with children");
                return Err(ServiceError::Conflict(format!(
                    "category {} still has {} child categories",
                    id, children
                )));
            }

            let contents = Content::find()
                .filter(content::Column::CategoryId.eq(id))
                .count(&txn)
                .await?;
            if contents > 0 {
                return Err(ServiceError::Conflict(format!(
                    "category {} still holds {} content items",
                    id, contents
                )));
            }

            let binding_ids: Vec<Uuid> = CategoryAttribute::find()
                .select_only()
                .column(category_attribute::Column::Id)
                .filter(category_attribute::Column::CategoryId.eq(id))
                .into_tuple()
                .all(&txn)
                .await?;
            if !binding_ids.is_empty() {
                CategoryAttributeValue::delete_many()
                    .filter(category_attribute_value::Column::BindingId.is_in(binding_ids))
                    .exec(&txn)
                    .await?;
                CategoryAttribute::delete_many()
                    .filter(category_attribute::Column::CategoryId.eq(id))
                    .exec(&txn)
                    .await?;
            }
            Category::delete_by_id(id).exec(&txn).await?;
            Ok(())
        }
        .await;
        db::finish(txn, "category.remove", result).await?;

        self.event_sender
            .send_or_log(Event::CategoryDeleted(id))
            .await;

        info!(category_id = %id, "Deleted category");
        Ok(())
    }

    async fn check_move<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        parent_id: Uuid,
    ) -> Result<(), ServiceError> {
        let index = parent_index(conn).await?;
        if !index.contains(parent_id) {
            return Err(ServiceError::ValidationError(format!(
                "parent category {} does not exist",
                parent_id
            )));
        }
        if index.would_create_cycle(id, parent_id) {
            return Err(ServiceError::ValidationError(format!(
                "category {} cannot be moved under itself or one of its descendants",
                id
            )));
        }
        let depth = index.depth(parent_id) + index.subtree_height(id);
        if depth > self.max_depth {
            return Err(ServiceError::ValidationError(format!(
                "move would nest categories {} levels deep, limit is {}",
                depth, self.max_depth
            )));
        }
        Ok(())
    }
}

/// Row-locks categories in id order so concurrent writers queue instead of deadlocking.
async fn lock_categories<C: ConnectionTrait>(
    conn: &C,
    mut ids: Vec<Uuid>,
) -> Result<(), ServiceError> {
    ids.sort();
    ids.dedup();
    Category::find()
        .select_only()
        .column(category::Column::Id)
        .filter(category::Column::Id.is_in(ids))
        .order_by_asc(category::Column::Id)
        .lock_exclusive()
        .into_tuple::<Uuid>()
        .all(conn)
        .await?;
    Ok(())
}

async fn parent_index<C: ConnectionTrait>(conn: &C) -> Result<ParentIndex, ServiceError> {
    let links: Vec<(Uuid, Option<Uuid>)> = Category::find()
        .select_only()
        .column(category::Column::Id)
        .column(category::Column::ParentId)
        .into_tuple()
        .all(conn)
        .await?;
    Ok(ParentIndex::new(links))
}

/// Picks the slug for category `id`: the requested one, else one derived
/// from `name`, else an id-based fallback for names with no letters or digits.
async fn resolve_slug<C: ConnectionTrait>(
    conn: &C,
    requested: Option<&str>,
    name: &str,
    id: Uuid,
    existing: bool,
) -> Result<String, ServiceError> {
    let slug = match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slug.to_string(),
        None => match slugify(name) {
            derived if derived.is_empty() => fallback_slug(id),
            derived => derived,
        },
    };
    if !is_valid_slug(&slug) {
        return Err(ServiceError::ValidationError(format!(
            "'{}' is not a valid slug",
            slug
        )));
    }

    let mut query = Category::find().filter(category::Column::Slug.eq(slug.as_str()));
    if existing {
        query = query.filter(category::Column::Id.ne(id));
    }
    if query.count(conn).await? > 0 {
        return Err(ServiceError::Conflict(slug_taken(&slug)));
    }
    Ok(slug)
}

fn slug_taken(slug: &str) -> String {
    format!("slug '{}' is already in use", slug)
}

async fn ensure_content_model<C: ConnectionTrait>(
    conn: &C,
    model_id: Uuid,
) -> Result<(), ServiceError> {
    ContentModel::find_by_id(model_id)
        .one(conn)
        .await?
        .map(|_| ())
        .ok_or_else(|| {
            ServiceError::ValidationError(format!("content model {} does not exist", model_id))
        })
}

fn default_true() -> bool {
    true
}

/// Distinguishes an absent field from an explicit `null`.
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Derived from `name` when absent
    #[validate(length(max = 255))]
    pub slug: Option<String>,
    pub description: Option<String>,
    /// `null` or the nil uuid creates a root
    pub parent_id: Option<Uuid>,
    pub content_model_id: Option<Uuid>,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    pub description: Option<String>,
    /// Absent keeps the parent; `null` or the nil uuid moves the node to the root
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub parent_id: Option<Option<Uuid>>,
    /// Absent keeps the link; `null` clears it
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<Uuid>)]
    pub content_model_id: Option<Option<Uuid>>,
    pub sort: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: CategoryModel,
    pub parent: Option<CategoryModel>,
    pub children: Vec<CategoryModel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_input_distinguishes_null_from_absent() {
        let absent: UpdateCategoryInput = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(absent.parent_id, None);

        let to_root: UpdateCategoryInput = serde_json::from_str(r#"{"parent_id":null}"#).unwrap();
        assert_eq!(to_root.parent_id, Some(None));

        let id = Uuid::new_v4();
        let moved: UpdateCategoryInput =
            serde_json::from_str(&format!(r#"{{"parent_id":"{}"}}"#, id)).unwrap();
        assert_eq!(moved.parent_id, Some(Some(id)));
    }

    #[test]
    fn create_input_defaults() {
        let input: CreateCategoryInput = serde_json::from_str(r#"{"name":"Software"}"#).unwrap();
        assert!(input.is_active);
        assert_eq!(input.sort, 0);
        assert!(input.validate().is_ok());
    }
}
