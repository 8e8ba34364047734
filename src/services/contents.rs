use crate::{
    db,
    entities::{content, Content, ContentRecord},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        bump_version,
        content_assignments::{
            current_value_ids, lock_category, replace_relations, validate_selection,
        },
        required_text,
    },
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Content items filed under categories
#[derive(Clone)]
pub struct ContentService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl ContentService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a content item, optionally with its attribute selection
    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create(&self, input: CreateContentInput) -> Result<ContentRecord, ServiceError> {
        let title = required_text("title", &input.title)?;

        let txn = db::begin(&self.db, "content.create").await?;
        let result: Result<(ContentRecord, Option<usize>), ServiceError> = async {
            let category = lock_category(&txn, input.category_id)
                .await?
                .ok_or_else(|| missing_category(input.category_id))?;
            let selection = match &input.attribute_value_ids {
                Some(value_ids) => Some(validate_selection(&txn, &category, value_ids).await?),
                None => None,
            };

            let now = Utc::now();
            let record = content::ActiveModel {
                id: Set(Uuid::new_v4()),
                title: Set(title),
                body: Set(input.body),
                category_id: Set(category.id),
                is_active: Set(input.is_active),
                sort: Set(input.sort),
                view_count: Set(0),
                comment_count: Set(0),
                version: Set(0),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;

            let assigned = match &selection {
                Some(selection) => Some(replace_relations(&txn, record.id, selection).await?),
                None => None,
            };
            Ok((record, assigned))
        }
        .await;
        let (record, assigned) = db::finish(txn, "content.create", result).await?;

        self.event_sender
            .send_or_log(Event::ContentCreated(record.id))
            .await;
        if let Some(value_count) = assigned {
            self.event_sender
                .send_or_log(Event::ContentAttributesAssigned {
                    content_id: record.id,
                    value_count,
                    timestamp: record.created_at,
                })
                .await;
        }

        info!(content_id = %record.id, category_id = %record.category_id, "Created content");
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<ContentRecord, ServiceError> {
        Content::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Content", id))
    }

    /// Page of content items, optionally restricted to one category
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        category_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ContentRecord>, u64), ServiceError> {
        let mut query = Content::find()
            .order_by_asc(content::Column::Sort)
            .order_by_desc(content::Column::CreatedAt);
        if let Some(category_id) = category_id {
            query = query.filter(content::Column::CategoryId.eq(category_id));
        }

        let paginator = query.paginate(&*self.db, per_page.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((items, total))
    }

    /// Updates a content item. Moving it to another category re-validates its
    /// selection against the new category; a supplied selection replaces the
    /// old one in the same transaction.
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateContentInput,
    ) -> Result<ContentRecord, ServiceError> {
        let title = input
            .title
            .as_deref()
            .map(|t| required_text("title", t))
            .transpose()?;

        let txn = db::begin(&self.db, "content.update").await?;
        let result: Result<(ContentRecord, Option<usize>), ServiceError> = async {
            bump_version::<Content, _>(
                &txn,
                "Content",
                content::Column::Id,
                content::Column::Version,
                content::Column::UpdatedAt,
                id,
                input.expected_version,
            )
            .await?;

            let current = Content::find_by_id(id)
                .one(&txn)
                .await?
                .ok_or_else(|| ServiceError::not_found("Content", id))?;
            let target_id = input.category_id.unwrap_or(current.category_id);
            let category_changed = target_id != current.category_id;
            let target = lock_category(&txn, target_id)
                .await?
                .ok_or_else(|| missing_category(target_id))?;

            let selection = match (&input.attribute_value_ids, category_changed) {
                (Some(value_ids), _) => Some(validate_selection(&txn, &target, value_ids).await?),
                (None, true) => {
                    let held = current_value_ids(&txn, id).await?;
                    validate_selection(&txn, &target, &held).await?;
                    None
                }
                (None, false) => None,
            };

            let mut active: content::ActiveModel = current.into();
            if let Some(title) = title {
                active.title = Set(title);
            }
            if let Some(body) = input.body {
                active.body = Set(body);
            }
            if category_changed {
                active.category_id = Set(target.id);
            }
            if let Some(sort) = input.sort {
                active.sort = Set(sort);
            }
            if let Some(is_active) = input.is_active {
                active.is_active = Set(is_active);
            }
            active.updated_at = Set(Utc::now());
            let record = active.update(&txn).await?;

            let assigned = match &selection {
                Some(selection) => Some(replace_relations(&txn, id, selection).await?),
                None => None,
            };
            Ok((record, assigned))
        }
        .await;
        let (record, assigned) = db::finish(txn, "content.update", result).await?;

        self.event_sender
            .send_or_log(Event::ContentUpdated(id))
            .await;
        if let Some(value_count) = assigned {
            self.event_sender
                .send_or_log(Event::ContentAttributesAssigned {
                    content_id: id,
                    value_count,
                    timestamp: record.updated_at,
                })
                .await;
        }

        info!(content_id = %id, version = record.version, "Updated content");
        Ok(record)
    }
}

fn missing_category(id: Uuid) -> ServiceError {
    ServiceError::ValidationError(format!("category {} does not exist", id))
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateContentInput {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub sort: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Initial attribute selection; omitted means none is recorded
    pub attribute_value_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateContentInput {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub body: Option<String>,
    pub category_id: Option<Uuid>,
    pub sort: Option<i32>,
    pub is_active: Option<bool>,
    /// Replaces the whole selection when present
    pub attribute_value_ids: Option<Vec<Uuid>>,
    pub expected_version: Option<i32>,
}
