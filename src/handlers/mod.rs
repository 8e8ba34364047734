pub mod attributes;
pub mod categories;
pub mod common;
pub mod content_models;
pub mod contents;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{
        attributes::AttributeService, categories::CategoryService,
        category_bindings::CategoryBindingService, content_assignments::ContentAssignmentService,
        content_models::ContentModelService, contents::ContentService,
    },
};
use std::sync::Arc;

/// Every service the HTTP surface dispatches to, shared behind `Arc`s.
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub attributes: Arc<AttributeService>,
    pub bindings: Arc<CategoryBindingService>,
    pub content_models: Arc<ContentModelService>,
    pub assignments: Arc<ContentAssignmentService>,
    pub contents: Arc<ContentService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>, config: &AppConfig) -> Self {
        Self {
            categories: Arc::new(
                CategoryService::new(db_pool.clone(), event_sender.clone())
                    .with_max_depth(config.max_category_depth),
            ),
            attributes: Arc::new(AttributeService::new(db_pool.clone(), event_sender.clone())),
            bindings: Arc::new(CategoryBindingService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            content_models: Arc::new(ContentModelService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            assignments: Arc::new(ContentAssignmentService::new(
                db_pool.clone(),
                event_sender.clone(),
            )),
            contents: Arc::new(ContentService::new(db_pool, event_sender)),
        }
    }
}
