#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use taxonomy_api::{
    config::AppConfig,
    db,
    entities::{AttributeModel, AttributeValueModel, CategoryModel, ContentRecord, SelectionMode},
    events::{self, EventSender},
    services::{
        attributes::{CreateAttributeInput, CreateAttributeValueInput},
        categories::CreateCategoryInput,
        contents::CreateContentInput,
    },
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Application state and router backed by a private SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _data_dir: Option<TempDir>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// A file-backed database served by a pool of `connections`, so
    /// concurrent calls really run on separate connections.
    pub async fn on_disk(connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir for test database");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("taxonomy.db").display());
        let mut app = Self::with_config(|cfg| {
            cfg.database_url = url;
            cfg.db_max_connections = connections;
        })
        .await;
        app._data_dir = Some(dir);
        app
    }

    /// Builds the app after letting the caller tweak the configuration.
    pub async fn with_config(tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // One connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        tweak(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx));

        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = taxonomy_api::app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
            _data_dir: None,
        }
    }

    /// Send a request against the full router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_category(&self, name: &str, parent_id: Option<Uuid>) -> CategoryModel {
        self.state
            .services
            .categories
            .create(CreateCategoryInput {
                name: name.to_string(),
                slug: None,
                description: None,
                parent_id,
                content_model_id: None,
                sort: 0,
                is_active: true,
            })
            .await
            .expect("seed category for tests")
    }

    pub async fn seed_attribute(&self, code: &str, mode: SelectionMode) -> AttributeModel {
        self.state
            .services
            .attributes
            .create_attribute(CreateAttributeInput {
                name: code.to_uppercase(),
                code: code.to_string(),
                description: None,
                selection_mode: mode,
                sort: 0,
                is_active: true,
            })
            .await
            .expect("seed attribute for tests")
    }

    pub async fn seed_value(&self, attribute_id: Uuid, text: &str) -> AttributeValueModel {
        self.state
            .services
            .attributes
            .create_value(
                attribute_id,
                CreateAttributeValueInput {
                    value: text.to_string(),
                    sort: None,
                    is_active: true,
                },
            )
            .await
            .expect("seed attribute value for tests")
    }

    /// An attribute with one value per entry of `values`.
    pub async fn seed_attribute_with_values(
        &self,
        code: &str,
        mode: SelectionMode,
        values: &[&str],
    ) -> (AttributeModel, Vec<AttributeValueModel>) {
        let attribute = self.seed_attribute(code, mode).await;
        let mut seeded = Vec::with_capacity(values.len());
        for text in values {
            seeded.push(self.seed_value(attribute.id, text).await);
        }
        (attribute, seeded)
    }

    pub async fn seed_content(&self, title: &str, category_id: Uuid) -> ContentRecord {
        self.state
            .services
            .contents
            .create(CreateContentInput {
                title: title.to_string(),
                body: String::new(),
                category_id,
                sort: 0,
                is_active: true,
                attribute_value_ids: None,
            })
            .await
            .expect("seed content for tests")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Reads a response body as JSON.
pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse response body")
}
