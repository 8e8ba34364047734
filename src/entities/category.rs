use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A node of the category tree. `parent_id = None` marks a root.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Category)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    /// Content model governing content filed under this category, if any.
    pub content_model_id: Option<Uuid>,
    pub sort: i32,
    pub is_active: bool,
    /// Bumped by every binding replace; see `CategoryBindingService::set_bindings`.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,

    #[sea_orm(
        belongs_to = "super::content_model::Entity",
        from = "Column::ContentModelId",
        to = "super::content_model::Column::Id"
    )]
    ContentModel,

    #[sea_orm(has_many = "super::category_attribute::Entity")]
    Bindings,

    #[sea_orm(has_many = "super::content::Entity")]
    Contents,
}

impl Related<super::content_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContentModel.def()
    }
}

impl Related<super::category_attribute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Bindings.def()
    }
}

impl Related<super::content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
