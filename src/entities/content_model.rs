use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Reusable template bundling attributes with default value presets.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ContentModel)]
#[sea_orm(table_name = "content_models")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    pub name: String,
    pub description: Option<String>,
    pub sort: i32,
    pub is_active: bool,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::model_attribute::Entity")]
    Attributes,

    #[sea_orm(has_many = "super::model_attribute_value::Entity")]
    Presets,
}

impl Related<super::model_attribute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attributes.def()
    }
}

impl Related<super::model_attribute_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Presets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
