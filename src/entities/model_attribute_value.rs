use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Enable/sort override for one value within a content model.
/// Values without a row fall back to `is_enabled = true, sort = 0`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = ModelAttributeValue)]
#[sea_orm(table_name = "content_model_attribute_values")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    pub model_id: Uuid,
    pub attribute_value_id: Uuid,
    pub is_enabled: bool,
    pub sort: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::content_model::Entity",
        from = "Column::ModelId",
        to = "super::content_model::Column::Id"
    )]
    ContentModel,

    #[sea_orm(
        belongs_to = "super::attribute_value::Entity",
        from = "Column::AttributeValueId",
        to = "super::attribute_value::Column::Id"
    )]
    AttributeValue,
}

impl Related<super::content_model::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContentModel.def()
    }
}

impl Related<super::attribute_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttributeValue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
