use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A value a binding permits. The value must belong to the bound attribute.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = CategoryAttributeValue)]
#[sea_orm(table_name = "category_attribute_values")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false, column_type = "Uuid")]
    pub id: Uuid,

    pub binding_id: Uuid,
    pub attribute_value_id: Uuid,
    pub is_enabled: bool,
    pub sort: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category_attribute::Entity",
        from = "Column::BindingId",
        to = "super::category_attribute::Column::Id"
    )]
    Binding,

    #[sea_orm(
        belongs_to = "super::attribute_value::Entity",
        from = "Column::AttributeValueId",
        to = "super::attribute_value::Column::Id"
    )]
    AttributeValue,
}

impl Related<super::category_attribute::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Binding.def()
    }
}

impl Related<super::attribute_value::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttributeValue.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
