//! Taxonomy entities
pub mod attribute;
pub mod attribute_value;
pub mod category;
pub mod category_attribute;
pub mod category_attribute_value;
pub mod content;
pub mod content_attribute_value;
pub mod content_model;
pub mod model_attribute;
pub mod model_attribute_value;

// Re-export entities
pub use attribute::{Entity as Attribute, Model as AttributeModel, SelectionMode};
pub use attribute_value::{Entity as AttributeValue, Model as AttributeValueModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use category_attribute::{Entity as CategoryAttribute, Model as CategoryAttributeModel};
pub use category_attribute_value::{
    Entity as CategoryAttributeValue, Model as CategoryAttributeValueModel,
};
pub use content::{Entity as Content, Model as ContentRecord};
pub use content_attribute_value::{
    Entity as ContentAttributeValue, Model as ContentAttributeValueModel,
};
pub use content_model::{Entity as ContentModel, Model as ContentModelRecord};
pub use model_attribute::{Entity as ModelAttribute, Model as ModelAttributeModel};
pub use model_attribute_value::{Entity as ModelAttributeValue, Model as ModelAttributeValueModel};
