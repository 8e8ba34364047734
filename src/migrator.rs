use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_attribute_dictionary::Migration),
            Box::new(m20250301_000002_create_content_models::Migration),
            Box::new(m20250301_000003_create_categories::Migration),
            Box::new(m20250301_000004_create_contents::Migration),
        ]
    }
}

#[derive(DeriveIden, Clone, Copy)]
pub enum Attributes {
    Table,
    Id,
    Name,
    Code,
    Description,
    SelectionMode,
    IsActive,
    Sort,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum AttributeValues {
    Table,
    Id,
    AttributeId,
    Value,
    Sort,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum ContentModels {
    Table,
    Id,
    Name,
    Description,
    Sort,
    IsActive,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum ContentModelAttributes {
    Table,
    Id,
    ModelId,
    AttributeId,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum ContentModelAttributeValues {
    Table,
    Id,
    ModelId,
    AttributeValueId,
    IsEnabled,
    Sort,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum Categories {
    Table,
    Id,
    Name,
    Slug,
    Description,
    ParentId,
    ContentModelId,
    Sort,
    IsActive,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum CategoryAttributes {
    Table,
    Id,
    CategoryId,
    AttributeId,
    IsRequired,
    Sort,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum CategoryAttributeValues {
    Table,
    Id,
    BindingId,
    AttributeValueId,
    IsEnabled,
    Sort,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum Contents {
    Table,
    Id,
    Title,
    Body,
    CategoryId,
    IsActive,
    Sort,
    ViewCount,
    CommentCount,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum ContentAttributeValues {
    Table,
    Id,
    ContentId,
    AttributeValueId,
}

fn timestamps<T: IntoIden + Copy>(table: &mut TableCreateStatement, created: T, updated: T) {
    table
        .col(
            ColumnDef::new(created)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        )
        .col(
            ColumnDef::new(updated)
                .timestamp_with_time_zone()
                .not_null()
                .default(Expr::current_timestamp()),
        );
}

mod m20250301_000001_create_attribute_dictionary {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000001_create_attribute_dictionary"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut attributes = Table::create();
            attributes
                .table(Attributes::Table)
                .if_not_exists()
                .col(ColumnDef::new(Attributes::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Attributes::Name).string_len(255).not_null())
                .col(
                    ColumnDef::new(Attributes::Code)
                        .string_len(64)
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(Attributes::Description).text().null())
                .col(
                    ColumnDef::new(Attributes::SelectionMode)
                        .string_len(16)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(Attributes::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(Attributes::Sort)
                        .integer()
                        .not_null()
                        .default(0),
                );
            timestamps(&mut attributes, Attributes::CreatedAt, Attributes::UpdatedAt);
            manager.create_table(attributes.to_owned()).await?;

            let mut values = Table::create();
            values
                .table(AttributeValues::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(AttributeValues::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(AttributeValues::AttributeId).uuid().not_null())
                .col(
                    ColumnDef::new(AttributeValues::Value)
                        .string_len(255)
                        .not_null(),
                )
                .col(
                    ColumnDef::new(AttributeValues::Sort)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(AttributeValues::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_attribute_values_attribute_id")
                        .from(AttributeValues::Table, AttributeValues::AttributeId)
                        .to(Attributes::Table, Attributes::Id)
                        .on_delete(ForeignKeyAction::Restrict),
                );
            timestamps(
                &mut values,
                AttributeValues::CreatedAt,
                AttributeValues::UpdatedAt,
            );
            manager.create_table(values.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_attribute_values_attribute_value")
                        .table(AttributeValues::Table)
                        .col(AttributeValues::AttributeId)
                        .col(AttributeValues::Value)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AttributeValues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Attributes::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000002_create_content_models {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000002_create_content_models"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut models = Table::create();
            models
                .table(ContentModels::Table)
                .if_not_exists()
                .col(
                    ColumnDef::new(ContentModels::Id)
                        .uuid()
                        .not_null()
                        .primary_key(),
                )
                .col(ColumnDef::new(ContentModels::Name).string_len(255).not_null())
                .col(ColumnDef::new(ContentModels::Description).text().null())
                .col(
                    ColumnDef::new(ContentModels::Sort)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(ContentModels::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(ContentModels::Version)
                        .integer()
                        .not_null()
                        .default(0),
                );
            timestamps(&mut models, ContentModels::CreatedAt, ContentModels::UpdatedAt);
            manager.create_table(models.to_owned()).await?;

            manager
                .create_table(
                    Table::create()
                        .table(ContentModelAttributes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContentModelAttributes::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ContentModelAttributes::ModelId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ContentModelAttributes::AttributeId)
                                .uuid()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_model_attributes_model_id")
                                .from(
                                    ContentModelAttributes::Table,
                                    ContentModelAttributes::ModelId,
                                )
                                .to(ContentModels::Table, ContentModels::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_model_attributes_attribute_id")
                                .from(
                                    ContentModelAttributes::Table,
                                    ContentModelAttributes::AttributeId,
                                )
                                .to(Attributes::Table, Attributes::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_content_model_attributes_pair")
                        .table(ContentModelAttributes::Table)
                        .col(ContentModelAttributes::ModelId)
                        .col(ContentModelAttributes::AttributeId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ContentModelAttributeValues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContentModelAttributeValues::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ContentModelAttributeValues::ModelId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ContentModelAttributeValues::AttributeValueId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ContentModelAttributeValues::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ContentModelAttributeValues::Sort)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_model_attribute_values_model_id")
                                .from(
                                    ContentModelAttributeValues::Table,
                                    ContentModelAttributeValues::ModelId,
                                )
                                .to(ContentModels::Table, ContentModels::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_model_attribute_values_value_id")
                                .from(
                                    ContentModelAttributeValues::Table,
                                    ContentModelAttributeValues::AttributeValueId,
                                )
                                .to(AttributeValues::Table, AttributeValues::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_content_model_attribute_values_pair")
                        .table(ContentModelAttributeValues::Table)
                        .col(ContentModelAttributeValues::ModelId)
                        .col(ContentModelAttributeValues::AttributeValueId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(
                    Table::drop()
                        .table(ContentModelAttributeValues::Table)
                        .to_owned(),
                )
                .await?;
            manager
                .drop_table(Table::drop().table(ContentModelAttributes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ContentModels::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000003_create_categories {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000003_create_categories"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut categories = Table::create();
            categories
                .table(Categories::Table)
                .if_not_exists()
                .col(ColumnDef::new(Categories::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Categories::Name).string_len(255).not_null())
                .col(
                    ColumnDef::new(Categories::Slug)
                        .string_len(255)
                        .not_null()
                        .unique_key(),
                )
                .col(ColumnDef::new(Categories::Description).text().null())
                .col(ColumnDef::new(Categories::ParentId).uuid().null())
                .col(ColumnDef::new(Categories::ContentModelId).uuid().null())
                .col(
                    ColumnDef::new(Categories::Sort)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(Categories::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(Categories::Version)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_categories_parent_id")
                        .from(Categories::Table, Categories::ParentId)
                        .to(Categories::Table, Categories::Id)
                        .on_delete(ForeignKeyAction::Restrict),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_categories_content_model_id")
                        .from(Categories::Table, Categories::ContentModelId)
                        .to(ContentModels::Table, ContentModels::Id)
                        .on_delete(ForeignKeyAction::Restrict),
                );
            timestamps(&mut categories, Categories::CreatedAt, Categories::UpdatedAt);
            manager.create_table(categories.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_categories_parent_id")
                        .table(Categories::Table)
                        .col(Categories::ParentId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CategoryAttributes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CategoryAttributes::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributes::CategoryId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributes::AttributeId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributes::IsRequired)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributes::Sort)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_category_attributes_category_id")
                                .from(CategoryAttributes::Table, CategoryAttributes::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_category_attributes_attribute_id")
                                .from(CategoryAttributes::Table, CategoryAttributes::AttributeId)
                                .to(Attributes::Table, Attributes::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_category_attributes_pair")
                        .table(CategoryAttributes::Table)
                        .col(CategoryAttributes::CategoryId)
                        .col(CategoryAttributes::AttributeId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CategoryAttributeValues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CategoryAttributeValues::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributeValues::BindingId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributeValues::AttributeValueId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributeValues::IsEnabled)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(CategoryAttributeValues::Sort)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_category_attribute_values_binding_id")
                                .from(
                                    CategoryAttributeValues::Table,
                                    CategoryAttributeValues::BindingId,
                                )
                                .to(CategoryAttributes::Table, CategoryAttributes::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_category_attribute_values_value_id")
                                .from(
                                    CategoryAttributeValues::Table,
                                    CategoryAttributeValues::AttributeValueId,
                                )
                                .to(AttributeValues::Table, AttributeValues::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_category_attribute_values_pair")
                        .table(CategoryAttributeValues::Table)
                        .col(CategoryAttributeValues::BindingId)
                        .col(CategoryAttributeValues::AttributeValueId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CategoryAttributeValues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CategoryAttributes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }
}

mod m20250301_000004_create_contents {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250301_000004_create_contents"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let mut contents = Table::create();
            contents
                .table(Contents::Table)
                .if_not_exists()
                .col(ColumnDef::new(Contents::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(Contents::Title).string_len(255).not_null())
                .col(ColumnDef::new(Contents::Body).text().not_null())
                .col(ColumnDef::new(Contents::CategoryId).uuid().not_null())
                .col(
                    ColumnDef::new(Contents::IsActive)
                        .boolean()
                        .not_null()
                        .default(true),
                )
                .col(
                    ColumnDef::new(Contents::Sort)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(Contents::ViewCount)
                        .big_integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(Contents::CommentCount)
                        .big_integer()
                        .not_null()
                        .default(0),
                )
                .col(
                    ColumnDef::new(Contents::Version)
                        .integer()
                        .not_null()
                        .default(0),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name("fk_contents_category_id")
                        .from(Contents::Table, Contents::CategoryId)
                        .to(Categories::Table, Categories::Id)
                        .on_delete(ForeignKeyAction::Restrict),
                );
            timestamps(&mut contents, Contents::CreatedAt, Contents::UpdatedAt);
            manager.create_table(contents.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_contents_category_id")
                        .table(Contents::Table)
                        .col(Contents::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ContentAttributeValues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ContentAttributeValues::Id)
                                .uuid()
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ContentAttributeValues::ContentId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ContentAttributeValues::AttributeValueId)
                                .uuid()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_attribute_values_content_id")
                                .from(
                                    ContentAttributeValues::Table,
                                    ContentAttributeValues::ContentId,
                                )
                                .to(Contents::Table, Contents::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_content_attribute_values_value_id")
                                .from(
                                    ContentAttributeValues::Table,
                                    ContentAttributeValues::AttributeValueId,
                                )
                                .to(AttributeValues::Table, AttributeValues::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("uq_content_attribute_values_pair")
                        .table(ContentAttributeValues::Table)
                        .col(ContentAttributeValues::ContentId)
                        .col(ContentAttributeValues::AttributeValueId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_content_attribute_values_value_id")
                        .table(ContentAttributeValues::Table)
                        .col(ContentAttributeValues::AttributeValueId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ContentAttributeValues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Contents::Table).to_owned())
                .await
        }
    }
}
