mod common;

use assert_matches::assert_matches;
use taxonomy_api::{
    entities::{AttributeValueModel, CategoryModel, SelectionMode},
    errors::ServiceError,
    services::{
        categories::UpdateCategoryInput,
        category_bindings::SetBindingsInput,
        content_assignments::{AssignAttributesInput, ContentAttributeView},
        content_models::CreateContentModelInput,
        contents::{CreateContentInput, UpdateContentInput},
    },
    taxonomy::{BindingInput, ValuePresetInput},
};
use uuid::Uuid;

use common::TestApp;

fn assign(value_ids: Vec<Uuid>) -> AssignAttributesInput {
    AssignAttributesInput {
        attribute_value_ids: value_ids,
        expected_version: None,
    }
}

fn ids(values: &[AttributeValueModel]) -> Vec<Uuid> {
    values.iter().map(|v| v.id).collect()
}

fn held(views: &[ContentAttributeView]) -> Vec<Uuid> {
    let mut held: Vec<Uuid> = views
        .iter()
        .flat_map(|a| a.values.iter().map(|v| v.attribute_value_id))
        .collect();
    held.sort();
    held
}

async fn bind(app: &TestApp, category: &CategoryModel, bindings: Vec<BindingInput>) {
    app.state
        .services
        .bindings
        .set_bindings(
            category.id,
            SetBindingsInput {
                bindings,
                expected_version: None,
            },
        )
        .await
        .unwrap();
}

/// A "Shop" category binding multi-valued tags and a single-valued size.
struct Shop {
    category: CategoryModel,
    tags: Vec<AttributeValueModel>,
    sizes: Vec<AttributeValueModel>,
}

async fn shop(app: &TestApp) -> Shop {
    let category = app.seed_category("Shop", None).await;
    let (tag, tags) = app
        .seed_attribute_with_values("tags", SelectionMode::Multi, &["new", "sale", "eco"])
        .await;
    let (size, sizes) = app
        .seed_attribute_with_values("size", SelectionMode::Single, &["S", "M", "L"])
        .await;
    bind(
        app,
        &category,
        vec![
            BindingInput {
                attribute_id: tag.id,
                value_ids: ids(&tags),
                required: false,
                sort: 0,
            },
            BindingInput {
                attribute_id: size.id,
                value_ids: ids(&sizes),
                required: false,
                sort: 1,
            },
        ],
    )
    .await;
    Shop {
        category,
        tags,
        sizes,
    }
}

#[tokio::test]
async fn single_mode_violation_keeps_previous_assignment() {
    let app = TestApp::new().await;
    let assignments = &app.state.services.assignments;
    let shop = shop(&app).await;
    let content = app.seed_content("Shirt", shop.category.id).await;

    let first = assignments
        .assign(
            content.id,
            assign(vec![shop.tags[0].id, shop.tags[1].id, shop.sizes[0].id]),
        )
        .await
        .unwrap();
    let before = held(&first);
    assert_eq!(before.len(), 3);

    let result = assignments
        .assign(content.id, assign(vec![shop.sizes[0].id, shop.sizes[1].id]))
        .await;
    assert_matches!(
        result,
        Err(ServiceError::ValidationError(msg)) if msg.contains("accepts a single value but 2 were given")
    );

    let after = assignments.by_content(content.id).await.unwrap();
    assert_eq!(held(&after), before);
    assert_eq!(app.state.services.contents.get(content.id).await.unwrap().version, 1);
}

#[tokio::test]
async fn values_outside_the_binding_are_not_permitted() {
    let app = TestApp::new().await;
    let category = app.seed_category("Paint", None).await;
    let (color, colors) = app
        .seed_attribute_with_values("color", SelectionMode::Multi, &["Red", "Blue"])
        .await;
    bind(
        &app,
        &category,
        vec![BindingInput {
            attribute_id: color.id,
            value_ids: vec![colors[0].id],
            required: false,
            sort: 0,
        }],
    )
    .await;
    let allowed = app
        .state
        .services
        .bindings
        .get_allowed_attributes(category.id)
        .await
        .unwrap();
    assert_eq!(allowed.len(), 1);
    assert_eq!(
        allowed[0]
            .values
            .iter()
            .map(|v| v.value.as_str())
            .collect::<Vec<_>>(),
        vec!["Red"]
    );

    let content = app.seed_content("Can", category.id).await;
    let assignments = &app.state.services.assignments;

    assert_matches!(
        assignments.assign(content.id, assign(vec![colors[1].id])).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("'Blue' is not permitted")
    );

    let views = assignments
        .assign(content.id, assign(vec![colors[0].id]))
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].code, "color");
    assert_eq!(views[0].values[0].value, "Red");
}

#[tokio::test]
async fn required_bindings_must_be_selected() {
    let app = TestApp::new().await;
    let category = app.seed_category("Books", None).await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["PDF"])
        .await;
    let (tag, tags) = app
        .seed_attribute_with_values("tags", SelectionMode::Multi, &["classic"])
        .await;
    bind(
        &app,
        &category,
        vec![
            BindingInput {
                attribute_id: format.id,
                value_ids: ids(&formats),
                required: true,
                sort: 0,
            },
            BindingInput {
                attribute_id: tag.id,
                value_ids: ids(&tags),
                required: false,
                sort: 1,
            },
        ],
    )
    .await;
    let content = app.seed_content("Novel", category.id).await;
    let assignments = &app.state.services.assignments;

    assert_matches!(
        assignments.assign(content.id, assign(vec![tags[0].id])).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("'format' is required")
    );
    assignments
        .assign(content.id, assign(vec![formats[0].id, tags[0].id]))
        .await
        .unwrap();
}

#[tokio::test]
async fn content_model_gates_attributes_and_disabled_values() {
    let app = TestApp::new().await;
    let (edition, editions) = app
        .seed_attribute_with_values("edition", SelectionMode::Single, &["Standard", "Deluxe"])
        .await;
    let (_, regions) = app
        .seed_attribute_with_values("region", SelectionMode::Single, &["EU"])
        .await;
    let model = app
        .state
        .services
        .content_models
        .create(CreateContentModelInput {
            name: "Game".into(),
            description: None,
            sort: 0,
            is_active: true,
            attribute_ids: vec![edition.id],
            presets: vec![ValuePresetInput {
                attribute_value_id: editions[1].id,
                is_enabled: false,
                sort: 0,
            }],
        })
        .await
        .unwrap();
    let category = app.seed_category("Games", None).await;
    app.state
        .services
        .categories
        .update(
            category.id,
            UpdateCategoryInput {
                content_model_id: Some(Some(model.model.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let content = app.seed_content("Quest", category.id).await;
    let assignments = &app.state.services.assignments;

    assert_matches!(
        assignments.assign(content.id, assign(vec![regions[0].id])).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("not part of the category's content model")
    );
    assert_matches!(
        assignments.assign(content.id, assign(vec![editions[1].id])).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("'Deluxe' is disabled")
    );
    let views = assignments
        .assign(content.id, assign(vec![editions[0].id]))
        .await
        .unwrap();
    assert_eq!(held(&views), vec![editions[0].id]);
}

#[tokio::test]
async fn ungoverned_categories_only_accept_empty_selections() {
    let app = TestApp::new().await;
    let category = app.seed_category("Misc", None).await;
    let (_, colors) = app
        .seed_attribute_with_values("color", SelectionMode::Single, &["Red"])
        .await;
    let content = app.seed_content("Thing", category.id).await;
    let assignments = &app.state.services.assignments;

    assert_matches!(
        assignments.assign(content.id, assign(vec![colors[0].id])).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("neither attribute bindings nor a content model")
    );
    assert!(assignments
        .assign(content.id, assign(vec![]))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn unknown_values_and_content_are_reported() {
    let app = TestApp::new().await;
    let shop = shop(&app).await;
    let content = app.seed_content("Shirt", shop.category.id).await;
    let assignments = &app.state.services.assignments;

    assert_matches!(
        assignments.assign(content.id, assign(vec![Uuid::new_v4()])).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        assignments.assign(Uuid::new_v4(), assign(vec![])).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        assignments.by_content(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn stale_content_version_is_rejected() {
    let app = TestApp::new().await;
    let shop = shop(&app).await;
    let content = app.seed_content("Shirt", shop.category.id).await;
    let assignments = &app.state.services.assignments;

    assignments
        .assign(
            content.id,
            AssignAttributesInput {
                attribute_value_ids: vec![shop.sizes[0].id],
                expected_version: Some(0),
            },
        )
        .await
        .unwrap();
    let stale = assignments
        .assign(
            content.id,
            AssignAttributesInput {
                attribute_value_ids: vec![shop.sizes[1].id],
                expected_version: Some(0),
            },
        )
        .await;
    assert_matches!(stale, Err(ServiceError::ConcurrentModification(id)) if id == content.id);
    assert_eq!(
        held(&assignments.by_content(content.id).await.unwrap()),
        vec![shop.sizes[0].id]
    );
}

#[tokio::test]
async fn facet_ands_attributes_and_ors_values() {
    let app = TestApp::new().await;
    let shop = shop(&app).await;
    let assignments = &app.state.services.assignments;
    let (new, sale) = (shop.tags[0].id, shop.tags[1].id);
    let (small, large) = (shop.sizes[0].id, shop.sizes[2].id);

    let a = app.seed_content("A", shop.category.id).await;
    let b = app.seed_content("B", shop.category.id).await;
    let c = app.seed_content("C", shop.category.id).await;
    assignments.assign(a.id, assign(vec![new, small])).await.unwrap();
    assignments.assign(b.id, assign(vec![sale, small])).await.unwrap();
    assignments.assign(c.id, assign(vec![new, large])).await.unwrap();

    let matched = |records: Vec<taxonomy_api::entities::ContentRecord>| {
        let mut titles: Vec<String> = records.into_iter().map(|r| r.title).collect();
        titles.sort();
        titles
    };

    assert_eq!(matched(assignments.facet(&[new]).await.unwrap()), vec!["A", "C"]);
    assert_eq!(
        matched(assignments.facet(&[new, sale]).await.unwrap()),
        vec!["A", "B", "C"]
    );
    assert_eq!(matched(assignments.facet(&[new, small]).await.unwrap()), vec!["A"]);
    assert_eq!(
        matched(assignments.facet(&[new, sale, large]).await.unwrap()),
        vec!["C"]
    );
    assert!(assignments.facet(&[]).await.unwrap().is_empty());
    assert_matches!(
        assignments.facet(&[Uuid::new_v4()]).await,
        Err(ServiceError::ValidationError(_))
    );

    assert_eq!(
        matched(assignments.by_attribute_value(small).await.unwrap()),
        vec!["A", "B"]
    );
    assert_matches!(
        assignments.by_attribute_value(Uuid::new_v4()).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn inactive_content_is_left_out_of_value_lookups() {
    let app = TestApp::new().await;
    let shop = shop(&app).await;
    let content = app.seed_content("Hidden", shop.category.id).await;
    let small = shop.sizes[0].id;
    app.state
        .services
        .assignments
        .assign(content.id, assign(vec![small]))
        .await
        .unwrap();

    app.state
        .services
        .contents
        .update(
            content.id,
            UpdateContentInput {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let assignments = &app.state.services.assignments;
    assert!(assignments.by_attribute_value(small).await.unwrap().is_empty());
    assert!(assignments.facet(&[small]).await.unwrap().is_empty());
}

#[tokio::test]
async fn content_create_and_move_validate_the_selection() {
    let app = TestApp::new().await;
    let shop = shop(&app).await;
    let contents = &app.state.services.contents;
    let assignments = &app.state.services.assignments;

    let created = contents
        .create(CreateContentInput {
            title: "Jacket".into(),
            body: String::new(),
            category_id: shop.category.id,
            sort: 0,
            is_active: true,
            attribute_value_ids: Some(vec![shop.sizes[1].id]),
        })
        .await
        .unwrap();
    assert_eq!(
        held(&assignments.by_content(created.id).await.unwrap()),
        vec![shop.sizes[1].id]
    );

    assert_matches!(
        contents
            .create(CreateContentInput {
                title: "Bad".into(),
                body: String::new(),
                category_id: shop.category.id,
                sort: 0,
                is_active: true,
                attribute_value_ids: Some(vec![shop.sizes[0].id, shop.sizes[1].id]),
            })
            .await,
        Err(ServiceError::ValidationError(_))
    );

    // Moving into an ungoverned category would strand the size value.
    let bare = app.seed_category("Bare", None).await;
    assert_matches!(
        contents
            .update(
                created.id,
                UpdateContentInput {
                    category_id: Some(bare.id),
                    ..Default::default()
                },
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_eq!(
        contents.get(created.id).await.unwrap().category_id,
        shop.category.id
    );

    // Clearing the selection in the same update makes the move valid.
    let moved = contents
        .update(
            created.id,
            UpdateContentInput {
                category_id: Some(bare.id),
                attribute_value_ids: Some(vec![]),
                expected_version: Some(created.version),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.category_id, bare.id);
    assert_eq!(moved.version, created.version + 1);
    assert!(assignments.by_content(created.id).await.unwrap().is_empty());
}
