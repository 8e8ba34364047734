mod common;

use assert_matches::assert_matches;
use sea_orm::{EntityTrait, PaginatorTrait};
use taxonomy_api::{
    entities::{CategoryAttribute, CategoryAttributeValue, SelectionMode},
    errors::ServiceError,
    services::category_bindings::SetBindingsInput,
    taxonomy::BindingInput,
};
use uuid::Uuid;

use common::TestApp;

fn binding(attribute_id: Uuid, value_ids: Vec<Uuid>, required: bool, sort: i32) -> BindingInput {
    BindingInput {
        attribute_id,
        value_ids,
        required,
        sort,
    }
}

fn replace(bindings: Vec<BindingInput>) -> SetBindingsInput {
    SetBindingsInput {
        bindings,
        expected_version: None,
    }
}

#[tokio::test]
async fn binding_set_round_trips() {
    let app = TestApp::new().await;
    let bindings = &app.state.services.bindings;
    let category = app.seed_category("Games", None).await;
    let (platform, platforms) = app
        .seed_attribute_with_values("platform", SelectionMode::Multi, &["PC", "Console", "Mobile"])
        .await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["Boxed", "Digital"])
        .await;

    let input = vec![
        binding(platform.id, vec![platforms[2].id, platforms[0].id], false, 0),
        binding(format.id, vec![formats[1].id], true, 1),
    ];
    let returned = bindings
        .set_bindings(category.id, replace(input.clone()))
        .await
        .unwrap();
    let fetched = bindings.get_allowed_attributes(category.id).await.unwrap();
    assert_eq!(returned, fetched);

    let round_trip: Vec<BindingInput> = fetched.iter().map(|a| a.to_binding_input()).collect();
    assert_eq!(round_trip, input);
    assert_eq!(fetched[0].code, "platform");
    assert_eq!(fetched[0].values[0].value, "Mobile");
    assert!(fetched[1].required);
}

#[tokio::test]
async fn bindings_come_back_in_sort_order_whatever_the_input_order() {
    let app = TestApp::new().await;
    let bindings = &app.state.services.bindings;
    let category = app.seed_category("Games", None).await;
    let (platform, platforms) = app
        .seed_attribute_with_values("platform", SelectionMode::Multi, &["PC", "Console"])
        .await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["Boxed"])
        .await;

    let format_binding = binding(format.id, vec![formats[0].id], true, 1);
    let platform_binding = binding(platform.id, vec![platforms[1].id, platforms[0].id], false, 0);
    let fetched = bindings
        .set_bindings(
            category.id,
            replace(vec![format_binding.clone(), platform_binding.clone()]),
        )
        .await
        .unwrap();

    let round_trip: Vec<BindingInput> = fetched.iter().map(|a| a.to_binding_input()).collect();
    assert_eq!(round_trip, vec![platform_binding, format_binding]);
    assert_eq!(fetched[0].values[0].value, "Console");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_replaces_store_one_whole_set() {
    let app = TestApp::on_disk(4).await;
    let bindings = &app.state.services.bindings;
    let category = app.seed_category("Games", None).await;
    let (platform, platforms) = app
        .seed_attribute_with_values("platform", SelectionMode::Multi, &["PC", "Console"])
        .await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["Boxed", "Digital"])
        .await;

    let first = vec![binding(platform.id, vec![platforms[0].id], false, 0)];
    let second = vec![
        binding(platform.id, vec![platforms[1].id], true, 0),
        binding(format.id, vec![formats[0].id, formats[1].id], false, 1),
    ];

    let (a, b) = tokio::join!(
        bindings.set_bindings(category.id, replace(first.clone())),
        bindings.set_bindings(category.id, replace(second.clone())),
    );
    a.unwrap();
    b.unwrap();

    let stored: Vec<BindingInput> = bindings
        .get_allowed_attributes(category.id)
        .await
        .unwrap()
        .iter()
        .map(|a| a.to_binding_input())
        .collect();
    assert!(stored == first || stored == second, "merged binding set: {:?}", stored);

    let db = &*app.state.db;
    let expected_rows = if stored == first { (1, 1) } else { (2, 3) };
    assert_eq!(
        (
            CategoryAttribute::find().count(db).await.unwrap(),
            CategoryAttributeValue::find().count(db).await.unwrap()
        ),
        expected_rows
    );
    assert_eq!(
        app.state.services.categories.get(category.id).await.unwrap().version,
        2
    );
}

#[tokio::test]
async fn replacing_drops_previous_rows() {
    let app = TestApp::new().await;
    let bindings = &app.state.services.bindings;
    let category = app.seed_category("Games", None).await;
    let (platform, platforms) = app
        .seed_attribute_with_values("platform", SelectionMode::Multi, &["PC", "Console"])
        .await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["Boxed"])
        .await;

    bindings
        .set_bindings(
            category.id,
            replace(vec![
                binding(platform.id, platforms.iter().map(|v| v.id).collect(), false, 0),
                binding(format.id, vec![formats[0].id], false, 1),
            ]),
        )
        .await
        .unwrap();
    bindings
        .set_bindings(
            category.id,
            replace(vec![binding(format.id, vec![formats[0].id], false, 0)]),
        )
        .await
        .unwrap();

    let db = &*app.state.db;
    assert_eq!(CategoryAttribute::find().count(db).await.unwrap(), 1);
    assert_eq!(CategoryAttributeValue::find().count(db).await.unwrap(), 1);

    bindings.set_bindings(category.id, replace(vec![])).await.unwrap();
    assert!(bindings
        .get_allowed_attributes(category.id)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(CategoryAttributeValue::find().count(db).await.unwrap(), 0);
}

#[tokio::test]
async fn invalid_sets_are_rejected_without_touching_stored_bindings() {
    let app = TestApp::new().await;
    let bindings = &app.state.services.bindings;
    let category = app.seed_category("Games", None).await;
    let (platform, platforms) = app
        .seed_attribute_with_values("platform", SelectionMode::Multi, &["PC"])
        .await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["Boxed"])
        .await;

    let original = bindings
        .set_bindings(
            category.id,
            replace(vec![binding(platform.id, vec![platforms[0].id], false, 0)]),
        )
        .await
        .unwrap();

    // A value owned by another attribute.
    assert_matches!(
        bindings
            .set_bindings(
                category.id,
                replace(vec![binding(platform.id, vec![formats[0].id], false, 0)]),
            )
            .await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("belongs to attribute 'format'")
    );
    // The same attribute twice.
    assert_matches!(
        bindings
            .set_bindings(
                category.id,
                replace(vec![
                    binding(format.id, vec![], false, 0),
                    binding(format.id, vec![], false, 1),
                ]),
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );
    // An attribute that does not exist.
    assert_matches!(
        bindings
            .set_bindings(
                category.id,
                replace(vec![binding(Uuid::new_v4(), vec![], false, 0)]),
            )
            .await,
        Err(ServiceError::ValidationError(_))
    );

    assert_eq!(
        bindings.get_allowed_attributes(category.id).await.unwrap(),
        original
    );
}

#[tokio::test]
async fn stale_expected_version_is_a_concurrent_modification() {
    let app = TestApp::new().await;
    let bindings = &app.state.services.bindings;
    let category = app.seed_category("Games", None).await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["Boxed", "Digital"])
        .await;
    assert_eq!(category.version, 0);

    bindings
        .set_bindings(
            category.id,
            SetBindingsInput {
                bindings: vec![binding(format.id, vec![formats[0].id], false, 0)],
                expected_version: Some(0),
            },
        )
        .await
        .unwrap();

    let stale = bindings
        .set_bindings(
            category.id,
            SetBindingsInput {
                bindings: vec![binding(format.id, vec![formats[1].id], false, 0)],
                expected_version: Some(0),
            },
        )
        .await;
    assert_matches!(stale, Err(ServiceError::ConcurrentModification(id)) if id == category.id);

    let allowed = bindings.get_allowed_attributes(category.id).await.unwrap();
    assert_eq!(allowed[0].values[0].attribute_value_id, formats[0].id);
    assert_eq!(
        app.state
            .services
            .categories
            .get(category.id)
            .await
            .unwrap()
            .version,
        1
    );
}

#[tokio::test]
async fn unknown_category_is_not_found() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .bindings
        .set_bindings(Uuid::new_v4(), replace(vec![]))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn removing_a_category_deletes_its_bindings() {
    let app = TestApp::new().await;
    let category = app.seed_category("Games", None).await;
    let (format, formats) = app
        .seed_attribute_with_values("format", SelectionMode::Single, &["Boxed"])
        .await;
    app.state
        .services
        .bindings
        .set_bindings(
            category.id,
            replace(vec![binding(format.id, vec![formats[0].id], true, 0)]),
        )
        .await
        .unwrap();

    app.state.services.categories.remove(category.id).await.unwrap();

    let db = &*app.state.db;
    assert_eq!(CategoryAttribute::find().count(db).await.unwrap(), 0);
    assert_eq!(CategoryAttributeValue::find().count(db).await.unwrap(), 0);
}
