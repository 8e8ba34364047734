mod common;

use assert_matches::assert_matches;
use taxonomy_api::{
    errors::ServiceError,
    services::categories::{CreateCategoryInput, UpdateCategoryInput},
    taxonomy::CategoryTreeNode,
};
use uuid::Uuid;

use common::TestApp;

fn create_input(name: &str, parent_id: Option<Uuid>) -> CreateCategoryInput {
    CreateCategoryInput {
        name: name.to_string(),
        slug: None,
        description: None,
        parent_id,
        content_model_id: None,
        sort: 0,
        is_active: true,
    }
}

fn find<'a>(nodes: &'a [CategoryTreeNode], id: Uuid) -> Option<&'a CategoryTreeNode> {
    nodes.iter().find_map(|node| {
        if node.id == id {
            Some(node)
        } else {
            find(&node.children, id)
        }
    })
}

#[tokio::test]
async fn tree_nests_children_and_blocks_deleting_non_leaves() {
    let app = TestApp::new().await;
    let categories = &app.state.services.categories;

    let one = app.seed_category("Books", None).await;
    let two = app.seed_category("Fiction", Some(one.id)).await;
    let three = app.seed_category("Music", None).await;

    let tree = categories.tree().await.unwrap();
    assert_eq!(tree.len(), 2);
    let root = find(&tree, one.id).expect("root present");
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].id, two.id);
    assert!(find(&tree, three.id).unwrap().children.is_empty());

    assert_matches!(categories.remove(one.id).await, Err(ServiceError::Conflict(_)));
    assert!(categories.get(one.id).await.is_ok());

    categories.remove(two.id).await.unwrap();
    categories.remove(one.id).await.unwrap();

    let tree = categories.tree().await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].id, three.id);
}

#[tokio::test]
async fn nil_parent_creates_a_root() {
    let app = TestApp::new().await;
    let created = app
        .state
        .services
        .categories
        .create(create_input("Root", Some(Uuid::nil())))
        .await
        .unwrap();
    assert_eq!(created.parent_id, None);
}

#[tokio::test]
async fn unknown_parent_is_rejected() {
    let app = TestApp::new().await;
    let result = app
        .state
        .services
        .categories
        .create(create_input("Orphan", Some(Uuid::new_v4())))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn duplicate_slug_conflicts() {
    let app = TestApp::new().await;
    app.seed_category("Garden Tools", None).await;
    let result = app
        .state
        .services
        .categories
        .create(create_input("Garden tools", None))
        .await;
    assert_matches!(result, Err(ServiceError::Conflict(msg)) if msg.contains("garden-tools"));
}

#[tokio::test]
async fn non_latin_and_symbol_names_get_slugs() {
    let app = TestApp::new().await;
    let categories = &app.state.services.categories;

    let software = categories.create(create_input("软件", None)).await.unwrap();
    assert_eq!(software.slug, "软件");

    let symbols = categories.create(create_input("★ ★", None)).await.unwrap();
    assert_eq!(symbols.slug, format!("category-{}", symbols.id.simple()));

    let again = categories.create(create_input("软件", None)).await;
    assert_matches!(again, Err(ServiceError::Conflict(_)));
}

#[tokio::test]
async fn moving_under_a_descendant_is_rejected() {
    let app = TestApp::new().await;
    let categories = &app.state.services.categories;

    let a = app.seed_category("A", None).await;
    let b = app.seed_category("B", Some(a.id)).await;
    let c = app.seed_category("C", Some(b.id)).await;

    for new_parent in [a.id, c.id] {
        let result = categories
            .update(
                a.id,
                UpdateCategoryInput {
                    parent_id: Some(Some(new_parent)),
                    ..Default::default()
                },
            )
            .await;
        assert_matches!(result, Err(ServiceError::ValidationError(_)));
    }

    // Unchanged after the rejected moves.
    assert_eq!(categories.get(a.id).await.unwrap().parent_id, None);

    let moved = categories
        .update(
            c.id,
            UpdateCategoryInput {
                parent_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.parent_id, None);
    assert_eq!(categories.tree().await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn crossing_moves_cannot_store_a_cycle() {
    let app = TestApp::on_disk(4).await;
    let categories = &app.state.services.categories;
    let a = app.seed_category("A", None).await;
    let b = app.seed_category("B", None).await;

    let move_under = |parent: Uuid| UpdateCategoryInput {
        parent_id: Some(Some(parent)),
        ..Default::default()
    };
    let (first, second) = tokio::join!(
        categories.update(a.id, move_under(b.id)),
        categories.update(b.id, move_under(a.id)),
    );
    assert_eq!(
        [first.is_ok(), second.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );

    let a = categories.get(a.id).await.unwrap();
    let b = categories.get(b.id).await.unwrap();
    assert!(!(a.parent_id == Some(b.id) && b.parent_id == Some(a.id)));
    assert_eq!(categories.tree().await.unwrap().len(), 1);
}

#[tokio::test]
async fn depth_limit_applies_to_create_and_move() {
    let app = TestApp::with_config(|cfg| cfg.max_category_depth = 2).await;
    let categories = &app.state.services.categories;

    let root = app.seed_category("Root", None).await;
    let child = app.seed_category("Child", Some(root.id)).await;
    let result = categories
        .create(create_input("Grandchild", Some(child.id)))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("depth"));

    let other = app.seed_category("Other", None).await;
    let leaf = app.seed_category("Leaf", Some(other.id)).await;
    assert_eq!(leaf.parent_id, Some(other.id));

    // Other carries a child, so under Child it would reach depth 4.
    let result = categories
        .update(
            other.id,
            UpdateCategoryInput {
                parent_id: Some(Some(child.id)),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn find_one_returns_parent_and_children() {
    let app = TestApp::new().await;
    let parent = app.seed_category("Parent", None).await;
    let node = app.seed_category("Node", Some(parent.id)).await;
    let kid = app.seed_category("Kid", Some(node.id)).await;

    let detail = app
        .state
        .services
        .categories
        .find_one(node.id)
        .await
        .unwrap();
    assert_eq!(detail.category.id, node.id);
    assert_eq!(detail.parent.map(|p| p.id), Some(parent.id));
    assert_eq!(
        detail.children.iter().map(|c| c.id).collect::<Vec<_>>(),
        vec![kid.id]
    );
}

#[tokio::test]
async fn removing_a_category_with_content_conflicts() {
    let app = TestApp::new().await;
    let category = app.seed_category("Shelf", None).await;
    app.seed_content("Item", category.id).await;

    let result = app.state.services.categories.remove(category.id).await;
    assert_matches!(result, Err(ServiceError::Conflict(msg)) if msg.contains("content"));
}

#[tokio::test]
async fn removing_a_missing_category_is_not_found() {
    let app = TestApp::new().await;
    let result = app.state.services.categories.remove(Uuid::new_v4()).await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}
