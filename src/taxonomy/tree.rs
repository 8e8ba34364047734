//! Category hierarchy helpers that never touch the database.
//!
//! The tree is assembled from the flat category list with an id→index map and
//! an explicit stack, so construction is linear in the number of categories
//! and cannot overflow on deep chains.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::CategoryModel;

/// One node of the nested category view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoryTreeNode {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub content_model_id: Option<Uuid>,
    pub sort: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    #[schema(no_recursion)]
    pub children: Vec<CategoryTreeNode>,
}

impl From<CategoryModel> for CategoryTreeNode {
    fn from(category: CategoryModel) -> Self {
        Self {
            id: category.id,
            name: category.name,
            slug: category.slug,
            description: category.description,
            parent_id: category.parent_id,
            content_model_id: category.content_model_id,
            sort: category.sort,
            is_active: category.is_active,
            created_at: category.created_at,
            children: Vec::new(),
        }
    }
}

/// Listing order: `sort` ascending, newest first among equal sorts.
pub fn listing_order(a: &CategoryModel, b: &CategoryModel) -> Ordering {
    a.sort
        .cmp(&b.sort)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_for_listing(categories: &mut [CategoryModel]) {
    categories.sort_by(listing_order);
}

/// Maps the legacy nil-uuid root sentinel onto `None`.
pub fn normalize_parent_id(parent_id: Option<Uuid>) -> Option<Uuid> {
    parent_id.filter(|id| !id.is_nil())
}

/// Builds the nested view from a flat category list.
///
/// Categories whose parent is missing from the list are treated as roots.
/// Every input category appears exactly once in the output, even when the
/// stored parent links contain a cycle; the first member of such a cycle (in
/// listing order) is promoted to a root.
pub fn build_tree(mut categories: Vec<CategoryModel>) -> Vec<CategoryTreeNode> {
    sort_for_listing(&mut categories);
    let n = categories.len();

    let index: HashMap<Uuid, usize> = categories
        .iter()
        .enumerate()
        .map(|(i, c)| (c.id, i))
        .collect();

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut roots = Vec::new();
    for (i, category) in categories.iter().enumerate() {
        let parent = normalize_parent_id(category.parent_id)
            .and_then(|p| index.get(&p).copied())
            .filter(|&p| p != i);
        match parent {
            Some(p) => children[p].push(i),
            None => roots.push(i),
        }
    }

    // Preorder walk; parents always precede their children in `order`.
    let mut visited = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut tree_children: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut tree_roots = Vec::with_capacity(roots.len());

    let starts = roots.into_iter().chain(0..n);
    for start in starts {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        tree_roots.push(start);

        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            order.push(current);
            for &child in &children[current] {
                if !visited[child] {
                    visited[child] = true;
                    tree_children[current].push(child);
                    stack.push(child);
                }
            }
        }
    }

    let mut slots: Vec<Option<CategoryModel>> = categories.into_iter().map(Some).collect();
    let mut built: Vec<Option<CategoryTreeNode>> = (0..n).map(|_| None).collect();
    for &i in order.iter().rev() {
        let Some(category) = slots[i].take() else {
            continue;
        };
        let mut node = CategoryTreeNode::from(category);
        node.children = tree_children[i]
            .iter()
            .filter_map(|&c| built[c].take())
            .collect();
        built[i] = Some(node);
    }

    tree_roots
        .into_iter()
        .filter_map(|r| built[r].take())
        .collect()
}

/// Child→parent links of the whole tree, used for cycle and depth checks.
#[derive(Debug, Default, Clone)]
pub struct ParentIndex {
    parents: HashMap<Uuid, Option<Uuid>>,
}

impl ParentIndex {
    pub fn new<I>(links: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, Option<Uuid>)>,
    {
        Self {
            parents: links
                .into_iter()
                .map(|(id, parent)| (id, normalize_parent_id(parent)))
                .collect(),
        }
    }

    pub fn from_categories(categories: &[CategoryModel]) -> Self {
        Self::new(categories.iter().map(|c| (c.id, c.parent_id)))
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.parents.contains_key(&id)
    }

    pub fn parent_of(&self, id: Uuid) -> Option<Uuid> {
        self.parents.get(&id).copied().flatten()
    }

    /// Ancestors of `id`, nearest first. Stops if the stored links loop.
    pub fn ancestors(&self, id: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::from([id]);
        let mut out = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            out.push(parent);
            current = self.parent_of(parent);
        }
        out
    }

    /// True if re-parenting `node` under `new_parent` would close a loop,
    /// i.e. `new_parent` is `node` itself or one of its descendants.
    pub fn would_create_cycle(&self, node: Uuid, new_parent: Uuid) -> bool {
        new_parent == node || self.ancestors(new_parent).contains(&node)
    }

    /// Depth of `id`, roots being depth 1.
    pub fn depth(&self, id: Uuid) -> usize {
        self.ancestors(id).len() + 1
    }

    /// Height of the subtree rooted at `id`; a leaf has height 1.
    pub fn subtree_height(&self, id: Uuid) -> usize {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (&child, parent) in &self.parents {
            if let Some(parent) = parent {
                children.entry(*parent).or_default().push(child);
            }
        }

        let mut visited = HashSet::from([id]);
        let mut stack = vec![(id, 1usize)];
        let mut height = 0;
        while let Some((current, level)) = stack.pop() {
            height = height.max(level);
            for &child in children.get(&current).map(Vec::as_slice).unwrap_or_default() {
                if visited.insert(child) {
                    stack.push((child, level + 1));
                }
            }
        }
        height
    }
}

/// Derives a URL slug: lowercased Unicode letters and digits, every other
/// run collapsed to a single `-`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars().flat_map(char::to_lowercase) {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Slug for a name that yields nothing under [`slugify`], e.g. pure punctuation.
pub fn fallback_slug(id: Uuid) -> String {
    format!("category-{}", id.simple())
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty() && slugify(slug) == slug
}
