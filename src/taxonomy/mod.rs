//! Persistence-free taxonomy logic shared by the services.

pub mod presets;
pub mod rules;
pub mod tree;

pub use presets::{merge_model_values, MergedValue};
pub use rules::{
    check_governance, group_selection, validate_binding_set, validate_model_set, AllowedBinding,
    BindingInput, Dictionary, Governance, ModelGate, Selection, ValuePresetInput,
};
pub use tree::{
    build_tree, fallback_slug, is_valid_slug, listing_order, normalize_parent_id, slugify,
    sort_for_listing, CategoryTreeNode, ParentIndex,
};
