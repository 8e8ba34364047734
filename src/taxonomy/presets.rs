use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{AttributeValueModel, ModelAttributeValueModel};

/// A dictionary value with its effective preset for one content model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MergedValue {
    pub attribute_value_id: Uuid,
    pub value: String,
    pub is_active: bool,
    pub is_enabled: bool,
    pub sort: i32,
    /// True when the model carries an explicit preset row for this value.
    pub overridden: bool,
}

const DEFAULT_ENABLED: bool = true;
const DEFAULT_SORT: i32 = 0;

/// Merges the full value list of one attribute with a model's presets.
///
/// Values without a preset default to enabled with sort 0. The result is
/// ordered by effective sort, then by dictionary sort.
pub fn merge_model_values(
    values: &[AttributeValueModel],
    presets: &[ModelAttributeValueModel],
) -> Vec<MergedValue> {
    let by_value: HashMap<Uuid, &ModelAttributeValueModel> =
        presets.iter().map(|p| (p.attribute_value_id, p)).collect();

    let mut merged: Vec<(i32, MergedValue)> = values
        .iter()
        .map(|value| {
            let preset = by_value.get(&value.id);
            let entry = MergedValue {
                attribute_value_id: value.id,
                value: value.value.clone(),
                is_active: value.is_active,
                is_enabled: preset.map_or(DEFAULT_ENABLED, |p| p.is_enabled),
                sort: preset.map_or(DEFAULT_SORT, |p| p.sort),
                overridden: preset.is_some(),
            };
            (value.sort, entry)
        })
        .collect();

    merged.sort_by(|(a_dict, a), (b_dict, b)| a.sort.cmp(&b.sort).then(a_dict.cmp(b_dict)));
    merged.into_iter().map(|(_, entry)| entry).collect()
}
