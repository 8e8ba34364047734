//! Referential rules over candidate write sets.
//!
//! Every check here runs against an in-memory [`Dictionary`] snapshot, before
//! any row is written, so a rejected call never leaves partial state behind.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{AttributeModel, AttributeValueModel};
use crate::errors::ServiceError;

/// One requested category binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BindingInput {
    pub attribute_id: Uuid,
    /// Permitted values, in display order. Empty permits none.
    #[serde(default)]
    pub value_ids: Vec<Uuid>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub sort: i32,
}

/// One explicit preset override on a content model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValuePresetInput {
    pub attribute_value_id: Uuid,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
    #[serde(default)]
    pub sort: i32,
}

fn enabled_by_default() -> bool {
    true
}

/// Snapshot of the attributes and values a write refers to.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    attributes: HashMap<Uuid, AttributeModel>,
    values: HashMap<Uuid, AttributeValueModel>,
}

impl Dictionary {
    pub fn new(attributes: Vec<AttributeModel>, values: Vec<AttributeValueModel>) -> Self {
        Self {
            attributes: attributes.into_iter().map(|a| (a.id, a)).collect(),
            values: values.into_iter().map(|v| (v.id, v)).collect(),
        }
    }

    pub fn attribute(&self, id: Uuid) -> Option<&AttributeModel> {
        self.attributes.get(&id)
    }

    pub fn value(&self, id: Uuid) -> Option<&AttributeValueModel> {
        self.values.get(&id)
    }

    fn require_attribute(&self, id: Uuid) -> Result<&AttributeModel, ServiceError> {
        self.attribute(id).ok_or_else(|| {
            ServiceError::ValidationError(format!("attribute {} does not exist", id))
        })
    }

    fn require_value(&self, id: Uuid) -> Result<&AttributeValueModel, ServiceError> {
        self.value(id).ok_or_else(|| {
            ServiceError::ValidationError(format!("attribute value {} does not exist", id))
        })
    }

    fn label(&self, attribute_id: Uuid) -> String {
        self.attribute(attribute_id)
            .map(|a| a.code.clone())
            .unwrap_or_else(|| attribute_id.to_string())
    }
}

/// Checks a full replacement binding set for one category.
pub fn validate_binding_set(
    dictionary: &Dictionary,
    bindings: &[BindingInput],
) -> Result<(), ServiceError> {
    let mut bound = HashSet::new();
    for binding in bindings {
        let attribute = dictionary.require_attribute(binding.attribute_id)?;
        if !bound.insert(binding.attribute_id) {
            return Err(ServiceError::ValidationError(format!(
                "attribute '{}' is bound more than once",
                attribute.code
            )));
        }

        let mut listed = HashSet::new();
        for &value_id in &binding.value_ids {
            if !listed.insert(value_id) {
                return Err(ServiceError::ValidationError(format!(
                    "value {} is listed twice for attribute '{}'",
                    value_id, attribute.code
                )));
            }
            let value = dictionary.require_value(value_id)?;
            if value.attribute_id != attribute.id {
                return Err(ServiceError::ValidationError(format!(
                    "value '{}' belongs to attribute '{}', not '{}'",
                    value.value,
                    dictionary.label(value.attribute_id),
                    attribute.code
                )));
            }
        }
    }
    Ok(())
}

/// Checks a content model's attribute set and preset overrides together.
pub fn validate_model_set(
    dictionary: &Dictionary,
    attribute_ids: &[Uuid],
    presets: &[ValuePresetInput],
) -> Result<(), ServiceError> {
    let mut members = HashSet::new();
    for &attribute_id in attribute_ids {
        let attribute = dictionary.require_attribute(attribute_id)?;
        if !members.insert(attribute_id) {
            return Err(ServiceError::ValidationError(format!(
                "attribute '{}' is listed more than once",
                attribute.code
            )));
        }
    }

    let mut preset_ids = HashSet::new();
    for preset in presets {
        let value = dictionary.require_value(preset.attribute_value_id)?;
        if !preset_ids.insert(preset.attribute_value_id) {
            return Err(ServiceError::ValidationError(format!(
                "value '{}' has more than one preset",
                value.value
            )));
        }
        if !members.contains(&value.attribute_id) {
            return Err(ServiceError::ValidationError(format!(
                "value '{}' belongs to attribute '{}', which is not part of the model",
                value.value,
                dictionary.label(value.attribute_id)
            )));
        }
    }
    Ok(())
}

/// Selected value ids grouped by owning attribute.
pub type Selection = BTreeMap<Uuid, Vec<Uuid>>;

/// Resolves value ids to their attributes and enforces selection modes.
///
/// Duplicate ids are collapsed; input order is otherwise kept within each group.
pub fn group_selection(
    dictionary: &Dictionary,
    value_ids: &[Uuid],
) -> Result<Selection, ServiceError> {
    let mut seen = HashSet::new();
    let mut selection = Selection::new();

    for &value_id in value_ids {
        if !seen.insert(value_id) {
            continue;
        }
        let value = dictionary.require_value(value_id)?;
        let attribute = dictionary.require_attribute(value.attribute_id)?;
        if !value.is_active || !attribute.is_active {
            return Err(ServiceError::ValidationError(format!(
                "value '{}' of attribute '{}' is inactive",
                value.value, attribute.code
            )));
        }
        selection.entry(attribute.id).or_default().push(value_id);
    }

    for (attribute_id, values) in &selection {
        let attribute = dictionary.require_attribute(*attribute_id)?;
        if !attribute.selection_mode.allows_many() && values.len() > 1 {
            return Err(ServiceError::ValidationError(format!(
                "attribute '{}' accepts a single value but {} were given",
                attribute.code,
                values.len()
            )));
        }
    }

    Ok(selection)
}

/// A category binding as seen by the assignment check.
#[derive(Debug, Clone, Default)]
pub struct AllowedBinding {
    pub attribute_id: Uuid,
    pub is_required: bool,
    pub enabled_values: HashSet<Uuid>,
}

/// The attribute set and disabled presets of a content model.
#[derive(Debug, Clone, Default)]
pub struct ModelGate {
    pub attribute_ids: HashSet<Uuid>,
    pub disabled_values: HashSet<Uuid>,
}

/// Everything that constrains assignments for one category.
#[derive(Debug, Clone, Default)]
pub struct Governance {
    pub bindings: Vec<AllowedBinding>,
    pub model: Option<ModelGate>,
}

impl Governance {
    pub fn is_ungoverned(&self) -> bool {
        self.bindings.is_empty() && self.model.is_none()
    }
}

/// Checks a grouped selection against the category's bindings and model.
pub fn check_governance(
    dictionary: &Dictionary,
    governance: &Governance,
    selection: &Selection,
) -> Result<(), ServiceError> {
    if governance.is_ungoverned() {
        if selection.is_empty() {
            return Ok(());
        }
        return Err(ServiceError::ValidationError(
            "category has neither attribute bindings nor a content model".to_string(),
        ));
    }

    if !governance.bindings.is_empty() {
        let by_attribute: HashMap<Uuid, &AllowedBinding> = governance
            .bindings
            .iter()
            .map(|b| (b.attribute_id, b))
            .collect();

        for (attribute_id, values) in selection {
            let binding = by_attribute.get(attribute_id).ok_or_else(|| {
                ServiceError::ValidationError(format!(
                    "attribute '{}' is not bound to this category",
                    dictionary.label(*attribute_id)
                ))
            })?;
            for value_id in values {
                if !binding.enabled_values.contains(value_id) {
                    return Err(ServiceError::ValidationError(format!(
                        "value '{}' is not permitted for attribute '{}' in this category",
                        value_text(dictionary, *value_id),
                        dictionary.label(*attribute_id)
                    )));
                }
            }
        }

        for binding in governance.bindings.iter().filter(|b| b.is_required) {
            if !selection.contains_key(&binding.attribute_id) {
                return Err(ServiceError::ValidationError(format!(
                    "attribute '{}' is required",
                    dictionary.label(binding.attribute_id)
                )));
            }
        }
    }

    if let Some(model) = &governance.model {
        for (attribute_id, values) in selection {
            if !model.attribute_ids.contains(attribute_id) {
                return Err(ServiceError::ValidationError(format!(
                    "attribute '{}' is not part of the category's content model",
                    dictionary.label(*attribute_id)
                )));
            }
            if let Some(disabled) = values.iter().find(|v| model.disabled_values.contains(v)) {
                return Err(ServiceError::ValidationError(format!(
                    "value '{}' is disabled by the category's content model",
                    value_text(dictionary, *disabled)
                )));
            }
        }
    }

    Ok(())
}

fn value_text(dictionary: &Dictionary, value_id: Uuid) -> String {
    dictionary
        .value(value_id)
        .map(|v| v.value.clone())
        .unwrap_or_else(|| value_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SelectionMode;
    use assert_matches::assert_matches;
    use chrono::Utc;

    struct Fixture {
        dictionary: Dictionary,
        color: Uuid,
        red: Uuid,
        blue: Uuid,
        format: Uuid,
        pdf: Uuid,
        epub: Uuid,
    }

    fn attribute(code: &str, mode: SelectionMode) -> AttributeModel {
        AttributeModel {
            id: Uuid::new_v4(),
            name: code.to_uppercase(),
            code: code.to_string(),
            description: None,
            selection_mode: mode,
            is_active: true,
            sort: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn value(attribute_id: Uuid, text: &str, sort: i32) -> AttributeValueModel {
        AttributeValueModel {
            id: Uuid::new_v4(),
            attribute_id,
            value: text.to_string(),
            sort,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn fixture() -> Fixture {
        let color = attribute("color", SelectionMode::Multi);
        let format = attribute("format", SelectionMode::Single);
        let red = value(color.id, "Red", 0);
        let blue = value(color.id, "Blue", 1);
        let pdf = value(format.id, "PDF", 0);
        let epub = value(format.id, "EPUB", 1);

        Fixture {
            color: color.id,
            red: red.id,
            blue: blue.id,
            format: format.id,
            pdf: pdf.id,
            epub: epub.id,
            dictionary: Dictionary::new(vec![color, format], vec![red, blue, pdf, epub]),
        }
    }

    fn binding(attribute_id: Uuid, value_ids: Vec<Uuid>) -> BindingInput {
        BindingInput {
            attribute_id,
            value_ids,
            required: false,
            sort: 0,
        }
    }

    #[test]
    fn binding_set_accepts_owned_values() {
        let f = fixture();
        let set = vec![binding(f.color, vec![f.red]), binding(f.format, vec![])];
        assert!(validate_binding_set(&f.dictionary, &set).is_ok());
    }

    #[test]
    fn binding_set_rejects_foreign_value() {
        let f = fixture();
        let set = vec![binding(f.color, vec![f.pdf])];
        assert_matches!(
            validate_binding_set(&f.dictionary, &set),
            Err(ServiceError::ValidationError(msg)) if msg.contains("belongs to attribute 'format'")
        );
    }

    #[test]
    fn binding_set_rejects_unknown_and_duplicates() {
        let f = fixture();
        assert_matches!(
            validate_binding_set(&f.dictionary, &[binding(Uuid::new_v4(), vec![])]),
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            validate_binding_set(
                &f.dictionary,
                &[binding(f.color, vec![]), binding(f.color, vec![f.red])]
            ),
            Err(ServiceError::ValidationError(msg)) if msg.contains("more than once")
        );
        assert_matches!(
            validate_binding_set(&f.dictionary, &[binding(f.color, vec![f.red, f.red])]),
            Err(ServiceError::ValidationError(msg)) if msg.contains("listed twice")
        );
    }

    #[test]
    fn model_set_requires_presets_inside_member_attributes() {
        let f = fixture();
        let preset = ValuePresetInput {
            attribute_value_id: f.pdf,
            is_enabled: false,
            sort: 3,
        };
        assert!(validate_model_set(&f.dictionary, &[f.color, f.format], &[preset.clone()]).is_ok());
        assert_matches!(
            validate_model_set(&f.dictionary, &[f.color], &[preset]),
            Err(ServiceError::ValidationError(msg)) if msg.contains("not part of the model")
        );
    }

    #[test]
    fn single_mode_rejects_two_values() {
        let f = fixture();
        assert_matches!(
            group_selection(&f.dictionary, &[f.pdf, f.epub]),
            Err(ServiceError::ValidationError(msg)) if msg.contains("single value")
        );
    }

    #[test]
    fn selection_collapses_duplicates_and_groups() {
        let f = fixture();
        let selection = group_selection(&f.dictionary, &[f.red, f.pdf, f.red, f.blue]).unwrap();
        assert_eq!(selection.get(&f.color), Some(&vec![f.red, f.blue]));
        assert_eq!(selection.get(&f.format), Some(&vec![f.pdf]));
    }

    #[test]
    fn bindings_restrict_values_and_enforce_required() {
        let f = fixture();
        let governance = Governance {
            bindings: vec![
                AllowedBinding {
                    attribute_id: f.color,
                    is_required: false,
                    enabled_values: HashSet::from([f.red]),
                },
                AllowedBinding {
                    attribute_id: f.format,
                    is_required: true,
                    enabled_values: HashSet::from([f.pdf, f.epub]),
                },
            ],
            model: None,
        };

        let ok = group_selection(&f.dictionary, &[f.red, f.pdf]).unwrap();
        assert!(check_governance(&f.dictionary, &governance, &ok).is_ok());

        let blue = group_selection(&f.dictionary, &[f.blue, f.pdf]).unwrap();
        assert_matches!(
            check_governance(&f.dictionary, &governance, &blue),
            Err(ServiceError::ValidationError(msg)) if msg.contains("'Blue' is not permitted")
        );

        let missing = group_selection(&f.dictionary, &[f.red]).unwrap();
        assert_matches!(
            check_governance(&f.dictionary, &governance, &missing),
            Err(ServiceError::ValidationError(msg)) if msg.contains("'format' is required")
        );
    }

    #[test]
    fn model_gate_cross_checks_membership_and_disabled_presets() {
        let f = fixture();
        let governance = Governance {
            bindings: Vec::new(),
            model: Some(ModelGate {
                attribute_ids: HashSet::from([f.color]),
                disabled_values: HashSet::from([f.blue]),
            }),
        };

        let red = group_selection(&f.dictionary, &[f.red]).unwrap();
        assert!(check_governance(&f.dictionary, &governance, &red).is_ok());

        let blue = group_selection(&f.dictionary, &[f.blue]).unwrap();
        assert!(check_governance(&f.dictionary, &governance, &blue).is_err());

        let pdf = group_selection(&f.dictionary, &[f.pdf]).unwrap();
        assert!(check_governance(&f.dictionary, &governance, &pdf).is_err());
    }

    #[test]
    fn ungoverned_category_accepts_only_empty_selection() {
        let f = fixture();
        let governance = Governance::default();
        assert!(check_governance(&f.dictionary, &governance, &Selection::new()).is_ok());
        let red = group_selection(&f.dictionary, &[f.red]).unwrap();
        assert!(check_governance(&f.dictionary, &governance, &red).is_err());
    }
}
