//! The cross-cutting `Policy` object (spec.md §3, §4.4) and the selector shape every
//! resource-scoped policy shares.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A cross-cutting directive attached to an [`crate::Application`]. `type_` names one of the
/// core policy types (`topology`, `override`, `replication`, `shared-resource`, `read-only`,
/// `apply-once`, `garbage-collect`, `take-over`) or a user-registered `PolicyDefinition`.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub name: String,

    #[serde(rename = "type")]
    pub type_: String,

    #[schemars(schema_with = "oam_shared::schema_ext::raw_object_schema")]
    pub properties: serde_json::Value,
}

/// The common selector shape shared by every resource-scoped policy (spec.md §4.4): a policy
/// applies to a resource when every field present here matches.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_names: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oam_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_names: Option<Vec<String>>,
}

/// The resource attributes a [`Selector`] is matched against.
#[derive(Clone, Debug, Default)]
pub struct SelectorCandidate<'a> {
    pub component_name: Option<&'a str>,
    pub component_type: Option<&'a str>,
    pub oam_type: Option<&'a str>,
    pub trait_type: Option<&'a str>,
    pub resource_type: Option<&'a str>,
    pub resource_name: Option<&'a str>,
}

impl Selector {
    /// An entry matches when every provided field matches; fields left unset are ignored.
    pub fn matches(&self, candidate: &SelectorCandidate<'_>) -> bool {
        Self::field_matches(&self.component_names, candidate.component_name)
            && Self::field_matches(&self.component_types, candidate.component_type)
            && Self::field_matches(&self.oam_types, candidate.oam_type)
            && Self::field_matches(&self.trait_types, candidate.trait_type)
            && Self::field_matches(&self.resource_types, candidate.resource_type)
            && Self::field_matches(&self.resource_names, candidate.resource_name)
    }

    fn field_matches(selector_values: &Option<Vec<String>>, actual: Option<&str>) -> bool {
        match (selector_values, actual) {
            (None, _) => true,
            (Some(values), Some(actual)) => values.iter().any(|v| v == actual),
            (Some(_), None) => false,
        }
    }
}

/// The strategy a `garbage-collect` policy rule assigns to matching resources (spec.md §4.4,
/// §4.7).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GcStrategy {
    #[default]
    OnAppUpdate,
    OnAppDelete,
    Never,
}

/// One rule of a `garbage-collect` policy's `rules` list.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GcRule {
    pub selector: Selector,
    pub strategy: GcStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selector_matches_everything() {
        let selector = Selector::default();
        assert!(selector.matches(&SelectorCandidate {
            trait_type: Some("expose"),
            ..Default::default()
        }));
    }

    #[test]
    fn selector_rejects_on_any_mismatching_field() {
        let selector = Selector {
            trait_types: Some(vec!["expose".to_string()]),
            ..Default::default()
        };
        assert!(!selector.matches(&SelectorCandidate {
            trait_type: Some("scaler"),
            ..Default::default()
        }));
        assert!(!selector.matches(&SelectorCandidate {
            trait_type: None,
            ..Default::default()
        }));
    }

    #[test]
    fn selector_matches_one_of_several_names() {
        let selector = Selector {
            component_names: Some(vec!["nginx".to_string(), "redis".to_string()]),
            ..Default::default()
        };
        assert!(selector.matches(&SelectorCandidate {
            component_name: Some("redis"),
            ..Default::default()
        }));
    }
}
