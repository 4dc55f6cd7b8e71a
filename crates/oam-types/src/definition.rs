//! The registered capability kinds (spec.md §3, §4.1): the template + schema + attributes
//! behind every Component/Trait/Policy/WorkflowStep type name used on an `Application`.
use kube::CustomResource;
use oam_shared::schema_ext::raw_object_schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// The four kinds of Definitions the Definition Store (C1) resolves.
#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq, Hash)]
#[strum(serialize_all = "PascalCase")]
pub enum DefinitionKind {
    Component,
    Trait,
    Policy,
    WorkflowStep,
}

/// `{template, parameterSchema}` (spec.md §3): the evaluable body of a Definition and the
/// schema its `parameter`/`properties` input is validated against.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Schematic {
    #[schemars(schema_with = "raw_object_schema")]
    pub template: serde_json::Value,

    #[schemars(schema_with = "raw_object_schema")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_schema: Option<serde_json::Value>,
}

/// The underlying Kubernetes kind a Definition ultimately produces or patches.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionRef {
    pub name: String,
}

/// Behavioral flags carried on a Definition (spec.md §3).
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attributes {
    /// Whether applying this trait requires restarting the workload's pods.
    #[serde(default)]
    pub pod_disruptive: bool,

    /// Whether this trait/component owns health-check evaluation instead of deferring to the
    /// component's default.
    #[serde(default)]
    pub manage_health_check: bool,

    /// Where a trait stores the back-reference to the workload it applies to, as a JSON path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workload_ref_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_ref: Option<DefinitionRef>,
}

/// Registers a Component type: its workload kind and evaluable template.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "ComponentDefinition",
    namespaced,
    shortname = "comp-def"
)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDefinitionSpec {
    #[serde(default)]
    pub attributes: Attributes,
    pub schematic: Schematic,
}

/// Registers a Trait type: which workload kinds it may apply to and its patch/outputs template.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "TraitDefinition",
    namespaced,
    shortname = "trait-def"
)]
#[serde(rename_all = "camelCase")]
pub struct TraitDefinitionSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub applies_to_workloads: Vec<String>,

    #[serde(default)]
    pub attributes: Attributes,
    pub schematic: Schematic,
}

/// Registers a Policy type: its evaluable Application-transform or resource-scoped template.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "PolicyDefinition",
    namespaced,
    shortname = "policy-def"
)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDefinitionSpec {
    pub schematic: Schematic,
}

/// Registers a WorkflowStep type.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "WorkflowStepDefinition",
    namespaced,
    shortname = "wfstep-def"
)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStepDefinitionSpec {
    pub schematic: Schematic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_kind_round_trips_through_display_and_from_str() {
        assert_eq!(DefinitionKind::WorkflowStep.to_string(), "WorkflowStep");
        assert_eq!(
            "Trait".parse::<DefinitionKind>().unwrap(),
            DefinitionKind::Trait
        );
    }
}
