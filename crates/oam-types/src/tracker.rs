//! Records which Kubernetes objects an `Application` owns, across every cluster it was
//! dispatched to, so the GC pass (C7) can compute precisely what to delete on update or removal
//! (spec.md §3, §4.7).
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::policy::GcRule;

/// What produced a tracked resource, carried so GC can tell a component's own workload apart
/// from a trait's or policy's side-effect resources.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Creator {
    Component,
    Trait(String),
    Policy(String),
    WorkflowStep(String),
}

/// One resource dispatched on behalf of the owning Application.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTrackerEntry {
    pub cluster: String,
    pub api_version: String,
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,

    pub component_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trait_type: Option<String>,

    pub creator: Creator,

    /// Whether dispatch actually created this object, or it pre-existed and was only adopted
    /// (`take-over`/`shared-resource` policies, spec.md §4.4).
    #[serde(default)]
    pub created: bool,

    /// Whether a `shared-resource` policy matched this entry: GC (C7) must remove this
    /// Application from the object's sharer list rather than deleting it outright, unless it
    /// was the last remaining sharer (spec.md §3).
    #[serde(default)]
    pub shared: bool,
}

/// The live inventory of everything an Application's latest revision dispatched, across every
/// cluster, plus the `garbage-collect` rules to apply when pruning it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "ResourceTracker",
    namespaced,
    shortname = "rt"
)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTrackerSpec {
    pub owner_app: String,
    pub revision: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entries: Vec<ResourceTrackerEntry>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gc_rules: Vec<GcRule>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_trait_variant_round_trips_through_yaml() {
        let entry = ResourceTrackerEntry {
            cluster: "local".to_string(),
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            namespace: Some("default".to_string()),
            name: "nginx-expose".to_string(),
            component_name: "nginx".to_string(),
            trait_type: Some("expose".to_string()),
            creator: Creator::Trait("expose".to_string()),
            created: true,
            shared: false,
        };
        let yaml = serde_yaml::to_string(&entry).unwrap();
        let parsed: ResourceTrackerEntry = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, entry);
    }
}
