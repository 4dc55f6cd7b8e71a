//! The user-authored `Application` (spec.md §3) and the status the controller (C8) reports.
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use oam_shared::schema_ext::{raw_object_list_schema, raw_object_schema};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::policy::Policy;
use crate::workflow::Workflow;

/// One named input wired from another component's output (spec.md §3).
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInput {
    pub from: String,
    pub parameter_key: String,
}

/// One named output a component exposes, extracted from its rendered resource.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentOutput {
    pub name: String,
    pub value_from: String,
}

/// An overlay modifying a single [`Component`]'s rendered resource (spec.md §3, §4.3).
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trait {
    #[serde(rename = "type")]
    pub type_: String,

    #[schemars(schema_with = "raw_object_schema")]
    #[serde(default)]
    pub properties: serde_json::Value,
}

/// A single addressable unit of the Application, typed by a `ComponentDefinition`
/// (spec.md §3). `name` is unique within the Application; `dependsOn` and the component names
/// referenced by `inputs` must resolve within the same app, and the combined dependency graph
/// must be acyclic.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub name: String,

    #[serde(rename = "type")]
    pub type_: String,

    #[schemars(schema_with = "raw_object_schema")]
    #[serde(default)]
    pub properties: serde_json::Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<Trait>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<ComponentInput>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<ComponentOutput>,
}

/// The user's declarative application: components, policies, and an optional workflow
/// (spec.md §3).
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "Application",
    namespaced,
    status = "ApplicationStatus",
    shortname = "app"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    pub components: Vec<Component>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<Policy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
}

/// `status.phase` (spec.md §6).
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ApplicationPhase {
    #[default]
    Rendering,
    Running,
    WorkflowSuspended,
    WorkflowTerminated,
    WorkflowFailed,
    Unhealthy,
    Healthy,
    Deleting,
}

/// Per-trait health reported under a component's service status.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraitStatus {
    #[serde(rename = "type")]
    pub type_: String,
    pub healthy: bool,
}

/// `status.services[]` (spec.md §6): per-component health aggregation.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub name: String,
    pub healthy: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<TraitStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Per-step status reported under `status.workflow.steps[]`.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepStatus {
    pub name: String,

    #[serde(rename = "type")]
    pub type_: String,

    pub phase: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_execute_time: Option<k8s_openapi::apimachinery::pkg::apis::meta::v1::Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execute_time: Option<k8s_openapi::apimachinery::pkg::apis::meta::v1::Time>,
}

/// `status.workflow` (spec.md §6).
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_revision: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_backend: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepStatus>,

    #[serde(default)]
    pub suspend: bool,

    #[serde(default)]
    pub terminated: bool,

    #[serde(default)]
    pub finished: bool,
}

/// A pointer to the currently active [`crate::ApplicationRevision`].
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestRevision {
    pub name: String,
    pub revision: u64,
    pub revision_hash: String,
}

/// The status the Application Controller (C8) populates (spec.md §6).
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationStatus {
    #[serde(default)]
    pub phase: ApplicationPhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_revision: Option<LatestRevision>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schemars(schema_with = "raw_object_list_schema")]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_spec_roundtrips_through_yaml() {
        let spec = ApplicationSpec {
            components: vec![Component {
                name: "nginx".to_string(),
                type_: "webservice".to_string(),
                properties: serde_json::json!({"image": "nginx:1.21", "port": 80}),
                traits: vec![],
                depends_on: vec![],
                inputs: vec![],
                outputs: vec![],
            }],
            policies: vec![],
            workflow: None,
        };

        let yaml = serde_yaml::to_string(&spec).unwrap();
        let parsed: ApplicationSpec = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn default_phase_is_rendering() {
        assert_eq!(ApplicationStatus::default().phase, ApplicationPhase::Rendering);
    }
}
