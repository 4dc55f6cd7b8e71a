//! The ordered step graph governing dispatch (spec.md §3, §4.5).
use oam_shared::time::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A single named input wired from a prior step's/component's output.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepInput {
    pub from: String,
    pub parameter_key: String,
}

/// A single named output this step exposes, extracted from its applied resource via `valueFrom`.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub name: String,
    pub value_from: String,
}

/// One node of the workflow DAG (spec.md §4.5). `type_` is one of the built-in step types
/// (`apply-component`, `apply-remaining`, `deploy`, `suspend`, `notification`, `step-group`) or a
/// user-registered `WorkflowStepDefinition`.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub name: String,

    #[serde(rename = "type")]
    pub type_: String,

    #[schemars(schema_with = "oam_shared::schema_ext::raw_object_schema")]
    #[serde(default)]
    pub properties: serde_json::Value,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<StepInput>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<StepOutput>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Duration>,

    /// A boolean expression over prior step outputs; `false` skips the step.
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub if_: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_limit: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<Duration>,

    #[serde(default)]
    pub continue_on_error: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,

    /// Substeps of a `step-group`; themselves form a DAG and terminate when all reach a
    /// terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_steps: Option<Vec<WorkflowStep>>,
}

/// The user-declared workflow; absent on an [`crate::Application`] means the controller
/// synthesizes a default one (spec.md §4.5).
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<WorkflowStep>,
}
