//! Immutable snapshots of a rendered `Application` (spec.md §3, §4.2): each successful render
//! produces one, named `<app>-v<n>`, and reconciliation always dispatches from a revision, never
//! from the live `Application.spec` directly.
use kube::CustomResource;
use oam_shared::schema_ext::raw_object_schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationSpec;

/// A point-in-time, content-addressed snapshot of an Application's spec and the Definitions it
/// was resolved against.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "ApplicationRevision",
    namespaced,
    shortname = "apprev"
)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationRevisionSpec {
    pub revision_name: String,
    pub revision_number: u64,

    /// `hash::revision_hash(spec, resolved_definitions)`; two revisions with the same hash are
    /// the same render and the controller skips re-rendering (spec.md §8).
    pub revision_hash: String,

    pub spec: ApplicationSpec,

    /// The exact `ComponentDefinition`/`TraitDefinition`/... bodies resolved at render time,
    /// keyed by `"<kind>/<name>"`, frozen so a later edit to a Definition cannot silently change
    /// the meaning of an already-dispatched revision.
    #[schemars(schema_with = "raw_object_schema")]
    pub resolved_definitions: serde_json::Value,
}

impl ApplicationRevisionSpec {
    /// The conventional `<app>-v<n>` revision name (spec.md §4.2).
    pub fn name_for(app_name: &str, revision_number: u64) -> String {
        format!("{app_name}-v{revision_number}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_name_follows_the_app_v_n_convention() {
        assert_eq!(
            ApplicationRevisionSpec::name_for("webapp", 3),
            "webapp-v3"
        );
    }
}
