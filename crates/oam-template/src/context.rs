//! The `context` object injected into every template evaluation (spec.md §4.2).
use std::collections::BTreeMap;

use serde::Serialize;

/// `{name, appName, namespace, appRevision, appLabels, appAnnotations, output?, outputs?}`.
/// `output`/`outputs` are only populated while evaluating a Trait, where they expose the
/// component's already-rendered primary resource and any sibling resources emitted so far.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub name: String,
    pub app_name: String,
    pub namespace: String,
    pub app_revision: String,

    #[serde(default)]
    pub app_labels: BTreeMap<String, String>,

    #[serde(default)]
    pub app_annotations: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outputs: Option<serde_json::Value>,

    /// The active `replication` policy's key, exposed as `context.replicaKey` (spec.md §4.4).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replica_key: Option<String>,
}

impl Context {
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("Context always serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let ctx = Context {
            name: "nginx".to_string(),
            app_name: "web".to_string(),
            namespace: "default".to_string(),
            app_revision: "web-v1".to_string(),
            ..Default::default()
        };
        let value = ctx.to_value();
        assert_eq!(value["appName"], "web");
        assert_eq!(value["appRevision"], "web-v1");
        assert!(value.get("output").is_none());
    }
}
