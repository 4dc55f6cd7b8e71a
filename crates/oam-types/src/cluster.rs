//! Registered member clusters the dispatcher (C6) fans resources out to (spec.md §3, §4.6).
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The reserved name of the hub cluster: the cluster the controller itself runs in. A Cluster
/// object named `local` is never created by the user; it is synthesized so selectors can
/// uniformly address "here" alongside registered remotes.
pub const LOCAL_CLUSTER: &str = "local";

/// Points at the `Secret` holding the kubeconfig used to build a client for a non-local cluster.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretClassRef {
    pub namespace: String,
    pub name: String,

    #[serde(default = "default_secret_key")]
    pub key: String,
}

fn default_secret_key() -> String {
    "kubeconfig".to_string()
}

/// A member cluster resources may be dispatched to, referenced by name from a `topology` policy.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, CustomResource, PartialEq)]
#[kube(
    group = "core.oam.dev",
    version = "v1beta1",
    kind = "Cluster",
    namespaced,
    shortname = "cluster"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// `Some` for every cluster except `local`, whose client is the controller's own in-cluster
    /// config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_ref: Option<SecretClassRef>,

    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub labels: std::collections::BTreeMap<String, String>,
}

impl ClusterSpec {
    pub fn is_local(name: &str) -> bool {
        name == LOCAL_CLUSTER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_cluster_name_is_recognized() {
        assert!(ClusterSpec::is_local(LOCAL_CLUSTER));
        assert!(!ClusterSpec::is_local("prod-west"));
    }

    #[test]
    fn secret_key_defaults_when_omitted() {
        let yaml = "namespace: default\nname: prod-west-kubeconfig\n";
        let parsed: SecretClassRef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.key, "kubeconfig");
    }
}
