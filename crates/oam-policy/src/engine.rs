//! Composes the Application-scoped policies into a single effective application, and splits out
//! the resource-scoped policies for later consumption by the dispatcher (C6) and tracker (C7).
//!
//! Composition order (spec.md §4.4): `override` is applied before `replication`; `topology` is
//! resolved last, after components have taken their final shape.
use std::collections::BTreeMap;

use oam_types::{ApplicationSpec, Component};
use snafu::ResultExt;

use crate::error::{Error, MalformedPropertiesSnafu};
use crate::garbage_collect::GarbageCollectPolicy;
use crate::override_::OverridePolicy;
use crate::read_only::ReadOnlyPolicy;
use crate::replication::ReplicationPolicy;
use crate::shared_resource::SharedResourcePolicy;
use crate::take_over::TakeOverPolicy;
use crate::topology::TopologyPolicy;
use crate::apply_once::ApplyOncePolicy;

/// The resource-scoped policies left for C6/C7 to enforce per-resource.
#[derive(Clone, Debug, Default)]
pub struct ResourcePolicies {
    pub shared_resource: Vec<SharedResourcePolicy>,
    pub read_only: Vec<ReadOnlyPolicy>,
    pub take_over: Vec<TakeOverPolicy>,
    pub apply_once: Vec<ApplyOncePolicy>,
    pub garbage_collect: Vec<GarbageCollectPolicy>,
}

/// The result of composing every Application-scoped policy against an [`ApplicationSpec`].
#[derive(Clone, Debug)]
pub struct EffectiveApplication {
    pub components: Vec<Component>,
    pub clusters: Vec<String>,
    pub resource_policies: ResourcePolicies,
    /// `topology.namespace`, when set: overrides the namespace components are deployed into
    /// (spec.md §4.4), in place of the Application's own namespace.
    pub namespace_override: Option<String>,
}

#[derive(Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    pub fn new() -> Self {
        Self
    }

    /// Parses and composes every policy attached to `spec`. `cluster_labels` is the set of
    /// labels known clusters carry, used to resolve `topology.clusterLabelSelector`.
    pub fn compose(
        &self,
        app_name: &str,
        spec: &ApplicationSpec,
        cluster_labels: &BTreeMap<String, BTreeMap<String, String>>,
    ) -> Result<EffectiveApplication, Error> {
        let mut components = spec.components.clone();
        let mut resource_policies = ResourcePolicies::default();
        let mut clusters = vec![oam_types::LOCAL_CLUSTER.to_string()];
        let mut namespace_override = None;

        for policy in &spec.policies {
            match policy.type_.as_str() {
                "override" => {
                    let parsed: OverridePolicy = parse(policy)?;
                    parsed.apply(&policy.name, &mut components)?;
                }
                "shared-resource" => resource_policies.shared_resource.push(parse(policy)?),
                "read-only" => resource_policies.read_only.push(parse(policy)?),
                "take-over" => resource_policies.take_over.push(parse(policy)?),
                "apply-once" => resource_policies.apply_once.push(parse(policy)?),
                "garbage-collect" => resource_policies.garbage_collect.push(parse(policy)?),
                // "replication" and "topology" are applied below, in their mandated order, after
                // every other policy has had its say. Unknown types reference a user-registered
                // PolicyDefinition, evaluated by the template evaluator (C2) instead.
                _ => {}
            }
        }

        for policy in &spec.policies {
            if policy.type_ == "replication" {
                let parsed: ReplicationPolicy = parse(policy)?;
                components = parsed.apply(components);
            }
        }

        for policy in &spec.policies {
            if policy.type_ == "topology" {
                let parsed: TopologyPolicy = parse(policy)?;
                clusters = parsed.resolve_clusters(&policy.name, cluster_labels)?;
                namespace_override = parsed.namespace.clone();
            }
        }

        let _ = app_name;
        Ok(EffectiveApplication {
            components,
            clusters,
            resource_policies,
            namespace_override,
        })
    }
}

fn parse<T: serde::de::DeserializeOwned>(policy: &oam_types::Policy) -> Result<T, Error> {
    serde_json::from_value(policy.properties.clone()).context(MalformedPropertiesSnafu {
        name: policy.name.clone(),
        type_: policy.type_.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::{Component, Policy};

    fn component(name: &str) -> Component {
        Component {
            name: name.to_string(),
            type_: "webservice".to_string(),
            properties: serde_json::json!({}),
            traits: vec![],
            depends_on: vec![],
            inputs: vec![],
            outputs: vec![],
        }
    }

    #[test]
    fn defaults_to_the_local_cluster_when_no_topology_policy_is_present() {
        let spec = ApplicationSpec {
            components: vec![component("nginx")],
            policies: vec![],
            workflow: None,
        };
        let effective = PolicyEngine::new()
            .compose("app", &spec, &BTreeMap::new())
            .unwrap();
        assert_eq!(effective.clusters, vec![oam_types::LOCAL_CLUSTER.to_string()]);
        assert_eq!(effective.components.len(), 1);
    }

    #[test]
    fn override_runs_before_replication_expands_the_set() {
        let spec = ApplicationSpec {
            components: vec![component("nginx")],
            policies: vec![
                Policy {
                    name: "patch-image".to_string(),
                    type_: "override".to_string(),
                    properties: serde_json::json!({
                        "components": [{"name": "nginx", "properties": {"image": "nginx:1.25"}}]
                    }),
                },
                Policy {
                    name: "fan-out".to_string(),
                    type_: "replication".to_string(),
                    properties: serde_json::json!({"keys": ["east", "west"]}),
                },
            ],
            workflow: None,
        };
        let effective = PolicyEngine::new()
            .compose("app", &spec, &BTreeMap::new())
            .unwrap();
        assert_eq!(effective.components.len(), 2);
        for component in &effective.components {
            assert_eq!(component.properties["image"], "nginx:1.25");
        }
    }

    #[test]
    fn topology_namespace_override_is_threaded_onto_the_effective_application() {
        let spec = ApplicationSpec {
            components: vec![component("nginx")],
            policies: vec![Policy {
                name: "cross-ns".to_string(),
                type_: "topology".to_string(),
                properties: serde_json::json!({"clusters": ["local"], "namespace": "prod"}),
            }],
            workflow: None,
        };
        let effective = PolicyEngine::new()
            .compose("app", &spec, &BTreeMap::new())
            .unwrap();
        assert_eq!(effective.namespace_override.as_deref(), Some("prod"));
    }

    #[test]
    fn namespace_override_is_none_without_a_topology_policy() {
        let spec = ApplicationSpec {
            components: vec![component("nginx")],
            policies: vec![],
            workflow: None,
        };
        let effective = PolicyEngine::new()
            .compose("app", &spec, &BTreeMap::new())
            .unwrap();
        assert_eq!(effective.namespace_override, None);
    }

    #[test]
    fn unknown_policy_type_is_left_for_the_template_evaluator() {
        let spec = ApplicationSpec {
            components: vec![component("nginx")],
            policies: vec![Policy {
                name: "custom".to_string(),
                type_: "my-company.com/custom".to_string(),
                properties: serde_json::json!({"anything": true}),
            }],
            workflow: None,
        };
        let effective = PolicyEngine::new()
            .compose("app", &spec, &BTreeMap::new())
            .unwrap();
        assert_eq!(effective.components.len(), 1);
    }
}
