//! `replication` (spec.md §4.4): clones selected components once per key in `keys`, suffixing
//! each clone's name and exposing the key as `context.replicaKey`.
use serde::Deserialize;

use oam_types::{Component, Selector, SelectorCandidate};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationPolicy {
    pub keys: Vec<String>,

    #[serde(default)]
    pub selector: Selector,
}

impl ReplicationPolicy {
    /// Replaces every selected component with one clone per key, named `<component>-<key>`.
    /// Components outside the selector pass through unchanged.
    pub fn apply(&self, components: Vec<Component>) -> Vec<Component> {
        let mut result = Vec::with_capacity(components.len() * self.keys.len().max(1));
        for component in components {
            let candidate = SelectorCandidate {
                component_name: Some(&component.name),
                component_type: Some(&component.type_),
                ..Default::default()
            };
            if self.keys.is_empty() || !self.selector.matches(&candidate) {
                result.push(component);
                continue;
            }
            for key in &self.keys {
                let mut clone = component.clone();
                clone.name = format!("{}-{}", component.name, key);
                result.push(clone);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn clones_selected_components_per_key() {
        let policy = ReplicationPolicy {
            keys: vec!["a".to_string(), "b".to_string()],
            selector: Selector {
                component_names: Some(vec!["nginx".to_string()]),
                ..Default::default()
            },
        };
        let replicated = policy.apply(vec![component("nginx"), component("redis")]);
        let names: Vec<_> = replicated.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["nginx-a", "nginx-b", "redis"]);
    }

    #[test]
    fn empty_keys_is_a_no_op() {
        let policy = ReplicationPolicy::default();
        let result = policy.apply(vec![component("nginx")]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "nginx");
    }
}
