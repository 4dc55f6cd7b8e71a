//! Deterministic content hashing for `ApplicationRevision.revisionHash` (spec.md §3, invariant
//! "revision determinism" in §8): two renders of the same `spec` against the same resolved
//! Definitions must produce the same hash, regardless of field ordering in the source YAML.
use sha2::{Digest, Sha256};

use crate::application::ApplicationSpec;

/// Computes the content hash of an Application's spec together with the Definitions it
/// resolved against at render time. Serializing through `serde_json::to_vec` on a `Value`
/// produced by `serde_json::to_value` guarantees map keys are ordered (`serde_json`'s
/// `preserve_order` feature is not enabled in this workspace, so `Value::Object` is a
/// `BTreeMap`), which is what makes the hash stable across equivalent but differently-ordered
/// input documents.
pub fn revision_hash(spec: &ApplicationSpec, resolved_definitions: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hash_value(&mut hasher, &serde_json::to_value(spec).expect("ApplicationSpec always serializes"));
    hash_value(&mut hasher, resolved_definitions);
    format!("{:x}", hasher.finalize())
}

fn hash_value(hasher: &mut Sha256, value: &serde_json::Value) {
    let canonical = serde_json::to_vec(value).expect("serde_json::Value always serializes");
    hasher.update(canonical);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::Component;

    fn spec(component_name: &str) -> ApplicationSpec {
        ApplicationSpec {
            components: vec![Component {
                name: component_name.to_string(),
                type_: "webservice".to_string(),
                properties: serde_json::json!({"image": "nginx:1.21"}),
                traits: vec![],
                depends_on: vec![],
                inputs: vec![],
                outputs: vec![],
            }],
            policies: vec![],
            workflow: None,
        }
    }

    #[test]
    fn identical_inputs_hash_identically() {
        let defs = serde_json::json!({"webservice": {"template": "..."}});
        let a = revision_hash(&spec("nginx"), &defs);
        let b = revision_hash(&spec("nginx"), &defs);
        assert_eq!(a, b);
    }

    #[test]
    fn differing_component_name_changes_the_hash() {
        let defs = serde_json::json!({"webservice": {"template": "..."}});
        let a = revision_hash(&spec("nginx"), &defs);
        let b = revision_hash(&spec("redis"), &defs);
        assert_ne!(a, b);
    }

    #[test]
    fn differing_resolved_definitions_changes_the_hash() {
        let a = revision_hash(&spec("nginx"), &serde_json::json!({"v": 1}));
        let b = revision_hash(&spec("nginx"), &serde_json::json!({"v": 2}));
        assert_ne!(a, b);
    }
}
