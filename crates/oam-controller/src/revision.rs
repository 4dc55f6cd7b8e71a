//! Turns an `Application.spec` into the content-addressed `ApplicationRevision` it dispatches
//! from (spec.md §4.2): resolve every Component/Trait type it references, hash the result
//! together with the spec, and mint a new revision only when that hash actually changed
//! (revision-determinism invariant, spec.md §8 #2).
use std::collections::BTreeMap;

use oam_definitions::store::{DefinitionKey, DefinitionStore};
use oam_types::{ApplicationRevisionSpec, ApplicationSpec, DefinitionKind, LatestRevision};
use snafu::ResultExt;

use crate::error::{self, Error};

/// Resolves every Component and Trait Definition the spec references, keyed `"<Kind>/<name>"`,
/// suitable for [`oam_types::revision_hash`] and for freezing into the `ApplicationRevision`.
pub async fn resolve_definitions(
    store: &DefinitionStore,
    namespace: &str,
    spec: &ApplicationSpec,
    app_name: &str,
) -> Result<serde_json::Value, Error> {
    let mut resolved: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    for component in &spec.components {
        insert(store, namespace, DefinitionKind::Component, &component.type_, &mut resolved)
            .await
            .context(error::ResolveDefinitionsSnafu { name: app_name })?;
        for component_trait in &component.traits {
            insert(store, namespace, DefinitionKind::Trait, &component_trait.type_, &mut resolved)
                .await
                .context(error::ResolveDefinitionsSnafu { name: app_name })?;
        }
    }
    Ok(serde_json::Value::Object(resolved.into_iter().collect()))
}

async fn insert(
    store: &DefinitionStore,
    namespace: &str,
    kind: DefinitionKind,
    name: &str,
    resolved: &mut BTreeMap<String, serde_json::Value>,
) -> Result<(), oam_definitions::Error> {
    let key = format!("{kind}/{name}");
    if resolved.contains_key(&key) {
        return Ok(());
    }
    let definition = store.get(DefinitionKey { kind, namespace, name }).await?;
    resolved.insert(
        key,
        serde_json::json!({
            "attributes": definition.attributes,
            "appliesToWorkloads": definition.applies_to_workloads,
            "schematic": definition.schematic,
        }),
    );
    Ok(())
}

/// Either the already-current revision (same hash as `status.latestRevision`) or a freshly
/// minted one the caller must persist via `ApplicationRevision` server-side apply.
pub enum Revision {
    Unchanged(LatestRevision),
    New(ApplicationRevisionSpec),
}

/// Decides whether `spec` (resolved against `resolved_definitions`) is the same render as the
/// Application's current `latest_revision`, or whether a new revision number is needed.
pub fn next_revision(
    app_name: &str,
    spec: &ApplicationSpec,
    resolved_definitions: serde_json::Value,
    latest_revision: Option<&LatestRevision>,
) -> Revision {
    let hash = oam_types::revision_hash(spec, &resolved_definitions);
    if let Some(latest) = latest_revision {
        if latest.revision_hash == hash {
            return Revision::Unchanged(latest.clone());
        }
    }
    let revision_number = latest_revision.map(|latest| latest.revision + 1).unwrap_or(1);
    let revision_name = ApplicationRevisionSpec::name_for(app_name, revision_number);
    Revision::New(ApplicationRevisionSpec {
        revision_name,
        revision_number,
        revision_hash: hash,
        spec: spec.clone(),
        resolved_definitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oam_types::Component;

    fn spec(component_name: &str) -> ApplicationSpec {
        ApplicationSpec {
            components: vec![Component {
                name: component_name.to_string(),
                type_: "webservice".to_string(),
                properties: serde_json::json!({}),
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
    fn first_render_always_mints_revision_one() {
        let revision = next_revision("web", &spec("nginx"), serde_json::json!({}), None);
        match revision {
            Revision::New(rev) => {
                assert_eq!(rev.revision_number, 1);
                assert_eq!(rev.revision_name, "web-v1");
            }
            Revision::Unchanged(_) => panic!("expected a new revision"),
        }
    }

    #[test]
    fn unchanged_spec_reuses_the_latest_revision() {
        let defs = serde_json::json!({});
        let hash = oam_types::revision_hash(&spec("nginx"), &defs);
        let latest = LatestRevision {
            name: "web-v1".to_string(),
            revision: 1,
            revision_hash: hash,
        };
        let revision = next_revision("web", &spec("nginx"), defs, Some(&latest));
        assert!(matches!(revision, Revision::Unchanged(_)));
    }

    #[test]
    fn changed_spec_mints_the_next_revision_number() {
        let defs = serde_json::json!({});
        let latest = LatestRevision {
            name: "web-v1".to_string(),
            revision: 1,
            revision_hash: "stale".to_string(),
        };
        let revision = next_revision("web", &spec("redis"), defs, Some(&latest));
        match revision {
            Revision::New(rev) => assert_eq!(rev.revision_number, 2),
            Revision::Unchanged(_) => panic!("expected a new revision"),
        }
    }
}
