//! `Get`/`List` over the four Definition kinds (spec.md §4.1), resolved first from the
//! Application's own namespace, then from a configured system namespace (default
//! `vela-system`).
use kube::{Api, ResourceExt};
use oam_types::{
    Attributes, ComponentDefinition, DefinitionKind, PolicyDefinition, Schematic, TraitDefinition,
    WorkflowStepDefinition,
};
use snafu::OptionExt;
use tracing::instrument;

use crate::cache::DefinitionCache;
use crate::error::{Error, FetchSnafu, NotFoundSnafu};

pub const DEFAULT_SYSTEM_NAMESPACE: &str = "vela-system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefinitionKey<'a> {
    pub kind: DefinitionKind,
    pub namespace: &'a str,
    pub name: &'a str,
}

/// The parts of a Definition the render pipeline (C2/C3) actually consumes, independent of
/// which of the four CRD kinds it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedDefinition {
    pub attributes: Attributes,
    /// Empty for Component/Policy/WorkflowStep Definitions; populated for Trait Definitions.
    pub applies_to_workloads: Vec<String>,
    pub schematic: Schematic,
}

/// Resolves `(kind, namespace, name)` to a [`ResolvedDefinition`], consulting the cache first
/// and falling back to the API server, trying the Application's namespace before the system
/// namespace.
pub struct DefinitionStore {
    client: kube::Client,
    system_namespace: String,
    cache: DefinitionCache,
}

impl DefinitionStore {
    pub fn new(client: kube::Client, system_namespace: impl Into<String>) -> Self {
        Self {
            client,
            system_namespace: system_namespace.into(),
            cache: DefinitionCache::new(),
        }
    }

    pub fn cache(&self) -> &DefinitionCache {
        &self.cache
    }

    #[instrument(skip(self), fields(kind = %key.kind, namespace = key.namespace, name = key.name))]
    pub async fn get(&self, key: DefinitionKey<'_>) -> Result<ResolvedDefinition, Error> {
        if let Some(found) = self.try_in_namespace(key, key.namespace).await? {
            return Ok(found);
        }
        if key.namespace != self.system_namespace {
            if let Some(found) = self.try_in_namespace(key, &self.system_namespace).await? {
                return Ok(found);
            }
        }
        NotFoundSnafu {
            kind: key.kind,
            namespace: key.namespace.to_string(),
            name: key.name.to_string(),
        }
        .fail()
    }

    async fn try_in_namespace(
        &self,
        key: DefinitionKey<'_>,
        namespace: &str,
    ) -> Result<Option<ResolvedDefinition>, Error> {
        if let Some(cached) = self.cache.get_any(key.kind, namespace, key.name) {
            return Ok(Some(cached));
        }

        macro_rules! fetch {
            ($api_kind:ty, $to_resolved:expr) => {{
                let api: Api<$api_kind> = Api::namespaced(self.client.clone(), namespace);
                match api.get_opt(key.name).await.context(FetchSnafu {
                    kind: key.kind,
                    name: key.name.to_string(),
                })? {
                    Some(object) => {
                        let resource_version = object.resource_version().unwrap_or_default();
                        let resolved: ResolvedDefinition = $to_resolved(&object);
                        self.cache.insert(
                            key.kind,
                            namespace,
                            key.name,
                            resource_version,
                            resolved.clone(),
                        );
                        Ok(Some(resolved))
                    }
                    None => Ok(None),
                }
            }};
        }

        match key.kind {
            DefinitionKind::Component => fetch!(ComponentDefinition, |d: &ComponentDefinition| {
                ResolvedDefinition {
                    attributes: d.spec.attributes.clone(),
                    applies_to_workloads: vec![],
                    schematic: d.spec.schematic.clone(),
                }
            }),
            DefinitionKind::Trait => fetch!(TraitDefinition, |d: &TraitDefinition| {
                ResolvedDefinition {
                    attributes: d.spec.attributes.clone(),
                    applies_to_workloads: d.spec.applies_to_workloads.clone(),
                    schematic: d.spec.schematic.clone(),
                }
            }),
            DefinitionKind::Policy => fetch!(PolicyDefinition, |d: &PolicyDefinition| {
                ResolvedDefinition {
                    attributes: Attributes::default(),
                    applies_to_workloads: vec![],
                    schematic: d.spec.schematic.clone(),
                }
            }),
            DefinitionKind::WorkflowStep => {
                fetch!(WorkflowStepDefinition, |d: &WorkflowStepDefinition| {
                    ResolvedDefinition {
                        attributes: Attributes::default(),
                        applies_to_workloads: vec![],
                        schematic: d.spec.schematic.clone(),
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_namespace_defaults_match_spec() {
        assert_eq!(DEFAULT_SYSTEM_NAMESPACE, "vela-system");
    }
}
