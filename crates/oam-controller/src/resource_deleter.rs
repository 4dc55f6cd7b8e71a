//! Implements `oam_tracker::ResourceDeleter` by deleting a dynamic object through the
//! dispatcher's per-cluster client pool (spec.md §4.6, §4.7).
use std::collections::BTreeMap;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, Patch, PatchParams};
use kube::core::GroupVersionKind;
use kube::discovery::{Discovery, Scope};
use oam_dispatch::{sharer_list, SharedClientPool};
use oam_tracker::{Error, ResourceDeleter};
use oam_types::{ClusterSpec, ResourceTrackerEntry};
use tracing::info;

/// Deletes a tracked entry through its owning Application's name, so a `shared-resource` entry
/// (spec.md §3) is removed from the object's sharer list rather than the object being deleted
/// outright while other Applications still share it.
pub struct DispatchResourceDeleter<'a> {
    pool: &'a SharedClientPool,
    cluster_specs: &'a BTreeMap<String, ClusterSpec>,
    app_name: &'a str,
}

impl<'a> DispatchResourceDeleter<'a> {
    pub fn new(pool: &'a SharedClientPool, cluster_specs: &'a BTreeMap<String, ClusterSpec>, app_name: &'a str) -> Self {
        Self {
            pool,
            cluster_specs,
            app_name,
        }
    }

    fn fail(&self, entry: &ResourceTrackerEntry, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Error {
        Error::Delete {
            cluster: entry.cluster.clone(),
            kind: entry.kind.clone(),
            name: entry.name.clone(),
            source: source.into(),
        }
    }
}

#[async_trait]
impl<'a> ResourceDeleter for DispatchResourceDeleter<'a> {
    async fn delete(&self, entry: &ResourceTrackerEntry) -> Result<(), Error> {
        let default_spec = ClusterSpec {
            credential_ref: None,
            labels: Default::default(),
        };
        let cluster_spec = self.cluster_specs.get(&entry.cluster).unwrap_or(&default_spec);
        let client = self
            .pool
            .get_or_connect(&entry.cluster, cluster_spec)
            .await
            .map_err(|source| self.fail(entry, source))?;

        let gvk = gvk_from_api_version_and_kind(&entry.api_version, &entry.kind);
        let discovery = Discovery::new(client.clone())
            .run()
            .await
            .map_err(|source| self.fail(entry, source))?;
        let (api_resource, capabilities) = discovery.resolve_gvk(&gvk).ok_or_else(|| {
            self.fail(
                entry,
                format!("resource type {}/{} is not served by cluster {:?}", entry.api_version, entry.kind, entry.cluster),
            )
        })?;

        let api: Api<DynamicObject> = match (capabilities.scope, &entry.namespace) {
            (Scope::Namespaced, Some(namespace)) => Api::namespaced_with(client, namespace, &api_resource),
            _ => Api::all_with(client, &api_resource),
        };

        if entry.shared {
            return self.leave_or_delete_shared(&api, entry).await;
        }

        match api.delete(&entry.name, &Default::default()).await {
            Ok(_) => {
                info!(cluster = %entry.cluster, kind = %entry.kind, name = %entry.name, "deleted recycled tracker entry");
                Ok(())
            }
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
            Err(source) => Err(self.fail(entry, source)),
        }
    }
}

impl<'a> DispatchResourceDeleter<'a> {
    /// Removes `self.app_name` from the object's sharer list. The object itself is only deleted
    /// once the list is left empty; otherwise the next remaining sharer becomes the first and
    /// keeps the object (spec.md §3).
    async fn leave_or_delete_shared(&self, api: &Api<DynamicObject>, entry: &ResourceTrackerEntry) -> Result<(), Error> {
        let existing = match api.get_opt(&entry.name).await {
            Ok(Some(object)) => object,
            Ok(None) => return Ok(()),
            Err(source) => return Err(self.fail(entry, source)),
        };

        let remaining: Vec<String> = sharer_list(&existing).into_iter().filter(|sharer| sharer != self.app_name).collect();

        if remaining.is_empty() {
            return match api.delete(&entry.name, &Default::default()).await {
                Ok(_) => {
                    info!(cluster = %entry.cluster, kind = %entry.kind, name = %entry.name, "deleted shared resource, no sharers remain");
                    Ok(())
                }
                Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
                Err(source) => Err(self.fail(entry, source)),
            };
        }

        let patch = serde_json::json!({
            "metadata": {
                "annotations": {
                    oam_shared::kvp::consts::keys::OAM_SHARERS_KEY: remaining.join(","),
                }
            }
        });
        api.patch(&entry.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|source| self.fail(entry, source))?;
        info!(
            cluster = %entry.cluster,
            kind = %entry.kind,
            name = %entry.name,
            remaining = remaining.len(),
            next_sharer = %remaining[0],
            "left shared resource, ownership passed to the next sharer",
        );
        Ok(())
    }
}

fn gvk_from_api_version_and_kind(api_version: &str, kind: &str) -> GroupVersionKind {
    let (group, version) = match api_version.rsplit_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    };
    GroupVersionKind {
        group,
        version,
        kind: kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_api_version_has_no_group() {
        let gvk = gvk_from_api_version_and_kind("v1", "ConfigMap");
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.kind, "ConfigMap");
    }

    #[test]
    fn grouped_api_version_splits_on_the_last_slash() {
        let gvk = gvk_from_api_version_and_kind("apps/v1", "Deployment");
        assert_eq!(gvk.group, "apps");
        assert_eq!(gvk.version, "v1");
    }
}
