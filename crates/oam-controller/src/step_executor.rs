//! Implements `oam_workflow::StepExecutor` over the Definition Store (C1), Renderer (C2/C3),
//! Policy Engine's composed output (C4), and Dispatcher (C6), so the workflow runtime never
//! touches a cluster directly (spec.md §4.5, §4.6).
//!
//! `deploy` is treated identically to `apply-remaining`: both apply every component the
//! workflow didn't already name in an explicit `apply-component` step. `suspend` is handled by
//! `oam_workflow::WorkflowRuntime` itself and never reaches [`StepExecutor::execute`].
use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use oam_definitions::store::DefinitionStore;
use oam_dispatch::{dispatch_all, ApplyOutcome, DispatchItem, SharedClientPool};
use oam_policy::engine::EffectiveApplication;
use oam_render::{render_component, Manifest};
use oam_template::Context;
use oam_types::{ClusterSpec, Creator, ResourceTrackerEntry, SelectorCandidate, WorkflowStep, LOCAL_CLUSTER};
use oam_workflow::{StepExecutor, StepOutcome};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use crate::health::ManifestHealth;

fn applied_component_names(steps: &[WorkflowStep]) -> HashSet<String> {
    let mut names = HashSet::new();
    for step in steps {
        if step.type_ == "apply-component" {
            if let Some(name) = step.properties.get("component").and_then(Value::as_str) {
                names.insert(name.to_string());
            }
        }
        if let Some(sub_steps) = &step.sub_steps {
            names.extend(applied_component_names(sub_steps));
        }
    }
    names
}

/// Executes the built-in workflow step types against one Application revision.
pub struct BuiltinStepExecutor {
    definitions: DefinitionStore,
    clients: SharedClientPool,
    dispatch_config: oam_dispatch::DispatchConfig,
    app_name: String,
    namespace: String,
    app_revision: String,
    effective: EffectiveApplication,
    cluster_specs: BTreeMap<String, ClusterSpec>,
    explicitly_applied: HashSet<String>,
    previously_dispatched: Vec<ResourceTrackerEntry>,
    /// Every resource this tick actually applied or carried forward, read back by the caller
    /// once the tick finishes to build the next `ResourceTracker` snapshot.
    pub dispatched: Mutex<Vec<ResourceTrackerEntry>>,
    pub health: Mutex<Vec<ManifestHealth>>,
}

impl BuiltinStepExecutor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        definitions: DefinitionStore,
        clients: SharedClientPool,
        dispatch_config: oam_dispatch::DispatchConfig,
        app_name: String,
        namespace: String,
        app_revision: String,
        effective: EffectiveApplication,
        cluster_specs: BTreeMap<String, ClusterSpec>,
        workflow_steps: &[WorkflowStep],
        previously_dispatched: Vec<ResourceTrackerEntry>,
    ) -> Self {
        Self {
            definitions,
            clients,
            dispatch_config,
            app_name,
            namespace,
            app_revision,
            effective,
            cluster_specs,
            explicitly_applied: applied_component_names(workflow_steps),
            previously_dispatched,
            dispatched: Mutex::new(Vec::new()),
            health: Mutex::new(Vec::new()),
        }
    }

    fn was_previously_created(&self, cluster: &str, manifest: &Manifest) -> Option<&ResourceTrackerEntry> {
        self.previously_dispatched.iter().find(|entry| {
            entry.cluster == cluster
                && Some(entry.kind.as_str()) == manifest.kind()
                && Some(entry.name.as_str()) == manifest.name()
        })
    }

    /// Whether an `apply-once` policy blocks re-applying a manifest that was already dispatched
    /// by a prior revision. The dispatcher's full-body server-side apply can't diff/merge-patch
    /// a single field path, so a field-path scoped policy (non-empty `paths`) is enforced at the
    /// whole-resource level instead of being silently skipped: it blocks re-applying the entire
    /// manifest that carries those paths rather than letting only the named fields drift (see
    /// DESIGN.md). A whole-resource policy (empty `paths`) keeps its `affect`-driven behavior.
    fn blocked_by_apply_once(&self, candidate: &SelectorCandidate<'_>) -> bool {
        self.effective.resource_policies.apply_once.iter().any(|policy| {
            policy.selector.matches(candidate) && (!policy.paths.is_empty() || policy.blocks_field(""))
        })
    }

    async fn apply_components(&self, names: &[String]) -> StepOutcome {
        let mut candidates: Vec<(String, Manifest)> = Vec::new();

        for name in names {
            let Some(component) = self.effective.components.iter().find(|c| &c.name == name) else {
                continue;
            };

            for cluster in &self.effective.clusters {
                let mut context = Context {
                    name: component.name.clone(),
                    app_name: self.app_name.clone(),
                    namespace: self.namespace.clone(),
                    app_revision: self.app_revision.clone(),
                    ..Context::default()
                };

                let rendered = match render_component(&self.definitions, component, &self.namespace, &mut context).await {
                    Ok(rendered) => rendered,
                    Err(source) => {
                        warn!(component = %component.name, error = %source, "failed to render component");
                        return StepOutcome::Failed {
                            message: format!("failed to render component {:?}: {source}", component.name),
                        };
                    }
                };

                let mut manifests = vec![rendered.primary];
                manifests.extend(rendered.extras);
                for mut manifest in manifests {
                    if cluster != LOCAL_CLUSTER {
                        tag_cluster(&mut manifest, cluster);
                    }
                    candidates.push((cluster.clone(), manifest));
                }
            }
        }

        let mut items: Vec<(String, Manifest, oam_dispatch::Disposition)> = Vec::new();
        for (cluster, manifest) in candidates {
            let candidate = SelectorCandidate {
                component_name: Some(manifest.component_name.as_str()),
                trait_type: manifest.trait_type.as_deref(),
                resource_type: manifest.kind(),
                resource_name: manifest.name(),
                ..SelectorCandidate::default()
            };

            if self.was_previously_created(&cluster, &manifest).is_some() && self.blocked_by_apply_once(&candidate) {
                let mut health = self.health.lock().await;
                health.push(ManifestHealth {
                    component_name: manifest.component_name.clone(),
                    trait_type: manifest.trait_type.clone(),
                    healthy: true,
                    message: None,
                });
                drop(health);
                if let Some(entry) = self.was_previously_created(&cluster, &manifest) {
                    self.dispatched.lock().await.push(entry.clone());
                }
                continue;
            }

            let disposition = oam_dispatch::Disposition {
                read_only: self
                    .effective
                    .resource_policies
                    .read_only
                    .iter()
                    .any(|policy| policy.selector.matches(&candidate)),
                take_over: self
                    .effective
                    .resource_policies
                    .take_over
                    .iter()
                    .any(|policy| policy.selector.matches(&candidate)),
                shared: self
                    .effective
                    .resource_policies
                    .shared_resource
                    .iter()
                    .any(|policy| policy.selector.matches(&candidate)),
            };
            items.push((cluster, manifest, disposition));
        }

        if items.is_empty() {
            return StepOutcome::Succeeded { outputs: BTreeMap::new() };
        }

        let missing_cluster = items.iter().find_map(|(cluster, _, _)| {
            (!self.cluster_specs.contains_key(cluster)).then(|| cluster.clone())
        });
        if let Some(cluster) = missing_cluster {
            return StepOutcome::Failed {
                message: format!("cluster {cluster:?} is not a registered Cluster"),
            };
        }

        let default_spec = ClusterSpec {
            credential_ref: None,
            labels: Default::default(),
        };
        let dispatch_items: Vec<DispatchItem<'_>> = items
            .iter()
            .map(|(cluster, manifest, disposition)| DispatchItem {
                cluster: cluster.as_str(),
                cluster_spec: self.cluster_specs.get(cluster).unwrap_or(&default_spec),
                body: &manifest.body,
                disposition: *disposition,
            })
            .collect();

        let results = dispatch_all(&self.clients, &self.app_name, dispatch_items, &self.dispatch_config).await;

        let mut failure: Option<String> = None;
        let mut retry: Option<String> = None;

        for ((cluster, manifest, disposition), result) in items.iter().zip(results) {
            match result.outcome {
                Ok(outcome) => {
                    let healthy = matches!(outcome, ApplyOutcome::Applied { .. } | ApplyOutcome::SharedReadOnly { .. });
                    let created = matches!(outcome, ApplyOutcome::Applied { created: true });
                    self.health.lock().await.push(ManifestHealth {
                        component_name: manifest.component_name.clone(),
                        trait_type: manifest.trait_type.clone(),
                        healthy,
                        message: (!healthy).then(|| format!("{outcome:?}")),
                    });
                    self.dispatched.lock().await.push(ResourceTrackerEntry {
                        cluster: cluster.clone(),
                        api_version: manifest.api_version().unwrap_or_default().to_string(),
                        kind: manifest.kind().unwrap_or_default().to_string(),
                        namespace: manifest.namespace().map(str::to_string),
                        name: manifest.name().unwrap_or_default().to_string(),
                        component_name: manifest.component_name.clone(),
                        trait_type: manifest.trait_type.clone(),
                        creator: manifest
                            .trait_type
                            .clone()
                            .map(Creator::Trait)
                            .unwrap_or(Creator::Component),
                        created,
                        shared: disposition.shared,
                    });
                }
                Err(source) => {
                    self.health.lock().await.push(ManifestHealth {
                        component_name: manifest.component_name.clone(),
                        trait_type: manifest.trait_type.clone(),
                        healthy: false,
                        message: Some(source.to_string()),
                    });
                    if source.is_retryable() {
                        retry.get_or_insert(source.to_string());
                    } else {
                        failure.get_or_insert(source.to_string());
                    }
                }
            }
        }

        if let Some(message) = failure {
            return StepOutcome::Failed { message };
        }
        if let Some(message) = retry {
            return StepOutcome::Retry { message };
        }
        StepOutcome::Succeeded { outputs: BTreeMap::new() }
    }
}

fn tag_cluster(manifest: &mut Manifest, cluster: &str) {
    if let Some(labels) = manifest
        .body
        .get_mut("metadata")
        .and_then(|metadata| metadata.get_mut("labels"))
        .and_then(Value::as_object_mut)
    {
        labels.insert(
            oam_shared::kvp::consts::keys::OAM_APP_CLUSTER_KEY.to_string(),
            Value::String(cluster.to_string()),
        );
    }
}

#[async_trait]
impl StepExecutor for BuiltinStepExecutor {
    async fn execute(&self, step: &WorkflowStep, _inputs: &BTreeMap<String, Value>) -> StepOutcome {
        match step.type_.as_str() {
            "apply-component" => {
                let Some(name) = step.properties.get("component").and_then(Value::as_str) else {
                    return StepOutcome::Failed {
                        message: format!("step {:?} is missing its `component` property", step.name),
                    };
                };
                self.apply_components(std::slice::from_ref(&name.to_string())).await
            }
            "apply-remaining" | "deploy" => {
                let remaining: Vec<String> = self
                    .effective
                    .components
                    .iter()
                    .map(|component| component.name.clone())
                    .filter(|name| !self.explicitly_applied.contains(name))
                    .collect();
                self.apply_components(&remaining).await
            }
            "notification" => StepOutcome::Succeeded { outputs: BTreeMap::new() },
            other => StepOutcome::Failed {
                message: format!("unsupported workflow step type {other:?}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, type_: &str, properties: Value) -> WorkflowStep {
        WorkflowStep {
            name: name.to_string(),
            type_: type_.to_string(),
            properties,
            depends_on: vec![],
            inputs: vec![],
            outputs: vec![],
            timeout: None,
            if_: None,
            retry_limit: None,
            retry_delay: None,
            continue_on_error: false,
            meta: None,
            sub_steps: None,
        }
    }

    #[test]
    fn applied_component_names_collects_every_apply_component_step() {
        let steps = vec![
            step("a", "apply-component", serde_json::json!({"component": "web"})),
            step("b", "apply-remaining", serde_json::json!({})),
        ];
        let names = applied_component_names(&steps);
        assert_eq!(names.len(), 1);
        assert!(names.contains("web"));
    }

    #[test]
    fn applied_component_names_descends_into_step_groups() {
        let mut group = step("setup", "step-group", serde_json::json!({}));
        group.sub_steps = Some(vec![step(
            "inner",
            "apply-component",
            serde_json::json!({"component": "db"}),
        )]);
        let names = applied_component_names(std::slice::from_ref(&group));
        assert!(names.contains("db"));
    }
}
