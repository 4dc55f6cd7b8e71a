//! Durable storage for [`crate::state::WorkflowState`], scoped to an Application and the
//! revision that produced the steps currently running (spec.md §4.5). The Kubernetes-backed
//! implementation persists state as a `ConfigMap`, the idiomatic place the teacher's ecosystem
//! keeps small controller-scoped state (see `config_map.rs` in the teacher).
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, Patch, PatchParams};
use snafu::ResultExt;

use crate::error::{ContextCorruptSnafu, ContextLoadSnafu, ContextSaveSnafu, Error};
use crate::state::WorkflowState;

const FIELD_MANAGER: &str = "oam-controller";
const DATA_KEY: &str = "state.json";

#[async_trait]
pub trait WorkflowContextStore: Send + Sync {
    async fn load(&self, app: &str, revision: u64) -> Result<WorkflowState, Error>;
    async fn save(&self, app: &str, revision: u64, state: &WorkflowState) -> Result<(), Error>;
}

fn config_map_name(app: &str, revision: u64) -> String {
    format!("{app}-workflow-v{revision}")
}

pub struct ConfigMapContextStore {
    client: kube::Client,
    namespace: String,
}

impl ConfigMapContextStore {
    pub fn new(client: kube::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn api(&self) -> Api<ConfigMap> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }
}

#[async_trait]
impl WorkflowContextStore for ConfigMapContextStore {
    async fn load(&self, app: &str, revision: u64) -> Result<WorkflowState, Error> {
        let name = config_map_name(app, revision);
        let found = self
            .api()
            .get_opt(&name)
            .await
            .context(ContextLoadSnafu {
                app: app.to_string(),
                revision,
            })?;

        let Some(config_map) = found else {
            return Ok(WorkflowState::default());
        };

        let Some(raw) = config_map.data.as_ref().and_then(|d| d.get(DATA_KEY)) else {
            return Ok(WorkflowState::default());
        };

        serde_json::from_str(raw).context(ContextCorruptSnafu {
            app: app.to_string(),
            revision,
        })
    }

    async fn save(&self, app: &str, revision: u64, state: &WorkflowState) -> Result<(), Error> {
        let name = config_map_name(app, revision);
        let serialized = serde_json::to_string(state).expect("WorkflowState always serializes");

        let config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(self.namespace.clone()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(DATA_KEY.to_string(), serialized)])),
            ..Default::default()
        };

        self.api()
            .patch(
                &name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Apply(&config_map),
            )
            .await
            .context(ContextSaveSnafu {
                app: app.to_string(),
                revision,
            })?;
        Ok(())
    }
}

/// An in-memory store for use in tests and for the dry-run/preview paths that never touch the
/// cluster.
#[derive(Default)]
pub struct InMemoryContextStore {
    states: Mutex<HashMap<(String, u64), WorkflowState>>,
}

#[async_trait]
impl WorkflowContextStore for InMemoryContextStore {
    async fn load(&self, app: &str, revision: u64) -> Result<WorkflowState, Error> {
        Ok(self
            .states
            .lock()
            .expect("workflow context lock is never poisoned")
            .get(&(app.to_string(), revision))
            .cloned()
            .unwrap_or_default())
    }

    async fn save(&self, app: &str, revision: u64, state: &WorkflowState) -> Result<(), Error> {
        self.states
            .lock()
            .expect("workflow context lock is never poisoned")
            .insert((app.to_string(), revision), state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StepPhase, StepRecord};

    #[tokio::test]
    async fn in_memory_store_round_trips_state() {
        let store = InMemoryContextStore::default();
        let mut state = WorkflowState::default();
        state.steps.insert(
            "render-nginx".to_string(),
            StepRecord {
                phase: StepPhase::Succeeded,
                ..Default::default()
            },
        );

        store.save("my-app", 3, &state).await.unwrap();
        let loaded = store.load("my-app", 3).await.unwrap();
        assert_eq!(loaded.steps["render-nginx"].phase, StepPhase::Succeeded);
    }

    #[tokio::test]
    async fn unknown_revision_loads_as_empty_state() {
        let store = InMemoryContextStore::default();
        let loaded = store.load("my-app", 1).await.unwrap();
        assert!(loaded.steps.is_empty());
    }
}
