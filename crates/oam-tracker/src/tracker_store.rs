//! CRUD over the `ResourceTracker` custom resource (spec.md §3, §4.7): one tracker per
//! Application revision, listed by the `core.oam.dev/owner-app` label for the finalizer walk.
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams};
use oam_types::{ResourceTracker, ResourceTrackerSpec};
use snafu::ResultExt;

use crate::error::{TrackerListSnafu, TrackerLoadSnafu, TrackerSaveSnafu};
use crate::Error;

const FIELD_MANAGER: &str = "oam-controller";

/// `core.oam.dev/owner-app` — the label every `ResourceTracker` carries so the finalizer walk
/// can list all of an Application's trackers in one call.
pub const OWNER_APP_LABEL: &str = "core.oam.dev/owner-app";

pub fn tracker_name(app: &str, revision: &str) -> String {
    format!("{app}-{revision}")
}

pub struct TrackerStore {
    client: kube::Client,
    namespace: String,
}

impl TrackerStore {
    pub fn new(client: kube::Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn api(&self) -> Api<ResourceTracker> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    pub async fn load(&self, app: &str, revision: &str) -> Result<Option<ResourceTrackerSpec>, Error> {
        let name = tracker_name(app, revision);
        let tracker = self
            .api()
            .get_opt(&name)
            .await
            .context(TrackerLoadSnafu {
                app: app.to_string(),
                revision: revision.to_string(),
            })?;
        Ok(tracker.map(|t| t.spec))
    }

    pub async fn save(&self, app: &str, revision: &str, spec: ResourceTrackerSpec) -> Result<(), Error> {
        let name = tracker_name(app, revision);
        let tracker = ResourceTracker {
            metadata: ObjectMeta {
                name: Some(name.clone()),
                namespace: Some(self.namespace.clone()),
                labels: Some([(OWNER_APP_LABEL.to_string(), app.to_string())].into_iter().collect()),
                ..Default::default()
            },
            spec,
        };

        self.api()
            .patch(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(&tracker))
            .await
            .map(|_| ())
            .context(TrackerSaveSnafu {
                app: app.to_string(),
                revision: revision.to_string(),
            })
    }

    /// Lists every tracker owned by `app`, oldest revision last (spec.md §4.7 step 4: "walked in
    /// reverse revision order"). Revisions sort lexically, which holds for the monotonically
    /// zero-padded revision names the controller mints.
    pub async fn list_for_app(&self, app: &str) -> Result<Vec<ResourceTrackerSpec>, Error> {
        let list = self
            .api()
            .list(&ListParams::default().labels(&format!("{OWNER_APP_LABEL}={app}")))
            .await
            .context(TrackerListSnafu { app: app.to_string() })?;

        let mut specs: Vec<ResourceTrackerSpec> = list.items.into_iter().map(|t| t.spec).collect();
        specs.sort_by(|a, b| b.revision.cmp(&a.revision));
        Ok(specs)
    }

    pub async fn delete(&self, app: &str, revision: &str) -> Result<(), Error> {
        let name = tracker_name(app, revision);
        self.api()
            .delete(&name, &Default::default())
            .await
            .map(|_| ())
            .context(TrackerSaveSnafu {
                app: app.to_string(),
                revision: revision.to_string(),
            })
    }
}
