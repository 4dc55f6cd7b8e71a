//! The outer reconcile loop (spec.md §4.2, §4.7, §4.8): fetch the Application, mint or reuse its
//! revision, compose policies, tick the workflow, dispatch the rendered manifests, recycle
//! whatever the tracker diff drops, and write status back. Driven by `crate::queue::ReconcileQueue`
//! rather than `kube::runtime::Controller`, so finalizer handling and error-to-event reporting —
//! normally the runtime's job — are done directly here.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::ResourceExt;
use oam_definitions::store::DefinitionStore;
use oam_dispatch::SharedClientPool;
use oam_policy::engine::PolicyEngine;
use oam_policy::garbage_collect::{DeletionOrder, GarbageCollectPolicy};
use oam_shared::logging::ReconcilerError;
use oam_tracker::TrackerStore;
use oam_types::{
    Application, ApplicationPhase, ApplicationRevision, ApplicationSpec, ApplicationStatus, Cluster,
    ClusterSpec, LatestRevision, ResourceTrackerSpec, ServiceStatus, StepStatus, WorkflowStatus,
    WorkflowStep, LOCAL_CLUSTER,
};
use oam_workflow::{StepPhase, TickResult, WorkflowContextStore, WorkflowRuntime, WorkflowState};
use snafu::ResultExt;
use tracing::{info, instrument, warn};

use crate::config::ControllerConfig;
use crate::error::{self, Error};
use crate::flatten;
use crate::health;
use crate::metrics::Metrics;
use crate::queue::ReconcileKey;
use crate::resource_deleter::DispatchResourceDeleter;
use crate::revision;
use crate::step_executor::BuiltinStepExecutor;

const FIELD_MANAGER: &str = "oam-controller";
const CONTROLLER_NAME: &str = "oam-controller";
const FINALIZER: &str = "core.oam.dev/application-controller";

/// Everything a reconcile needs that outlives a single tick, shared across every concurrent
/// reconcile task (spec.md §9 design note: no consumer reaches for a global singleton, every
/// dependency is handed to it explicitly).
pub struct ReconcileContext {
    pub client: kube::Client,
    pub clients: SharedClientPool,
    pub policy_engine: PolicyEngine,
    pub tracker_store: TrackerStore,
    pub context_store: Arc<dyn WorkflowContextStore>,
    pub config: ControllerConfig,
    pub metrics: Arc<Metrics>,
}

/// Reconciles one Application, keyed by `(namespace, name)`. Missing objects (already deleted
/// and already cleaned up) are a no-op, not an error.
#[instrument(skip(ctx), fields(namespace = %key.0, name = %key.1))]
pub async fn reconcile(ctx: &ReconcileContext, key: &ReconcileKey) -> Result<(), Error> {
    let (namespace, name) = key;
    let api: Api<Application> = Api::namespaced(ctx.client.clone(), namespace);

    let Some(app) = api.get_opt(name).await.context(error::FetchApplicationSnafu {
        namespace: namespace.clone(),
        name: name.clone(),
    })?
    else {
        return Ok(());
    };

    let start = Instant::now();
    let result = reconcile_application(ctx, &api, &app).await;
    ctx.metrics.record_reconcile_duration(start.elapsed());

    if let Err(err) = &result {
        publish_error_event(&ctx.client, &app, err).await;
    }

    result
}

async fn reconcile_application(ctx: &ReconcileContext, api: &Api<Application>, app: &Application) -> Result<(), Error> {
    let name = app.name_any();

    if app.meta().deletion_timestamp.is_some() {
        return reconcile_delete(ctx, api, app, &name).await;
    }

    add_finalizer(api, app).await?;

    let namespace = app.namespace().unwrap_or_else(|| "default".to_string());
    let definitions = DefinitionStore::new(ctx.client.clone(), ctx.config.system_namespace.clone());

    let (cluster_specs, cluster_labels) = list_clusters(&ctx.client, &namespace).await?;

    let resolved_definitions = revision::resolve_definitions(&definitions, &namespace, &app.spec, &name).await?;

    let latest_revision = match revision::next_revision(
        &name,
        &app.spec,
        resolved_definitions,
        app.status.as_ref().and_then(|status| status.latest_revision.as_ref()),
    ) {
        revision::Revision::Unchanged(latest) => latest,
        revision::Revision::New(spec) => {
            persist_revision(&ctx.client, &namespace, &name, &spec).await?;
            LatestRevision {
                name: spec.revision_name,
                revision: spec.revision_number,
                revision_hash: spec.revision_hash,
            }
        }
    };

    let effective = ctx
        .policy_engine
        .compose(&name, &app.spec, &cluster_labels)
        .context(error::ComposePoliciesSnafu { name: name.clone() })?;
    let gc_policies = effective.resource_policies.garbage_collect.clone();
    let deploy_namespace = effective.namespace_override.clone().unwrap_or_else(|| namespace.clone());

    let flat_steps = flatten::flatten(&workflow_steps_for(&app.spec));

    let mut state = ctx
        .context_store
        .load(&name, latest_revision.revision)
        .await
        .context(error::LoadContextSnafu { name: name.clone() })?;

    let previous_tracker = ctx
        .tracker_store
        .list_for_app(&name)
        .await
        .context(error::ListTrackersSnafu { name: name.clone() })?
        .into_iter()
        .next();
    let previously_dispatched = previous_tracker.as_ref().map(|tracker| tracker.entries.clone()).unwrap_or_default();

    let executor = BuiltinStepExecutor::new(
        definitions,
        ctx.clients.clone(),
        ctx.config.dispatch_config(),
        name.clone(),
        deploy_namespace,
        latest_revision.name.clone(),
        effective,
        cluster_specs.clone(),
        &flat_steps,
        previously_dispatched,
    );

    let runtime = WorkflowRuntime::new(ctx.config.workflow_runtime_config(), &executor);
    let tick_result = runtime
        .tick(&flat_steps, &mut state, now_unix())
        .await
        .context(error::WorkflowTickSnafu { name: name.clone() })?;

    ctx.context_store
        .save(&name, latest_revision.revision, &state)
        .await
        .context(error::SaveContextSnafu { name: name.clone() })?;

    let dispatched = executor.dispatched.lock().await.clone();
    let health_records = executor.health.lock().await.clone();

    if let Some(previous) = &previous_tracker {
        let policy = merge_gc_policy(&gc_policies);
        let deleter = DispatchResourceDeleter::new(&ctx.clients, &cluster_specs, &name);
        let (outcome, recycle_err) =
            oam_tracker::recycle_on_revision_change(&previous.entries, &dispatched, &policy, &deleter).await;
        if let Some(source) = recycle_err {
            return Err(Error::Recycle { name: name.clone(), source });
        }
        if !outcome.deleted.is_empty() {
            info!(app = %name, count = outcome.deleted.len(), "recycled resources dropped by the new revision");
        }
    }

    ctx.tracker_store
        .save(
            &name,
            &latest_revision.name,
            ResourceTrackerSpec {
                owner_app: name.clone(),
                revision: latest_revision.name.clone(),
                entries: dispatched.clone(),
                gc_rules: gc_policies.into_iter().flat_map(|policy| policy.rules).collect(),
            },
        )
        .await
        .context(error::SaveTrackerSnafu {
            name: name.clone(),
            revision: latest_revision.name.clone(),
        })?;

    ctx.metrics.set_resource_tracker_entries(&name, dispatched.len() as i64);

    let services = health::aggregate(&health_records);
    let status = build_status(app, tick_result, latest_revision, services, &state, &flat_steps);
    update_status(api, &name, status).await
}

/// Recycles every resource the Application's trackers still hold, oldest revision last
/// (spec.md §4.7 step 4), then removes the finalizer.
async fn reconcile_delete(ctx: &ReconcileContext, api: &Api<Application>, app: &Application, name: &str) -> Result<(), Error> {
    if !has_finalizer(app) {
        return Ok(());
    }

    let namespace = app.namespace().unwrap_or_else(|| "default".to_string());
    let trackers = ctx
        .tracker_store
        .list_for_app(name)
        .await
        .context(error::ListTrackersSnafu { name: name.to_string() })?;

    let (cluster_specs, _) = list_clusters(&ctx.client, &namespace).await?;
    let deleter = DispatchResourceDeleter::new(&ctx.clients, &cluster_specs, name);

    for tracker in &trackers {
        let policy = GarbageCollectPolicy {
            rules: tracker.gc_rules.clone(),
            ..Default::default()
        };
        let (outcome, recycle_err) = oam_tracker::recycle_on_app_delete(&tracker.entries, &policy, &deleter).await;
        if let Some(source) = recycle_err {
            return Err(Error::Recycle { name: name.to_string(), source });
        }
        if !outcome.retained.is_empty() {
            info!(
                app = %name,
                revision = %tracker.revision,
                count = outcome.retained.len(),
                "left `never`-strategy entries in place past application deletion",
            );
        }

        ctx.tracker_store
            .delete(name, &tracker.revision)
            .await
            .context(error::DeleteTrackerSnafu {
                name: name.to_string(),
                revision: tracker.revision.clone(),
            })?;
    }

    remove_finalizer(api, app).await
}

fn has_finalizer(app: &Application) -> bool {
    app.finalizers().iter().any(|f| f == FINALIZER)
}

async fn add_finalizer(api: &Api<Application>, app: &Application) -> Result<(), Error> {
    if has_finalizer(app) {
        return Ok(());
    }
    let mut finalizers = app.finalizers().to_vec();
    finalizers.push(FINALIZER.to_string());
    let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&app.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .context(error::AddFinalizerSnafu { name: app.name_any() })?;
    Ok(())
}

async fn remove_finalizer(api: &Api<Application>, app: &Application) -> Result<(), Error> {
    let finalizers: Vec<String> = app.finalizers().iter().filter(|f| f.as_str() != FINALIZER).cloned().collect();
    let patch = serde_json::json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&app.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .context(error::RemoveFinalizerSnafu { name: app.name_any() })?;
    Ok(())
}

/// Registered Clusters in `namespace`, plus the synthesized `local` entry (spec.md §4.6): a map
/// of cluster name to its dispatch credentials, and a map of cluster name to its labels for
/// resolving `topology.clusterLabelSelector`.
async fn list_clusters(
    client: &kube::Client,
    namespace: &str,
) -> Result<(BTreeMap<String, ClusterSpec>, BTreeMap<String, BTreeMap<String, String>>), Error> {
    let api: Api<Cluster> = Api::namespaced(client.clone(), namespace);
    let list = api.list(&ListParams::default()).await.context(error::ListClustersSnafu {
        namespace: namespace.to_string(),
    })?;

    let mut specs = BTreeMap::new();
    let mut labels = BTreeMap::new();
    specs.insert(
        LOCAL_CLUSTER.to_string(),
        ClusterSpec {
            credential_ref: None,
            labels: BTreeMap::new(),
        },
    );
    labels.insert(LOCAL_CLUSTER.to_string(), BTreeMap::new());

    for cluster in list.items {
        let cluster_name = cluster.name_any();
        labels.insert(cluster_name.clone(), cluster.spec.labels.clone());
        specs.insert(cluster_name, cluster.spec);
    }

    Ok((specs, labels))
}

async fn persist_revision(
    client: &kube::Client,
    namespace: &str,
    app_name: &str,
    spec: &oam_types::ApplicationRevisionSpec,
) -> Result<(), Error> {
    let api: Api<ApplicationRevision> = Api::namespaced(client.clone(), namespace);
    let revision = ApplicationRevision {
        metadata: ObjectMeta {
            name: Some(spec.revision_name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some([("core.oam.dev/app".to_string(), app_name.to_string())].into_iter().collect()),
            ..Default::default()
        },
        spec: spec.clone(),
    };
    api.patch(&spec.revision_name, &PatchParams::apply(FIELD_MANAGER), &Patch::Apply(&revision))
        .await
        .context(error::SaveRevisionSnafu {
            name: app_name.to_string(),
            revision: spec.revision_name.clone(),
        })?;
    Ok(())
}

/// Merges every `garbage-collect` policy attached to the Application into the single policy
/// `oam-tracker`'s recycle pass consumes: rules are tried in the order their policies appear
/// (spec.md §4.4 "first matching rule wins"), the last explicit ordering constraint wins, and
/// `keepLegacyResource` is honored if any policy sets it.
fn merge_gc_policy(policies: &[GarbageCollectPolicy]) -> GarbageCollectPolicy {
    let mut merged = GarbageCollectPolicy::default();
    for policy in policies {
        merged.rules.extend(policy.rules.iter().cloned());
        if policy.order != DeletionOrder::Unconstrained {
            merged.order = policy.order;
        }
        merged.keep_legacy_resource |= policy.keep_legacy_resource;
    }
    merged
}

/// The workflow to run: the Application's own, or a synthesized single `apply-remaining` step
/// when none is declared (spec.md §4.5).
fn workflow_steps_for(spec: &ApplicationSpec) -> Vec<WorkflowStep> {
    spec.workflow
        .as_ref()
        .map(|workflow| workflow.steps.clone())
        .filter(|steps| !steps.is_empty())
        .unwrap_or_else(default_workflow_steps)
}

fn default_workflow_steps() -> Vec<WorkflowStep> {
    vec![WorkflowStep {
        name: "apply-remaining".to_string(),
        type_: "apply-remaining".to_string(),
        properties: serde_json::json!({}),
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
    }]
}

fn build_status(
    app: &Application,
    tick_result: TickResult,
    latest_revision: LatestRevision,
    services: Vec<ServiceStatus>,
    state: &WorkflowState,
    flat_steps: &[WorkflowStep],
) -> ApplicationStatus {
    let all_healthy = services.iter().all(|service| service.healthy);
    let phase = match tick_result {
        TickResult::Suspended => ApplicationPhase::WorkflowSuspended,
        TickResult::Failed => ApplicationPhase::WorkflowFailed,
        TickResult::InProgress => ApplicationPhase::Running,
        TickResult::Finished if all_healthy => ApplicationPhase::Healthy,
        TickResult::Finished => ApplicationPhase::Unhealthy,
    };

    let steps = flat_steps
        .iter()
        .map(|step| {
            let record = state.record_for(&step.name);
            StepStatus {
                name: step.name.clone(),
                type_: step.type_.clone(),
                phase: phase_label(record.phase),
                message: record.message,
                first_execute_time: record.first_execute_unix.map(unix_to_time),
                last_execute_time: record.last_execute_unix.map(unix_to_time),
            }
        })
        .collect();

    ApplicationStatus {
        phase,
        observed_generation: app.metadata.generation,
        latest_revision: Some(latest_revision.clone()),
        services,
        workflow: Some(WorkflowStatus {
            mode: None,
            app_revision: Some(latest_revision.name),
            context_backend: Some("ConfigMap".to_string()),
            steps,
            suspend: state.suspended,
            terminated: state.terminated,
            finished: tick_result == TickResult::Finished,
        }),
        conditions: vec![],
    }
}

fn phase_label(phase: StepPhase) -> String {
    serde_json::to_value(phase)
        .ok()
        .and_then(|value| value.as_str().map(str::to_string))
        .unwrap_or_default()
}

fn unix_to_time(unix: u64) -> k8s_openapi::apimachinery::pkg::apis::meta::v1::Time {
    let datetime = k8s_openapi::chrono::DateTime::from_timestamp(unix as i64, 0).unwrap_or_else(k8s_openapi::chrono::Utc::now);
    k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(datetime)
}

fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0)
}

async fn update_status(api: &Api<Application>, name: &str, status: ApplicationStatus) -> Result<(), Error> {
    let patch = serde_json::json!({ "status": status });
    api.patch_status(name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
        .await
        .context(error::UpdateStatusSnafu { name: name.to_string() })?;
    Ok(())
}

/// Reports a failed reconcile as a Kubernetes Event on the Application, the way
/// `oam_shared::logging::k8s_events` reports controller errors — reimplemented here because that
/// helper is tied to `kube::runtime::controller::Error`, which this crate's hand-rolled queue
/// (`crate::queue::ReconcileQueue`) never produces.
async fn publish_error_event(client: &kube::Client, app: &Application, err: &Error) {
    let recorder = Recorder::new(
        client.clone(),
        Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: None,
        },
        app.object_ref(&()),
    );
    let event = error_to_event(err);
    if let Err(source) = recorder.publish(event).await {
        warn!(error = %source, "failed to report error as a k8s event");
    }
}

fn error_to_event(err: &Error) -> Event {
    let mut full_message = {
        use std::fmt::Write;
        let mut buf = err.to_string();
        let mut source: &dyn std::error::Error = err;
        loop {
            source = match source.source() {
                Some(next) => {
                    write!(buf, ": {next}").unwrap_or(());
                    next
                }
                None => break buf,
            }
        }
    };
    truncate_with_ellipsis(&mut full_message, 1024);

    Event {
        type_: EventType::Warning,
        reason: err.category().to_string(),
        note: Some(full_message),
        action: "Reconcile".to_string(),
        secondary: None,
    }
}

fn truncate_with_ellipsis(message: &mut String, max_len: usize) {
    if message.len() <= max_len {
        return;
    }
    let mut cut = max_len.saturating_sub('…'.len_utf8());
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message.truncate(cut);
    message.push('…');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_workflow_steps_is_a_single_apply_remaining_step() {
        let steps = default_workflow_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].type_, "apply-remaining");
    }

    #[test]
    fn an_empty_declared_workflow_falls_back_to_the_default() {
        let spec = ApplicationSpec {
            components: vec![],
            policies: vec![],
            workflow: Some(oam_types::Workflow { steps: vec![] }),
        };
        let steps = workflow_steps_for(&spec);
        assert_eq!(steps[0].type_, "apply-remaining");
    }

    #[test]
    fn merge_gc_policy_concatenates_rules_and_ors_keep_legacy_resource() {
        let a = GarbageCollectPolicy {
            rules: vec![],
            order: DeletionOrder::Unconstrained,
            keep_legacy_resource: false,
        };
        let b = GarbageCollectPolicy {
            rules: vec![],
            order: DeletionOrder::ReverseDependency,
            keep_legacy_resource: true,
        };
        let merged = merge_gc_policy(&[a, b]);
        assert_eq!(merged.order, DeletionOrder::ReverseDependency);
        assert!(merged.keep_legacy_resource);
    }

    #[test]
    fn truncate_is_a_noop_under_the_limit() {
        let mut message = "short".to_string();
        truncate_with_ellipsis(&mut message, 1024);
        assert_eq!(message, "short");
    }

    #[test]
    fn truncate_ellipsizes_over_the_limit() {
        let mut message = "a".repeat(2000);
        truncate_with_ellipsis(&mut message, 16);
        assert!(message.len() <= 16);
        assert!(message.ends_with('…'));
    }

    #[test]
    fn phase_label_uses_camel_case() {
        assert_eq!(phase_label(StepPhase::TimedOut), "timedOut");
    }
}
