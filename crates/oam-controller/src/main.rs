//! Process entrypoint (spec.md §5, §9): constructs every C1-C7 dependency once, then either
//! prints the registered CRDs' YAML schemas or runs the reconcile loop, fed by three
//! `kube::runtime::watcher` streams over an explicit [`ReconcileQueue`] rather than
//! `kube::runtime::Controller` (spec.md §9 design note).
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::StreamExt;
use kube::api::Api;
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Client, ResourceExt};
use oam_controller::cli::{Command, Opts};
use oam_controller::config::ControllerConfig;
use oam_controller::error::{self, Error};
use oam_controller::metrics::Metrics;
use oam_controller::queue::ReconcileQueue;
use oam_controller::reconcile::ReconcileContext;
use oam_dispatch::client_pool::ClusterClientPool;
use oam_policy::PolicyEngine;
use oam_shared::crd::CustomResourceExt as OamCrdExt;
use oam_shared::signal::SignalWatcher;
use oam_tracker::{TrackerStore, OWNER_APP_LABEL};
use oam_types::{
    Application, ApplicationRevision, Cluster, ComponentDefinition, PolicyDefinition,
    ResourceTracker, TraitDefinition, WorkflowStepDefinition,
};
use oam_workflow::{ConfigMapContextStore, WorkflowContextStore};
use snafu::ResultExt;
use tracing::{info, warn};

/// Operator-version string stamped into the printed CRD schemas' documentation links.
const OPERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Label an `ApplicationRevision` carries back to its owning Application (spec.md §4.2); see
/// `reconcile::persist_revision`.
const REVISION_APP_LABEL: &str = "core.oam.dev/app";

fn main() -> Result<(), Error> {
    oam_shared::logging::init_logging("OAM_CONTROLLER_LOG");

    let opts = Opts::parse();
    let runtime = tokio::runtime::Runtime::new().expect("failed to start the tokio runtime");
    let result = runtime.block_on(run(opts));

    if let Err(err) = &result {
        tracing::error!(error = %err, "oam-controller exited with an error");
    }
    result
}

async fn run(opts: Opts) -> Result<(), Error> {
    match opts.command {
        Command::Crd { output } => print_crds(output).await,
        Command::Run(config) => run_controller(config).await,
    }
}

/// Writes every registered kind's CRD YAML schema, one document per kind, to `output` if given
/// or to stdout otherwise.
async fn print_crds(output: Option<PathBuf>) -> Result<(), Error> {
    match output {
        Some(dir) => {
            write_crd_to::<Application>(&dir, "application").await?;
            write_crd_to::<ApplicationRevision>(&dir, "applicationrevision").await?;
            write_crd_to::<ResourceTracker>(&dir, "resourcetracker").await?;
            write_crd_to::<Cluster>(&dir, "cluster").await?;
            write_crd_to::<ComponentDefinition>(&dir, "componentdefinition").await?;
            write_crd_to::<TraitDefinition>(&dir, "traitdefinition").await?;
            write_crd_to::<PolicyDefinition>(&dir, "policydefinition").await?;
            write_crd_to::<WorkflowStepDefinition>(&dir, "workflowstepdefinition").await?;
        }
        None => {
            print_one::<Application>()?;
            print_one::<ApplicationRevision>()?;
            print_one::<ResourceTracker>()?;
            print_one::<Cluster>()?;
            print_one::<ComponentDefinition>()?;
            print_one::<TraitDefinition>()?;
            print_one::<PolicyDefinition>()?;
            print_one::<WorkflowStepDefinition>()?;
        }
    }
    Ok(())
}

fn print_one<K: OamCrdExt>() -> Result<(), Error> {
    K::print_yaml_schema(OPERATOR_VERSION).context(error::CrdSchemaSnafu)
}

async fn write_crd_to<K: OamCrdExt>(dir: &std::path::Path, file_stem: &str) -> Result<(), Error> {
    let yaml = K::yaml_schema(OPERATOR_VERSION).context(error::CrdSchemaSnafu)?;
    let path = dir.join(format!("{file_stem}.yaml"));
    std::fs::write(&path, yaml).context(error::CrdSchemaFileSnafu {
        path: path.display().to_string(),
    })?;
    Ok(())
}

/// Builds every shared dependency, starts the three watcher streams, and spawns
/// `concurrent_reconciles` workers draining the queue until `SIGTERM`.
async fn run_controller(config: ControllerConfig) -> Result<(), Error> {
    let client = Client::try_default().await.context(error::ClientBuildSnafu)?;
    let namespace = config.watch_namespace.clone().unwrap_or_else(|| "default".to_string());

    let clients = Arc::new(ClusterClientPool::new(client.clone()));
    let tracker_store = TrackerStore::new(client.clone(), namespace.clone());
    let context_store: Arc<dyn WorkflowContextStore> =
        Arc::new(ConfigMapContextStore::new(client.clone(), namespace.clone()));
    let policy_engine = PolicyEngine::new();
    let metrics = Arc::new(Metrics::new());

    let ctx = Arc::new(ReconcileContext {
        client: client.clone(),
        clients,
        policy_engine,
        tracker_store,
        context_store,
        config,
        metrics,
    });

    let queue = Arc::new(ReconcileQueue::new());
    let signals = SignalWatcher::sigterm().context(error::SignalSnafu)?;

    let app_watch = spawn_application_watch(client.clone(), ctx.config.watch_namespace.clone(), queue.clone());
    let revision_watch = spawn_owned_watch::<ApplicationRevision>(
        client.clone(),
        ctx.config.watch_namespace.clone(),
        queue.clone(),
        REVISION_APP_LABEL,
    );
    let tracker_watch = spawn_owned_watch::<ResourceTracker>(
        client.clone(),
        ctx.config.watch_namespace.clone(),
        queue.clone(),
        OWNER_APP_LABEL,
    );

    let mut workers = Vec::with_capacity(ctx.config.concurrent_reconciles);
    for worker_id in 0..ctx.config.concurrent_reconciles {
        let ctx = ctx.clone();
        let queue = queue.clone();
        let shutdown = signals.handle();
        workers.push(tokio::spawn(async move {
            reconcile_worker(worker_id, ctx, queue, shutdown).await;
        }));
    }

    for worker in workers {
        let _ = worker.await;
    }
    app_watch.abort();
    revision_watch.abort();
    tracker_watch.abort();

    Ok(())
}

async fn reconcile_worker(
    worker_id: usize,
    ctx: Arc<ReconcileContext>,
    queue: Arc<ReconcileQueue>,
    shutdown: impl std::future::Future<Output = ()>,
) {
    tokio::pin!(shutdown);
    loop {
        let key = tokio::select! {
            key = queue.recv() => key,
            _ = &mut shutdown => {
                info!(worker_id, "shutting down on SIGTERM");
                return;
            }
        };

        if let Err(err) = oam_controller::reconcile::reconcile(&ctx, &key).await {
            warn!(worker_id, namespace = %key.0, name = %key.1, error = %err, "reconcile failed");
        }
        queue.finish(&key);
    }
}

fn spawn_application_watch(
    client: Client,
    namespace: Option<String>,
    queue: Arc<ReconcileQueue>,
) -> tokio::task::JoinHandle<()> {
    let api: Api<Application> = match &namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    tokio::spawn(async move {
        let mut stream = watcher(api, watcher::Config::default()).touched_objects().boxed();
        while let Some(event) = stream.next().await {
            match event {
                Ok(app) => {
                    let namespace = app.namespace().unwrap_or_else(|| "default".to_string());
                    queue.enqueue((namespace, app.name_any()));
                }
                Err(err) => warn!(error = %err, "Application watch stream error"),
            }
        }
    })
}

/// Watches a kind owned by an Application (`ApplicationRevision`, `ResourceTracker`) and
/// requeues the owning Application named by its `owner_label`.
fn spawn_owned_watch<K>(
    client: Client,
    namespace: Option<String>,
    queue: Arc<ReconcileQueue>,
    owner_label: &'static str,
) -> tokio::task::JoinHandle<()>
where
    K: kube::Resource<DynamicType = ()> + kube::ResourceExt + Clone + std::fmt::Debug + Send + Sync + 'static,
    K: serde::de::DeserializeOwned,
{
    let api: Api<K> = match &namespace {
        Some(ns) => Api::namespaced(client, ns),
        None => Api::all(client),
    };
    tokio::spawn(async move {
        let mut stream = watcher(api, watcher::Config::default()).touched_objects().boxed();
        while let Some(event) = stream.next().await {
            match event {
                Ok(object) => {
                    let Some(app_name) = object.labels().get(owner_label).cloned() else {
                        continue;
                    };
                    let namespace = object.namespace().unwrap_or_else(|| "default".to_string());
                    queue.enqueue((namespace, app_name));
                }
                Err(err) => warn!(error = %err, kind = std::any::type_name::<K>(), "watch stream error"),
            }
        }
    })
}
