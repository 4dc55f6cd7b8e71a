//! The controller's own error surface: wraps the per-crate errors from every component (C1-C7)
//! it wires together, plus the failures that only make sense at the reconcile-loop level.
use oam_shared::logging::ReconcilerError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("failed to fetch Application {namespace}/{name}"))]
    FetchApplication {
        namespace: String,
        name: String,
        source: kube::Error,
    },

    #[snafu(display("failed to resolve the Definitions referenced by Application {name}"))]
    ResolveDefinitions { name: String, source: oam_definitions::Error },

    #[snafu(display("failed to compose the policies attached to Application {name}"))]
    ComposePolicies { name: String, source: oam_policy::Error },

    #[snafu(display("failed to render component {component:?} of Application {name}"))]
    RenderComponent {
        name: String,
        component: String,
        source: oam_render::Error,
    },

    #[snafu(display("workflow tick failed for Application {name}"))]
    WorkflowTick { name: String, source: oam_workflow::Error },

    #[snafu(display("failed to load workflow context for Application {name}"))]
    LoadContext { name: String, source: oam_workflow::Error },

    #[snafu(display("failed to save workflow context for Application {name}"))]
    SaveContext { name: String, source: oam_workflow::Error },

    #[snafu(display("failed to persist ApplicationRevision {revision} for Application {name}"))]
    SaveRevision {
        name: String,
        revision: String,
        source: kube::Error,
    },

    #[snafu(display("failed to load the resource tracker for Application {name} revision {revision}"))]
    LoadTracker {
        name: String,
        revision: String,
        source: oam_tracker::Error,
    },

    #[snafu(display("failed to save the resource tracker for Application {name} revision {revision}"))]
    SaveTracker {
        name: String,
        revision: String,
        source: oam_tracker::Error,
    },

    #[snafu(display("failed to list resource trackers for Application {name}"))]
    ListTrackers { name: String, source: oam_tracker::Error },

    #[snafu(display("failed to delete the resource tracker for Application {name} revision {revision}"))]
    DeleteTracker {
        name: String,
        revision: String,
        source: oam_tracker::Error,
    },

    #[snafu(display("failed to recycle orphaned resources for Application {name}"))]
    Recycle { name: String, source: oam_tracker::Error },

    #[snafu(display("failed to list registered Clusters in namespace {namespace}"))]
    ListClusters { namespace: String, source: kube::Error },

    #[snafu(display("failed to update status of Application {name}"))]
    UpdateStatus { name: String, source: kube::Error },

    #[snafu(display("failed to add finalizer to Application {name}"))]
    AddFinalizer { name: String, source: kube::Error },

    #[snafu(display("failed to remove finalizer from Application {name}"))]
    RemoveFinalizer { name: String, source: kube::Error },

    #[snafu(display("failed to construct a Kubernetes client"))]
    ClientBuild { source: kube::Error },

    #[snafu(display("failed to install the SIGTERM handler"))]
    Signal { source: oam_shared::signal::SignalError },

    #[snafu(display("failed to write CRD YAML schema"))]
    CrdSchema { source: oam_shared::crd::Error },

    #[snafu(display("failed to write CRD YAML schema to {path}"))]
    CrdSchemaFile {
        path: String,
        source: std::io::Error,
    },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        match self {
            Error::FetchApplication { .. } => "FetchApplication",
            Error::ResolveDefinitions { .. } => "ResolveDefinitions",
            Error::ComposePolicies { .. } => "ComposePolicies",
            Error::RenderComponent { .. } => "RenderComponent",
            Error::WorkflowTick { .. } => "WorkflowTick",
            Error::LoadContext { .. } => "LoadContext",
            Error::SaveContext { .. } => "SaveContext",
            Error::SaveRevision { .. } => "SaveRevision",
            Error::LoadTracker { .. } => "LoadTracker",
            Error::SaveTracker { .. } => "SaveTracker",
            Error::ListTrackers { .. } => "ListTrackers",
            Error::DeleteTracker { .. } => "DeleteTracker",
            Error::Recycle { .. } => "Recycle",
            Error::ListClusters { .. } => "ListClusters",
            Error::UpdateStatus { .. } => "UpdateStatus",
            Error::AddFinalizer { .. } => "AddFinalizer",
            Error::RemoveFinalizer { .. } => "RemoveFinalizer",
            Error::ClientBuild { .. } => "ClientBuild",
            Error::Signal { .. } => "Signal",
            Error::CrdSchema { .. } => "CrdSchema",
            Error::CrdSchemaFile { .. } => "CrdSchemaFile",
        }
    }
}
