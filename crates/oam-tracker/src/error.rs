use oam_shared::logging::ReconcilerError;
use snafu::Snafu;

/// Errors from the Resource Tracker & GC subsystem (spec.md §4.7).
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("failed to load ResourceTracker {app:?} revision {revision:?}"))]
    TrackerLoad {
        app: String,
        revision: String,
        source: kube::Error,
    },

    #[snafu(display("failed to save ResourceTracker {app:?} revision {revision:?}"))]
    TrackerSave {
        app: String,
        revision: String,
        source: kube::Error,
    },

    #[snafu(display("failed to list ResourceTrackers for Application {app:?}"))]
    TrackerList { app: String, source: kube::Error },

    #[snafu(display(
        "failed to delete {kind} {name:?} on cluster {cluster:?} while recycling tracker entries"
    ))]
    Delete {
        cluster: String,
        kind: String,
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        match self {
            Error::TrackerLoad { .. } => "TrackerLoad",
            Error::TrackerSave { .. } => "TrackerSave",
            Error::TrackerList { .. } => "TrackerList",
            Error::Delete { .. } => "Delete",
        }
    }
}
