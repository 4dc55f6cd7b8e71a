use oam_shared::logging::ReconcilerError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("step {name:?} depends on unknown step {depends_on:?}"))]
    UnknownDependency { name: String, depends_on: String },

    #[snafu(display("step {name:?} and a sibling share the name {duplicate:?}"))]
    DuplicateStepName { name: String, duplicate: String },

    #[snafu(display("step {name:?} has a cyclic dependency"))]
    Cycle { name: String },

    #[snafu(display("step {name:?} could not resolve input {input:?}: {reason}"))]
    InputUnresolved {
        name: String,
        input: String,
        reason: String,
    },

    #[snafu(display("step {name:?} has a malformed if-condition {expression:?}"))]
    MalformedCondition { name: String, expression: String },

    #[snafu(display("failed to load workflow context for {app:?} revision {revision}"))]
    ContextLoad {
        app: String,
        revision: u64,
        source: kube::Error,
    },

    #[snafu(display("failed to persist workflow context for {app:?} revision {revision}"))]
    ContextSave {
        app: String,
        revision: u64,
        source: kube::Error,
    },

    #[snafu(display("workflow context for {app:?} revision {revision} is corrupt"))]
    ContextCorrupt {
        app: String,
        revision: u64,
        source: serde_json::Error,
    },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        match self {
            Error::UnknownDependency { .. } => "UnknownDependency",
            Error::DuplicateStepName { .. } => "DuplicateStepName",
            Error::Cycle { .. } => "Cycle",
            Error::InputUnresolved { .. } => "InputUnresolved",
            Error::MalformedCondition { .. } => "MalformedCondition",
            Error::ContextLoad { .. } => "ContextLoad",
            Error::ContextSave { .. } => "ContextSave",
            Error::ContextCorrupt { .. } => "ContextCorrupt",
        }
    }
}
