use oam_shared::logging::ReconcilerError;
use oam_types::DefinitionKind;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("no {kind} definition named {name:?} in namespace {namespace:?} or the system namespace"))]
    NotFound {
        kind: DefinitionKind,
        namespace: String,
        name: String,
    },

    #[snafu(display("{kind} definition {name:?} in namespace {namespace:?} has an invalid parameter schema"))]
    SchemaParse {
        kind: DefinitionKind,
        namespace: String,
        name: String,
        source: serde_json::Error,
    },

    #[snafu(display("failed to fetch {kind} definition {name:?} from the Kubernetes API"))]
    Fetch {
        kind: DefinitionKind,
        name: String,
        source: kube::Error,
    },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "NotFound",
            Error::SchemaParse { .. } => "SchemaParse",
            Error::Fetch { .. } => "Fetch",
        }
    }
}
