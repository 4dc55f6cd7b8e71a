use oam_shared::logging::ReconcilerError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("policy {name:?} has malformed properties for type {type_:?}"))]
    MalformedProperties {
        name: String,
        type_: String,
        source: serde_json::Error,
    },

    #[snafu(display("topology policy {name:?} selects no clusters and allowEmpty is false"))]
    EmptyTopology { name: String },

    #[snafu(display("override policy {name:?} targets unknown component {component:?}"))]
    UnknownComponent { name: String, component: String },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        match self {
            Error::MalformedProperties { .. } => "MalformedProperties",
            Error::EmptyTopology { .. } => "EmptyTopology",
            Error::UnknownComponent { .. } => "UnknownComponent",
        }
    }
}
