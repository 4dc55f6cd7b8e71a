use oam_shared::logging::ReconcilerError;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("component {component:?} uses undefined type {type_:?}"))]
    UndefinedComponentType {
        component: String,
        type_: String,
        source: oam_definitions::Error,
    },

    #[snafu(display("trait {trait_type:?} on component {component:?} uses undefined type"))]
    UndefinedTraitType {
        component: String,
        trait_type: String,
        source: oam_definitions::Error,
    },

    #[snafu(display(
        "trait {trait_type:?} does not apply to workload kind {workload_kind:?} on component {component:?}"
    ))]
    TraitNotApplicable {
        component: String,
        trait_type: String,
        workload_kind: String,
    },

    #[snafu(display("failed to evaluate the template for component {component:?}"))]
    ComponentEval {
        component: String,
        source: oam_template::Error,
    },

    #[snafu(display("failed to evaluate trait {trait_type:?} on component {component:?}"))]
    TraitEval {
        component: String,
        trait_type: String,
        source: oam_template::Error,
    },

    #[snafu(display("failed to merge trait {trait_type:?}'s patch into component {component:?}"))]
    PatchMerge {
        component: String,
        trait_type: String,
        source: oam_template::Error,
    },

    #[snafu(display("failed to tag manifest for component {component:?} with provenance labels"))]
    Tagging {
        component: String,
        source: oam_shared::kvp::LabelError,
    },
}

impl ReconcilerError for Error {
    fn category(&self) -> &'static str {
        match self {
            Error::UndefinedComponentType { .. } => "UndefinedComponentType",
            Error::UndefinedTraitType { .. } => "UndefinedTraitType",
            Error::TraitNotApplicable { .. } => "TraitNotApplicable",
            Error::ComponentEval { .. } => "ComponentEval",
            Error::TraitEval { .. } => "TraitEval",
            Error::PatchMerge { .. } => "PatchMerge",
            Error::Tagging { .. } => "Tagging",
        }
    }
}
