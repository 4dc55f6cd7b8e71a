use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("parameter {path:?} failed schema validation: {message}"))]
    Schema { path: String, message: String },

    #[snafu(display("template evaluation failed at {path:?}: {message}"))]
    Eval { path: String, message: String },

    #[snafu(display("template references {path:?}, which is not set"))]
    MissingField { path: String },

    #[snafu(display("template field {path:?} forms a substitution cycle"))]
    CycleInTemplate { path: String },

    #[snafu(display("list field {path:?} has duplicate patch key {key:?}"))]
    DuplicatePatchKey { path: String, key: String },
}
