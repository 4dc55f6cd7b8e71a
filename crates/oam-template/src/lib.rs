//! Evaluates a Definition's `schematic.template` against a `parameter` object and an injected
//! `context`, producing the `output`/`outputs` (components), `patch`/`outputs` (traits), or
//! `components`/`workflow`/`policies`/`labels`/`annotations`/`ctx` deltas (Application-scoped
//! policies) spec.md §4.2 describes.
//!
//! The template language here is a pragmatic, statically-typed stand-in for the CUE-like
//! constraint language the source system embeds: a JSON tree whose string leaves may contain
//! `{{ parameter.* }}` / `{{ context.* }}` references, evaluated deterministically so that
//! identical inputs always yield identical outputs (required for revision hashing, spec.md §8
//! invariant 2).

pub mod context;
pub mod error;
pub mod merge;
pub mod path;
pub mod schema;
pub mod template;

pub use context::Context;
pub use error::Error;
pub use merge::MergeStrategy;
pub use template::{ComponentEvaluation, PolicyEvaluation, Template, TraitEvaluation};
