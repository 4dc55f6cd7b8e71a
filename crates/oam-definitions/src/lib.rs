//! Resolves named Definitions (Component/Trait/Policy/WorkflowStep) to their template, schema,
//! and attributes (spec.md §4.1).

pub mod cache;
pub mod error;
pub mod store;

pub use cache::DefinitionCache;
pub use error::Error;
pub use store::{DefinitionKey, DefinitionStore, ResolvedDefinition};
