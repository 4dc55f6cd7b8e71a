//! Applies `Policy` objects that either transform the Application before rendering
//! (`override`, `replication`, `topology`) or govern a rendered resource's lifecycle/ownership
//! (`shared-resource`, `read-only`, `apply-once`, `garbage-collect`, `take-over`) (spec.md §4.4).

pub mod apply_once;
pub mod engine;
pub mod error;
pub mod garbage_collect;
pub mod override_;
pub mod read_only;
pub mod replication;
pub mod shared_resource;
pub mod take_over;
pub mod topology;

pub use engine::{EffectiveApplication, PolicyEngine, ResourcePolicies};
pub use error::Error;
