//! Records every resource an Application revision dispatches and recycles orphaned ones when a
//! new revision drops them or the Application is deleted (spec.md §4.7).

pub mod diff;
pub mod error;
pub mod gc;
pub mod recycle;
pub mod tracker_store;

pub use diff::delta_applied;
pub use error::Error;
pub use recycle::{recycle_on_app_delete, recycle_on_revision_change, RecycleOutcome, ResourceDeleter};
pub use tracker_store::{tracker_name, TrackerStore, OWNER_APP_LABEL};
