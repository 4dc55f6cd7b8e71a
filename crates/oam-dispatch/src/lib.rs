//! Fans rendered manifests out to member clusters via server-side apply (spec.md §4.6). Builds
//! and caches a [`kube::Client`] per cluster from its `credentialRef`, classifies apply failures
//! into the dispatcher's own retryable/non-retryable taxonomy, and bounds in-flight applies to
//! a configurable concurrency cap.

pub mod apply;
pub mod client_pool;
pub mod config;
pub mod dispatcher;
pub mod error;

pub use apply::{sharer_list, ApplyOutcome, Disposition, FIELD_MANAGER};
pub use client_pool::{ClusterClientPool, SharedClientPool};
pub use config::DispatchConfig;
pub use dispatcher::{dispatch_all, DispatchItem, DispatchResult};
pub use error::Error;
