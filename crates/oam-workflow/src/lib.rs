//! DAG scheduling and the per-step state machine over `WorkflowStep` (spec.md §4.5). Rendering,
//! dispatch, and tracking are injected via [`executor::StepExecutor`]; this crate owns only
//! scheduling, retries, suspension, and conditional execution.

mod backoff;
pub mod condition;
pub mod context_store;
pub mod error;
pub mod executor;
pub mod runtime;
pub mod scheduler;
pub mod state;

pub use context_store::{ConfigMapContextStore, InMemoryContextStore, WorkflowContextStore};
pub use error::Error;
pub use executor::{StepExecutor, StepOutcome};
pub use runtime::{RuntimeConfig, TickResult, WorkflowRuntime};
pub use state::{StepPhase, StepRecord, WorkflowState};
