//! The seam between the scheduler and the rest of the engine: rendering, dispatch, and tracking
//! (C3/C6/C7) all happen behind [`StepExecutor`], so this crate only owns the DAG and the state
//! machine (spec.md §4.5).
use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

/// What a single attempt at running a step produced.
#[derive(Clone, Debug)]
pub enum StepOutcome {
    Succeeded { outputs: BTreeMap<String, Value> },
    /// Non-retryable or retries exhausted.
    Failed { message: String },
    /// Retryable; the runtime will re-attempt after backoff.
    Retry { message: String },
    /// A `suspend` step, or any step that asked to pause the whole workflow.
    Suspend,
}

#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(
        &self,
        step: &oam_types::WorkflowStep,
        inputs: &BTreeMap<String, Value>,
    ) -> StepOutcome;
}
