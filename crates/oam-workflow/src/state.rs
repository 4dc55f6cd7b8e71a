//! Per-step state (spec.md §4.5): `Pending -> Running -> {Succeeded, Failed, Skipped,
//! Suspended, TimedOut}`.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StepPhase {
    #[default]
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
    Suspended,
    TimedOut,
}

impl StepPhase {
    /// `Succeeded` and `Skipped` satisfy a dependent's `dependsOn`; `Failed` does only when the
    /// failed step was marked continue-on-error, which the scheduler accounts for separately.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StepPhase::Succeeded | StepPhase::Failed | StepPhase::Skipped | StepPhase::TimedOut
        )
    }

    pub fn satisfies_dependency(self) -> bool {
        matches!(self, StepPhase::Succeeded | StepPhase::Skipped)
    }
}

/// The runtime state of one step, persisted in the [`crate::context_store::WorkflowContextStore`].
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub phase: StepPhase,

    #[serde(default)]
    pub attempt: u32,

    /// Unix seconds before which a retry must not be attempted. The controller (C8), which owns
    /// the wall clock, is responsible for both setting and comparing this.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_attempt_at_unix: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_execute_unix: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_execute_unix: Option<u64>,

    #[serde(default)]
    pub outputs: BTreeMap<String, Value>,
}

/// The whole workflow's state, keyed by step name; nested `step-group` substeps are flattened
/// under `"<group>/<substep>"`.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    #[serde(default)]
    pub steps: BTreeMap<String, StepRecord>,

    #[serde(default)]
    pub suspended: bool,

    #[serde(default)]
    pub terminated: bool,
}

impl WorkflowState {
    pub fn record_for(&self, step_name: &str) -> StepRecord {
        self.steps.get(step_name).cloned().unwrap_or_default()
    }

    /// Clears the suspend flag and resets any `Suspended` step back to `Pending` so the next
    /// tick re-dispatches it. Called by the controller on a resume event (timer, object change,
    /// manual resume) (spec.md §4.5).
    pub fn resume(&mut self) {
        self.suspended = false;
        for record in self.steps.values_mut() {
            if record.phase == StepPhase::Suspended {
                record.phase = StepPhase::Pending;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn succeeded_and_skipped_satisfy_dependencies_failed_does_not() {
        assert!(StepPhase::Succeeded.satisfies_dependency());
        assert!(StepPhase::Skipped.satisfies_dependency());
        assert!(!StepPhase::Failed.satisfies_dependency());
        assert!(!StepPhase::Pending.satisfies_dependency());
    }

    #[test]
    fn resume_clears_suspended_steps_back_to_pending() {
        let mut state = WorkflowState {
            suspended: true,
            ..Default::default()
        };
        state.steps.insert(
            "pause".to_string(),
            StepRecord {
                phase: StepPhase::Suspended,
                ..Default::default()
            },
        );
        state.resume();
        assert!(!state.suspended);
        assert_eq!(state.steps["pause"].phase, StepPhase::Pending);
    }

    #[test]
    fn terminal_states_match_the_documented_set() {
        assert!(StepPhase::Succeeded.is_terminal());
        assert!(StepPhase::Failed.is_terminal());
        assert!(StepPhase::Skipped.is_terminal());
        assert!(StepPhase::TimedOut.is_terminal());
        assert!(!StepPhase::Running.is_terminal());
        assert!(!StepPhase::Suspended.is_terminal());
    }
}
