//! The per-tick scheduling loop (spec.md §4.5): "within one reconciliation tick all ready steps
//! are dispatched concurrently; the tick ends when either all steps reach a terminal state, a
//! step enters `Suspended`, a step enters `Failed` with non-continue semantics, or the
//! reconciliation deadline elapses."
use std::collections::BTreeMap;
use std::time::Duration;

use oam_types::WorkflowStep;
use tracing::{info, instrument, warn};

use crate::backoff::delay_for_attempt;
use crate::condition::Condition;
use crate::executor::{StepExecutor, StepOutcome};
use crate::scheduler::{all_terminal, ready_steps, validate};
use crate::state::{StepPhase, StepRecord, WorkflowState};
use crate::Error;

/// Operator-tunable knobs (spec.md §4.5, §6).
#[derive(Clone, Copy, Debug)]
pub struct RuntimeConfig {
    pub max_wait_backoff: Duration,
    pub max_failed_backoff: Duration,
    pub max_step_error_retry_times: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_wait_backoff: Duration::from_secs(60),
            max_failed_backoff: Duration::from_secs(300),
            max_step_error_retry_times: 10,
        }
    }
}

/// What the tick concluded with, driving `status.phase` in the caller (C8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickResult {
    /// Every step is terminal; the workflow finished (successfully or not).
    Finished,
    /// At least one step suspended the workflow; it must be resumed by a later event.
    Suspended,
    /// A step failed without continue-on-error; the workflow is terminally failed.
    Failed,
    /// Some steps are still in flight or awaiting retry backoff.
    InProgress,
}

pub struct WorkflowRuntime<'a, E: StepExecutor> {
    config: RuntimeConfig,
    executor: &'a E,
}

impl<'a, E: StepExecutor> WorkflowRuntime<'a, E> {
    pub fn new(config: RuntimeConfig, executor: &'a E) -> Self {
        Self { config, executor }
    }

    /// Runs one tick over `steps`, mutating `state` in place. `now_unix` is the caller's wall
    /// clock reading, used only to gate retry backoff and is otherwise opaque to this crate.
    #[instrument(skip(self, steps, state))]
    pub async fn tick(
        &self,
        steps: &[WorkflowStep],
        state: &mut WorkflowState,
        now_unix: u64,
    ) -> Result<TickResult, Error> {
        validate(steps)?;

        if state.suspended {
            return Ok(TickResult::Suspended);
        }
        if state.terminated {
            return Ok(TickResult::Failed);
        }

        self.evaluate_conditions(steps, state)?;

        let ready: Vec<String> = ready_steps(steps, state)
            .into_iter()
            .filter(|step| {
                state
                    .record_for(&step.name)
                    .next_attempt_at_unix
                    .is_none_or(|due| now_unix >= due)
            })
            .map(|step| step.name.clone())
            .collect();

        if ready.is_empty() && all_terminal(steps, state) {
            return Ok(TickResult::Finished);
        }

        // Suspend steps pause the whole workflow and never race with other steps in the same
        // tick; every other ready step is dispatched to the executor concurrently (spec.md §4.5).
        let (suspends, runnable): (Vec<_>, Vec<_>) = ready
            .into_iter()
            .partition(|name| steps.iter().any(|s| s.name == *name && s.type_ == "suspend"));

        for name in suspends {
            info!(step = %name, "suspending workflow");
            state.suspended = true;
            state.steps.insert(
                name.clone(),
                StepRecord {
                    phase: StepPhase::Suspended,
                    ..state.record_for(&name)
                },
            );
        }
        if state.suspended {
            return Ok(TickResult::Suspended);
        }

        let mut dispatches = Vec::with_capacity(runnable.len());
        for name in &runnable {
            let step = steps.iter().find(|s| &s.name == name).expect("ready step exists");
            let inputs = self.resolve_inputs(step, state)?;
            let mut record = state.record_for(name);
            record.phase = StepPhase::Running;
            record.attempt += 1;
            record.first_execute_unix.get_or_insert(now_unix);
            record.last_execute_unix = Some(now_unix);
            state.steps.insert(name.clone(), record);
            dispatches.push(async move { (step, self.executor.execute(step, &inputs).await) });
        }

        let outcomes = futures::future::join_all(dispatches).await;
        for (step, outcome) in outcomes {
            self.apply_outcome(step, outcome, state, now_unix);
            if state.suspended {
                return Ok(TickResult::Suspended);
            }
            let record = state.record_for(&step.name);
            if record.phase == StepPhase::Failed && !step.continue_on_error {
                state.terminated = true;
                return Ok(TickResult::Failed);
            }
        }

        if all_terminal(steps, state) {
            Ok(TickResult::Finished)
        } else {
            Ok(TickResult::InProgress)
        }
    }

    fn apply_outcome(
        &self,
        step: &WorkflowStep,
        outcome: StepOutcome,
        state: &mut WorkflowState,
        now_unix: u64,
    ) {
        let mut record = state.record_for(&step.name);
        match outcome {
            StepOutcome::Succeeded { outputs } => {
                record.phase = StepPhase::Succeeded;
                record.outputs = outputs;
                record.message = None;
            }
            StepOutcome::Suspend => {
                record.phase = StepPhase::Suspended;
                state.suspended = true;
            }
            StepOutcome::Failed { message } => {
                warn!(step = %step.name, %message, "step failed non-retryably");
                record.phase = StepPhase::Failed;
                record.message = Some(message);
            }
            StepOutcome::Retry { message } => {
                if record.attempt >= self.config.max_step_error_retry_times {
                    warn!(step = %step.name, attempts = record.attempt, "retry budget exhausted");
                    record.phase = StepPhase::Failed;
                    record.message = Some(message);
                } else {
                    let initial_delay = step
                        .retry_delay
                        .map(oam_shared::time::Duration::as_std)
                        .unwrap_or(Duration::from_secs(1));
                    let delay = delay_for_attempt(
                        initial_delay,
                        self.config.max_failed_backoff,
                        record.attempt,
                    );
                    record.phase = StepPhase::Pending;
                    record.next_attempt_at_unix = Some(now_unix + delay.as_secs());
                    record.message = Some(message);
                }
            }
        }
        state.steps.insert(step.name.clone(), record);
    }

    fn resolve_inputs(
        &self,
        step: &WorkflowStep,
        state: &WorkflowState,
    ) -> Result<BTreeMap<String, serde_json::Value>, Error> {
        let mut inputs = BTreeMap::new();
        for input in &step.inputs {
            let Some((source_step, output_name)) = input.from.split_once('.') else {
                return crate::error::InputUnresolvedSnafu {
                    name: step.name.clone(),
                    input: input.parameter_key.clone(),
                    reason: format!("malformed `from` reference {:?}", input.from),
                }
                .fail();
            };
            let value = state
                .steps
                .get(source_step)
                .and_then(|record| record.outputs.get(output_name))
                .cloned()
                .ok_or_else(|| {
                    crate::error::InputUnresolvedSnafu {
                        name: step.name.clone(),
                        input: input.parameter_key.clone(),
                        reason: format!("no output {output_name:?} recorded for step {source_step:?}"),
                    }
                    .build()
                })?;
            inputs.insert(input.parameter_key.clone(), value);
        }
        Ok(inputs)
    }

    fn evaluate_conditions(&self, steps: &[WorkflowStep], state: &mut WorkflowState) -> Result<(), Error> {
        for step in steps {
            let record = state.record_for(&step.name);
            if record.phase != StepPhase::Pending {
                continue;
            }
            let Some(expression) = &step.if_ else { continue };
            let ready = step.depends_on.iter().all(|dependency| {
                state
                    .steps
                    .get(dependency)
                    .is_some_and(|r| r.phase.is_terminal())
            });
            if !ready {
                continue;
            }
            let condition = Condition::parse(&step.name, expression)?;
            if !condition.evaluate(state) {
                state.steps.insert(
                    step.name.clone(),
                    StepRecord {
                        phase: StepPhase::Skipped,
                        ..record
                    },
                );
            }
        }
        Ok(())
    }
}
