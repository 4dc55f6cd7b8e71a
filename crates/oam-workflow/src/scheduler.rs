//! The ready-set computation (spec.md §4.5): "the runtime maintains a ready set (Pending steps
//! with all `dependsOn` in a terminal success state and all declared `inputs` resolved)."
use std::collections::{HashMap, HashSet};

use oam_types::WorkflowStep;
use snafu::ensure;

use crate::error::{CycleSnafu, DuplicateStepNameSnafu, Error, UnknownDependencySnafu};
use crate::state::{StepPhase, WorkflowState};

/// Validates that every `dependsOn` refers to a sibling step and that the dependency graph is
/// acyclic. Called once per tick before computing the ready set.
pub fn validate(steps: &[WorkflowStep]) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for step in steps {
        ensure!(
            seen.insert(step.name.as_str()),
            DuplicateStepNameSnafu {
                name: step.name.clone(),
                duplicate: step.name.clone(),
            }
        );
    }
    for step in steps {
        for dependency in &step.depends_on {
            ensure!(
                seen.contains(dependency.as_str()),
                UnknownDependencySnafu {
                    name: step.name.clone(),
                    depends_on: dependency.clone(),
                }
            );
        }
    }
    detect_cycles(steps)
}

fn detect_cycles(steps: &[WorkflowStep]) -> Result<(), Error> {
    let by_name: HashMap<&str, &WorkflowStep> =
        steps.iter().map(|s| (s.name.as_str(), s)).collect();

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(
        name: &'a str,
        by_name: &HashMap<&'a str, &'a WorkflowStep>,
        marks: &mut HashMap<&'a str, Mark>,
    ) -> Result<(), Error> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                return CycleSnafu {
                    name: name.to_string(),
                }
                .fail();
            }
            None => {}
        }
        marks.insert(name, Mark::Visiting);
        if let Some(step) = by_name.get(name) {
            for dependency in &step.depends_on {
                visit(dependency, by_name, marks)?;
            }
        }
        marks.insert(name, Mark::Done);
        Ok(())
    }

    for step in steps {
        visit(&step.name, &by_name, &mut marks)?;
    }
    Ok(())
}

/// Steps that are `Pending` and whose every `dependsOn` entry has reached a state that satisfies
/// a dependency (`Succeeded` or `Skipped`).
pub fn ready_steps<'a>(steps: &'a [WorkflowStep], state: &WorkflowState) -> Vec<&'a WorkflowStep> {
    steps
        .iter()
        .filter(|step| {
            let phase = state.record_for(&step.name).phase;
            phase == StepPhase::Pending
                && step.depends_on.iter().all(|dependency| {
                    state
                        .steps
                        .get(dependency)
                        .is_some_and(|record| record.phase.satisfies_dependency())
                })
        })
        .collect()
}

/// `true` once every step has reached a terminal state.
pub fn all_terminal(steps: &[WorkflowStep], state: &WorkflowState) -> bool {
    steps
        .iter()
        .all(|step| state.record_for(&step.name).phase.is_terminal())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, depends_on: &[&str]) -> WorkflowStep {
        WorkflowStep {
            name: name.to_string(),
            type_: "apply-component".to_string(),
            properties: serde_json::json!({}),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            inputs: vec![],
            outputs: vec![],
            timeout: None,
            if_: None,
            retry_limit: None,
            retry_delay: None,
            continue_on_error: false,
            meta: None,
            sub_steps: None,
        }
    }

    #[test]
    fn root_steps_are_ready_immediately() {
        let steps = vec![step("a", &[]), step("b", &["a"])];
        let ready = ready_steps(&steps, &WorkflowState::default());
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].name, "a");
    }

    #[test]
    fn dependent_step_becomes_ready_once_its_dependency_succeeds() {
        let steps = vec![step("a", &[]), step("b", &["a"])];
        let mut state = WorkflowState::default();
        state.steps.insert(
            "a".to_string(),
            crate::state::StepRecord {
                phase: StepPhase::Succeeded,
                ..Default::default()
            },
        );
        let ready = ready_steps(&steps, &state);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].name, "b");
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let steps = vec![step("a", &["missing"])];
        assert!(validate(&steps).is_err());
    }

    #[test]
    fn direct_cycle_is_rejected() {
        let steps = vec![step("a", &["b"]), step("b", &["a"])];
        assert!(validate(&steps).is_err());
    }

    #[test]
    fn acyclic_graph_validates() {
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &["a", "b"])];
        assert!(validate(&steps).is_ok());
    }
}
