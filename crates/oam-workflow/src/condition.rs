//! `if` expressions (spec.md §4.5): "a boolean expression over prior step outputs; `false`
//! yields `Skipped`." Only a small, closed grammar is supported; arbitrary CUE-style expressions
//! are out of scope (spec.md §1).
use serde_json::Value;

use crate::error::{Error, MalformedConditionSnafu};
use crate::state::WorkflowState;

/// The special value a `timeout` consults to decide whether a step should run out its timer
/// regardless of earlier failures (spec.md §4.5).
pub const ALWAYS_RUN: &str = "alwaysRun";

#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    AlwaysRun,
    Literal(bool),
    OutputEquals {
        step: String,
        output: String,
        value: Value,
    },
}

impl Condition {
    pub fn parse(step_name: &str, expression: &str) -> Result<Self, Error> {
        let trimmed = expression.trim();
        if trimmed == ALWAYS_RUN {
            return Ok(Condition::AlwaysRun);
        }
        if trimmed == "true" {
            return Ok(Condition::Literal(true));
        }
        if trimmed == "false" {
            return Ok(Condition::Literal(false));
        }
        if let Some((lhs, rhs)) = trimmed.split_once("==") {
            let lhs = lhs.trim();
            let rhs = rhs.trim().trim_matches('"');
            let Some((step, output)) = lhs.split_once('.') else {
                return MalformedConditionSnafu {
                    name: step_name.to_string(),
                    expression: expression.to_string(),
                }
                .fail();
            };
            return Ok(Condition::OutputEquals {
                step: step.to_string(),
                output: output.to_string(),
                value: Value::String(rhs.to_string()),
            });
        }
        MalformedConditionSnafu {
            name: step_name.to_string(),
            expression: expression.to_string(),
        }
        .fail()
    }

    /// Evaluates against the outputs recorded for already-run steps. A referenced step or output
    /// that hasn't run yet evaluates to `false` rather than erroring, since the scheduler only
    /// evaluates `if` once every dependency has reached a terminal state.
    pub fn evaluate(&self, state: &WorkflowState) -> bool {
        match self {
            Condition::AlwaysRun => true,
            Condition::Literal(value) => *value,
            Condition::OutputEquals {
                step,
                output,
                value,
            } => state
                .steps
                .get(step)
                .and_then(|record| record.outputs.get(output))
                .is_some_and(|actual| actual == value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StepRecord;
    use std::collections::BTreeMap;

    #[test]
    fn literal_true_and_false_parse_and_evaluate() {
        let state = WorkflowState::default();
        assert!(Condition::parse("s", "true").unwrap().evaluate(&state));
        assert!(!Condition::parse("s", "false").unwrap().evaluate(&state));
    }

    #[test]
    fn output_equality_reads_the_recorded_output() {
        let mut state = WorkflowState::default();
        state.steps.insert(
            "check".to_string(),
            StepRecord {
                outputs: BTreeMap::from([(
                    "status".to_string(),
                    serde_json::json!("ready"),
                )]),
                ..Default::default()
            },
        );
        let condition = Condition::parse("next", "check.status == \"ready\"").unwrap();
        assert!(condition.evaluate(&state));

        let condition = Condition::parse("next", "check.status == \"pending\"").unwrap();
        assert!(!condition.evaluate(&state));
    }

    #[test]
    fn malformed_expression_is_rejected() {
        assert!(Condition::parse("s", "not a real expression").is_err());
    }
}
