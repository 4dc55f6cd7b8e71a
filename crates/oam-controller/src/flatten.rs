//! Flattens a workflow's nested `step-group` substeps into the flat step list
//! [`oam_workflow::WorkflowRuntime::tick`] operates over, per the naming convention
//! `oam_workflow`'s own `WorkflowState` doc comment assumes: a substep named `b` of a group
//! named `g` becomes the step named `"g/b"`.
//!
//! A step outside the group that declared `dependsOn: [g]` is rewritten to depend on every
//! substep of `g` nothing else inside the group depends on (the group's "exit points"); a
//! substep inside `g` with no `dependsOn` of its own inherits `g`'s own `dependsOn` (the
//! group's "entry points"). This keeps the group's external ordering contract intact once it's
//! gone.
use std::collections::{HashMap, HashSet};
use std::ops::Range;

use oam_types::WorkflowStep;

fn qualify(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}/{name}"),
        None => name.to_string(),
    }
}

/// Flattens `steps`, which may be arbitrarily nested via `sub_steps`, into a single flat list.
pub fn flatten(steps: &[WorkflowStep]) -> Vec<WorkflowStep> {
    let mut flat = Vec::new();
    let mut sinks_by_name: HashMap<String, Vec<String>> = HashMap::new();
    process_level(steps, None, &mut flat, &mut sinks_by_name);
    flat
}

fn process_level(
    items: &[WorkflowStep],
    prefix: Option<&str>,
    flat: &mut Vec<WorkflowStep>,
    sinks_by_name: &mut HashMap<String, Vec<String>>,
) {
    let level_start = flat.len();
    // (item's own name, its fully-qualified name, the range it produced in `flat`, its own
    // `dependsOn` if it's a group — `None` for a plain step, whose `dependsOn` is already on
    // the single entry it produced).
    let mut ranges: Vec<(String, String, Range<usize>, Option<Vec<String>>)> = Vec::new();

    for item in items {
        let flat_name = qualify(prefix, &item.name);
        match &item.sub_steps {
            Some(sub_steps) if !sub_steps.is_empty() => {
                let start = flat.len();
                process_level(sub_steps, Some(&flat_name), flat, sinks_by_name);
                ranges.push((item.name.clone(), flat_name, start..flat.len(), Some(item.depends_on.clone())));
            }
            _ => {
                let mut flattened = item.clone();
                flattened.name = flat_name.clone();
                flattened.sub_steps = None;
                flat.push(flattened);
                ranges.push((item.name.clone(), flat_name, flat.len() - 1..flat.len(), None));
            }
        }
    }

    for (_, flat_name, range, own_depends_on) in &ranges {
        let local_names: HashSet<String> = range.clone().map(|i| flat[i].name.clone()).collect();

        if let Some(own_depends_on) = own_depends_on {
            let entry_points: Vec<usize> = range
                .clone()
                .filter(|&i| flat[i].depends_on.iter().all(|dep| !local_names.contains(dep)))
                .collect();
            for i in entry_points {
                for dep in own_depends_on {
                    if !flat[i].depends_on.contains(dep) {
                        flat[i].depends_on.push(dep.clone());
                    }
                }
            }
        }

        let mut sinks = Vec::new();
        for i in range.clone() {
            let name = flat[i].name.clone();
            let depended_on = range.clone().any(|j| flat[j].depends_on.contains(&name));
            if !depended_on {
                sinks.push(name);
            }
        }
        sinks_by_name.insert(flat_name.clone(), sinks);
    }

    let sibling_sinks: HashMap<String, Vec<String>> = ranges
        .iter()
        .map(|(name, flat_name, _, _)| {
            (
                name.clone(),
                sinks_by_name.get(flat_name).cloned().unwrap_or_default(),
            )
        })
        .collect();

    for i in level_start..flat.len() {
        let mut rewritten = Vec::new();
        for dep in flat[i].depends_on.clone() {
            match sibling_sinks.get(&dep) {
                Some(sinks) => {
                    for sink in sinks {
                        if !rewritten.contains(sink) {
                            rewritten.push(sink.clone());
                        }
                    }
                }
                None => {
                    if !rewritten.contains(&dep) {
                        rewritten.push(dep);
                    }
                }
            }
        }
        flat[i].depends_on = rewritten;
    }
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

    fn group(name: &str, depends_on: &[&str], sub_steps: Vec<WorkflowStep>) -> WorkflowStep {
        WorkflowStep {
            sub_steps: Some(sub_steps),
            ..step(name, depends_on)
        }
    }

    #[test]
    fn a_flat_workflow_is_unchanged() {
        let steps = vec![step("a", &[]), step("b", &["a"])];
        let flat = flatten(&steps);
        assert_eq!(flat.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(flat[1].depends_on, vec!["a"]);
    }

    #[test]
    fn substeps_are_named_group_slash_substep() {
        let steps = vec![group("setup", &[], vec![step("a", &[]), step("b", &["a"])])];
        let flat = flatten(&steps);
        let names: Vec<_> = flat.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["setup/a", "setup/b"]);
        assert_eq!(flat[1].depends_on, vec!["setup/a"]);
    }

    #[test]
    fn a_step_after_the_group_depends_on_the_groups_exit_points() {
        let steps = vec![
            group("setup", &[], vec![step("a", &[]), step("b", &["a"])]),
            step("after", &["setup"]),
        ];
        let flat = flatten(&steps);
        let after = flat.iter().find(|s| s.name == "after").unwrap();
        assert_eq!(after.depends_on, vec!["setup/b"]);
    }

    #[test]
    fn the_groups_own_dependency_is_spliced_onto_its_entry_substeps() {
        let steps = vec![
            step("before", &[]),
            group("setup", &["before"], vec![step("a", &[]), step("b", &["a"])]),
        ];
        let flat = flatten(&steps);
        let entry = flat.iter().find(|s| s.name == "setup/a").unwrap();
        assert_eq!(entry.depends_on, vec!["before"]);
        let inner = flat.iter().find(|s| s.name == "setup/b").unwrap();
        assert_eq!(inner.depends_on, vec!["setup/a"]);
    }

    #[test]
    fn a_group_with_two_independent_branches_has_two_entry_points_and_two_exit_points() {
        let steps = vec![
            group(
                "setup",
                &["before"],
                vec![step("left", &[]), step("right", &[])],
            ),
            step("after", &["setup"]),
        ];
        let flat = flatten(&steps);
        let left = flat.iter().find(|s| s.name == "setup/left").unwrap();
        let right = flat.iter().find(|s| s.name == "setup/right").unwrap();
        assert_eq!(left.depends_on, vec!["before"]);
        assert_eq!(right.depends_on, vec!["before"]);

        let after = flat.iter().find(|s| s.name == "after").unwrap();
        let mut deps = after.depends_on.clone();
        deps.sort();
        assert_eq!(deps, vec!["setup/left", "setup/right"]);
    }
}
