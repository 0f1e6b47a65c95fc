// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration expansion: defaults layering, matrix expansion, token
//! substitution, and stage grouping.
//!
//! Validation problems are aggregated and returned as one error carrying
//! the full list, never just the first.

use crate::condition::Condition;
use crate::document::{ConfigDef, StepDef};
use crate::matrix::Matrix;
use crate::schedule::{validate_cronspec, Schedule};
use crate::template;
use indexmap::IndexMap;
use mill_core::{merge, normalize_pipeline, validate, Clock, Strategy, Work};
use mill_workspace::Workspace;
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Aggregated configuration problems.
#[derive(Debug, Error)]
#[error("invalid configuration: {}", errors.join("; "))]
pub struct ExpandErrors {
    pub errors: Vec<String>,
}

/// A step expanded to its concrete work items.
#[derive(Debug, Clone)]
pub struct ExpandedStep {
    pub name: String,
    pub stage: u32,
    pub condition: Option<Condition>,
    pub runs_on: Option<String>,
    pub services: Vec<String>,
    /// One work item per matrix combination
    pub work: Vec<Work>,
}

impl ExpandedStep {
    /// The effective gate: an absent `if` means "all prior steps succeeded".
    pub fn gate(&self) -> Condition {
        self.condition.clone().unwrap_or(Condition::Success)
    }
}

/// Steps sharing a stage number; unordered among themselves at execution
/// time, declaration order preserved for determinism.
#[derive(Debug, Clone)]
pub struct Stage {
    pub number: u32,
    pub steps: Vec<ExpandedStep>,
}

/// The deterministic output of expansion: stages ascending, each carrying
/// the concrete work to deposit when the stage executes.
#[derive(Debug, Clone)]
pub struct ExpandedConfig {
    pub name: String,
    pub schedule: Option<Schedule>,
    pub stages: Vec<Stage>,
}

impl ExpandedConfig {
    /// All expanded steps in stage order.
    pub fn steps(&self) -> impl Iterator<Item = &ExpandedStep> {
        self.stages.iter().flat_map(|s| s.steps.iter())
    }

    /// Total number of concrete work items.
    pub fn work_count(&self) -> usize {
        self.steps().map(|s| s.work.len()).sum()
    }
}

/// Expand a configuration against a workspace.
pub fn expand(
    doc: &ConfigDef,
    workspace: &Workspace,
    clock: &dyn Clock,
) -> Result<ExpandedConfig, ExpandErrors> {
    let mut errors = Vec::new();

    if doc.version.trim().is_empty() {
        errors.push("version must be non-empty".to_string());
    }
    let name = normalize_pipeline(&doc.name);
    if name.is_empty() {
        errors.push(format!("name {:?} has no [a-z0-9-] characters", doc.name));
    }
    if let Some(schedule) = &doc.schedule {
        if let Err(e) = validate_cronspec(&schedule.cronspec) {
            errors.push(e);
        }
    }
    if doc.pipeline.is_empty() {
        errors.push("configuration has no steps".to_string());
    }

    let top_matrix = doc.matrix.clone().unwrap_or_default();
    let stage_of: HashMap<&str, u32> = doc
        .steps()
        .map(|s| (s.name.as_str(), s.stage))
        .collect();

    let mut expanded = Vec::new();
    for step in doc.steps() {
        match expand_step(step, doc, &top_matrix, &stage_of, workspace, clock) {
            Ok(out) => expanded.push(out),
            Err(mut step_errors) => errors.append(&mut step_errors),
        }
    }

    if !errors.is_empty() {
        return Err(ExpandErrors { errors });
    }

    Ok(ExpandedConfig {
        name,
        schedule: doc.schedule.clone(),
        stages: group_stages(expanded),
    })
}

fn expand_step(
    step: &StepDef,
    doc: &ConfigDef,
    top_matrix: &Matrix,
    stage_of: &HashMap<&str, u32>,
    workspace: &Workspace,
    clock: &dyn Clock,
) -> Result<ExpandedStep, Vec<String>> {
    let mut errors = Vec::new();

    if step.stage == 0 {
        errors.push(format!("step {:?}: stage must be positive", step.name));
    }

    let step_matrix = step.matrix.clone().unwrap_or_default();
    let shared = top_matrix.shared_axes(&step_matrix);
    if !shared.is_empty() {
        errors.push(format!(
            "step {:?}: matrix axes also declared at top level: {}",
            step.name,
            shared.join(", ")
        ));
    }

    if let Some(condition) = &step.condition {
        for referenced in condition.referenced_steps() {
            match stage_of.get(referenced.as_str()) {
                None => errors.push(format!(
                    "step {:?}: condition references unknown step {:?}",
                    step.name, referenced
                )),
                Some(stage) if *stage >= step.stage => errors.push(format!(
                    "step {:?}: condition references step {:?} which is not in an earlier stage",
                    step.name, referenced
                )),
                _ => {}
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    // Effective template: defaults layered under the step's work,
    // leaf-right-wins.
    let mut template = Value::Object(doc.defaults.clone());
    merge::update(&mut template, Value::Object(step.work.clone()));

    let combos = match top_matrix.union(&step_matrix).product() {
        Ok(combos) => combos,
        Err(e) => return Err(vec![format!("step {:?}: {}", step.name, e)]),
    };

    let mut items = Vec::with_capacity(combos.len());
    for combo in combos {
        match realize(&template, &combo, doc, workspace, clock) {
            Ok(work) => items.push(work),
            Err(e) => errors.push(format!("step {:?}: {}", step.name, e)),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(ExpandedStep {
        name: step.name.clone(),
        stage: step.stage,
        condition: step.condition.clone(),
        runs_on: step.runs_on.clone(),
        services: step.services.clone(),
        work: items,
    })
}

/// Produce one concrete work item from a template and a matrix combination.
fn realize(
    template: &Value,
    combo: &IndexMap<String, Value>,
    doc: &ConfigDef,
    workspace: &Workspace,
    clock: &dyn Clock,
) -> Result<Work, String> {
    let lookup = |token: &str| -> Option<Value> {
        token
            .strip_prefix("matrix.")
            .and_then(|key| combo.get(key).cloned())
    };
    let substituted = template::substitute(template, &lookup);
    let Value::Object(mut map) = substituted else {
        return Err("work template is not a mapping".to_string());
    };

    map.entry("pipeline")
        .or_insert_with(|| Value::String(normalize_pipeline(&doc.name)));

    // The matrix combination is the replica's identity; axes not already
    // present in the parameters are recorded there.
    if !combo.is_empty() {
        let params = map
            .entry("parameters")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(params) = params {
            for (axis, value) in combo {
                params.entry(axis.clone()).or_insert_with(|| value.clone());
            }
        }
    }

    if !map.contains_key("site") {
        return Err("work.site missing after defaults and matrix".to_string());
    }

    let work: Work =
        serde_json::from_value(Value::Object(map)).map_err(|e| e.to_string())?;
    validate(work, &workspace.sites, Strategy::Strict, clock).map_err(|e| e.to_string())
}

fn group_stages(steps: Vec<ExpandedStep>) -> Vec<Stage> {
    let mut stages: Vec<Stage> = Vec::new();
    let mut numbers: Vec<u32> = steps.iter().map(|s| s.stage).collect();
    numbers.sort_unstable();
    numbers.dedup();
    for number in numbers {
        stages.push(Stage {
            number,
            steps: steps.iter().filter(|s| s.stage == number).cloned().collect(),
        });
    }
    stages
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
