// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution gating conditions.
//!
//! A step's `if` is one of the reserved literals (`success`, `failure`,
//! `always`), evaluated over the aggregate outcome of all prior stages, or
//! an (in)equality expression over `${{ pipeline.<step>.<field> }}` tokens.

use crate::template;
use mill_core::WorkStatus;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// All prior steps succeeded
    Success,
    /// At least one prior step failed
    Failure,
    /// Unconditional
    Always,
    /// Equality / inequality over pipeline references
    Expr(String),
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        let text = match self {
            Condition::Success => "success",
            Condition::Failure => "failure",
            Condition::Always => "always",
            Condition::Expr(e) => e.as_str(),
        };
        s.serialize_str(text)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        Ok(match raw.trim() {
            "success" => Condition::Success,
            "failure" => Condition::Failure,
            "always" => Condition::Always,
            _ => Condition::Expr(raw),
        })
    }
}

impl Condition {
    /// Step names referenced by an expression condition
    /// (`pipeline.<step>.<field>` tokens).
    pub fn referenced_steps(&self) -> Vec<String> {
        let Condition::Expr(expr) = self else {
            return Vec::new();
        };
        template::references(&Value::String(expr.clone()))
            .into_iter()
            .filter_map(|name| {
                let mut parts = name.splitn(3, '.');
                match (parts.next(), parts.next()) {
                    (Some("pipeline"), Some(step)) => Some(step.to_string()),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Execution-time view of earlier steps in the same configuration.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    steps: HashMap<String, StepRecord>,
}

#[derive(Debug, Clone)]
struct StepRecord {
    status: WorkStatus,
    fields: Map<String, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished step's status and output fields.
    pub fn record(&mut self, step: &str, status: WorkStatus, fields: Map<String, Value>) {
        self.steps
            .insert(step.to_string(), StepRecord { status, fields });
    }

    /// Aggregate: every recorded step succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.steps
            .values()
            .all(|r| r.status == WorkStatus::Success)
    }

    /// Aggregate: at least one recorded step failed.
    pub fn any_failed(&self) -> bool {
        self.steps.values().any(|r| {
            matches!(
                r.status,
                WorkStatus::Failure | WorkStatus::Cancelled | WorkStatus::Expired
            )
        })
    }

    /// Resolve a `pipeline.<step>.<field>` reference.
    fn lookup(&self, name: &str) -> Option<Value> {
        let mut parts = name.splitn(3, '.');
        if parts.next() != Some("pipeline") {
            return None;
        }
        let step = self.steps.get(parts.next()?)?;
        match parts.next() {
            None | Some("status") => Some(Value::String(step.status.to_string())),
            Some(field) => step.fields.get(field).cloned(),
        }
    }
}

/// Errors from malformed expression conditions.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConditionError {
    #[error("condition {0:?} is not an equality expression")]
    Malformed(String),
}

/// Evaluate a condition against the outcomes of all prior stages.
pub fn evaluate(
    condition: &Condition,
    context: &ExecutionContext,
) -> Result<bool, ConditionError> {
    match condition {
        Condition::Always => Ok(true),
        Condition::Success => Ok(context.all_succeeded()),
        Condition::Failure => Ok(context.any_failed()),
        Condition::Expr(expr) => evaluate_expr(expr, context),
    }
}

fn evaluate_expr(expr: &str, context: &ExecutionContext) -> Result<bool, ConditionError> {
    let substituted = match template::substitute(
        &Value::String(expr.to_string()),
        &|name| context.lookup(name),
    ) {
        Value::String(s) => s,
        other => render_operand(&other),
    };

    if let Some((lhs, rhs)) = substituted.split_once("!=") {
        return Ok(clean_operand(lhs) != clean_operand(rhs));
    }
    if let Some((lhs, rhs)) = substituted.split_once("==") {
        return Ok(clean_operand(lhs) == clean_operand(rhs));
    }
    Err(ConditionError::Malformed(expr.to_string()))
}

fn render_operand(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Trim whitespace and surrounding quotes from an operand.
fn clean_operand(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| {
            trimmed
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
        })
        .unwrap_or(trimmed)
        .to_string()
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
