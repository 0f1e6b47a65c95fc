// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The pipeline configuration document.

use crate::condition::Condition;
use crate::matrix::Matrix;
use crate::schedule::Schedule;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A step within a configuration.
///
/// `work` is a partial work template; the expander layers the
/// configuration's `defaults` under it and fills `pipeline` from the
/// configuration name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepDef {
    /// Step name (injected from the map key)
    #[serde(skip)]
    pub name: String,
    /// Stage ordering key; stages execute ascending
    pub stage: u32,
    /// Partial work template
    pub work: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Matrix>,
    /// Execution gate: reserved literal or expression
    #[serde(default, rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Deployment hint, carried through uninterpreted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runs_on: Option<String>,
    /// Deployment hint, carried through uninterpreted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
}

/// A pipeline configuration: a declarative document describing a DAG of
/// work to be generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDef {
    pub version: String,
    pub name: String,
    /// Partial work layered under every step's template
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Matrix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    /// Ordered step-name to step mapping
    pub pipeline: IndexMap<String, StepDef>,
}

impl ConfigDef {
    /// Parse a YAML document. Unknown keys are rejected.
    pub fn from_yaml(text: &str) -> Result<Self, ParseError> {
        let mut doc: ConfigDef = serde_yaml::from_str(text)?;
        doc.inject_step_names();
        Ok(doc)
    }

    /// Parse a JSON document (the wire form used by the pipelines manager).
    pub fn from_json(value: Value) -> Result<Self, ParseError> {
        let mut doc: ConfigDef = serde_json::from_value(value)?;
        doc.inject_step_names();
        Ok(doc)
    }

    fn inject_step_names(&mut self) {
        for (key, step) in self.pipeline.iter_mut() {
            step.name = key.clone();
        }
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> impl Iterator<Item = &StepDef> {
        self.pipeline.values()
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
