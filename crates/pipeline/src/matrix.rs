// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Matrix axes and their Cartesian product.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One axis of a matrix: an explicit value list, or an inclusive integer
/// range `{range: [lo, hi]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Axis {
    Range { range: [i64; 2] },
    Values(Vec<Value>),
}

impl Axis {
    /// Concrete values for this axis, in order.
    pub fn values(&self) -> Result<Vec<Value>, String> {
        match self {
            Axis::Values(values) => {
                if values.is_empty() {
                    return Err("axis has no values".to_string());
                }
                Ok(values.clone())
            }
            Axis::Range { range: [lo, hi] } => {
                if lo > hi {
                    return Err(format!("range [{lo}, {hi}] has lo > hi"));
                }
                Ok((*lo..=*hi).map(Value::from).collect())
            }
        }
    }
}

/// A parameter-space specification that multiplies a step into replicas.
///
/// Axis declaration order is preserved; the product enumerates the last
/// axis fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Matrix(pub IndexMap<String, Axis>);

impl Matrix {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Axis names shared with `other`.
    pub fn shared_axes(&self, other: &Matrix) -> Vec<String> {
        self.0
            .keys()
            .filter(|k| other.0.contains_key(*k))
            .cloned()
            .collect()
    }

    /// Combine two axis-disjoint matrices, self's axes first.
    pub fn union(&self, other: &Matrix) -> Matrix {
        let mut combined = self.0.clone();
        for (key, axis) in &other.0 {
            combined.insert(key.clone(), axis.clone());
        }
        Matrix(combined)
    }

    /// Cartesian product of all axes in declaration order.
    ///
    /// An empty matrix yields one empty combination (a step with no matrix
    /// expands to exactly one work item).
    pub fn product(&self) -> Result<Vec<IndexMap<String, Value>>, String> {
        let mut combos: Vec<IndexMap<String, Value>> = vec![IndexMap::new()];
        for (name, axis) in &self.0 {
            let values = axis
                .values()
                .map_err(|e| format!("axis {name:?}: {e}"))?;
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for value in &values {
                    let mut extended = combo.clone();
                    extended.insert(name.clone(), value.clone());
                    next.push(extended);
                }
            }
            combos = next;
        }
        Ok(combos)
    }
}

#[cfg(test)]
#[path = "matrix_tests.rs"]
mod tests;
