// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Work entity: an atomic unit of deferred computation.

use crate::clock::Clock;
use crate::config::{NotifyConfig, WorkConfig};
use crate::status::WorkStatus;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default execution timeout in seconds (1 hour).
pub const DEFAULT_TIMEOUT: u64 = 3_600;

/// Upper bound on the execution timeout (24 hours).
pub const MAX_TIMEOUT: u64 = 86_400;

/// Default retry count.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default priority (1 lowest .. 5 highest).
pub const DEFAULT_PRIORITY: u8 = 3;

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

/// Accept scalar argv elements and render them as strings.
///
/// Matrix substitution can turn an argv element into a number or a bool;
/// the spawned process only ever sees strings.
fn deserialize_argv<'de, D>(d: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let raw: Option<Vec<Value>> = Option::deserialize(d)?;
    raw.map(|items| {
        items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                Value::Bool(b) => Ok(b.to_string()),
                other => Err(D::Error::custom(format!(
                    "argv element is not a scalar: {other}"
                ))),
            })
            .collect()
    })
    .transpose()
}

/// The payload discriminant: exactly one of these must be set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload<'a> {
    /// Dotted registry key resolving to a registered callable
    Function(&'a str),
    /// Ordered argv list spawned as a subprocess
    Command(&'a [String]),
}

/// An atomic unit of deferred computation plus its metadata and lifecycle.
///
/// The queue service assigns `id` on deposit and maintains `attempt`.
/// Runners stamp `start`/`stop` and fill `results`, `products`, `plots`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// Server-assigned identifier (absent until deposited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Pipeline this work belongs to; the withdrawal key
    pub pipeline: String,
    /// Site the work may run at; must be in the workspace's allowed sites
    pub site: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Dotted reference to a registered callable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Argv list to spawn
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_argv"
    )]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    /// Wall-clock execution bound in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Withdrawal count, maintained by the queue service
    #[serde(default)]
    pub attempt: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event: Vec<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Map<String, Value>>,
    /// Filesystem paths produced by the execution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plots: Option<Vec<String>>,
    #[serde(default)]
    pub config: WorkConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notify: Option<NotifyConfig>,
    /// Unix epoch seconds, stamped by the validator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation: Option<f64>,
    /// Unix epoch seconds, stamped by the runner on withdrawal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    /// Unix epoch seconds, stamped by the runner on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<f64>,
    #[serde(default)]
    pub status: WorkStatus,
    /// Fields not in the schema, preserved under relaxed validation
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Work {
    /// Create a defaulted work item for the given pipeline and site.
    pub fn new(pipeline: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            id: None,
            pipeline: pipeline.into(),
            site: site.into(),
            user: None,
            function: None,
            command: None,
            parameters: None,
            timeout: DEFAULT_TIMEOUT,
            retries: DEFAULT_RETRIES,
            priority: DEFAULT_PRIORITY,
            attempt: 0,
            event: Vec::new(),
            tags: Vec::new(),
            group: Vec::new(),
            results: None,
            products: None,
            plots: None,
            config: WorkConfig::default(),
            notify: None,
            creation: None,
            start: None,
            stop: None,
            status: WorkStatus::Created,
            extra: Map::new(),
        }
    }

    /// Set the function payload.
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// Set the command payload.
    pub fn with_command<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    /// Set the parameters mapping.
    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// The payload, if exactly the valid one-of holds.
    pub fn payload(&self) -> Option<Payload<'_>> {
        match (&self.function, &self.command) {
            (Some(f), None) => Some(Payload::Function(f)),
            (None, Some(c)) => Some(Payload::Command(c)),
            _ => None,
        }
    }

    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Stamp `start` and transition to running.
    ///
    /// Timestamps are monotonically non-decreasing: a `start` earlier than
    /// `creation` is clamped up.
    pub fn stamp_start(&mut self, clock: &dyn Clock) {
        let mut t = clock.epoch();
        if let Some(creation) = self.creation {
            t = t.max(creation);
        }
        self.start = Some(t);
        self.status = WorkStatus::Running;
    }

    /// Stamp `stop`, clamped so `start <= stop`.
    pub fn stamp_stop(&mut self, clock: &dyn Clock) {
        let mut t = clock.epoch();
        if let Some(start) = self.start {
            t = t.max(start);
        }
        self.stop = Some(t);
    }

    /// Merge an execution's results into any pre-existing results.
    ///
    /// Nested mappings merge recursively, lists concatenate, scalars on the
    /// right replace the left (see [`crate::merge::update`]).
    pub fn merge_results(&mut self, incoming: Map<String, Value>) {
        match &mut self.results {
            Some(existing) => crate::merge::update_map(existing, incoming),
            None => self.results = Some(incoming),
        }
    }

    /// Record an execution error under `results.error`.
    pub fn record_error(&mut self, reason: &str, detail: impl Into<String>) {
        let mut map = Map::new();
        map.insert(
            "error".to_string(),
            Value::String(format!("{}: {}", reason, detail.into())),
        );
        self.merge_results(map);
    }
}

/// Selection filter for withdrawing work from the queue.
///
/// All fields optional; the queue returns the highest-priority, oldest
/// matching item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WithdrawFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl WithdrawFilter {
    /// Render as query parameters for the withdraw endpoint.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(event) = self.event {
            q.push(("event".to_string(), event.to_string()));
        }
        if let Some(site) = &self.site {
            q.push(("site".to_string(), site.clone()));
        }
        if let Some(priority) = self.priority {
            q.push(("priority".to_string(), priority.to_string()));
        }
        if let Some(user) = &self.user {
            q.push(("user".to_string(), user.clone()));
        }
        if !self.tags.is_empty() {
            q.push(("tags".to_string(), self.tags.join(",")));
        }
        if let Some(parent) = &self.parent {
            q.push(("parent".to_string(), parent.clone()));
        }
        q
    }

    /// Whether a work item matches this filter.
    pub fn matches(&self, work: &Work) -> bool {
        if let Some(event) = self.event {
            if !work.event.contains(&event) {
                return false;
            }
        }
        if let Some(site) = &self.site {
            if &work.site != site {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if work.priority != priority {
                return false;
            }
        }
        if let Some(user) = &self.user {
            if work.user.as_deref() != Some(user.as_str()) {
                return false;
            }
        }
        if !self.tags.iter().all(|t| work.tags.contains(t)) {
            return false;
        }
        true
    }
}

#[cfg(test)]
#[path = "work_tests.rs"]
mod tests;
