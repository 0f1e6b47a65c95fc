// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for behavioral specs.

use mill_client::{FakeBucket, WorkQueue};
use mill_core::{SystemClock, Work};
use mill_runner::{Registry, Runner, RunnerConfig};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub fn map(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

/// A registry carrying the `tests.add` function used by the happy-path
/// scenario: sums parameters `a` and `b`.
pub fn test_registry() -> Registry {
    let mut registry = Registry::new();
    registry.register_fn("tests.add", |args| {
        let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
        let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
        Ok((
            map(serde_json::json!({"sum": a + b})),
            Vec::new(),
            Vec::new(),
        ))
    });
    registry
}

/// Deposit one work item and return its assigned id.
pub async fn deposit(queue: &FakeBucket, mut work: Work) -> String {
    if work.creation.is_none() {
        work.creation = Some(1.0);
    }
    queue.deposit(vec![work]).await.unwrap().remove(0)
}

/// Run a single-iteration runner over the queue.
pub async fn run_once(queue: Arc<FakeBucket>, registry: Registry, pipeline: &str) {
    let mut config = RunnerConfig::new(pipeline);
    config.lifetime = 1;
    config.sleep = Duration::from_millis(1);
    Runner::new(queue, Arc::new(registry), config, Arc::new(SystemClock))
        .run()
        .await
        .unwrap();
}
