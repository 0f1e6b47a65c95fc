// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conditional stage gating: a failed first stage blocks `if: success`.

use crate::prelude::*;
use mill_client::{FakeBucket, WorkQueue};
use mill_core::{FakeClock, WorkStatus};
use mill_pipeline::{evaluate, expand, Condition, ConfigDef, ExecutionContext};
use mill_runner::Registry;
use mill_workspace::Workspace;
use serde_json::Map;
use std::sync::Arc;

fn workspace() -> Workspace {
    serde_yaml::from_str("workspace: test\nsites: [local]\n").unwrap()
}

const TWO_STAGE: &str = r#"
version: "1"
name: gated
defaults:
  site: local
pipeline:
  first:
    stage: 1
    work:
      command: ["sh", "-c", "exit 1"]
  second:
    stage: 2
    if: success
    work:
      command: ["true"]
"#;

#[tokio::test]
async fn failed_stage_blocks_success_gate() {
    let doc = ConfigDef::from_yaml(TWO_STAGE).unwrap();
    let expanded = expand(&doc, &workspace(), &FakeClock::new(1.0)).unwrap();
    assert_eq!(expanded.stages.len(), 2);

    // Deposit and execute stage 1.
    let queue = Arc::new(FakeBucket::new());
    let stage_one = &expanded.stages[0];
    let ids = queue.deposit(stage_one.steps[0].work.clone()).await.unwrap();
    run_once(Arc::clone(&queue), Registry::new(), "gated").await;

    // Record stage-1 outcomes into the execution context.
    let mut context = ExecutionContext::new();
    for id in &ids {
        let done = queue.get(id).unwrap();
        assert_eq!(done.status, WorkStatus::Failure);
        context.record(&stage_one.steps[0].name, done.status, Map::new());
    }

    // Stage 2 is gated on success: it must not be deposited.
    let stage_two = &expanded.stages[1];
    let gate = stage_two.steps[0].gate();
    assert_eq!(gate, Condition::Success);
    assert!(!evaluate(&gate, &context).unwrap());

    // Nothing but the spent stage-1 work is in the queue.
    assert_eq!(queue.len(), 1);
}

#[tokio::test]
async fn always_gate_runs_after_failure() {
    let doc = ConfigDef::from_yaml(
        r#"
version: "1"
name: cleanup
defaults:
  site: local
pipeline:
  first:
    stage: 1
    work:
      command: ["sh", "-c", "exit 1"]
  sweep:
    stage: 2
    if: always
    work:
      command: ["true"]
"#,
    )
    .unwrap();
    let expanded = expand(&doc, &workspace(), &FakeClock::new(1.0)).unwrap();

    let mut context = ExecutionContext::new();
    context.record("first", WorkStatus::Failure, Map::new());

    let gate = expanded.stages[1].steps[0].gate();
    assert!(evaluate(&gate, &context).unwrap());
}
