// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end work lifecycle scenarios.

use crate::prelude::*;
use mill_client::{FakeBucket, WorkQueue};
use mill_core::{Work, WorkStatus};
use mill_runner::Registry;
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn happy_path_function() {
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_function("tests.add");
    work.parameters = Some(map(json!({"a": 1, "b": 2})));
    let id = deposit(&queue, work).await;

    run_once(Arc::clone(&queue), test_registry(), "t1").await;

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Success);
    assert_eq!(done.results.as_ref().unwrap()["sum"], json!(3));
    assert_eq!(done.attempt, 1);
    assert!(done.start.unwrap() <= done.stop.unwrap());
}

#[tokio::test]
async fn command_nonzero_exit() {
    let queue = Arc::new(FakeBucket::new());
    let work = Work::new("t1", "local").with_command(["sh", "-c", "exit 7"]);
    let id = deposit(&queue, work).await;

    run_once(Arc::clone(&queue), Registry::new(), "t1").await;

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Failure);
    let results = done.results.unwrap();
    assert_eq!(results["returncode"], json!(7));
    assert_eq!(results["stdout"], json!(""));
}

#[tokio::test]
async fn command_timeout() {
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_command(["sleep", "10"]);
    work.timeout = 1;
    let id = deposit(&queue, work).await;

    run_once(Arc::clone(&queue), Registry::new(), "t1").await;

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Failure);
    let error = done.results.as_ref().unwrap()["error"].as_str().unwrap();
    assert!(error.contains("timeout"), "error: {error}");

    let elapsed = done.stop.unwrap() - done.start.unwrap();
    assert!((1.0..=6.0).contains(&elapsed), "elapsed: {elapsed}");
}

#[tokio::test]
async fn attempts_never_exceed_retries_plus_one() {
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_command(["sh", "-c", "exit 1"]);
    work.retries = 1;
    let id = deposit(&queue, work).await;

    // The queue re-dispatches the failed item until retries + 1 attempts
    // are spent; extra iterations find nothing eligible.
    for _ in 0..4 {
        run_once(Arc::clone(&queue), Registry::new(), "t1").await;
        let after = queue.get(&id).unwrap();
        assert!(after.attempt <= after.retries + 1);
    }

    let done = queue.get(&id).unwrap();
    assert_eq!(done.attempt, 2);
    assert_eq!(done.status, WorkStatus::Failure);
}
