// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::function::{Callable, FunctionOutput};
use mill_client::FakeBucket;
use mill_core::SystemClock;
use serde_json::{json, Map, Value};

fn map(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn registry_with_add() -> Registry {
    let mut registry = Registry::new();
    registry.register_fn("tests.add", |args| {
        let a = args.get("a").and_then(Value::as_i64).unwrap_or(0);
        let b = args.get("b").and_then(Value::as_i64).unwrap_or(0);
        Ok((map(json!({"sum": a + b})), Vec::new(), Vec::new()))
    });
    registry
}

fn one_shot(queue: Arc<FakeBucket>, registry: Registry, pipeline: &str) -> Runner<FakeBucket> {
    let mut config = RunnerConfig::new(pipeline);
    config.lifetime = 1;
    config.sleep = Duration::from_millis(1);
    Runner::new(
        queue,
        Arc::new(registry),
        config,
        Arc::new(SystemClock),
    )
}

async fn deposit(queue: &FakeBucket, work: Work) -> String {
    queue
        .deposit(vec![work])
        .await
        .unwrap()
        .remove(0)
}

#[tokio::test]
async fn happy_path_function() {
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_function("tests.add");
    work.parameters = Some(map(json!({"a": 1, "b": 2})));
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    let summary = one_shot(Arc::clone(&queue), registry_with_add(), "t1")
        .run()
        .await
        .unwrap();
    assert_eq!(summary.executed, 1);
    assert_eq!(summary.succeeded, 1);

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Success);
    assert_eq!(done.results.as_ref().unwrap()["sum"], json!(3));
    assert_eq!(done.attempt, 1);
    let (start, stop) = (done.start.unwrap(), done.stop.unwrap());
    assert!(start <= stop);
}

#[tokio::test]
async fn command_nonzero_exit_is_failure() {
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_command(["sh", "-c", "exit 7"]);
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    one_shot(Arc::clone(&queue), Registry::new(), "t1")
        .run()
        .await
        .unwrap();

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Failure);
    let results = done.results.unwrap();
    assert_eq!(results["returncode"], json!(7));
    assert_eq!(results["stdout"], json!(""));
}

#[tokio::test]
async fn command_timeout_is_failure_with_reason() {
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_command(["sleep", "10"]);
    work.timeout = 1;
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    one_shot(Arc::clone(&queue), Registry::new(), "t1")
        .run()
        .await
        .unwrap();

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Failure);
    let error = done.results.as_ref().unwrap()["error"].as_str().unwrap();
    assert!(error.contains("timeout"), "error was: {error}");

    let elapsed = done.stop.unwrap() - done.start.unwrap();
    assert!((1.0..=6.0).contains(&elapsed), "elapsed: {elapsed}");
}

#[tokio::test]
async fn function_error_recorded_not_propagated() {
    let queue = Arc::new(FakeBucket::new());
    let mut registry = Registry::new();
    registry.register_fn("tests.broken", |_| Err("boom".to_string()));
    let mut work = Work::new("t1", "local").with_function("tests.broken");
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    let summary = one_shot(Arc::clone(&queue), registry, "t1")
        .run()
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Failure);
    let error = done.results.as_ref().unwrap()["error"].as_str().unwrap();
    assert!(error.contains("boom"));
}

#[tokio::test]
async fn unregistered_function_is_failure() {
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_function("tests.missing");
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    one_shot(Arc::clone(&queue), Registry::new(), "t1")
        .run()
        .await
        .unwrap();

    let done = queue.get(&id).unwrap();
    assert_eq!(done.status, WorkStatus::Failure);
    let error = done.results.as_ref().unwrap()["error"].as_str().unwrap();
    assert!(error.contains("not registered"));
}

#[tokio::test]
async fn function_results_merge_into_existing() {
    let queue = Arc::new(FakeBucket::new());
    let mut registry = Registry::new();
    registry.register_fn("tests.annotate", |_| {
        Ok((map(json!({"dm": {"snr": 15.5}})), Vec::new(), Vec::new()))
    });
    let mut work = Work::new("t1", "local").with_function("tests.annotate");
    work.results = Some(map(json!({"dm": {"width": 3}, "kept": true})));
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    one_shot(Arc::clone(&queue), registry, "t1").run().await.unwrap();

    let done = queue.get(&id).unwrap();
    assert_eq!(
        serde_json::to_value(done.results.unwrap()).unwrap(),
        json!({"dm": {"snr": 15.5, "width": 3}, "kept": true})
    );
}

#[tokio::test]
async fn cli_wrapper_defaults_merge() {
    struct Wrapped;
    impl Callable for Wrapped {
        fn call(&self, args: &Map<String, Value>) -> Result<FunctionOutput, String> {
            Ok((args.clone(), Vec::new(), Vec::new()))
        }
        fn defaults(&self) -> Option<Map<String, Value>> {
            Some(map(json!({"mode": "fast", "threshold": null, "deep": true})))
        }
    }
    let queue = Arc::new(FakeBucket::new());
    let mut registry = Registry::new();
    registry.register("tests.wrapped", Arc::new(Wrapped));

    let mut work = Work::new("t1", "local").with_function("tests.wrapped");
    work.parameters = Some(map(json!({"mode": "slow"})));
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    one_shot(Arc::clone(&queue), registry, "t1").run().await.unwrap();

    let results = queue.get(&id).unwrap().results.unwrap();
    assert_eq!(results["mode"], json!("slow"));
    assert_eq!(results["deep"], json!(true));
    assert!(!results.contains_key("threshold"));
}

#[tokio::test]
async fn arg_source_work_passes_full_item() {
    struct SiteProbe;
    impl Callable for SiteProbe {
        fn call(&self, _: &Map<String, Value>) -> Result<FunctionOutput, String> {
            Err("expected the full work item".to_string())
        }
        fn call_with_work(&self, work: &Work) -> Result<FunctionOutput, String> {
            Ok((
                map(json!({"seen_site": work.site})),
                Vec::new(),
                Vec::new(),
            ))
        }
    }
    let queue = Arc::new(FakeBucket::new());
    let mut registry = Registry::new();
    registry.register("tests.probe", Arc::new(SiteProbe));

    let mut work = Work::new("t1", "chime").with_function("tests.probe");
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    let mut config = RunnerConfig::new("t1");
    config.lifetime = 1;
    config.arg_source = ArgSource::Work;
    let runner = Runner::new(
        Arc::clone(&queue),
        Arc::new(registry),
        config,
        Arc::new(SystemClock),
    );
    runner.run().await.unwrap();

    let results = queue.get(&id).unwrap().results.unwrap();
    assert_eq!(results["seen_site"], json!("chime"));
}

#[tokio::test]
async fn products_and_plots_captured() {
    let queue = Arc::new(FakeBucket::new());
    let mut registry = Registry::new();
    registry.register_fn("tests.artifacts", |_| {
        Ok((
            Map::new(),
            vec!["/tmp/a.dat".to_string()],
            vec!["/tmp/a.png".to_string()],
        ))
    });
    let mut work = Work::new("t1", "local").with_function("tests.artifacts");
    work.creation = Some(1.0);
    let id = deposit(&queue, work).await;

    one_shot(Arc::clone(&queue), registry, "t1").run().await.unwrap();

    let done = queue.get(&id).unwrap();
    assert_eq!(done.products.unwrap(), ["/tmp/a.dat"]);
    assert_eq!(done.plots.unwrap(), ["/tmp/a.png"]);
}

#[tokio::test]
async fn lifetime_bounds_iterations() {
    let queue = Arc::new(FakeBucket::new());
    let mut config = RunnerConfig::new("empty");
    config.lifetime = 3;
    config.sleep = Duration::from_millis(1);
    let runner = Runner::new(
        queue,
        Arc::new(Registry::new()),
        config,
        Arc::new(SystemClock),
    );
    let summary = runner.run().await.unwrap();
    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.executed, 0);
    assert!(!summary.interrupted);
}

#[tokio::test]
async fn shutdown_between_iterations() {
    let queue = Arc::new(FakeBucket::new());
    let mut config = RunnerConfig::new("empty");
    config.sleep = Duration::from_secs(60);
    let runner = Runner::new(
        queue,
        Arc::new(Registry::new()),
        config,
        Arc::new(SystemClock),
    );
    let shutdown = runner.shutdown_handle();

    let handle = tokio::spawn(async move { runner.run().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.notify_one();

    let summary = handle.await.unwrap().unwrap();
    assert!(summary.interrupted);
}

#[tokio::test]
async fn concurrent_runners_never_share_a_running_item() {
    let queue = Arc::new(FakeBucket::new());
    for n in 0..4 {
        let mut work =
            Work::new("t1", "local").with_command(["sh", "-c", "sleep 0.05"]);
        work.creation = Some(n as f64);
        queue.deposit(vec![work]).await.unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..2 {
        let mut config = RunnerConfig::new("t1");
        config.lifetime = 2;
        config.sleep = Duration::from_millis(1);
        let runner = Runner::new(
            Arc::clone(&queue),
            Arc::new(Registry::new()),
            config,
            Arc::new(SystemClock),
        );
        handles.push(tokio::spawn(async move { runner.run().await }));
    }
    let mut executed = 0;
    for handle in handles {
        executed += handle.await.unwrap().unwrap().executed;
    }

    // Every item ran exactly once across both runners.
    assert_eq!(executed, 4);
    for work in queue.all() {
        assert_eq!(work.status, WorkStatus::Success);
        assert_eq!(work.attempt, 1);
    }
}
