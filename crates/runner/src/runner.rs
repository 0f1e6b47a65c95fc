// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The runner loop: withdraw, execute, update.
//!
//! Execution errors never propagate out of the loop; they are recorded on
//! the work item. Backend errors do propagate once the client's retries
//! are exhausted.

use crate::command::execute_command;
use crate::function::{merge_arguments, ArgSource, Registry};
use mill_client::{QueueError, WorkQueue};
use mill_core::{Clock, Payload, WithdrawFilter, Work, WorkStatus};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("queue error after retries: {0}")]
    Queue(#[from] QueueError),
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Pipeline to withdraw from
    pub pipeline: String,
    pub filter: WithdrawFilter,
    /// Iterations before exiting; 0 means run forever
    pub lifetime: u64,
    /// Sleep between empty withdrawals
    pub sleep: Duration,
    pub arg_source: ArgSource,
}

impl RunnerConfig {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            filter: WithdrawFilter::default(),
            lifetime: 0,
            sleep: Duration::from_secs(5),
            arg_source: ArgSource::Parameters,
        }
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub executed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub interrupted: bool,
}

/// A long-lived worker process bound to one pipeline.
pub struct Runner<Q: WorkQueue> {
    queue: Arc<Q>,
    registry: Arc<Registry>,
    config: RunnerConfig,
    clock: Arc<dyn Clock>,
    shutdown: Arc<Notify>,
}

impl<Q: WorkQueue> Runner<Q> {
    pub fn new(
        queue: Arc<Q>,
        registry: Arc<Registry>,
        config: RunnerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            queue,
            registry,
            config,
            clock,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Handle used to request a graceful stop from another task.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Run until the lifetime is spent or a shutdown is requested.
    pub async fn run(&self) -> Result<RunSummary, RunnerError> {
        let mut summary = RunSummary::default();
        tracing::info!(
            pipeline = %self.config.pipeline,
            lifetime = self.config.lifetime,
            "runner starting"
        );

        loop {
            summary.iterations += 1;

            let withdrawn = tokio::select! {
                biased;
                _ = self.shutdown.notified() => {
                    summary.interrupted = true;
                    break;
                }
                result = self.queue.withdraw(&self.config.pipeline, &self.config.filter) => result?,
            };

            match withdrawn {
                None => {
                    if self.lifetime_spent(summary.iterations) {
                        break;
                    }
                    tokio::select! {
                        biased;
                        _ = self.shutdown.notified() => {
                            summary.interrupted = true;
                            break;
                        }
                        _ = tokio::time::sleep(self.config.sleep) => {}
                    }
                }
                Some(work) => {
                    summary.executed += 1;
                    let pending = work.clone();
                    let finished = tokio::select! {
                        biased;
                        _ = self.shutdown.notified() => {
                            summary.interrupted = true;
                            let mut abandoned = pending;
                            abandoned.record_error(
                                "interrupted",
                                "runner received a stop signal mid-execution",
                            );
                            abandoned.status = WorkStatus::Failure;
                            abandoned.stamp_stop(self.clock.as_ref());
                            abandoned
                        }
                        done = self.execute(work) => done,
                    };

                    match finished.status {
                        WorkStatus::Success => summary.succeeded += 1,
                        _ => summary.failed += 1,
                    }
                    tracing::info!(
                        work_id = finished.id.as_deref().unwrap_or("?"),
                        pipeline = %finished.pipeline,
                        status = %finished.status,
                        attempt = finished.attempt,
                        "work finished"
                    );
                    self.queue.update(&finished).await?;

                    if summary.interrupted || self.lifetime_spent(summary.iterations) {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            iterations = summary.iterations,
            executed = summary.executed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            interrupted = summary.interrupted,
            "runner stopped"
        );
        Ok(summary)
    }

    fn lifetime_spent(&self, iterations: u64) -> bool {
        self.config.lifetime != 0 && iterations >= self.config.lifetime
    }

    /// Execute one work item and stamp its lifecycle.
    async fn execute(&self, mut work: Work) -> Work {
        work.stamp_start(self.clock.as_ref());
        let timeout = Duration::from_secs(work.timeout);

        // Detach the payload so execution can mutate the work item.
        enum Dispatch {
            Argv(Vec<String>),
            Function(String),
            Invalid,
        }
        let dispatch = match work.payload() {
            Some(Payload::Command(argv)) => Dispatch::Argv(argv.to_vec()),
            Some(Payload::Function(name)) => Dispatch::Function(name.to_string()),
            None => Dispatch::Invalid,
        };

        let status = match dispatch {
            Dispatch::Argv(argv) => self.execute_argv(&mut work, &argv, timeout).await,
            Dispatch::Function(name) => self.execute_function(&mut work, &name, timeout).await,
            Dispatch::Invalid => {
                work.record_error("invalid", "work has no executable payload");
                WorkStatus::Failure
            }
        };

        work.status = status;
        work.stamp_stop(self.clock.as_ref());
        work
    }

    async fn execute_argv(
        &self,
        work: &mut Work,
        argv: &[String],
        timeout: Duration,
    ) -> WorkStatus {
        match execute_command(argv, timeout).await {
            Ok(outcome) => {
                let timed_out = outcome.timed_out;
                let succeeded = outcome.success();
                work.merge_results(outcome.results);
                if timed_out {
                    work.record_error(
                        "timeout",
                        format!("execution exceeded {}s", work.timeout),
                    );
                }
                if succeeded {
                    WorkStatus::Success
                } else {
                    WorkStatus::Failure
                }
            }
            Err(e) => {
                work.record_error("execution", e.to_string());
                WorkStatus::Failure
            }
        }
    }

    async fn execute_function(
        &self,
        work: &mut Work,
        name: &str,
        timeout: Duration,
    ) -> WorkStatus {
        let Some(callable) = self.registry.get(name) else {
            work.record_error("execution", format!("function {name:?} is not registered"));
            return WorkStatus::Failure;
        };

        let args = merge_arguments(callable.defaults(), work.parameters.as_ref());
        let arg_source = self.config.arg_source;
        let snapshot = work.clone();
        let handle = tokio::task::spawn_blocking(move || match arg_source {
            ArgSource::Parameters => callable.call(&args),
            ArgSource::Work => callable.call_with_work(&snapshot),
        });

        // Function execution cannot be interrupted safely; on timeout the
        // result is abandoned and the task runs to its natural end.
        match tokio::time::timeout(timeout, handle).await {
            Err(_) => {
                work.record_error(
                    "timeout",
                    format!("execution exceeded {}s, result abandoned", work.timeout),
                );
                WorkStatus::Failure
            }
            Ok(Err(join_error)) => {
                work.record_error("execution", format!("function panicked: {join_error}"));
                WorkStatus::Failure
            }
            Ok(Ok(Err(message))) => {
                work.record_error("execution", message);
                WorkStatus::Failure
            }
            Ok(Ok(Ok((results, products, plots)))) => {
                work.merge_results(results);
                if !products.is_empty() {
                    work.products.get_or_insert_with(Vec::new).extend(products);
                }
                if !plots.is_empty() {
                    work.plots.get_or_insert_with(Vec::new).extend(plots);
                }
                WorkStatus::Success
            }
        }
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
