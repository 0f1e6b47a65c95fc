// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The audit daemon: finds expired, stale, and orphaned work.
//!
//! Audit repairs state but never deletes; removal belongs to the transfer
//! daemon or an operator.

use crate::metrics::AuditMetrics;
use crate::transfer::DaemonError;
use mill_client::{ScanQuery, WorkQueue};
use mill_core::{Clock, WorkStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Pipelines to audit
    pub pipelines: Vec<String>,
    /// Age beyond which terminal items are considered settled
    pub buffer: Duration,
    /// Cycle period
    pub period: Duration,
    /// Pipelines with a live configuration; when set, non-terminal work
    /// in a pipeline not listed here is orphaned.
    pub known_pipelines: Option<Vec<String>>,
}

impl AuditConfig {
    pub fn new(pipelines: Vec<String>) -> Self {
        Self {
            pipelines,
            buffer: Duration::from_secs(3_600),
            period: Duration::from_secs(60),
            known_pipelines: None,
        }
    }
}

pub struct AuditDaemon<Q> {
    queue: Arc<Q>,
    clock: Arc<dyn Clock>,
    config: AuditConfig,
}

impl<Q: WorkQueue> AuditDaemon<Q> {
    pub fn new(queue: Arc<Q>, clock: Arc<dyn Clock>, config: AuditConfig) -> Self {
        Self {
            queue,
            clock,
            config,
        }
    }

    /// Run cycles until a shutdown is requested.
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), DaemonError> {
        let mut ticker = tokio::time::interval(self.config.period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    tracing::info!("audit daemon stopping");
                    return Ok(());
                }
                _ = ticker.tick() => match self.cycle().await {
                    Ok(metrics) => metrics.log(),
                    Err(e) => return Err(e),
                },
            }
        }
    }

    /// One audit pass over every configured pipeline.
    pub async fn cycle(&self) -> Result<AuditMetrics, DaemonError> {
        let mut metrics = AuditMetrics::default();
        let now = self.clock.epoch();
        let buffer = self.config.buffer.as_secs_f64();

        for pipeline in &self.config.pipelines {
            let orphaned_pipeline = self
                .config
                .known_pipelines
                .as_ref()
                .is_some_and(|known| !known.iter().any(|p| p == pipeline));

            let items = self
                .queue
                .scan(pipeline, &ScanQuery::default())
                .await?;

            for mut work in items {
                if orphaned_pipeline && !work.is_terminal() {
                    work.status = WorkStatus::Cancelled;
                    work.record_error("orphaned", "configuration no longer exists");
                    if work.stop.is_none() {
                        work.stop = Some(now);
                    }
                    self.queue.update(&work).await?;
                    metrics.orphaned += 1;
                    continue;
                }

                match work.status {
                    WorkStatus::Running => {
                        let started = work.start.unwrap_or(now);
                        let deadline = started + work.timeout as f64 + buffer;
                        if now > deadline {
                            work.status = WorkStatus::Failure;
                            work.attempt += 1;
                            work.record_error(
                                "expired",
                                format!(
                                    "withdrawn at {started:.0} and silent past timeout + buffer"
                                ),
                            );
                            if work.stop.is_none() {
                                work.stop = Some(now);
                            }
                            self.queue.update(&work).await?;
                            metrics.expired += 1;
                        }
                    }
                    WorkStatus::Failure => {
                        let stopped = work.stop.or(work.start).unwrap_or(now);
                        if now - stopped > buffer {
                            metrics.stale += 1;
                            tracing::warn!(
                                work_id = work.id.as_deref().unwrap_or("?"),
                                pipeline,
                                age_secs = (now - stopped) as u64,
                                "stale failure needs operator attention"
                            );
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(metrics)
    }
}

#[cfg(test)]
#[path = "audit_tests.rs"]
mod tests;
