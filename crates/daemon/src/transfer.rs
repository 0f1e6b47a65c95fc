// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transfer daemon: archives terminal work and forwards it to the
//! results service.
//!
//! Per-item failures are isolated; the rest of the batch proceeds. Policy
//! violations (an archive backend the workspace never configured) abort
//! the whole batch.

use crate::metrics::TransferMetrics;
use crate::objectstore::ObjectStore;
use crate::posix::{ArchiveError, PosixArchive};
use mill_client::{QueueError, ResultsStore, ScanQuery, WorkQueue};
use mill_core::{ArchiveMode, Work, WorkStatus};
use mill_workspace::Workspace;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

/// Statuses the transfer daemon collects.
pub const TERMINAL: [WorkStatus; 4] = [
    WorkStatus::Success,
    WorkStatus::Failure,
    WorkStatus::Cancelled,
    WorkStatus::Expired,
];

#[derive(Debug, Error)]
pub enum DaemonError {
    /// Aborts the current batch; alerted, never silently retried.
    #[error("archive policy violation: {0}")]
    Policy(String),
    /// Isolated to one item.
    #[error("item failed: {0}")]
    Item(String),
    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl From<ArchiveError> for DaemonError {
    fn from(e: ArchiveError) -> Self {
        DaemonError::Item(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Pipelines to collect from
    pub pipelines: Vec<String>,
    /// Cycle period
    pub period: Duration,
    /// Items per pipeline × site per cycle
    pub batch: usize,
}

impl TransferConfig {
    pub fn new(pipelines: Vec<String>) -> Self {
        Self {
            pipelines,
            period: Duration::from_secs(30),
            batch: 50,
        }
    }
}

pub struct TransferDaemon<Q, R> {
    queue: Arc<Q>,
    results: Arc<R>,
    workspace: Workspace,
    config: TransferConfig,
}

impl<Q: WorkQueue, R: ResultsStore> TransferDaemon<Q, R> {
    pub fn new(
        queue: Arc<Q>,
        results: Arc<R>,
        workspace: Workspace,
        config: TransferConfig,
    ) -> Self {
        Self {
            queue,
            results,
            workspace,
            config,
        }
    }

    /// Run cycles until a shutdown is requested. Queue failures that
    /// survive the client's retries end the loop.
    pub async fn run(&self, shutdown: Arc<Notify>) -> Result<(), DaemonError> {
        let mut ticker = tokio::time::interval(self.config.period);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => {
                    tracing::info!("transfer daemon stopping");
                    return Ok(());
                }
                _ = ticker.tick() => match self.cycle().await {
                    Ok(metrics) => metrics.log(),
                    Err(DaemonError::Policy(violation)) => {
                        tracing::error!(%violation, "batch aborted by archive policy");
                    }
                    Err(e) => return Err(e),
                },
            }
        }
    }

    /// One reconciliation pass over every pipeline × site pair.
    pub async fn cycle(&self) -> Result<TransferMetrics, DaemonError> {
        let mut metrics = TransferMetrics::default();
        for pipeline in &self.config.pipelines {
            for site in &self.workspace.sites {
                self.collect(pipeline, site, &mut metrics).await?;
            }
        }
        Ok(metrics)
    }

    async fn collect(
        &self,
        pipeline: &str,
        site: &str,
        metrics: &mut TransferMetrics,
    ) -> Result<(), DaemonError> {
        let query = ScanQuery {
            site: Some(site.to_string()),
            statuses: TERMINAL.to_vec(),
            limit: self.config.batch,
        };
        let batch = self.queue.scan(pipeline, &query).await?;
        for work in batch {
            // A failure with attempts left is waiting for re-dispatch,
            // not for collection.
            if work.status == WorkStatus::Failure && work.attempt <= work.retries {
                continue;
            }
            match self.process(&work, site).await {
                Ok(forwarded) => {
                    metrics.archived += 1;
                    metrics.deleted += 1;
                    if forwarded {
                        metrics.forwarded += 1;
                    }
                }
                Err(DaemonError::Policy(violation)) => {
                    return Err(DaemonError::Policy(violation));
                }
                Err(e) => {
                    metrics.failed += 1;
                    tracing::warn!(
                        work_id = work.id.as_deref().unwrap_or("?"),
                        pipeline,
                        error = %e,
                        "item left in queue"
                    );
                }
            }
        }
        Ok(())
    }

    /// Archive one item's artifacts, forward it, and delete it from the
    /// queue. Returns whether it was forwarded to the results service.
    async fn process(&self, work: &Work, site: &str) -> Result<bool, DaemonError> {
        let id = work
            .id
            .as_deref()
            .ok_or_else(|| DaemonError::Item("work has no id".to_string()))?;
        let toggles = &self.workspace.config.archive;
        let archive = &work.config.archive;

        let mut archived_dir = None;

        if toggles.plots {
            if let Some(plots) = &work.plots {
                let dir = self
                    .apply_class(archive.plots, "plots", plots, work, id, site)
                    .await?;
                archived_dir = archived_dir.or(dir);
            }
        }
        if toggles.products {
            if let Some(products) = &work.products {
                let dir = self
                    .apply_class(archive.products, "products", products, work, id, site)
                    .await?;
                archived_dir = archived_dir.or(dir);
            }
        }
        if toggles.results {
            archived_dir = self
                .archive_results(archive.results, work, id, site)
                .await?
                .or(archived_dir);
        }

        if let (Some(dir), Some(group)) = (&archived_dir, &toggles.permissions) {
            // Best-effort: a failed ACL never blocks the transfer.
            let posix = self.posix(site)?;
            if let Err(e) = posix.set_permissions(group, dir, None).await {
                tracing::warn!(path = %dir.display(), error = %e, "ACL step failed");
            }
        }

        let forwarded = if archive.forward_results() && toggles.results {
            self.results.deposit(work).await?;
            true
        } else {
            false
        };

        self.queue.delete(&[id.to_string()]).await?;
        Ok(forwarded)
    }

    /// Route one artifact class to its backend. Returns the archive
    /// directory when the posix backend wrote anything.
    async fn apply_class(
        &self,
        mode: ArchiveMode,
        class: &str,
        sources: &[String],
        work: &Work,
        id: &str,
        site: &str,
    ) -> Result<Option<std::path::PathBuf>, DaemonError> {
        match mode {
            ArchiveMode::Bypass => Ok(None),
            ArchiveMode::Upload => {
                let store = self.objectstore(site)?;
                for source in sources {
                    let key = store.upload_file(source, &work.pipeline, id).await?;
                    tracing::debug!(%key, class, "uploaded");
                }
                Ok(None)
            }
            ArchiveMode::Copy | ArchiveMode::Move | ArchiveMode::Delete => {
                let posix = self.posix(site)?;
                let written = posix
                    .apply(mode, class, sources, &work.pipeline, id)
                    .await?;
                if written.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(posix.target_dir(&work.pipeline, id)))
                }
            }
        }
    }

    /// The results mapping archives as `results.json`.
    async fn archive_results(
        &self,
        mode: ArchiveMode,
        work: &Work,
        id: &str,
        site: &str,
    ) -> Result<Option<std::path::PathBuf>, DaemonError> {
        match mode {
            ArchiveMode::Bypass | ArchiveMode::Delete => Ok(None),
            ArchiveMode::Copy | ArchiveMode::Move => {
                let posix = self.posix(site)?;
                posix.write_results(work, id).await?;
                Ok(Some(posix.target_dir(&work.pipeline, id)))
            }
            ArchiveMode::Upload => {
                let store = self.objectstore(site)?;
                let empty = serde_json::Map::new();
                let results = work.results.as_ref().unwrap_or(&empty);
                let bytes = serde_json::to_vec_pretty(results)
                    .map_err(|e| DaemonError::Item(e.to_string()))?;
                let key = store.key(&work.pipeline, id, "results.json");
                store.put(&key, bytes).await?;
                Ok(None)
            }
        }
    }

    fn posix(&self, site: &str) -> Result<PosixArchive, DaemonError> {
        let root = self.workspace.posix_root(site).ok_or_else(|| {
            DaemonError::Policy(format!("site {site:?} has no posix archive root"))
        })?;
        Ok(PosixArchive::new(root.clone()))
    }

    fn objectstore(&self, site: &str) -> Result<ObjectStore, DaemonError> {
        let coords = self.workspace.s3_site(site).ok_or_else(|| {
            DaemonError::Policy(format!("site {site:?} has no object store configured"))
        })?;
        ObjectStore::new(coords).map_err(|e| DaemonError::Policy(e.to_string()))
    }
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
