// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The queue abstraction runners and daemons work against.
//!
//! [`BucketClient`](crate::BucketClient) is the HTTP implementation;
//! [`FakeBucket`] is an in-memory one (behind the `test-support` feature)
//! that enforces the same server-side semantics: atomic single dequeue,
//! attempt accounting, and the status transition table
//! ([`WorkStatus::can_transition`]).

use crate::transport::TransportError;
use async_trait::async_trait;
use mill_core::{WithdrawFilter, Work, WorkStatus};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("work has no id; deposit it first")]
    MissingId,
    #[error("work {0} not found")]
    NotFound(String),
    #[error("work {id} may not move {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: WorkStatus,
        to: WorkStatus,
    },
    #[error("bad response from queue service: {0}")]
    BadResponse(String),
}

impl QueueError {
    /// Whether the underlying failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, QueueError::Transport(e) if e.is_transient())
    }
}

/// Scan selection for the maintenance daemons.
#[derive(Debug, Clone, Default)]
pub struct ScanQuery {
    pub site: Option<String>,
    pub statuses: Vec<WorkStatus>,
    pub limit: usize,
}

/// Deposit / withdraw / update / delete against the work queue.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Deposit validated work items; returns the server-assigned ids.
    async fn deposit(&self, work: Vec<Work>) -> Result<Vec<String>, QueueError>;

    /// Atomically dequeue one matching item, or None if the queue is empty.
    async fn withdraw(
        &self,
        pipeline: &str,
        filter: &WithdrawFilter,
    ) -> Result<Option<Work>, QueueError>;

    /// Write an updated item back.
    async fn update(&self, work: &Work) -> Result<(), QueueError>;

    /// Remove items by id.
    async fn delete(&self, ids: &[String]) -> Result<(), QueueError>;

    /// List items for a pipeline without dequeuing them.
    async fn scan(&self, pipeline: &str, query: &ScanQuery) -> Result<Vec<Work>, QueueError>;
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBucket;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;

    /// In-memory queue with the bucket service's semantics.
    #[derive(Default)]
    pub struct FakeBucket {
        items: Mutex<Vec<Work>>,
    }

    impl FakeBucket {
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of everything in the queue.
        pub fn all(&self) -> Vec<Work> {
            self.items.lock().clone()
        }

        /// Look up one item by id.
        pub fn get(&self, id: &str) -> Option<Work> {
            self.items
                .lock()
                .iter()
                .find(|w| w.id.as_deref() == Some(id))
                .cloned()
        }

        pub fn len(&self) -> usize {
            self.items.lock().len()
        }

        pub fn is_empty(&self) -> bool {
            self.items.lock().is_empty()
        }

        /// Whether a withdraw may hand this item out: the status table
        /// must admit a move to `running`, and a failed item only while
        /// it still has attempts left (at-least-once with
        /// commit-or-retry).
        fn eligible(work: &Work) -> bool {
            if !work.status.can_transition(WorkStatus::Running) {
                return false;
            }
            work.status != WorkStatus::Failure || work.attempt <= work.retries
        }
    }

    #[async_trait]
    impl WorkQueue for FakeBucket {
        async fn deposit(&self, work: Vec<Work>) -> Result<Vec<String>, QueueError> {
            let mut items = self.items.lock();
            let mut ids = Vec::with_capacity(work.len());
            for mut item in work {
                let id = uuid::Uuid::new_v4().simple().to_string();
                item.id = Some(id.clone());
                item.status = WorkStatus::Queued;
                ids.push(id);
                items.push(item);
            }
            Ok(ids)
        }

        async fn withdraw(
            &self,
            pipeline: &str,
            filter: &WithdrawFilter,
        ) -> Result<Option<Work>, QueueError> {
            let mut items = self.items.lock();

            // Attempt bound is enforced at withdrawal: an item that already
            // spent retries + 1 attempts fails instead of being handed out.
            for item in items.iter_mut() {
                if item.status == WorkStatus::Queued
                    && item.pipeline == pipeline
                    && item.attempt > item.retries
                {
                    item.status = WorkStatus::Failure;
                }
            }

            let chosen = items
                .iter()
                .enumerate()
                .filter(|(_, w)| {
                    FakeBucket::eligible(w) && w.pipeline == pipeline && filter.matches(w)
                })
                .max_by(|(_, a), (_, b)| {
                    a.priority.cmp(&b.priority).then(
                        // Older creation wins, so compare reversed.
                        b.creation
                            .unwrap_or(f64::MAX)
                            .total_cmp(&a.creation.unwrap_or(f64::MAX)),
                    )
                })
                .map(|(index, _)| index);

            Ok(chosen.map(|index| {
                let item = &mut items[index];
                item.attempt += 1;
                item.status = WorkStatus::Running;
                item.clone()
            }))
        }

        async fn update(&self, work: &Work) -> Result<(), QueueError> {
            let id = work.id.as_deref().ok_or(QueueError::MissingId)?;
            let mut items = self.items.lock();
            let slot = items
                .iter_mut()
                .find(|w| w.id.as_deref() == Some(id))
                .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
            if work.status != slot.status && !slot.status.can_transition(work.status) {
                return Err(QueueError::InvalidTransition {
                    id: id.to_string(),
                    from: slot.status,
                    to: work.status,
                });
            }
            *slot = work.clone();
            Ok(())
        }

        async fn delete(&self, ids: &[String]) -> Result<(), QueueError> {
            let mut items = self.items.lock();
            items.retain(|w| !w.id.as_deref().is_some_and(|id| ids.iter().any(|i| i == id)));
            Ok(())
        }

        async fn scan(&self, pipeline: &str, query: &ScanQuery) -> Result<Vec<Work>, QueueError> {
            let items = self.items.lock();
            let mut selected: Vec<Work> = items
                .iter()
                .filter(|w| w.pipeline == pipeline)
                .filter(|w| {
                    query
                        .site
                        .as_deref()
                        .is_none_or(|site| w.site == site)
                })
                .filter(|w| query.statuses.is_empty() || query.statuses.contains(&w.status))
                .cloned()
                .collect();
            selected.sort_by(|a, b| {
                a.creation
                    .unwrap_or(f64::MAX)
                    .total_cmp(&b.creation.unwrap_or(f64::MAX))
            });
            if query.limit > 0 {
                selected.truncate(query.limit);
            }
            Ok(selected)
        }
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
