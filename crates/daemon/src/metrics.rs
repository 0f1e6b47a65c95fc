// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-cycle outcome counters, emitted as one structured log line.

use serde::Serialize;

/// Transfer daemon cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferMetrics {
    /// Items whose artifacts were archived
    pub archived: u64,
    /// Items forwarded to the results service
    pub forwarded: u64,
    /// Items deleted from the queue
    pub deleted: u64,
    /// Items that failed and were left in place
    pub failed: u64,
}

impl TransferMetrics {
    pub fn log(&self) {
        tracing::info!(
            archived = self.archived,
            forwarded = self.forwarded,
            deleted = self.deleted,
            failed = self.failed,
            "transfer cycle complete"
        );
    }
}

/// Audit daemon cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditMetrics {
    /// Non-terminal items forced to failure after timeout + buffer
    pub expired: u64,
    /// Terminal failures past the buffer, flagged for an operator
    pub stale: u64,
    /// Items cancelled because their configuration is gone
    pub orphaned: u64,
}

impl AuditMetrics {
    pub fn log(&self) {
        tracing::info!(
            expired = self.expired,
            stale = self.stale,
            orphaned = self.orphaned,
            "audit cycle complete"
        );
    }
}
