// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a [`Work`](crate::Work) item.
///
/// The queue service owns items while they are `created`, `queued`, or
/// `running`. Terminal statuses are final: a runner may never re-mutate a
/// terminal item, and only the maintenance daemons or the queue service
/// itself may remove one. The legal moves are in [`can_transition`].
///
/// [`can_transition`]: WorkStatus::can_transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkStatus {
    /// Accepted by the validator, not yet deposited
    #[default]
    Created,
    /// Deposited and waiting in the queue
    Queued,
    /// Withdrawn by a runner, executing
    Running,
    /// Execution finished with a zero exit / no error
    Success,
    /// Execution failed, timed out, or exhausted its attempts
    Failure,
    /// Cancelled by an operator or the audit daemon
    Cancelled,
    /// Sat non-terminal past its timeout and the audit buffer
    Expired,
}

impl WorkStatus {
    /// Terminal statuses may not be re-entered or left.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkStatus::Success | WorkStatus::Failure | WorkStatus::Cancelled | WorkStatus::Expired
        )
    }

    /// Whether an item may move from `self` to `to`.
    ///
    /// Terminal statuses are final, with one exception owned by the queue
    /// service: a `failure` with attempts left is re-dispatched back to
    /// `running` (commit-or-retry). Whether attempts remain is the
    /// caller's check; this table only admits the edge.
    pub fn can_transition(&self, to: WorkStatus) -> bool {
        match (self, to) {
            (WorkStatus::Created, WorkStatus::Queued) => true,
            (WorkStatus::Queued, WorkStatus::Running) => true,
            (WorkStatus::Running, t) => t.is_terminal(),
            // Cancellation may land before a runner ever picks the item up.
            (WorkStatus::Created | WorkStatus::Queued, WorkStatus::Cancelled) => true,
            (WorkStatus::Failure, WorkStatus::Running) => true,
            _ => false,
        }
    }
}

impl fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkStatus::Created => write!(f, "created"),
            WorkStatus::Queued => write!(f, "queued"),
            WorkStatus::Running => write!(f, "running"),
            WorkStatus::Success => write!(f, "success"),
            WorkStatus::Failure => write!(f, "failure"),
            WorkStatus::Cancelled => write!(f, "cancelled"),
            WorkStatus::Expired => write!(f, "expired"),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
