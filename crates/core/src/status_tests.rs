// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn terminal_statuses() {
    assert!(WorkStatus::Success.is_terminal());
    assert!(WorkStatus::Failure.is_terminal());
    assert!(WorkStatus::Cancelled.is_terminal());
    assert!(WorkStatus::Expired.is_terminal());
    assert!(!WorkStatus::Created.is_terminal());
    assert!(!WorkStatus::Queued.is_terminal());
    assert!(!WorkStatus::Running.is_terminal());
}

#[yare::parameterized(
    created_to_queued = { WorkStatus::Created, WorkStatus::Queued, true },
    queued_to_running = { WorkStatus::Queued, WorkStatus::Running, true },
    running_to_success = { WorkStatus::Running, WorkStatus::Success, true },
    running_to_failure = { WorkStatus::Running, WorkStatus::Failure, true },
    running_to_expired = { WorkStatus::Running, WorkStatus::Expired, true },
    failure_redispatch = { WorkStatus::Failure, WorkStatus::Running, true },
    queued_cancellable = { WorkStatus::Queued, WorkStatus::Cancelled, true },
    created_cancellable = { WorkStatus::Created, WorkStatus::Cancelled, true },
    created_to_running = { WorkStatus::Created, WorkStatus::Running, false },
    queued_to_success = { WorkStatus::Queued, WorkStatus::Success, false },
    success_is_final = { WorkStatus::Success, WorkStatus::Running, false },
    failure_not_requeued = { WorkStatus::Failure, WorkStatus::Queued, false },
    cancelled_is_final = { WorkStatus::Cancelled, WorkStatus::Running, false },
    expired_is_final = { WorkStatus::Expired, WorkStatus::Failure, false },
)]
fn transitions(from: WorkStatus, to: WorkStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn wire_form_is_lowercase() {
    let json = serde_json::to_string(&WorkStatus::Cancelled).unwrap();
    assert_eq!(json, "\"cancelled\"");
    let back: WorkStatus = serde_json::from_str("\"expired\"").unwrap();
    assert_eq!(back, WorkStatus::Expired);
}

#[test]
fn display_matches_wire_form() {
    for status in [
        WorkStatus::Created,
        WorkStatus::Queued,
        WorkStatus::Running,
        WorkStatus::Success,
        WorkStatus::Failure,
        WorkStatus::Cancelled,
        WorkStatus::Expired,
    ] {
        let wire = serde_json::to_string(&status).unwrap();
        assert_eq!(wire, format!("\"{}\"", status));
    }
}
