// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validate / serialize / deserialize / validate is the identity.

use mill_core::{validate, FakeClock, Strategy, Work};
use serde_json::json;

fn sites() -> Vec<String> {
    vec!["chime".to_string()]
}

#[test]
fn round_trip_is_identity() {
    let clock = FakeClock::new(1_700_000_000.0);
    let mut work = Work::new("frb-search", "chime").with_function("analysis.reduce.stack");
    work.parameters = Some(json!({"beam": 12, "deep": true}).as_object().unwrap().clone());
    work.event = vec![42, 43];
    work.tags = vec!["nightly".to_string()];
    work.timeout = 1_200;
    work.priority = 4;

    let validated = validate(work, &sites(), Strategy::Strict, &clock).unwrap();
    let wire = serde_json::to_string(&validated).unwrap();
    let parsed: Work = serde_json::from_str(&wire).unwrap();
    let revalidated = validate(parsed, &sites(), Strategy::Strict, &clock).unwrap();
    assert_eq!(validated, revalidated);
}

#[test]
fn relaxed_round_trip_keeps_unknown_fields() {
    let clock = FakeClock::new(1.0);
    let raw = json!({
        "pipeline": "p",
        "site": "chime",
        "command": ["true"],
        "beam_row": 117
    });
    let work: Work = serde_json::from_value(raw).unwrap();
    let validated = validate(work, &sites(), Strategy::Relaxed, &clock).unwrap();

    let wire = serde_json::to_value(&validated).unwrap();
    assert_eq!(wire["beam_row"], json!(117));
}
