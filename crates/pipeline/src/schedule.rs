// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cron schedules for pipeline configurations.

use serde::{Deserialize, Serialize};

/// A cron schedule with an optional firing bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schedule {
    /// Standard 5-field cron expression
    pub cronspec: String,
    /// Maximum number of firings; 0 means unbounded
    #[serde(default)]
    pub count: u32,
}

impl Schedule {
    /// Whether the firing bound allows another run.
    pub fn allows(&self, fired: u32) -> bool {
        self.count == 0 || fired < self.count
    }
}

/// Inclusive value bounds per cron field, in field order:
/// minute, hour, day-of-month, month, day-of-week.
const FIELD_BOUNDS: [(u32, u32); 5] = [(0, 59), (0, 23), (1, 31), (1, 12), (0, 7)];

const FIELD_NAMES: [&str; 5] = ["minute", "hour", "day-of-month", "month", "day-of-week"];

/// Validate a 5-field cron expression.
///
/// Supports `*`, `*/n`, single values, ranges `a-b`, and comma lists of
/// those. Names (e.g. `MON`) are not accepted.
pub fn validate_cronspec(spec: &str) -> Result<(), String> {
    let fields: Vec<&str> = spec.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(format!(
            "cronspec {spec:?} has {} fields, expected 5",
            fields.len()
        ));
    }
    for (index, field) in fields.iter().enumerate() {
        let (lo, hi) = FIELD_BOUNDS[index];
        for part in field.split(',') {
            validate_part(part, lo, hi)
                .map_err(|e| format!("cronspec {} field: {}", FIELD_NAMES[index], e))?;
        }
    }
    Ok(())
}

fn validate_part(part: &str, lo: u32, hi: u32) -> Result<(), String> {
    if part == "*" {
        return Ok(());
    }
    if let Some(step) = part.strip_prefix("*/") {
        let n: u32 = step
            .parse()
            .map_err(|_| format!("bad step in {part:?}"))?;
        if n == 0 {
            return Err(format!("zero step in {part:?}"));
        }
        return Ok(());
    }
    if let Some((a, b)) = part.split_once('-') {
        let a = parse_bounded(a, lo, hi)?;
        let b = parse_bounded(b, lo, hi)?;
        if a > b {
            return Err(format!("descending range {part:?}"));
        }
        return Ok(());
    }
    parse_bounded(part, lo, hi).map(|_| ())
}

fn parse_bounded(text: &str, lo: u32, hi: u32) -> Result<u32, String> {
    let n: u32 = text
        .parse()
        .map_err(|_| format!("{text:?} is not a number"))?;
    if n < lo || n > hi {
        return Err(format!("{n} outside {lo}..={hi}"));
    }
    Ok(n)
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
