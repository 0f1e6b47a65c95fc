// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Work validation: schema rules, payload discriminant, defaults.

use crate::clock::Clock;
use crate::work::{Work, MAX_TIMEOUT};
use thiserror::Error;

/// How unknown fields are treated at an ingestion point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Any violation rejects, unknown fields included
    #[default]
    Strict,
    /// Unknown fields are preserved and warned about
    Relaxed,
}

/// Rejected input. Carries every violation found, not just the first.
#[derive(Debug, Error)]
#[error("invalid work: {}", violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

/// Normalize a pipeline name: lowercase, `_` to `-`, any other run of
/// disallowed characters to a single `-`, leading/trailing separators
/// stripped.
pub fn normalize_pipeline(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut last_was_sep = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_sep = false;
        } else if !last_was_sep {
            out.push('-');
            last_was_sep = true;
        }
    }
    out.trim_matches('-').to_string()
}

/// Whether a function reference is a well-formed dotted path
/// (`pkg.mod.fn`: at least two segments, identifier characters only).
fn is_dotted_reference(reference: &str) -> bool {
    let segments: Vec<&str> = reference.split('.').collect();
    if segments.len() < 2 {
        return false;
    }
    segments.iter().all(|seg| {
        let mut chars = seg.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Validate a raw work item against the schema and the workspace's sites.
///
/// Normalizes the pipeline name (warning if it was rewritten), applies the
/// payload one-of rule, checks ranges, and stamps `creation`. Violations
/// are aggregated so the caller sees all of them at once.
pub fn validate(
    mut work: Work,
    sites: &[String],
    strategy: Strategy,
    clock: &dyn Clock,
) -> Result<Work, ValidationError> {
    let mut violations = Vec::new();

    let normalized = normalize_pipeline(&work.pipeline);
    if normalized.is_empty() {
        violations.push(format!(
            "pipeline {:?} has no [a-z0-9-] characters",
            work.pipeline
        ));
    } else if normalized != work.pipeline {
        tracing::warn!(
            from = %work.pipeline,
            to = %normalized,
            "pipeline name rewritten during validation"
        );
        work.pipeline = normalized;
    }

    match (&work.function, &work.command) {
        (Some(_), Some(_)) => {
            violations.push("work defines both function and command".to_string());
        }
        (None, None) => {
            violations.push("work defines neither function nor command".to_string());
        }
        (Some(f), None) => {
            if !is_dotted_reference(f) {
                violations.push(format!("function {:?} is not a dotted reference", f));
            }
        }
        (None, Some(argv)) => {
            if argv.is_empty() {
                violations.push("command argv is empty".to_string());
            }
        }
    }

    if !sites.iter().any(|s| s == &work.site) {
        violations.push(format!(
            "site {:?} is not in the workspace sites ({})",
            work.site,
            sites.join(", ")
        ));
    }

    if work.timeout == 0 || work.timeout > MAX_TIMEOUT {
        violations.push(format!(
            "timeout {} outside 1..={}",
            work.timeout, MAX_TIMEOUT
        ));
    }

    if !(1..=5).contains(&work.priority) {
        violations.push(format!("priority {} outside 1..=5", work.priority));
    }

    if let (Some(start), Some(stop)) = (work.start, work.stop) {
        if start > stop {
            violations.push(format!("start {} is after stop {}", start, stop));
        }
    }

    if !work.extra.is_empty() {
        match strategy {
            Strategy::Strict => {
                let mut keys: Vec<&str> = work.extra.keys().map(|k| k.as_str()).collect();
                keys.sort_unstable();
                violations.push(format!("unknown fields: {}", keys.join(", ")));
            }
            Strategy::Relaxed => {
                tracing::warn!(
                    fields = %work.extra.keys().cloned().collect::<Vec<_>>().join(", "),
                    "unknown fields preserved under relaxed validation"
                );
            }
        }
    }

    if !violations.is_empty() {
        return Err(ValidationError { violations });
    }

    if work.creation.is_none() {
        work.creation = Some(clock.epoch());
    }

    Ok(work)
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
