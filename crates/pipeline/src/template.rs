// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `${{ ... }}` token substitution.
//!
//! Substitution is structural: when a string scalar consists of exactly one
//! token, the replacement preserves the looked-up value's type; when a token
//! is embedded in a longer string, the rendered form is interpolated.
//! Unknown tokens are left as-is.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Token pattern: `${{ namespace.key... }}`
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
pub static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\{\s*([a-zA-Z_][a-zA-Z0-9_-]*(?:\.[a-zA-Z0-9_.-]+)*)\s*\}\}")
        .expect("constant regex pattern is valid")
});

/// Render a JSON value for string interpolation.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Substitute tokens in a string scalar.
fn substitute_str(s: &str, lookup: &dyn Fn(&str) -> Option<Value>) -> Value {
    // Sole-token form keeps the looked-up value's type.
    if let Some(caps) = TOKEN_PATTERN.captures(s) {
        if let Some(whole) = caps.get(0) {
            if whole.start() == 0 && whole.end() == s.len() {
                return match lookup(&caps[1]) {
                    Some(value) => value,
                    None => Value::String(s.to_string()),
                };
            }
        }
    }
    let replaced = TOKEN_PATTERN.replace_all(s, |caps: &regex::Captures| {
        match lookup(&caps[1]) {
            Some(value) => render(&value),
            None => caps[0].to_string(),
        }
    });
    Value::String(replaced.into_owned())
}

/// Substitute tokens throughout a JSON value.
pub fn substitute(value: &Value, lookup: &dyn Fn(&str) -> Option<Value>) -> Value {
    match value {
        Value::String(s) => substitute_str(s, lookup),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute(v, lookup)).collect())
        }
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, lookup)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Substitute tokens throughout a JSON object map.
pub fn substitute_map(
    map: &Map<String, Value>,
    lookup: &dyn Fn(&str) -> Option<Value>,
) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), substitute(v, lookup)))
        .collect()
}

/// Token names referenced in a value, in encounter order.
pub fn references(value: &Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in TOKEN_PATTERN.captures_iter(s) {
                found.push(caps[1].to_string());
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_references(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_references(v, found)),
        _ => {}
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
