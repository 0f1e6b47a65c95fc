// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deep merge for JSON values.
//!
//! Used for results accumulation across retries and for layering pipeline
//! defaults under step work templates. Nested mappings merge recursively,
//! lists concatenate, and any other value on the right replaces the left.

use serde_json::{Map, Value};

/// Merge `incoming` into `base` in place.
pub fn update(base: &mut Value, incoming: Value) {
    match (base, incoming) {
        (Value::Object(base_map), Value::Object(incoming_map)) => {
            update_map(base_map, incoming_map);
        }
        (Value::Array(base_list), Value::Array(incoming_list)) => {
            base_list.extend(incoming_list);
        }
        (base_slot, incoming_value) => {
            *base_slot = incoming_value;
        }
    }
}

/// Merge `incoming` into `base` key by key.
pub fn update_map(base: &mut Map<String, Value>, incoming: Map<String, Value>) {
    for (key, value) in incoming {
        match base.get_mut(&key) {
            Some(slot) => update(slot, value),
            None => {
                base.insert(key, value);
            }
        }
    }
}

/// Merge two values into a new one, right-wins.
pub fn merged(mut base: Value, incoming: Value) -> Value {
    update(&mut base, incoming);
    base
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
