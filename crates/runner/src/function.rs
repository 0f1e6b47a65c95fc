// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The function registry.
//!
//! User code registers named callables at process start; a work item's
//! `function` field is a dotted lookup key into the registry. A callable
//! may expose a default-parameter table (the CLI-wrapper case); merging is
//! deterministic: explicit parameters beat defaults, and null-valued
//! entries are dropped.

use mill_core::Work;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// What a callable returns: results, product paths, plot paths.
pub type FunctionOutput = (Map<String, Value>, Vec<String>, Vec<String>);

/// Whether the callable receives keyword parameters or the whole work item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ArgSource {
    /// Pass the merged parameter mapping
    #[default]
    Parameters,
    /// Pass the full work item
    Work,
}

/// A registered unit of user code.
pub trait Callable: Send + Sync {
    /// Invoke with keyword-style parameters.
    fn call(&self, args: &Map<String, Value>) -> Result<FunctionOutput, String>;

    /// Invoke with the full work item. Defaults to delegating to [`call`]
    /// with the item's parameters.
    ///
    /// [`call`]: Callable::call
    fn call_with_work(&self, work: &Work) -> Result<FunctionOutput, String> {
        match &work.parameters {
            Some(parameters) => self.call(parameters),
            None => self.call(&Map::new()),
        }
    }

    /// CLI-wrapper default parameters, if this callable carries any.
    fn defaults(&self) -> Option<Map<String, Value>> {
        None
    }
}

/// Adapter turning a plain closure into a [`Callable`].
struct FnCallable<F>(F);

impl<F> Callable for FnCallable<F>
where
    F: Fn(&Map<String, Value>) -> Result<FunctionOutput, String> + Send + Sync,
{
    fn call(&self, args: &Map<String, Value>) -> Result<FunctionOutput, String> {
        (self.0)(args)
    }
}

/// Lookup table from dotted reference to callable.
#[derive(Default, Clone)]
pub struct Registry {
    entries: HashMap<String, Arc<dyn Callable>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callable under a dotted name.
    pub fn register(&mut self, name: impl Into<String>, callable: Arc<dyn Callable>) {
        self.entries.insert(name.into(), callable);
    }

    /// Register a plain function under a dotted name.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Map<String, Value>) -> Result<FunctionOutput, String> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnCallable(f)));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Callable>> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(|k| k.as_str()).collect()
    }
}

/// Merge a callable's defaults with a work item's explicit parameters.
///
/// Explicit values win over defaults; entries that end up null are
/// omitted entirely (a null CLI option means "not passed"). Flag-style
/// options stay booleans.
pub fn merge_arguments(
    defaults: Option<Map<String, Value>>,
    explicit: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut merged = defaults.unwrap_or_default();
    if let Some(explicit) = explicit {
        for (key, value) in explicit {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged.retain(|_, value| !value.is_null());
    merged
}

#[cfg(test)]
#[path = "function_tests.rs"]
mod tests;
