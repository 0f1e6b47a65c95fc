// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-work archival and notification configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What the transfer daemon does with an artifact class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    /// Leave the artifact where it is
    Bypass,
    /// Duplicate into the archive, keep the source
    #[default]
    Copy,
    /// Relocate into the archive
    Move,
    /// Remove the source, archive nothing
    Delete,
    /// Upload to the site's object store
    Upload,
}

impl fmt::Display for ArchiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveMode::Bypass => write!(f, "bypass"),
            ArchiveMode::Copy => write!(f, "copy"),
            ArchiveMode::Move => write!(f, "move"),
            ArchiveMode::Delete => write!(f, "delete"),
            ArchiveMode::Upload => write!(f, "upload"),
        }
    }
}

/// Archival mode per artifact class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub results: ArchiveMode,
    #[serde(default)]
    pub plots: ArchiveMode,
    #[serde(default)]
    pub products: ArchiveMode,
}

impl ArchiveConfig {
    /// Whether the work should be forwarded to the results service.
    ///
    /// `bypass` leaves results in the queue entry only; `delete` discards
    /// them. Every other mode forwards.
    pub fn forward_results(&self) -> bool {
        !matches!(self.results, ArchiveMode::Bypass | ArchiveMode::Delete)
    }
}

/// Per-work configuration block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkConfig {
    #[serde(default)]
    pub archive: ArchiveConfig,
}

/// Notification routing for work completion.
///
/// Delivery and message formatting belong to the external notification
/// sink; the work item only carries the routing and inclusion choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Channel to post to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Member IDs to mention
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    /// Message template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Attach the results mapping to the message
    #[serde(default)]
    pub attach_results: bool,
    /// Attach product paths to the message
    #[serde(default)]
    pub attach_products: bool,
    /// Attach plot paths to the message
    #[serde(default)]
    pub attach_plots: bool,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
