// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace resolution and active-workspace persistence.
//!
//! A workspace locator resolves with the precedence: explicit filesystem
//! path, then URL, then bare name looked up under `~/.mill/workspaces/`.
//! The active workspace is persisted at `~/.mill/workspaces/active.yml`;
//! its absence is a fatal startup error for every binary.

use crate::document::Workspace;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("no active workspace; set one with a workspace document first")]
    NoActive,
    #[error("workspace {0:?} not found (tried path, URL, and ~/.mill/workspaces)")]
    NotFound(String),
    #[error("home directory could not be determined")]
    NoHome,
    #[error("failed to fetch workspace from {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid workspace document: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Directory holding named workspace documents and `active.yml`.
pub fn workspaces_dir() -> Result<PathBuf, WorkspaceError> {
    dirs::home_dir()
        .map(|home| home.join(".mill").join("workspaces"))
        .ok_or(WorkspaceError::NoHome)
}

fn parse(text: &str) -> Result<Workspace, WorkspaceError> {
    Ok(serde_yaml::from_str(text)?)
}

/// Resolve a workspace locator: path, then URL, then name.
pub async fn resolve(locator: &str) -> Result<Workspace, WorkspaceError> {
    let as_path = Path::new(locator);
    if as_path.is_file() {
        let text = std::fs::read_to_string(as_path)?;
        return parse(&text);
    }

    if locator.starts_with("http://") || locator.starts_with("https://") {
        let text = reqwest::get(locator)
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| WorkspaceError::Fetch {
                url: locator.to_string(),
                source,
            })?
            .text()
            .await
            .map_err(|source| WorkspaceError::Fetch {
                url: locator.to_string(),
                source,
            })?;
        return parse(&text);
    }

    let dir = workspaces_dir()?;
    for candidate in [
        dir.join(format!("{locator}.yml")),
        dir.join(format!("{locator}.yaml")),
    ] {
        if candidate.is_file() {
            let text = std::fs::read_to_string(&candidate)?;
            return parse(&text);
        }
    }

    Err(WorkspaceError::NotFound(locator.to_string()))
}

fn active_path() -> Result<PathBuf, WorkspaceError> {
    Ok(workspaces_dir()?.join("active.yml"))
}

/// Load the active workspace. Missing active workspace is fatal.
pub fn load_active() -> Result<Workspace, WorkspaceError> {
    let path = active_path()?;
    let text = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WorkspaceError::NoActive
        } else {
            WorkspaceError::Io(e)
        }
    })?;
    parse(&text)
}

/// Persist a workspace as the active one. Returns the path written.
pub fn save_active(workspace: &Workspace) -> Result<PathBuf, WorkspaceError> {
    let path = active_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_yaml::to_string(workspace)?;
    std::fs::write(&path, text)?;
    tracing::info!(workspace = %workspace.workspace, path = %path.display(), "active workspace set");
    Ok(path)
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
