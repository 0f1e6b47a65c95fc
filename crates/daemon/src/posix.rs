// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! POSIX filesystem archive backend.
//!
//! Layout under the site's archive root:
//! `<root>/<pipeline>/<id>/{results.json,plots/,products/}`. Per-work
//! paths embed the unique id, so concurrent daemon instances cannot
//! collide.

use mill_core::{ArchiveMode, Work};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default ACL command; `{group}` and `{path}` are substituted.
pub const DEFAULT_ACL_COMMAND: &str = "setfacl -R -m g:{group}:r {path}";

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Fatal for the item under copy/move: the artifact is gone.
    #[error("archive source missing: {0}")]
    MissingSource(PathBuf),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("object store upload failed for {key}: {message}")]
    Upload { key: String, message: String },
    #[error("permissions command failed: {0}")]
    Permissions(String),
    #[error("mode {0} is not a posix archive operation")]
    UnsupportedMode(ArchiveMode),
}

fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> ArchiveError {
    let path = path.into();
    move |source| ArchiveError::Io { path, source }
}

/// Archive backend rooted at one site's archive directory.
pub struct PosixArchive {
    root: PathBuf,
}

impl PosixArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Archive directory for one work item.
    pub fn target_dir(&self, pipeline: &str, id: &str) -> PathBuf {
        self.root.join(pipeline).join(id)
    }

    /// Apply an archive mode to one artifact class.
    ///
    /// `class` is the subdirectory name (`plots` or `products`). Returns
    /// the destination paths written. `bypass` touches nothing; `delete`
    /// removes sources and tolerates ones already gone; `copy` and `move`
    /// require every source to exist.
    pub async fn apply(
        &self,
        mode: ArchiveMode,
        class: &str,
        sources: &[String],
        pipeline: &str,
        id: &str,
    ) -> Result<Vec<PathBuf>, ArchiveError> {
        if sources.is_empty() || mode == ArchiveMode::Bypass {
            return Ok(Vec::new());
        }
        if mode == ArchiveMode::Upload {
            return Err(ArchiveError::UnsupportedMode(mode));
        }

        if mode == ArchiveMode::Delete {
            for source in sources {
                match tokio::fs::remove_file(source).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(io_err(source.as_str())(e)),
                }
            }
            return Ok(Vec::new());
        }

        let class_dir = self.target_dir(pipeline, id).join(class);
        tokio::fs::create_dir_all(&class_dir)
            .await
            .map_err(io_err(&class_dir))?;

        let mut written = Vec::with_capacity(sources.len());
        for source in sources {
            let source_path = Path::new(source);
            if !source_path.is_file() {
                return Err(ArchiveError::MissingSource(source_path.to_path_buf()));
            }
            let file_name = source_path
                .file_name()
                .ok_or_else(|| ArchiveError::MissingSource(source_path.to_path_buf()))?;
            let destination = class_dir.join(file_name);
            match mode {
                ArchiveMode::Copy => {
                    tokio::fs::copy(source_path, &destination)
                        .await
                        .map_err(io_err(&destination))?;
                }
                ArchiveMode::Move => {
                    // rename fails across filesystems; fall back to copy + remove
                    if tokio::fs::rename(source_path, &destination).await.is_err() {
                        tokio::fs::copy(source_path, &destination)
                            .await
                            .map_err(io_err(&destination))?;
                        tokio::fs::remove_file(source_path)
                            .await
                            .map_err(io_err(source_path))?;
                    }
                }
                ArchiveMode::Bypass | ArchiveMode::Delete | ArchiveMode::Upload => {
                    return Err(ArchiveError::UnsupportedMode(mode));
                }
            }
            written.push(destination);
        }
        Ok(written)
    }

    /// Write the work's results mapping as `results.json`.
    pub async fn write_results(&self, work: &Work, id: &str) -> Result<PathBuf, ArchiveError> {
        let dir = self.target_dir(&work.pipeline, id);
        tokio::fs::create_dir_all(&dir).await.map_err(io_err(&dir))?;
        let path = dir.join("results.json");
        let empty = serde_json::Map::new();
        let results = work.results.as_ref().unwrap_or(&empty);
        let text = serde_json::to_string_pretty(results).map_err(|e| ArchiveError::Io {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?;
        tokio::fs::write(&path, text).await.map_err(io_err(&path))?;
        Ok(path)
    }

    /// Run the ACL command over an archived directory.
    pub async fn set_permissions(
        &self,
        group: &str,
        path: &Path,
        command: Option<&str>,
    ) -> Result<(), ArchiveError> {
        let template = command.unwrap_or(DEFAULT_ACL_COMMAND);
        let rendered = template
            .replace("{group}", group)
            .replace("{path}", &path.display().to_string());
        let output = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&rendered)
            .output()
            .await
            .map_err(|e| ArchiveError::Permissions(e.to_string()))?;
        if !output.status.success() {
            return Err(ArchiveError::Permissions(format!(
                "{rendered:?} exited {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "posix_tests.rs"]
mod tests;
