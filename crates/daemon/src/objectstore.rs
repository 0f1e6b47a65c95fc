// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3-compatible object store backend.
//!
//! Uploads are plain HTTP PUTs against the site's configured endpoint;
//! the object key is `<subpath>/<pipeline>/<id>/<filename>`.

use crate::posix::ArchiveError;
use mill_workspace::S3Site;
use std::path::Path;
use std::time::Duration;

pub struct ObjectStore {
    client: reqwest::Client,
    url: String,
    bucket: String,
    subpath: String,
}

impl ObjectStore {
    pub fn new(site: &S3Site) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ArchiveError::Upload {
                key: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            url: site.url.trim_end_matches('/').to_string(),
            bucket: site.bucket.clone(),
            subpath: site.subpath.trim_matches('/').to_string(),
        })
    }

    /// Object key for one archived file.
    pub fn key(&self, pipeline: &str, id: &str, filename: &str) -> String {
        if self.subpath.is_empty() {
            format!("{pipeline}/{id}/{filename}")
        } else {
            format!("{}/{pipeline}/{id}/{filename}", self.subpath)
        }
    }

    /// Upload raw bytes under a key.
    pub async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ArchiveError> {
        let target = format!("{}/{}/{}", self.url, self.bucket, key);
        let response = self
            .client
            .put(&target)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ArchiveError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(ArchiveError::Upload {
                key: key.to_string(),
                message: format!("{} returned {}", target, response.status()),
            });
        }
        Ok(())
    }

    /// Upload one file; the key is derived from the work's identity and
    /// the file name.
    pub async fn upload_file(
        &self,
        source: &str,
        pipeline: &str,
        id: &str,
    ) -> Result<String, ArchiveError> {
        let path = Path::new(source);
        if !path.is_file() {
            return Err(ArchiveError::MissingSource(path.to_path_buf()));
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ArchiveError::MissingSource(path.to_path_buf()))?;
        let bytes = tokio::fs::read(path).await.map_err(|source| ArchiveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = self.key(pipeline, id, filename);
        self.put(&key, bytes).await?;
        Ok(key)
    }
}

#[cfg(test)]
#[path = "objectstore_tests.rs"]
mod tests;
