// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The workspace YAML document.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// A backend service the workspace knows endpoints for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Buckets,
    Results,
    Pipelines,
    Loki,
    Products,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::Buckets => write!(f, "buckets"),
            Service::Results => write!(f, "results"),
            Service::Pipelines => write!(f, "pipelines"),
            Service::Loki => write!(f, "loki"),
            Service::Products => write!(f, "products"),
        }
    }
}

/// Candidate base URLs for a service.
///
/// Accepts either a single string or a list in YAML; always a list in
/// memory, probed in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Baseurls(pub Vec<String>);

impl<'de> Deserialize<'de> for Baseurls {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Raw::deserialize(d)? {
            Raw::One(s) => Baseurls(vec![s]),
            Raw::Many(v) => Baseurls(v),
        })
    }
}

/// `http.baseurls` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default)]
    pub baseurls: BaseurlMap,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseurlMap {
    #[serde(default)]
    pub buckets: Baseurls,
    #[serde(default)]
    pub results: Baseurls,
    #[serde(default)]
    pub pipelines: Baseurls,
    #[serde(default)]
    pub loki: Baseurls,
    #[serde(default)]
    pub products: Baseurls,
}

/// Per-site S3-compatible object store coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Site {
    pub url: String,
    pub bucket: String,
    #[serde(default)]
    pub subpath: String,
}

/// `archive` section: storage backends keyed by site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveStorage {
    #[serde(default)]
    pub posix: HashMap<String, PathBuf>,
    #[serde(default)]
    pub s3: HashMap<String, S3Site>,
}

/// `config.archive` section: which artifact classes the transfer daemon
/// touches, and the group granted read access on archived directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveToggles {
    #[serde(default = "default_true")]
    pub results: bool,
    #[serde(default = "default_true")]
    pub plots: bool,
    #[serde(default = "default_true")]
    pub products: bool,
    /// Group name substituted into the ACL command, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for ArchiveToggles {
    fn default() -> Self {
        Self {
            results: true,
            plots: true,
            products: true,
            permissions: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceDefaults {
    #[serde(default)]
    pub archive: ArchiveToggles,
}

/// A resolved workspace: the ambient configuration identifying services,
/// sites, storage, and policies. Loaded once at startup and passed
/// explicitly to constructors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    /// Workspace name
    pub workspace: String,
    /// Sites work may be scheduled at
    pub sites: Vec<String>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub archive: ArchiveStorage,
    #[serde(default)]
    pub config: WorkspaceDefaults,
}

impl Workspace {
    /// Candidate base URLs for a service, probed in order.
    pub fn baseurls(&self, service: Service) -> &[String] {
        let urls = match service {
            Service::Buckets => &self.http.baseurls.buckets,
            Service::Results => &self.http.baseurls.results,
            Service::Pipelines => &self.http.baseurls.pipelines,
            Service::Loki => &self.http.baseurls.loki,
            Service::Products => &self.http.baseurls.products,
        };
        &urls.0
    }

    /// POSIX archive root for a site.
    pub fn posix_root(&self, site: &str) -> Option<&PathBuf> {
        self.archive.posix.get(site)
    }

    /// Object store coordinates for a site.
    pub fn s3_site(&self, site: &str) -> Option<&S3Site> {
        self.archive.s3.get(site)
    }

    /// Whether a site is allowed by this workspace.
    pub fn allows_site(&self, site: &str) -> bool {
        self.sites.iter().any(|s| s == site)
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
