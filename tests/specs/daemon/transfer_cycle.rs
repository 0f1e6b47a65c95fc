// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A full transfer cycle: archive, forward, delete.

use crate::prelude::*;
use mill_client::{FakeBucket, FakeResults, WorkQueue};
use mill_core::{ArchiveMode, Work, WorkStatus};
use mill_daemon::{TransferConfig, TransferDaemon};
use mill_runner::Registry;
use mill_workspace::Workspace;
use std::sync::Arc;

#[tokio::test]
async fn completed_work_is_archived_forwarded_and_deleted() {
    let sources = tempfile::tempdir().unwrap();
    let archive_root = tempfile::tempdir().unwrap();
    let product = sources.path().join("a.dat");
    std::fs::write(&product, "data").unwrap();

    let workspace: Workspace = serde_yaml::from_str(&format!(
        "workspace: test\nsites: [local]\narchive:\n  posix:\n    local: {}\n",
        archive_root.path().display()
    ))
    .unwrap();

    // Run a work item that names a product, then let the daemon collect it.
    let queue = Arc::new(FakeBucket::new());
    let mut work = Work::new("t1", "local").with_command(["true"]);
    work.products = Some(vec![product.display().to_string()]);
    work.config.archive.products = ArchiveMode::Move;
    work.config.archive.plots = ArchiveMode::Bypass;
    work.config.archive.results = ArchiveMode::Copy;
    let id = deposit(&queue, work).await;

    run_once(Arc::clone(&queue), Registry::new(), "t1").await;
    assert_eq!(queue.get(&id).unwrap().status, WorkStatus::Success);

    let results = Arc::new(FakeResults::new());
    let daemon = TransferDaemon::new(
        Arc::clone(&queue),
        Arc::clone(&results),
        workspace,
        TransferConfig::new(vec!["t1".to_string()]),
    );
    let metrics = daemon.cycle().await.unwrap();
    assert_eq!(metrics.archived, 1);
    assert_eq!(metrics.forwarded, 1);
    assert_eq!(metrics.deleted, 1);

    // The product exists only under the archive root.
    assert!(!product.exists());
    let archived = archive_root
        .path()
        .join("t1")
        .join(&id)
        .join("products")
        .join("a.dat");
    assert!(archived.is_file());

    // Present in results, absent from the queue.
    assert_eq!(results.len(), 1);
    assert_eq!(results.all()[0].id.as_deref(), Some(id.as_str()));
    assert!(queue.get(&id).is_none());
}
