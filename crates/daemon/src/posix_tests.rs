// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mill_core::Work;
use serde_json::json;

struct Fixture {
    _sources: tempfile::TempDir,
    archive_root: tempfile::TempDir,
    files: Vec<String>,
}

fn fixture(names: &[&str]) -> Fixture {
    let sources = tempfile::tempdir().unwrap();
    let archive_root = tempfile::tempdir().unwrap();
    let files = names
        .iter()
        .map(|name| {
            let path = sources.path().join(name);
            std::fs::write(&path, format!("payload of {name}")).unwrap();
            path.display().to_string()
        })
        .collect();
    Fixture {
        _sources: sources,
        archive_root,
        files,
    }
}

impl Fixture {
    fn archive(&self) -> PosixArchive {
        PosixArchive::new(self.archive_root.path())
    }
}

#[tokio::test]
async fn copy_keeps_source_and_writes_destination() {
    let fx = fixture(&["a.dat"]);
    let written = fx
        .archive()
        .apply(ArchiveMode::Copy, "products", &fx.files, "p", "w1")
        .await
        .unwrap();
    assert_eq!(written.len(), 1);
    assert!(Path::new(&fx.files[0]).exists());
    let destination = fx
        .archive_root
        .path()
        .join("p")
        .join("w1")
        .join("products")
        .join("a.dat");
    assert_eq!(written[0], destination);
    assert!(destination.is_file());
}

#[tokio::test]
async fn move_removes_source() {
    let fx = fixture(&["a.dat", "b.dat"]);
    let written = fx
        .archive()
        .apply(ArchiveMode::Move, "plots", &fx.files, "p", "w1")
        .await
        .unwrap();
    assert_eq!(written.len(), 2);
    for source in &fx.files {
        assert!(!Path::new(source).exists());
    }
    for destination in &written {
        assert!(destination.is_file());
    }
}

#[tokio::test]
async fn delete_removes_source_writes_nothing() {
    let fx = fixture(&["a.dat"]);
    let written = fx
        .archive()
        .apply(ArchiveMode::Delete, "products", &fx.files, "p", "w1")
        .await
        .unwrap();
    assert!(written.is_empty());
    assert!(!Path::new(&fx.files[0]).exists());
    assert!(!fx.archive_root.path().join("p").exists());
}

#[tokio::test]
async fn delete_tolerates_missing_source() {
    let fx = fixture(&[]);
    let missing = vec![fx
        .archive_root
        .path()
        .join("nope.dat")
        .display()
        .to_string()];
    let written = fx
        .archive()
        .apply(ArchiveMode::Delete, "products", &missing, "p", "w1")
        .await
        .unwrap();
    assert!(written.is_empty());
}

#[tokio::test]
async fn bypass_touches_nothing() {
    let fx = fixture(&["a.dat"]);
    let written = fx
        .archive()
        .apply(ArchiveMode::Bypass, "products", &fx.files, "p", "w1")
        .await
        .unwrap();
    assert!(written.is_empty());
    assert!(Path::new(&fx.files[0]).exists());
    assert!(!fx.archive_root.path().join("p").exists());
}

#[tokio::test]
async fn missing_source_is_fatal_for_copy_and_move() {
    for mode in [ArchiveMode::Copy, ArchiveMode::Move] {
        let fx = fixture(&[]);
        let missing = vec!["/definitely/not/here.dat".to_string()];
        let err = fx
            .archive()
            .apply(mode, "products", &missing, "p", "w1")
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::MissingSource(_)), "{mode}");
    }
}

#[tokio::test]
async fn results_written_as_json() {
    let fx = fixture(&[]);
    let mut work = Work::new("p", "local").with_command(["true"]);
    work.results = Some(json!({"snr": 12.5}).as_object().unwrap().clone());

    let path = fx.archive().write_results(&work, "w1").await.unwrap();
    assert!(path.ends_with("p/w1/results.json"));
    let text = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, json!({"snr": 12.5}));
}

#[tokio::test]
async fn permissions_command_substitutes_and_runs() {
    let fx = fixture(&[]);
    let target = fx.archive_root.path().join("marker");
    let template = "echo {group} > {path}";
    fx.archive()
        .set_permissions("frb-ro", &target, Some(template))
        .await
        .unwrap();
    let text = std::fs::read_to_string(&target).unwrap();
    assert_eq!(text.trim(), "frb-ro");
}

#[tokio::test]
async fn failing_permissions_command_is_an_error() {
    let fx = fixture(&[]);
    let err = fx
        .archive()
        .set_permissions("g", Path::new("/tmp/x"), Some("exit 3"))
        .await
        .unwrap_err();
    assert!(matches!(err, ArchiveError::Permissions(_)));
}
