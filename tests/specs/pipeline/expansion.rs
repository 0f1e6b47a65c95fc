// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Matrix expansion deposits the full Cartesian product.

use mill_client::{FakeBucket, ScanQuery, WorkQueue};
use mill_core::FakeClock;
use mill_pipeline::{expand, ConfigDef};
use mill_workspace::Workspace;
use std::sync::Arc;

fn workspace() -> Workspace {
    serde_yaml::from_str("workspace: test\nsites: [a, b]\n").unwrap()
}

#[tokio::test]
async fn matrix_step_deposits_four_distinct_works() {
    let doc = ConfigDef::from_yaml(
        r#"
version: "1"
name: fanout
pipeline:
  scan:
    stage: 1
    matrix:
      job_id: [1, 2]
      site: [a, b]
    work:
      site: ${{ matrix.site }}
      command: ["process", "--job", "${{ matrix.job_id }}"]
"#,
    )
    .unwrap();
    let expanded = expand(&doc, &workspace(), &FakeClock::new(1.0)).unwrap();
    assert_eq!(expanded.work_count(), 4);

    let queue = Arc::new(FakeBucket::new());
    for step in expanded.steps() {
        queue.deposit(step.work.clone()).await.unwrap();
    }

    let deposited = queue
        .scan("fanout", &ScanQuery::default())
        .await
        .unwrap();
    assert_eq!(deposited.len(), 4);

    let mut tuples: Vec<(i64, String)> = deposited
        .iter()
        .map(|w| {
            let params = w.parameters.as_ref().unwrap();
            (params["job_id"].as_i64().unwrap(), w.site.clone())
        })
        .collect();
    tuples.sort();
    tuples.dedup();
    assert_eq!(tuples.len(), 4, "expanded works must be pairwise distinct");
}
