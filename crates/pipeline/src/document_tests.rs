// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const DOC: &str = r#"
version: "1"
name: frb-search
defaults:
  site: chime
  user: frb
matrix:
  beam: [1, 2]
schedule:
  cronspec: "0 3 * * *"
  count: 10
pipeline:
  fetch:
    stage: 1
    work:
      command: ["fetch", "--beam", "${{ matrix.beam }}"]
  reduce:
    stage: 2
    if: success
    work:
      function: analysis.reduce.stack
"#;

#[test]
fn parses_and_injects_step_names() {
    let doc = ConfigDef::from_yaml(DOC).unwrap();
    assert_eq!(doc.name, "frb-search");
    assert_eq!(doc.version, "1");
    let names: Vec<&str> = doc.steps().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["fetch", "reduce"]);
}

#[test]
fn step_order_is_declaration_order() {
    let doc = ConfigDef::from_yaml(DOC).unwrap();
    let stages: Vec<u32> = doc.steps().map(|s| s.stage).collect();
    assert_eq!(stages, [1, 2]);
}

#[test]
fn condition_and_schedule_parsed() {
    let doc = ConfigDef::from_yaml(DOC).unwrap();
    let reduce = &doc.pipeline["reduce"];
    assert_eq!(reduce.condition, Some(crate::Condition::Success));
    assert_eq!(doc.schedule.as_ref().unwrap().count, 10);
}

#[test]
fn unknown_top_level_key_rejected() {
    let text = format!("{DOC}\nextra_key: true\n");
    assert!(ConfigDef::from_yaml(&text).is_err());
}

#[test]
fn unknown_step_key_rejected() {
    let text = r#"
version: "1"
name: p
pipeline:
  only:
    stage: 1
    work: {command: ["true"]}
    unexpected: 1
"#;
    assert!(ConfigDef::from_yaml(text).is_err());
}

#[test]
fn missing_pipeline_section_rejected() {
    let text = "version: \"1\"\nname: p\n";
    assert!(ConfigDef::from_yaml(text).is_err());
}

#[test]
fn json_wire_form_accepted() {
    let value = serde_json::json!({
        "version": "1",
        "name": "p",
        "pipeline": {
            "only": {"stage": 1, "work": {"command": ["true"]}}
        }
    });
    let doc = ConfigDef::from_json(value).unwrap();
    assert_eq!(doc.pipeline["only"].name, "only");
}

#[test]
fn deployment_hints_carried() {
    let text = r#"
version: "1"
name: p
pipeline:
  only:
    stage: 1
    runs_on: gpu-pool
    services: [scratch-cache]
    work: {command: ["true"]}
"#;
    let doc = ConfigDef::from_yaml(text).unwrap();
    let step = &doc.pipeline["only"];
    assert_eq!(step.runs_on.as_deref(), Some("gpu-pool"));
    assert_eq!(step.services, ["scratch-cache"]);
}
