// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use tempfile::TempDir;

use mediaflow::config::{ConfigFile, load_and_validate, load_from_path};
use mediaflow::errors::WorkflowError;
use mediaflow_test_utils::builders::{ConfigFileBuilder, DefinitionBuilder, OperationBuilder};

type TestResult = Result<(), Box<dyn Error>>;

fn write_config(contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Mediaflow.toml");
    fs::write(&path, contents).expect("write config");
    (dir, path)
}

fn config_error(contents: &str) -> String {
    let (_dir, path) = write_config(contents);
    match load_and_validate(&path) {
        Err(WorkflowError::ConfigError(msg)) => msg,
        other => panic!("expected a config error, got {other:?}"),
    }
}

const FULL: &str = r#"
[service]
max_concurrent_workflows = 4
include_environment = false

[dispatch]
workers = 2
retry_interval_ms = 100

[properties]
"server.url" = "http://localhost:8080"

[workflow.publish]
title = "Publish"

[[workflow.publish.operation]]
template = "defaults"
[workflow.publish.operation.configuration]
"publish" = "true"

[[workflow.publish.operation]]
template = "execute"
fail_on_error = true
exception_handler_workflow = "cleanup"
if = "${publish}"
[workflow.publish.operation.configuration]
command = "echo ${server.url}"

[workflow.cleanup]

[[workflow.cleanup.operation]]
template = "execute"
unless = "${keep}"
configuration = { command = "rm -rf work" }
"#;

#[test]
fn full_config_is_loaded_and_validated() -> TestResult {
    let (_dir, path) = write_config(FULL);
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.service.max_concurrent_workflows, Some(4));
    assert!(!cfg.service.include_environment);
    assert_eq!(cfg.dispatch.workers, 2);
    assert_eq!(cfg.max_load(), 2);
    assert_eq!(cfg.properties["server.url"], "http://localhost:8080");

    let publish = &cfg.workflows["publish"];
    assert_eq!(publish.id, "publish");
    assert_eq!(publish.title, "Publish");
    assert_eq!(publish.operations.len(), 2);
    assert_eq!(publish.operations[0].configuration["publish"], "true");

    let execute = &publish.operations[1];
    assert!(execute.fail_on_error);
    assert_eq!(execute.exception_handler_workflow.as_deref(), Some("cleanup"));
    assert_eq!(execute.execute_condition.as_deref(), Some("${publish}"));
    assert_eq!(execute.configuration["command"], "echo ${server.url}");

    let cleanup = &cfg.workflows["cleanup"];
    assert_eq!(cleanup.id, "cleanup");
    assert_eq!(cleanup.title, "cleanup", "title defaults to the id");
    assert_eq!(cleanup.operations[0].skip_condition.as_deref(), Some("${keep}"));
    Ok(())
}

#[test]
fn options_are_derived_from_the_sections() -> TestResult {
    let (_dir, path) = write_config(FULL);
    let cfg = load_and_validate(&path)?;

    let service = cfg.service_options();
    assert_eq!(service.max_concurrent_workflows, Some(4));
    assert_eq!(
        service.system.lookup("server.url").as_deref(),
        Some("http://localhost:8080")
    );
    assert_eq!(service.system.lookup("PATH"), None, "environment disabled");

    let dispatch = cfg.dispatch_options(true);
    assert_eq!(dispatch.workers, 2);
    assert_eq!(dispatch.retry_interval, Duration::from_millis(100));
    assert!(dispatch.exit_when_idle);
    Ok(())
}

#[test]
fn sections_default_when_omitted() -> TestResult {
    let (_dir, path) = write_config(
        r#"
[[workflow.only.operation]]
template = "defaults"
"#,
    );
    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.service.max_concurrent_workflows, None);
    assert!(cfg.service.include_environment);
    assert_eq!(cfg.dispatch.workers, 4);
    assert_eq!(cfg.dispatch.retry_interval_ms, 250);
    assert_eq!(cfg.max_load(), 4);
    assert!(cfg.properties.is_empty());
    assert_eq!(cfg.workflows["only"].operations[0].template, "defaults");
    Ok(())
}

#[test]
fn invalid_limits_are_rejected() {
    let msg = config_error(
        r#"
[dispatch]
workers = 0
[[workflow.a.operation]]
template = "defaults"
"#,
    );
    assert!(msg.contains("workers"));

    let msg = config_error(
        r#"
[service]
max_concurrent_workflows = 0
[[workflow.a.operation]]
template = "defaults"
"#,
    );
    assert!(msg.contains("max_concurrent_workflows"));
}

#[test]
fn workflows_must_exist_and_have_operations() {
    let msg = config_error("[service]\n");
    assert!(msg.contains("at least one"));

    let msg = config_error("[workflow.empty]\ntitle = \"Empty\"\n");
    assert!(msg.contains("empty"));

    let msg = config_error(
        r#"
[[workflow.a.operation]]
template = "  "
"#,
    );
    assert!(msg.contains("empty template"));
}

#[test]
fn unknown_exception_handler_workflow_is_rejected() {
    let msg = config_error(
        r#"
[[workflow.a.operation]]
template = "execute"
exception_handler_workflow = "missing"
"#,
    );
    assert!(msg.contains("missing"));
}

#[test]
fn cyclic_exception_handlers_only_warn() -> TestResult {
    let cfg = ConfigFileBuilder::new()
        .with_workflow(
            DefinitionBuilder::new("ping")
                .with(OperationBuilder::new("step").exception_handler("pong").build())
                .build(),
        )
        .with_workflow(
            DefinitionBuilder::new("pong")
                .with(OperationBuilder::new("step").exception_handler("ping").build())
                .build(),
        )
        .build();
    assert_eq!(cfg.workflows.len(), 2);
    Ok(())
}

#[test]
fn builder_config_matches_validation_rules() {
    let raw = ConfigFileBuilder::new().workers(0).raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(WorkflowError::ConfigError(_))
    ));
}

#[test]
fn malformed_toml_and_missing_files_are_reported() {
    let (_dir, path) = write_config("[workflow.a\n");
    assert!(matches!(load_from_path(&path), Err(WorkflowError::TomlError(_))));

    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.toml");
    assert!(matches!(load_from_path(&missing), Err(WorkflowError::IoError(_))));
}
