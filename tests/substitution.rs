// tests/substitution.rs

use std::borrow::Cow;

use mediaflow::model::{SystemProperties, substitute};
use mediaflow::types::Properties;
use mediaflow_test_utils::builders::{DefinitionBuilder, MediaPackageBuilder, OperationBuilder};
use mediaflow::model::WorkflowInstance;

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn text_without_placeholders_is_returned_borrowed() {
    let text = "no placeholders here, just $ and {braces}";
    let out = substitute(text, &props(&[("x", "Y")]), &SystemProperties::empty());

    assert!(matches!(out, Cow::Borrowed(_)));
    assert_eq!(out, text);
}

#[test]
fn placeholder_is_replaced_from_properties() {
    let out = substitute("a${x}b", &props(&[("x", "Y")]), &SystemProperties::empty());
    assert_eq!(out, "aYb");
}

#[test]
fn unknown_placeholder_is_kept_literally() {
    let out = substitute("a${x}b", &Properties::new(), &SystemProperties::empty());
    assert_eq!(out, "a${x}b");
}

#[test]
fn caller_properties_win_over_system_properties() {
    let system = SystemProperties::empty()
        .with_value("x", "system")
        .with_value("y", "fallback");
    let out = substitute("${x}/${y}", &props(&[("x", "caller")]), &system);
    assert_eq!(out, "caller/fallback");
}

#[test]
fn replacement_values_are_not_substituted_again() {
    let properties = props(&[("outer", "${inner}"), ("inner", "deep")]);
    let out = substitute("[${outer}]", &properties, &SystemProperties::empty());
    assert_eq!(out, "[${inner}]");
}

#[test]
fn environment_is_consulted_only_when_enabled() {
    // PATH is set in every test environment we run in.
    let Ok(path) = std::env::var("PATH") else {
        return;
    };

    let without_env = substitute("${PATH}", &Properties::new(), &SystemProperties::empty());
    assert_eq!(without_env, "${PATH}");

    let with_env = substitute(
        "${PATH}",
        &Properties::new(),
        &SystemProperties::new(Properties::new(), true),
    );
    assert_eq!(with_env, path);
}

#[test]
fn instance_resolves_configuration_and_conditions_up_front() {
    let definition = DefinitionBuilder::new("publish")
        .with(
            OperationBuilder::new("encode")
                .config("profile", "${profile}-hd")
                .config("target", "${server.url}/media")
                .execute_if("${encode}")
                .build(),
        )
        .build();
    let system = SystemProperties::empty().with_value("server.url", "http://localhost");

    let instance = WorkflowInstance::from_definition(
        &definition,
        MediaPackageBuilder::new("mp-1").build(),
        None,
        props(&[("profile", "mp4"), ("encode", "true")]),
        &system,
    );

    let op = instance.current_operation().expect("first operation");
    assert_eq!(op.config("profile"), Some("mp4-hd"));
    assert_eq!(op.config("target"), Some("http://localhost/media"));
    assert_eq!(op.execute_condition.as_deref(), Some("true"));
    assert!(op.should_execute());
}
