use bicep::config::{CompilerConfig, DiagnosticLevel};
use bicep::hir::{Severity, codes};
use bicep::project::InMemoryWorkspace;

use crate::helpers::compile_helpers::{MAIN, compile_workspace_with};

const UNUSED: &str = "param unused string\noutput o int = 1\n";

fn workspace(source: &str) -> InMemoryWorkspace {
    InMemoryWorkspace::new().with_file(MAIN, source)
}

#[test]
fn test_rule_level_from_json() {
    let config = CompilerConfig::from_json(
        r#"{ "analyzers": { "core": { "rules": { "no-unused-params": { "level": "error" } } } } }"#,
    )
    .unwrap();
    let result = compile_workspace_with(&workspace(UNUSED), MAIN, &config);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].severity, Severity::Error);
    assert!(result.template.is_none());
}

#[test]
fn test_rule_turned_off() {
    let mut config = CompilerConfig::default();
    config.set_rule_level("no-unused-params", DiagnosticLevel::Off);
    let result = compile_workspace_with(&workspace(UNUSED), MAIN, &config);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_linter_disabled() {
    let config = CompilerConfig::from_json(r#"{ "analyzers": { "core": { "enabled": false } } }"#).unwrap();
    let result = compile_workspace_with(&workspace(UNUSED), MAIN, &config);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_errors_cannot_be_downgraded() {
    let config = CompilerConfig::from_json(&format!(
        r#"{{ "diagnosticLevels": {{ "{}": "off" }} }}"#,
        codes::UNDEFINED_SYMBOL
    ))
    .unwrap();
    let result = compile_workspace_with(&workspace("output o int = missing\n"), MAIN, &config);
    assert_eq!(result.diagnostics.len(), 1);
    assert!(result.diagnostics[0].is_error());
}

#[test]
fn test_emit_options_from_json() {
    let config = CompilerConfig::from_json(
        r#"{ "emit": { "contentVersion": "3.0.0.0", "includeGeneratorMetadata": true } }"#,
    )
    .unwrap();
    let result = compile_workspace_with(&workspace("output o int = 1\n"), MAIN, &config);
    let template = result.template.unwrap();
    assert_eq!(template.content_version, "3.0.0.0");
    assert!(template.metadata.is_some());
}

#[test]
fn test_invalid_level_is_rejected() {
    assert!(CompilerConfig::from_json(r#"{ "nearDuplicateNames": "loud" }"#).is_err());
}
