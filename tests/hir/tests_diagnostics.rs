use bicep::hir::{DiagnosticCategory, codes};

use crate::helpers::diagnostic_helpers::{assert_no_errors, codes_from, errors_from};
use crate::helpers::source_fixtures::{LOOPS_AND_CONDITIONS, PARAM_OUTPUT, STORAGE_ACCOUNT};

#[test]
fn test_fixtures_have_no_errors() {
    assert_no_errors(PARAM_OUTPUT);
    assert_no_errors(STORAGE_ACCOUNT);
    assert_no_errors(LOOPS_AND_CONDITIONS);
}

#[test]
fn test_undefined_and_duplicate_symbols() {
    assert_eq!(codes_from("output o int = missing\n"), vec![codes::UNDEFINED_SYMBOL]);
    let duplicate = codes_from("var a = 1\nvar a = 2\noutput o int = a\n");
    assert!(duplicate.contains(&codes::DUPLICATE_SYMBOL), "{:?}", duplicate);
}

#[test]
fn test_output_type_mismatch() {
    let errors = errors_from("param n int\noutput o string = n\n");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, codes::TYPE_MISMATCH);
}

#[test]
fn test_dependency_cycle_between_resources() {
    let source = r#"resource a 'Microsoft.Storage/storageAccounts@2022-09-01' = {
  name: b.name
  sku: { name: 'Standard_LRS' }
  kind: 'StorageV2'
}
resource b 'Microsoft.Storage/storageAccounts@2022-09-01' = {
  name: a.name
  sku: { name: 'Standard_LRS' }
  kind: 'StorageV2'
}
"#;
    let errors = errors_from(source);
    assert!(errors.iter().any(|d| d.code == codes::DEPENDENCY_CYCLE), "{:?}", errors);
}

#[test]
fn test_syntax_errors_do_not_stop_analysis() {
    let result = crate::helpers::compile_helpers::compile_source("param a string =\noutput o int = missing\n");
    assert!(result.diagnostics.iter().any(|d| d.category == DiagnosticCategory::Syntactic));
    assert!(result.diagnostics.iter().any(|d| d.code == codes::UNDEFINED_SYMBOL));
    assert!(result.template.is_none());
}

#[test]
fn test_diagnostics_are_sorted_by_position() {
    let result = crate::helpers::compile_helpers::compile_source(
        "output a int = x\noutput b int = y\noutput c string = 1\n",
    );
    let starts: Vec<_> = result.diagnostics.iter().map(|d| d.range.start()).collect();
    let mut sorted = starts.clone();
    sorted.sort();
    assert_eq!(starts, sorted);
    assert_eq!(starts.len(), 3);
}

#[test]
fn test_unused_declarations_are_warnings() {
    let result = crate::helpers::compile_helpers::compile_source("param unused string\nvar alsoUnused = 1\n");
    assert!(!result.has_errors());
    let codes: Vec<_> = result.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["no-unused-params", "no-unused-vars"]);
    assert!(result.template.is_some());
}
