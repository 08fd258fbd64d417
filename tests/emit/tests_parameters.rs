use serde_json::json;

use bicep::hir::codes;
use bicep::project::InMemoryWorkspace;

use crate::helpers::compile_helpers::{MAIN, compile_workspace};
use crate::helpers::diagnostic_helpers::diagnostic_codes;

const PARAMS: &str = "file:///main.bicepparam";

fn workspace(params: &str) -> InMemoryWorkspace {
    InMemoryWorkspace::new()
        .with_file(
            MAIN,
            "param name string\nparam replicas int = 1\noutput o string = '${name}-${replicas}'\n",
        )
        .with_file(PARAMS, params)
}

#[test]
fn test_parameters_document() {
    let result = compile_workspace(&workspace("using './main.bicep'\nparam name = 'web'\nparam replicas = 3\n"), PARAMS);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert!(result.template.is_none());
    let text = result.parameters.unwrap().to_json_string().unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value,
        json!({
            "$schema": "https://schema.management.azure.com/schemas/2019-04-01/deploymentParameters.json#",
            "contentVersion": "1.0.0.0",
            "parameters": {
                "name": { "value": "web" },
                "replicas": { "value": 3 },
            },
        })
    );
}

#[test]
fn test_missing_required_parameter() {
    let result = compile_workspace(&workspace("using './main.bicep'\nparam replicas = 3\n"), PARAMS);
    assert_eq!(diagnostic_codes(&result), vec![codes::MISSING_PARAMETER_ASSIGNMENT]);
    assert!(result.parameters.is_none());
}

#[test]
fn test_unknown_parameter_and_type_mismatch() {
    let result = compile_workspace(
        &workspace("using './main.bicep'\nparam name = 1\nparam other = 'x'\n"),
        PARAMS,
    );
    let found = diagnostic_codes(&result);
    assert!(found.contains(&codes::TYPE_MISMATCH), "{:?}", found);
    assert!(found.contains(&codes::UNKNOWN_PARAMETER_ASSIGNMENT), "{:?}", found);
}
