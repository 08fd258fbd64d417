use serde_json::json;

use bicep::EmitError;
use bicep::hir::codes;
use bicep::project::InMemoryWorkspace;

use crate::helpers::compile_helpers::{MAIN, compile_source, compile_workspace, template_from};
use crate::helpers::diagnostic_helpers::diagnostic_codes;
use crate::helpers::source_fixtures::{LOOPS_AND_CONDITIONS, PARAM_OUTPUT, STORAGE_ACCOUNT, UNRESOLVED_MODULE};

#[test]
fn test_param_output_template() {
    let result = compile_source(PARAM_OUTPUT);
    assert!(result.diagnostics.is_empty());
    let value = result.template.unwrap().to_value().unwrap();
    assert_eq!(
        value,
        json!({
            "$schema": "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#",
            "contentVersion": "1.0.0.0",
            "parameters": { "name": { "type": "string", "defaultValue": "x" } },
            "variables": {},
            "resources": [],
            "outputs": { "result": { "type": "string", "value": "[parameters('name')]" } },
        })
    );
}

#[test]
fn test_storage_account_template() {
    let template = template_from(STORAGE_ACCOUNT);
    assert_eq!(
        template.parameter("location"),
        Some(&json!({ "type": "string", "defaultValue": "westus" }))
    );
    assert_eq!(
        template.resources,
        vec![json!({
            "type": "Microsoft.Storage/storageAccounts",
            "apiVersion": "2022-09-01",
            "name": "[format('store{0}', uniqueString(resourceGroup().id))]",
            "location": "[parameters('location')]",
            "sku": { "name": "Standard_LRS" },
            "kind": "StorageV2",
        })]
    );
    assert_eq!(
        template.output("accountId"),
        Some(&json!({
            "type": "string",
            "value": "[resourceId('Microsoft.Storage/storageAccounts', format('store{0}', uniqueString(resourceGroup().id)))]",
        }))
    );
}

#[test]
fn test_unresolved_module_is_linked() {
    let result = compile_source(UNRESOLVED_MODULE);
    assert_eq!(diagnostic_codes(&result), vec![codes::MODULE_NOT_FOUND]);
    let template = result.template.unwrap();
    assert_eq!(template.resources.len(), 1);
    assert_eq!(template.resources[0]["type"], json!("Microsoft.Resources/deployments"));
    assert_eq!(
        template.resources[0]["properties"]["templateLink"],
        json!({ "uri": "./missing.bicep" })
    );
}

#[test]
fn test_unresolved_module_outputs_block_emission() {
    let result = compile_source("module m './missing.bicep' = {\n  name: 'm'\n}\noutput o string = m.outputs.x\n");
    assert_eq!(diagnostic_codes(&result), vec![codes::MODULE_NOT_FOUND, codes::UNRESOLVED_MODULE_OUTPUT]);
    assert!(result.template.is_none());
}

#[test]
fn test_module_cycle_blocks_emission() {
    let workspace = InMemoryWorkspace::new()
        .with_file(MAIN, "module b './b.bicep' = {\n  name: 'b'\n}\n")
        .with_file("file:///b.bicep", "module a './main.bicep' = {\n  name: 'a'\n}\n");
    let result = compile_workspace(&workspace, MAIN);
    assert!(diagnostic_codes(&result).contains(&codes::MODULE_CYCLE));
    assert!(result.template.is_none());
}

#[test]
fn test_explicit_depends_on_cycle_blocks_emission() {
    let source = r#"resource a 'Microsoft.Storage/storageAccounts@2022-09-01' = {
  name: 'a'
  sku: { name: 'Standard_LRS' }
  kind: 'StorageV2'
  dependsOn: [b]
}
resource b 'Microsoft.Storage/storageAccounts@2022-09-01' = {
  name: 'b'
  sku: { name: 'Standard_LRS' }
  kind: 'StorageV2'
  dependsOn: [a]
}
"#;
    let result = compile_source(source);
    assert_eq!(diagnostic_codes(&result), vec![codes::DEPENDENCY_CYCLE, codes::DEPENDENCY_CYCLE]);
    assert!(result.diagnostics.iter().all(|d| d.is_error() && d.message.contains("a -> b -> a")));
    assert!(result.diagnostics[0].message.contains("'a'"));
    assert!(result.diagnostics[1].message.contains("'b'"));
    assert!(result.template.is_none());
    assert!(matches!(bicep::emit(&result.model), Err(EmitError::Blocked(2))));
}

#[test]
fn test_loops_and_conditions() {
    let template = template_from(LOOPS_AND_CONDITIONS);
    let accounts = &template.resources[0];
    assert_eq!(accounts["condition"], json!("[parameters('deploy')]"));
    assert_eq!(
        accounts["copy"],
        json!({ "name": "accounts", "count": "[length(parameters('names'))]" })
    );
    assert_eq!(
        template.output("first").and_then(|o| o.get("value")),
        Some(&json!("[variables('upper')[0]]"))
    );
}

#[test]
fn test_nested_modules_are_emitted_recursively() {
    let workspace = InMemoryWorkspace::new()
        .with_file(
            MAIN,
            "module outer './outer.bicep' = {\n  name: 'outer'\n}\noutput v int = outer.outputs.depth\n",
        )
        .with_file(
            "file:///outer.bicep",
            "module inner './inner/inner.bicep' = {\n  name: 'inner'\n}\noutput depth int = inner.outputs.depth + 1\n",
        )
        .with_file("file:///inner/inner.bicep", "output depth int = 1\n");
    let result = compile_workspace(&workspace, MAIN);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let template = result.template.unwrap();
    let outer = &template.resources[0]["properties"]["template"];
    let inner = &outer["resources"][0]["properties"]["template"];
    assert_eq!(inner["outputs"]["depth"], json!({ "type": "int", "value": 1 }));
}

#[test]
fn test_emission_is_byte_identical_across_runs() {
    let first = template_from(STORAGE_ACCOUNT).to_json_string().unwrap();
    for _ in 0..5 {
        assert_eq!(template_from(STORAGE_ACCOUNT).to_json_string().unwrap(), first);
    }
    assert!(first.starts_with("{\n  \"$schema\""));
}
