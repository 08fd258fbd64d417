//! Template emission.
//!
//! Turns a checked [`SemanticModel`] into a deployment template (or, for a
//! parameters file, a deployment parameters document). Emission is a pure
//! function of the model and options: output is built in memory and
//! serialized with keys in insertion order, so repeated runs are
//! byte-identical.
//!
//! ```text
//! SemanticModel ──► blocking check ──► FileEmitter (per template file)
//!                                         │  parameters, functions,
//!                                         │  variables, resources in
//!                                         │  deployment order, outputs
//!                                         ▼
//!                                      Template ──► JSON
//! ```

mod declarations;
mod expressions;
mod params;
mod template;

use thiserror::Error;

pub use template::{DEPLOYMENT_PARAMETERS_SCHEMA, ParametersFile, Template};

use crate::base::TextRange;
use crate::config::EmitOptions;
use crate::hir::{Diagnostic, DiagnosticCategory, SemanticModel, codes};
use crate::syntax::FileKind;
use declarations::FileEmitter;

/// Why a model could not be emitted.
#[derive(Debug, Error)]
pub enum EmitError {
    /// The model has error diagnostics that prevent emission.
    #[error("emission blocked by {0} error diagnostic(s)")]
    Blocked(usize),

    #[error("the entry file is a parameters file")]
    NotATemplate,

    #[error("the entry file is not a parameters file")]
    NotAParametersFile,

    /// A parameters-file assignment does not fold to a constant.
    #[error("the value assigned to parameter '{0}' is not a compile-time constant")]
    NonConstantValue(String),

    #[error("{construct} cannot be emitted")]
    Unsupported { construct: &'static str, range: TextRange },

    /// A node needed for emission is missing from the tree.
    #[error("incomplete syntax at {0:?}")]
    Incomplete(TextRange),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Whether `diagnostic` prevents emission.
///
/// Every error does, except failures to load a referenced module: those
/// modules lower to linked deployments. A reference to such a module's
/// outputs is itself an error and still blocks.
pub fn is_blocking(model: &SemanticModel, diagnostic: &Diagnostic) -> bool {
    if !diagnostic.is_error() {
        return false;
    }
    let unloaded = diagnostic.category == DiagnosticCategory::Resolution
        && matches!(
            diagnostic.code,
            codes::MODULE_NOT_FOUND | codes::MODULE_RESTORE_PENDING | codes::MODULE_AUTH_REQUIRED
        );
    // The entry file itself failing to load has no edge
    !(unloaded && model.grouping().edge_at(diagnostic.file, diagnostic.range).is_some())
}

fn check_blocking(model: &SemanticModel) -> Result<(), EmitError> {
    let blocking = model.diagnostics().iter().filter(|d| is_blocking(model, d)).count();
    if blocking > 0 {
        return Err(EmitError::Blocked(blocking));
    }
    Ok(())
}

/// Emit the entry template with default options.
pub fn emit(model: &SemanticModel) -> Result<Template, EmitError> {
    emit_with(model, &EmitOptions::default())
}

/// Emit the entry template.
pub fn emit_with(model: &SemanticModel, options: &EmitOptions) -> Result<Template, EmitError> {
    check_blocking(model)?;
    let entry = model.entry_model().ok_or(EmitError::NotATemplate)?;
    if entry.file.kind() != FileKind::Template {
        return Err(EmitError::NotATemplate);
    }
    FileEmitter::new(model, entry, options).emit_template()
}

/// Emit the deployment parameters of an entry parameters file.
pub fn emit_parameters(model: &SemanticModel, options: &EmitOptions) -> Result<ParametersFile, EmitError> {
    check_blocking(model)?;
    let entry = model.entry_model().ok_or(EmitError::NotAParametersFile)?;
    if entry.file.kind() != FileKind::Parameters {
        return Err(EmitError::NotAParametersFile);
    }
    params::emit_parameters_file(entry, options)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::base::SourceUri;
    use crate::config::CompilerConfig;
    use crate::hir::{AnalysisContext, FunctionLibrary, ResourceTypeCatalog, default_rules};
    use crate::project::{InMemoryWorkspace, SourceFileGrouping};

    const STORAGE: &str = "'Microsoft.Storage/storageAccounts@2022-09-01'";

    fn model_of(workspace: &InMemoryWorkspace, entry: &str) -> SemanticModel {
        let grouping = SourceFileGrouping::build(
            &SourceUri::new(entry),
            workspace,
            workspace,
            &CancellationToken::new(),
        )
        .unwrap();
        let library = FunctionLibrary::builtin();
        let catalog = ResourceTypeCatalog::builtin();
        let config = CompilerConfig::default();
        let rules = default_rules();
        SemanticModel::build(
            Arc::new(grouping),
            &AnalysisContext {
                library: &library,
                resource_types: &catalog,
                config: &config,
                rules: &rules,
            },
        )
    }

    fn template(text: &str) -> Template {
        let workspace = InMemoryWorkspace::new().with_file("file:///main.bicep", text);
        let model = model_of(&workspace, "file:///main.bicep");
        emit(&model).unwrap_or_else(|e| panic!("{}: {:?}", e, model.diagnostics()))
    }

    fn storage(name: &str, extra: &str) -> String {
        format!(
            "resource {name} {STORAGE} = {{\n  name: '{name}'\n  location: 'westus'\n  sku: {{ name: 'Standard_LRS' }}\n  kind: 'StorageV2'\n{extra}}}\n"
        )
    }

    #[test]
    fn test_param_output_scenario() {
        let template = template("param name string\noutput result string = name\n");
        assert_eq!(template.parameter("name"), Some(&json!({ "type": "string" })));
        assert_eq!(
            template.output("result"),
            Some(&json!({ "type": "string", "value": "[parameters('name')]" }))
        );
        assert!(template.resources.is_empty());
        assert!(template.functions.is_empty());
    }

    #[test]
    fn test_parameter_decorators() {
        let text = "@description('the sku')\n@allowed(['a', 'b'])\nparam sku string = 'a'\n@minValue(1)\n@maxValue(5)\nparam count int = 2\n@secure()\nparam password string\noutput o string = '${sku}${count}${password}'\n";
        let template = template(text);
        assert_eq!(
            template.parameter("sku"),
            Some(&json!({
                "type": "string",
                "defaultValue": "a",
                "allowedValues": ["a", "b"],
                "metadata": { "description": "the sku" },
            }))
        );
        assert_eq!(
            template.parameter("count"),
            Some(&json!({ "type": "int", "defaultValue": 2, "minValue": 1, "maxValue": 5 }))
        );
        assert_eq!(template.parameter("password"), Some(&json!({ "type": "securestring" })));
        assert_eq!(
            template.output("o").and_then(|o| o.get("value")),
            Some(&json!("[format('{0}{1}{2}', parameters('sku'), parameters('count'), parameters('password'))]"))
        );
    }

    #[test]
    fn test_expression_lowering() {
        let text = "param a int\nparam s string\nvar x = {\n  sum: a + 1\n  neg: -3\n  flag: !(a > 2) && true\n  pick: a == 1 ? 'one' : 'other'\n  lower: toLower(s)\n  bracket: '[literal]'\n  list: [1, s]\n  ci: s =~ 'X'\n}\noutput o object = x\n";
        let template = template(text);
        assert_eq!(
            template.variable("x"),
            Some(&json!({
                "sum": "[add(parameters('a'), 1)]",
                "neg": -3,
                "flag": "[and(not(greater(parameters('a'), 2)), true())]",
                "pick": "[if(equals(parameters('a'), 1), 'one', 'other')]",
                "lower": "[toLower(parameters('s'))]",
                "bracket": "[[literal]",
                "list": [1, "[parameters('s')]"],
                "ci": "[equals(toLower(parameters('s')), toLower('X'))]",
            }))
        );
        assert_eq!(
            template.output("o"),
            Some(&json!({ "type": "object", "value": "[variables('x')]" }))
        );
    }

    #[test]
    fn test_resources_follow_dependencies() {
        let text = format!(
            "{}{}output id string = first.id\n",
            storage("second", "  properties: {\n    accessTier: first.properties.accessTier\n  }\n"),
            storage("first", ""),
        );
        let template = template(&text);
        let names: Vec<_> = template.resources.iter().map(|r| r["name"].clone()).collect();
        assert_eq!(names, vec![json!("first"), json!("second")]);

        let second = &template.resources[1];
        assert_eq!(second["type"], json!("Microsoft.Storage/storageAccounts"));
        assert_eq!(second["apiVersion"], json!("2022-09-01"));
        assert_eq!(
            second["properties"]["accessTier"],
            json!("[reference(resourceId('Microsoft.Storage/storageAccounts', 'first'), '2022-09-01').accessTier]")
        );
        assert_eq!(
            second["dependsOn"],
            json!(["[resourceId('Microsoft.Storage/storageAccounts', 'first')]"])
        );
        assert_eq!(
            template.output("id").and_then(|o| o.get("value")),
            Some(&json!("[resourceId('Microsoft.Storage/storageAccounts', 'first')]"))
        );
    }

    #[test]
    fn test_runtime_variables_are_inlined() {
        let text = format!(
            "{}var endpoint = account.properties.primaryEndpoints\nvar plain = 'x'\noutput e object = endpoint\noutput p string = plain\n",
            storage("account", ""),
        );
        let template = template(&text);
        assert_eq!(template.variable("endpoint"), None);
        assert_eq!(template.variable("plain"), Some(&json!("x")));
        assert_eq!(
            template.output("e").and_then(|o| o.get("value")),
            Some(&json!(
                "[reference(resourceId('Microsoft.Storage/storageAccounts', 'account'), '2022-09-01').primaryEndpoints]"
            ))
        );
    }

    #[test]
    fn test_resource_loop_and_condition() {
        let text = format!(
            "param names array\nparam deploy bool\n@batchSize(2)\nresource accounts {STORAGE} = [for (n, i) in names: {{\n  name: '${{n}}${{i}}'\n  sku: {{ name: 'Standard_LRS' }}\n  kind: 'StorageV2'\n}}]\nresource maybe {STORAGE} = if (deploy) {{\n  name: 'maybe'\n  sku: {{ name: 'Standard_LRS' }}\n  kind: 'StorageV2'\n  dependsOn: [accounts]\n}}\n"
        );
        let template = template(&text);
        let accounts = &template.resources[0];
        assert_eq!(
            accounts["copy"],
            json!({
                "name": "accounts",
                "count": "[length(parameters('names'))]",
                "mode": "serial",
                "batchSize": 2,
            })
        );
        assert_eq!(
            accounts["name"],
            json!("[format('{0}{1}', parameters('names')[copyIndex()], copyIndex())]")
        );
        let maybe = &template.resources[1];
        assert_eq!(maybe["condition"], json!("[parameters('deploy')]"));
        assert_eq!(maybe["dependsOn"], json!(["accounts"]));
        assert!(maybe.get("copy").is_none());
    }

    #[test]
    fn test_variable_and_output_loops() {
        let text = "param items array\nvar names = [for item in items: toUpper(item)]\noutput lengths array = [for (item, i) in items: i]\noutput n array = names\n";
        let template = template(text);
        assert_eq!(
            template.variable("copy"),
            Some(&json!([{
                "name": "names",
                "count": "[length(parameters('items'))]",
                "input": "[toUpper(parameters('items')[copyIndex('names')])]",
            }]))
        );
        assert_eq!(
            template.output("lengths"),
            Some(&json!({
                "type": "array",
                "copy": { "count": "[length(parameters('items'))]", "input": "[copyIndex()]" },
            }))
        );
    }

    #[test]
    fn test_user_functions() {
        let text = "func greet(name string) string => 'Hi ${name}'\noutput o string = greet('you')\n";
        let template = template(text);
        assert_eq!(
            template.functions,
            vec![json!({
                "namespace": "__bicep",
                "members": {
                    "greet": {
                        "parameters": [{ "type": "string", "name": "name" }],
                        "output": { "type": "string", "value": "[format('Hi {0}', parameters('name'))]" },
                    }
                }
            })]
        );
        assert_eq!(
            template.output("o").and_then(|o| o.get("value")),
            Some(&json!("[__bicep.greet('you')]"))
        );
        let text = template.to_json_string().unwrap();
        assert!(text.find("\"functions\"").unwrap() < text.find("\"variables\"").unwrap());
    }

    #[test]
    fn test_nested_module_template() {
        let workspace = InMemoryWorkspace::new()
            .with_file(
                "file:///main.bicep",
                "param prefix string\nmodule child './child.bicep' = {\n  name: 'child'\n  params: { prefix: prefix }\n}\noutput v string = child.outputs.value\n",
            )
            .with_file(
                "file:///child.bicep",
                "param prefix string\noutput value string = '${prefix}-v'\n",
            );
        let model = model_of(&workspace, "file:///main.bicep");
        let template = emit(&model).unwrap();
        let module = &template.resources[0];
        assert_eq!(module["type"], json!("Microsoft.Resources/deployments"));
        assert_eq!(module["name"], json!("child"));
        assert_eq!(
            module["properties"]["parameters"],
            json!({ "prefix": { "value": "[parameters('prefix')]" } })
        );
        assert_eq!(
            module["properties"]["template"]["outputs"]["value"]["value"],
            json!("[format('{0}-v', parameters('prefix'))]")
        );
        assert_eq!(
            template.output("v").and_then(|o| o.get("value")),
            Some(&json!(
                "[reference(resourceId('Microsoft.Resources/deployments', 'child'), '2022-09-01').outputs.value.value]"
            ))
        );
    }

    #[test]
    fn test_unresolved_module_scenario() {
        let workspace = InMemoryWorkspace::new().with_file(
            "file:///main.bicep",
            "module m './missing.bicep' = {\n  name: 'm'\n}\n",
        );
        let model = model_of(&workspace, "file:///main.bicep");
        assert!(model.has_errors());
        let template = emit(&model).unwrap();
        assert_eq!(
            template.resources[0]["properties"]["templateLink"],
            json!({ "uri": "./missing.bicep" })
        );

        let workspace = workspace.with_file(
            "file:///main.bicep",
            "module m './missing.bicep' = {\n  name: 'm'\n}\noutput o string = m.outputs.x\n",
        );
        let model = model_of(&workspace, "file:///main.bicep");
        assert!(matches!(emit(&model), Err(EmitError::Blocked(1))));
    }

    #[test]
    fn test_errors_block_emission() {
        let workspace = InMemoryWorkspace::new().with_file("file:///main.bicep", "output o int = 'x'\n");
        let model = model_of(&workspace, "file:///main.bicep");
        assert!(matches!(emit(&model), Err(EmitError::Blocked(1))));

        let workspace = InMemoryWorkspace::new();
        let model = model_of(&workspace, "file:///absent.bicep");
        assert!(matches!(emit(&model), Err(EmitError::Blocked(_))));
    }

    #[test]
    fn test_target_scope_and_metadata() {
        let workspace = InMemoryWorkspace::new()
            .with_file("file:///main.bicep", "targetScope = 'subscription'\noutput o int = 1\n");
        let model = model_of(&workspace, "file:///main.bicep");
        let options = EmitOptions {
            content_version: "2.0.0.0".to_string(),
            include_generator_metadata: true,
        };
        let template = emit_with(&model, &options).unwrap();
        assert_eq!(
            template.schema,
            "https://schema.management.azure.com/schemas/2018-05-01/subscriptionDeploymentTemplate.json#"
        );
        assert_eq!(template.content_version, "2.0.0.0");
        assert_eq!(
            template.metadata.as_ref().and_then(|m| m["_generator"].get("name")),
            Some(&json!("bicep-core"))
        );
    }

    #[test]
    fn test_parameters_file() {
        let workspace = InMemoryWorkspace::new()
            .with_file(
                "file:///main.bicep",
                "param name string\nparam count int\nparam tags object\noutput o string = '${name}${count}${tags.a}'\n",
            )
            .with_file(
                "file:///main.bicepparam",
                "using './main.bicep'\nvar prefix = 'app'\nparam name = '${prefix}-web'\nparam count = -2\nparam tags = { a: 'x' }\n",
            );
        let model = model_of(&workspace, "file:///main.bicepparam");
        assert!(matches!(emit(&model), Err(EmitError::NotATemplate)));

        let parameters = emit_parameters(&model, &EmitOptions::default()).unwrap();
        assert_eq!(parameters.schema, DEPLOYMENT_PARAMETERS_SCHEMA);
        assert_eq!(parameters.value("name"), Some(&json!("app-web")));
        assert_eq!(parameters.value("count"), Some(&json!(-2)));
        assert_eq!(parameters.value("tags"), Some(&json!({ "a": "x" })));

        let template_model = model_of(&workspace, "file:///main.bicep");
        assert!(matches!(
            emit_parameters(&template_model, &EmitOptions::default()),
            Err(EmitError::NotAParametersFile)
        ));
    }

    #[test]
    fn test_non_constant_parameter_value() {
        let workspace = InMemoryWorkspace::new()
            .with_file("file:///main.bicep", "param name string\noutput o string = name\n")
            .with_file("file:///main.bicepparam", "using './main.bicep'\nparam name = toUpper('x')\n");
        let model = model_of(&workspace, "file:///main.bicepparam");
        assert!(matches!(
            emit_parameters(&model, &EmitOptions::default()),
            Err(EmitError::NonConstantValue(name)) if name == "name"
        ));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let text = format!(
            "param p string = 'x'\nvar v = {{ b: 1, a: p }}\n{}output o object = v\n",
            storage("s", "  tags: { z: 'z', a: p }\n"),
        );
        let first = template(&text).to_json_string().unwrap();
        let second = template(&text).to_json_string().unwrap();
        assert_eq!(first, second);
        assert!(first.find("\"b\"").unwrap() < first.find("\"a\"").unwrap());
    }
}
