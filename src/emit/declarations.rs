//! Declaration emission for one template file.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value, json};
use smol_str::SmolStr;
use tracing::trace;

use super::EmitError;
use super::expressions::{expression, part, quote};
use super::template::Template;
use crate::base::FileId;
use crate::config::EmitOptions;
use crate::hir::{FileModel, ResourceTypeReference, SemanticModel, SymbolId, SymbolKind, Type};
use crate::parser::{
    AstNode, Decorator, Expr, ForExpr, FuncDecl, ObjectExpr, OutputDecl, ParamDecl, Statement,
    VarDecl,
};

pub(super) const DEPLOYMENTS_TYPE: &str = "Microsoft.Resources/deployments";
pub(super) const DEPLOYMENTS_API_VERSION: &str = "2022-09-01";

/// Properties of a resource body that are not part of the resource payload
const NON_PAYLOAD_PROPERTIES: &[&str] = &["dependsOn", "parent", "scope"];

#[derive(Debug, Clone)]
pub(super) enum DeploymentKind {
    Resource { type_name: SmolStr, api_version: SmolStr },
    Module { target: Option<FileId>, path: String },
}

/// A resource or module declaration, split into its parts
#[derive(Debug, Clone)]
pub(super) struct Deployment {
    pub(super) kind: DeploymentKind,
    pub(super) loop_expr: Option<ForExpr>,
    pub(super) condition: Option<Expr>,
    pub(super) body: Option<ObjectExpr>,
    pub(super) decorators: Vec<Decorator>,
}

impl Deployment {
    pub(super) fn property(&self, name: &str) -> Option<Expr> {
        self.body.as_ref()?.property(name)?.value()
    }

    fn split(kind: DeploymentKind, body: Option<Expr>, decorators: Vec<Decorator>) -> Self {
        let mut deployment = Deployment {
            kind,
            loop_expr: None,
            condition: None,
            body: None,
            decorators,
        };
        let mut body = body;
        if let Some(Expr::For(loop_expr)) = &body {
            let inner = loop_expr.body();
            deployment.loop_expr = Some(loop_expr.clone());
            body = inner;
        }
        match body {
            Some(Expr::If(if_body)) => {
                deployment.condition = if_body.condition();
                deployment.body = if_body.body();
            }
            Some(Expr::Object(object)) => deployment.body = Some(object),
            _ => {}
        }
        deployment
    }
}

/// Variables of a loop currently being emitted
#[derive(Debug, Clone)]
pub(super) struct LoopBinding {
    pub(super) item: Option<SymbolId>,
    pub(super) index: Option<SymbolId>,
    pub(super) item_expr: String,
    pub(super) index_expr: String,
}

/// Emission state for one template file
pub(super) struct FileEmitter<'a> {
    pub(super) model: &'a SemanticModel,
    pub(super) file: &'a FileModel,
    pub(super) options: &'a EmitOptions,
    pub(super) deployments: FxHashMap<SymbolId, Deployment>,
    /// Variables whose values need the deployment runtime; their uses are
    /// replaced by the value itself
    pub(super) inlined: FxHashMap<SymbolId, Expr>,
    pub(super) loops: Vec<LoopBinding>,
}

impl<'a> FileEmitter<'a> {
    pub(super) fn new(model: &'a SemanticModel, file: &'a FileModel, options: &'a EmitOptions) -> Self {
        let mut emitter = FileEmitter {
            model,
            file,
            options,
            deployments: FxHashMap::default(),
            inlined: FxHashMap::default(),
            loops: Vec::new(),
        };
        emitter.collect_declarations();
        emitter
    }

    fn statements(&self) -> Vec<(SymbolId, Statement)> {
        let Some(source_file) = self.file.file.source_file() else {
            return Vec::new();
        };
        source_file
            .statements()
            .filter_map(|statement| {
                let id = self.file.symbols.declaration_at(statement.syntax().text_range())?;
                Some((id, statement))
            })
            .collect()
    }

    fn collect_declarations(&mut self) {
        let file = self.file;
        let table = &file.symbols;
        let mut variables = Vec::new();
        for (id, statement) in self.statements() {
            match statement {
                Statement::Resource(resource) => {
                    let reference = resource
                        .type_string()
                        .and_then(|s| s.literal_value())
                        .and_then(|raw| ResourceTypeReference::parse(&raw));
                    let Some(reference) = reference else {
                        continue;
                    };
                    let kind = DeploymentKind::Resource {
                        type_name: reference.type_name,
                        api_version: reference.api_version,
                    };
                    let deployment = Deployment::split(kind, resource.body(), resource.decorators().collect());
                    self.deployments.insert(id, deployment);
                }
                Statement::Module(module) => {
                    let kind = DeploymentKind::Module {
                        target: table.module_status(id).and_then(|status| status.resolved()),
                        path: module.path().and_then(|p| p.literal_value()).unwrap_or_default(),
                    };
                    let deployment = Deployment::split(kind, module.body(), module.decorators().collect());
                    self.deployments.insert(id, deployment);
                }
                Statement::Var(var) => variables.push((id, var)),
                _ => {}
            }
        }

        // A variable needs the runtime when it reaches a resource or module,
        // directly or through other such variables.
        let graph = &file.dependencies;
        let mut runtime: FxHashSet<SymbolId> = FxHashSet::default();
        let mut changed = true;
        while changed {
            changed = false;
            for (id, _) in &variables {
                if runtime.contains(id) {
                    continue;
                }
                let needs_runtime = graph.dependencies(*id).iter().any(|dep| {
                    matches!(table.symbol(*dep).kind, SymbolKind::Resource | SymbolKind::Module)
                        || runtime.contains(dep)
                });
                if needs_runtime {
                    runtime.insert(*id);
                    changed = true;
                }
            }
        }
        for (id, var) in variables {
            let value = var.value();
            let is_loop = matches!(value, Some(Expr::For(_)));
            if let (true, false, Some(value)) = (runtime.contains(&id), is_loop, value) {
                trace!("Inlining variable {}", table.symbol(id).name);
                self.inlined.insert(id, value);
            }
        }
    }

    pub(super) fn deployment(&self, id: SymbolId) -> Result<&Deployment, EmitError> {
        self.deployments
            .get(&id)
            .ok_or(EmitError::Incomplete(self.file.symbols.symbol(id).declaration_range))
    }

    // ------------------------------------------------------------------------
    // Template
    // ------------------------------------------------------------------------

    pub(super) fn emit_template(&mut self) -> Result<Template, EmitError> {
        let mut template = Template::new(self.file.target_scope().schema(), &self.options.content_version);
        if self.options.include_generator_metadata {
            template.metadata = Some(json!({
                "_generator": {
                    "name": env!("CARGO_PKG_NAME"),
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }));
        }

        let mut functions = Map::new();
        let mut variable_copies = Vec::new();
        let mut variables = Map::new();
        for (id, statement) in self.statements() {
            let name = self.file.symbols.symbol(id).name.to_string();
            match statement {
                Statement::Param(param) => {
                    let value = self.emit_parameter(id, &param)?;
                    template.parameters.insert(name, value);
                }
                Statement::Var(var) => {
                    if self.inlined.contains_key(&id) {
                        continue;
                    }
                    match self.emit_variable(&name, &var)? {
                        VariableValue::Plain(value) => {
                            variables.insert(name, value);
                        }
                        VariableValue::Copy(copy) => variable_copies.push(copy),
                    }
                }
                Statement::Output(output) => {
                    let value = self.emit_output(id, &output)?;
                    template.outputs.insert(name, value);
                }
                Statement::Func(func) => {
                    let value = self.emit_function(id, &func)?;
                    functions.insert(name, value);
                }
                _ => {}
            }
        }

        if !variable_copies.is_empty() {
            template.variables.insert("copy".to_string(), Value::Array(variable_copies));
        }
        template.variables.extend(variables);

        if !functions.is_empty() {
            template.functions.push(json!({
                "namespace": "__bicep",
                "members": functions,
            }));
        }

        for id in self.file.dependencies.deployment_order() {
            let resource = self.emit_deployment(id)?;
            template.resources.push(resource);
        }
        Ok(template)
    }

    fn decorator(decorators: &[Decorator], name: &str) -> Option<Decorator> {
        decorators.iter().find(|d| d.name().as_deref() == Some(name)).cloned()
    }

    fn decorator_arg(&mut self, decorators: &[Decorator], name: &str) -> Result<Option<Value>, EmitError> {
        match Self::decorator(decorators, name).and_then(|d| d.args().into_iter().next()) {
            Some(arg) => Ok(Some(self.lower_value(&arg)?)),
            None => Ok(None),
        }
    }

    /// `type` for a parameter or output of type `ty`
    fn type_name(ty: &Type, secure: bool) -> &'static str {
        match (ty.template_type_name(), secure) {
            ("string", true) => "securestring",
            ("object", true) => "secureObject",
            (name, _) => name,
        }
    }

    /// `metadata` from `@description` and `@metadata`
    fn metadata(&mut self, decorators: &[Decorator]) -> Result<Option<Value>, EmitError> {
        let mut metadata = match self.decorator_arg(decorators, "metadata")? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        if let Some(description) = self.decorator_arg(decorators, "description")? {
            metadata.insert("description".to_string(), description);
        }
        Ok((!metadata.is_empty()).then_some(Value::Object(metadata)))
    }

    fn emit_parameter(&mut self, id: SymbolId, param: &ParamDecl) -> Result<Value, EmitError> {
        let decorators: Vec<Decorator> = param.decorators().collect();
        let secure = Self::decorator(&decorators, "secure").is_some();
        let mut value = Map::new();
        value.insert("type".to_string(), json!(Self::type_name(self.file.symbol_type(id), secure)));
        if let Some(default) = param.default_value() {
            value.insert("defaultValue".to_string(), self.lower_value(&default)?);
        }
        for (decorator, key) in [
            ("allowed", "allowedValues"),
            ("minValue", "minValue"),
            ("maxValue", "maxValue"),
            ("minLength", "minLength"),
            ("maxLength", "maxLength"),
        ] {
            if let Some(arg) = self.decorator_arg(&decorators, decorator)? {
                value.insert(key.to_string(), arg);
            }
        }
        if let Some(metadata) = self.metadata(&decorators)? {
            value.insert("metadata".to_string(), metadata);
        }
        Ok(Value::Object(value))
    }

    fn emit_variable(&mut self, name: &str, var: &VarDecl) -> Result<VariableValue, EmitError> {
        let loop_expr = match part(var.value(), var.syntax())? {
            Expr::For(loop_expr) => loop_expr,
            value => return Ok(VariableValue::Plain(self.lower_value(&value)?)),
        };
        let (count, input) = self.emit_loop(&loop_expr, format!("copyIndex({})", quote(name)))?;
        Ok(VariableValue::Copy(json!({
            "name": name,
            "count": count,
            "input": input,
        })))
    }

    /// `count` and per-element value of a value loop, with `index` as the
    /// iteration index expression
    fn emit_loop(&mut self, loop_expr: &ForExpr, index: String) -> Result<(Value, Value), EmitError> {
        let iterable = self.lower_expr(&part(loop_expr.iterable(), loop_expr.syntax())?)?;
        let body = part(loop_expr.body(), loop_expr.syntax())?;
        let count = expression(&format!("length({})", iterable));
        let item = format!("{}[{}]", iterable, index);
        let input = self.with_loop(loop_expr, item, index, |this| this.lower_value(&body))?;
        Ok((count, input))
    }

    fn emit_output(&mut self, id: SymbolId, output: &OutputDecl) -> Result<Value, EmitError> {
        let decorators: Vec<Decorator> = output.decorators().collect();
        let secure = Self::decorator(&decorators, "secure").is_some();
        let value = part(output.value(), output.syntax())?;
        let mut result = Map::new();
        match value {
            Expr::For(loop_expr) => {
                let (count, input) = self.emit_loop(&loop_expr, "copyIndex()".to_string())?;
                result.insert("type".to_string(), json!("array"));
                result.insert("copy".to_string(), json!({ "count": count, "input": input }));
            }
            value => {
                let ty = self.file.symbol_type(id);
                result.insert("type".to_string(), json!(Self::type_name(ty, secure)));
                result.insert("value".to_string(), self.lower_value(&value)?);
            }
        }
        if let Some(metadata) = self.metadata(&decorators)? {
            result.insert("metadata".to_string(), metadata);
        }
        Ok(Value::Object(result))
    }

    fn emit_function(&mut self, id: SymbolId, func: &FuncDecl) -> Result<Value, EmitError> {
        let file = self.file;
        let Type::Function(function) = file.symbol_type(id) else {
            return Err(EmitError::Incomplete(func.syntax().text_range()));
        };
        let signature = part(function.overloads.first(), func.syntax())?;
        let mut parameters = Vec::new();
        for (param, ty) in func.params().zip(&signature.params) {
            let name = part(param.name().and_then(|n| n.text()), param.syntax())?;
            parameters.push(json!({ "type": ty.template_type_name(), "name": name.as_str() }));
        }
        let body = part(func.body(), func.syntax())?;
        let value = self.lower_value(&body)?;
        let mut member = Map::new();
        member.insert("parameters".to_string(), Value::Array(parameters));
        member.insert(
            "output".to_string(),
            json!({ "type": signature.returns.template_type_name(), "value": value }),
        );
        if let Some(metadata) = self.metadata(&func.decorators().collect::<Vec<_>>())? {
            member.insert("metadata".to_string(), metadata);
        }
        Ok(Value::Object(member))
    }

    // ------------------------------------------------------------------------
    // Resources and modules
    // ------------------------------------------------------------------------

    fn emit_deployment(&mut self, id: SymbolId) -> Result<Value, EmitError> {
        let deployment = self.deployment(id)?.clone();
        let name = self.file.symbols.symbol(id).name.clone();
        let mut result = Map::new();

        if let Some(loop_expr) = &deployment.loop_expr {
            let iterable = self.lower_expr(&part(loop_expr.iterable(), loop_expr.syntax())?)?;
            let mut copy = Map::new();
            copy.insert("name".to_string(), json!(name.as_str()));
            copy.insert("count".to_string(), expression(&format!("length({})", iterable)));
            if let Some(batch_size) = self.decorator_arg(&deployment.decorators, "batchSize")? {
                copy.insert("mode".to_string(), json!("serial"));
                copy.insert("batchSize".to_string(), batch_size);
            }
            result.insert("copy".to_string(), Value::Object(copy));

            let item = format!("{}[copyIndex()]", iterable);
            let body = self.with_loop(loop_expr, item, "copyIndex()".to_string(), |this| {
                this.emit_deployment_body(id, &deployment)
            })?;
            result.extend(body);
        } else {
            result.extend(self.emit_deployment_body(id, &deployment)?);
        }

        let depends_on = self
            .file
            .dependencies
            .deployment_dependencies(id)
            .into_iter()
            .map(|dep| self.dependency_entry(dep))
            .collect::<Result<Vec<_>, _>>()?;
        if !depends_on.is_empty() {
            result.insert("dependsOn".to_string(), Value::Array(depends_on));
        }
        trace!("Emitted {}", name);
        Ok(Value::Object(result))
    }

    /// `condition`, `type`, `apiVersion` and payload of one deployment
    fn emit_deployment_body(&mut self, id: SymbolId, deployment: &Deployment) -> Result<Map<String, Value>, EmitError> {
        let mut result = Map::new();
        if let Some(condition) = &deployment.condition {
            result.insert("condition".to_string(), self.lower_value(condition)?);
        }
        match &deployment.kind {
            DeploymentKind::Resource { type_name, api_version } => {
                result.insert("type".to_string(), json!(type_name.as_str()));
                result.insert("apiVersion".to_string(), json!(api_version.as_str()));
                let Some(body) = &deployment.body else {
                    return Ok(result);
                };
                for property in body.properties() {
                    let key = part(property.key().and_then(|k| k.text()), property.syntax())?;
                    if NON_PAYLOAD_PROPERTIES.contains(&key.as_str()) {
                        continue;
                    }
                    let value = part(property.value(), property.syntax())?;
                    result.insert(key, self.lower_value(&value)?);
                }
            }
            DeploymentKind::Module { target, path } => {
                result.insert("type".to_string(), json!(DEPLOYMENTS_TYPE));
                result.insert("apiVersion".to_string(), json!(DEPLOYMENTS_API_VERSION));
                let name = match deployment.property("name") {
                    Some(name) => self.lower_value(&name)?,
                    None => json!(self.file.symbols.symbol(id).name.as_str()),
                };
                result.insert("name".to_string(), name);

                let mut parameters = Map::new();
                if let Some(params) = deployment.property("params") {
                    let Expr::Object(params) = params else {
                        return Err(EmitError::Unsupported {
                            construct: "module parameters that are not an object literal",
                            range: params.syntax().text_range(),
                        });
                    };
                    for property in params.properties() {
                        let key = part(property.key().and_then(|k| k.text()), property.syntax())?;
                        let value = part(property.value(), property.syntax())?;
                        parameters.insert(key, json!({ "value": self.lower_value(&value)? }));
                    }
                }

                let mut properties = Map::new();
                properties.insert("expressionEvaluationOptions".to_string(), json!({ "scope": "inner" }));
                properties.insert("mode".to_string(), json!("Incremental"));
                properties.insert("parameters".to_string(), Value::Object(parameters));
                match target.and_then(|file| self.model.file(file)) {
                    Some(module_file) => {
                        let nested = FileEmitter::new(self.model, module_file, self.options).emit_template()?;
                        properties.insert("template".to_string(), nested.to_value()?);
                    }
                    None => {
                        properties.insert("templateLink".to_string(), json!({ "uri": path }));
                    }
                }
                result.insert("properties".to_string(), Value::Object(properties));
            }
        }
        Ok(result)
    }

    /// A `dependsOn` entry: the copy name for loops, the resource id otherwise
    fn dependency_entry(&mut self, dep: SymbolId) -> Result<Value, EmitError> {
        if self.deployment(dep)?.loop_expr.is_some() {
            return Ok(json!(self.file.symbols.symbol(dep).name.as_str()));
        }
        Ok(expression(&self.deployment_id(dep)?))
    }
}

enum VariableValue {
    Plain(Value),
    /// An entry of the variables `copy` array
    Copy(Value),
}
