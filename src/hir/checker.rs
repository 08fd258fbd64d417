//! Type checker.
//!
//! Bidirectional: declared types flow down into values as expected types and
//! inferred types flow up. Declaration types are computed lazily so that a
//! declaration may reference one declared later in the file; a reference
//! cycle between declarations types as `any` here and is reported by the
//! dependency analysis.
//!
//! Every inferred expression type is recorded, keyed by the node's range and
//! kind, for later queries and for the emitter.

use std::sync::Arc;

use rowan::NodeOrToken;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::binder::{CallTarget, SymbolId, SymbolKind, SymbolTable};
use super::diagnostics::{Diagnostic, DiagnosticCategory, codes};
use super::functions::{DecoratorTarget, FunctionLibrary, OverloadError, resolve_overload};
use super::resource_types::{ResourceTypeProvider, ResourceTypeReference, standard_envelope};
use super::types::{
    FunctionType, LiteralValue, ModuleInterface, ModuleType, ObjectType, PropertyType, ResourceType,
    Signature, Type, is_assignable,
};
use crate::base::{FileId, TextRange};
use crate::parser::{
    AstNode, BinaryExpr, BinaryOp, Decorator, Expr, ForExpr, LiteralTypeValue, LiteralValue as AstLiteral,
    ObjectExpr, ObjectTypeProperty, ParamDecl, ResourceDecl, Statement, StringSegment, SyntaxKind,
    SyntaxNode, TargetScopeDecl, TypeExpr, UnaryOp,
};
use crate::project::ResolutionStatus;
use crate::syntax::{FileKind, SyntaxFile};

// ============================================================================
// TARGET SCOPE
// ============================================================================

/// Deployment scope a template targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetScope {
    #[default]
    ResourceGroup,
    Subscription,
    ManagementGroup,
    Tenant,
}

impl TargetScope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "resourceGroup" => Some(TargetScope::ResourceGroup),
            "subscription" => Some(TargetScope::Subscription),
            "managementGroup" => Some(TargetScope::ManagementGroup),
            "tenant" => Some(TargetScope::Tenant),
            _ => None,
        }
    }

    /// `$schema` of templates deployed at this scope
    pub fn schema(self) -> &'static str {
        match self {
            TargetScope::ResourceGroup => {
                "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#"
            }
            TargetScope::Subscription => {
                "https://schema.management.azure.com/schemas/2018-05-01/subscriptionDeploymentTemplate.json#"
            }
            TargetScope::ManagementGroup => {
                "https://schema.management.azure.com/schemas/2019-08-01/managementGroupDeploymentTemplate.json#"
            }
            TargetScope::Tenant => {
                "https://schema.management.azure.com/schemas/2019-08-01/tenantDeploymentTemplate.json#"
            }
        }
    }
}

// ============================================================================
// RESULT
// ============================================================================

/// Capabilities the checker consults.
#[derive(Clone, Copy)]
pub struct CheckContext<'a> {
    pub library: &'a FunctionLibrary,
    pub resource_types: &'a dyn ResourceTypeProvider,
    /// Interfaces of already-checked files
    pub interfaces: &'a FxHashMap<FileId, ModuleInterface>,
}

/// Types and diagnostics of one checked file.
#[derive(Debug, Clone)]
pub struct CheckedFile {
    symbol_types: Vec<Type>,
    expr_types: FxHashMap<(TextRange, SyntaxKind), Type>,
    interface: ModuleInterface,
    target_scope: TargetScope,
    diagnostics: Vec<Diagnostic>,
}

impl CheckedFile {
    pub fn symbol_type(&self, id: SymbolId) -> &Type {
        &self.symbol_types[id.index()]
    }

    /// Type of the expression node with this range and kind
    pub fn expr_type(&self, range: TextRange, kind: SyntaxKind) -> Option<&Type> {
        self.expr_types.get(&(range, kind))
    }

    /// Parameters and outputs as seen by files referencing this one
    pub fn interface(&self) -> &ModuleInterface {
        &self.interface
    }

    pub fn target_scope(&self) -> TargetScope {
        self.target_scope
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Type-check one bound file.
pub fn check_file(file: &SyntaxFile, table: &SymbolTable, ctx: CheckContext<'_>) -> CheckedFile {
    let root = file.parse().syntax();
    let mut checker = Checker::new(table, ctx, root);
    checker.run();

    let interface = checker.build_interface();
    let symbol_types = checker
        .symbol_types
        .into_iter()
        .map(|ty| ty.unwrap_or(Type::Any))
        .collect();
    CheckedFile {
        symbol_types,
        expr_types: checker.expr_types,
        interface,
        target_scope: checker.target_scope,
        diagnostics: checker.diagnostics,
    }
}

// ============================================================================
// CHECKER
// ============================================================================

struct Checker<'a> {
    table: &'a SymbolTable,
    ctx: CheckContext<'a>,
    root: SyntaxNode,
    declarations: FxHashMap<SymbolId, Statement>,
    symbol_types: Vec<Option<Type>>,
    in_progress: Vec<bool>,
    expr_types: FxHashMap<(TextRange, SyntaxKind), Type>,
    target_scope: TargetScope,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Checker<'a> {
    fn new(table: &'a SymbolTable, ctx: CheckContext<'a>, root: SyntaxNode) -> Self {
        let mut declarations = FxHashMap::default();
        for &id in table.declarations() {
            let range = table.symbol(id).declaration_range;
            if let Some(statement) = node_at(&root, range).and_then(|n| n.ancestors().find_map(Statement::cast))
            {
                declarations.insert(id, statement);
            }
        }
        Self {
            table,
            ctx,
            root,
            declarations,
            symbol_types: vec![None; table.len()],
            in_progress: vec![false; table.len()],
            expr_types: FxHashMap::default(),
            target_scope: TargetScope::default(),
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, code: &'static str, range: TextRange, message: String) {
        self.diagnostics.push(Diagnostic::error(
            DiagnosticCategory::Type,
            code,
            self.table.file(),
            range,
            message,
        ));
    }

    fn warning(&mut self, code: &'static str, range: TextRange, message: String) {
        self.diagnostics.push(Diagnostic::warning(
            DiagnosticCategory::Type,
            code,
            self.table.file(),
            range,
            message,
        ));
    }

    fn mismatch(&mut self, range: TextRange, expected: &Type, actual: &Type) {
        self.error(
            codes::TYPE_MISMATCH,
            range,
            format!(
                "expected a value of type '{}' but the provided value is of type '{}'",
                expected, actual
            ),
        );
    }

    fn record(&mut self, expr: &Expr, ty: Type) {
        let node = expr.syntax();
        self.expr_types.insert((node.text_range(), node.kind()), ty);
    }

    fn run(&mut self) {
        let table = self.table;
        for &id in table.declarations() {
            self.symbol_type(id);
            if let Some(statement) = self.declarations.get(&id).cloned() {
                self.check_declaration(id, &statement);
            }
        }

        let statements: Vec<Statement> = self
            .root
            .children()
            .filter_map(Statement::cast)
            .collect();
        for statement in statements {
            if let Statement::TargetScope(decl) = statement {
                self.check_target_scope(&decl);
            }
        }

        if table.file_kind() == FileKind::Parameters {
            self.check_parameter_assignments();
        }
    }

    // ------------------------------------------------------------------------
    // Declaration types
    // ------------------------------------------------------------------------

    fn symbol_type(&mut self, id: SymbolId) -> Type {
        if let Some(ty) = &self.symbol_types[id.index()] {
            return ty.clone();
        }
        if self.in_progress[id.index()] {
            return Type::Any;
        }
        self.in_progress[id.index()] = true;
        let ty = self.compute_symbol_type(id);
        self.in_progress[id.index()] = false;
        self.symbol_types[id.index()] = Some(ty.clone());
        ty
    }

    fn compute_symbol_type(&mut self, id: SymbolId) -> Type {
        let table = self.table;
        let symbol = table.symbol(id);
        match symbol.kind {
            SymbolKind::LoopVariable => return Type::Any,
            SymbolKind::LoopIndex => return Type::Int,
            SymbolKind::FunctionParameter => {
                let range = symbol.declaration_range;
                return node_at(&self.root, range)
                    .and_then(|n| n.ancestors().find_map(crate::parser::FuncParam::cast))
                    .and_then(|p| p.ty())
                    .map(|ty| self.resolve_type(&ty))
                    .unwrap_or(Type::Error);
            }
            _ => {}
        }

        let Some(statement) = self.declarations.get(&id).cloned() else {
            return Type::Error;
        };
        match &statement {
            Statement::Param(param) => self.parameter_type(param),
            Statement::Var(var) => var.value().map(|v| self.infer(&v)).unwrap_or(Type::Error),
            Statement::Resource(resource) => {
                let ty = self.resource_type(resource);
                if is_loop(resource.body()) { Type::array_of(ty) } else { ty }
            }
            Statement::Module(module) => {
                let path = module
                    .path()
                    .and_then(|p| p.literal_value())
                    .unwrap_or_default();
                let interface = match self.table.module_status(id) {
                    Some(ResolutionStatus::Resolved(target)) => self.ctx.interfaces.get(target).cloned(),
                    _ => None,
                };
                let ty = Type::Module(Arc::new(ModuleType {
                    path: SmolStr::new(path),
                    interface,
                }));
                if is_loop(module.body()) { Type::array_of(ty) } else { ty }
            }
            Statement::Output(output) => {
                let declared = output.ty().map(|t| self.resolve_type(&t)).unwrap_or(Type::Error);
                apply_sealed(declared, statement.decorators())
            }
            Statement::Type(alias) => {
                let declared = alias.ty().map(|t| self.resolve_type(&t)).unwrap_or(Type::Error);
                apply_sealed(declared, statement.decorators())
            }
            Statement::Func(func) => {
                let mut params = Vec::new();
                for param in func.params() {
                    let ty = param.ty().map(|t| self.resolve_type(&t)).unwrap_or(Type::Error);
                    let range = param.syntax().text_range();
                    if let Some((param_id, _)) = table
                        .symbols()
                        .find(|(_, s)| s.kind == SymbolKind::FunctionParameter && s.declaration_range == range)
                    {
                        self.symbol_types[param_id.index()] = Some(ty.clone());
                    }
                    params.push(ty);
                }
                let returns = func.return_type().map(|t| self.resolve_type(&t)).unwrap_or(Type::Any);
                Type::Function(Arc::new(FunctionType {
                    name: symbol.name.clone(),
                    overloads: vec![Signature::new(params, returns)],
                }))
            }
            Statement::Using(_) | Statement::TargetScope(_) => Type::Error,
        }
    }

    fn parameter_type(&mut self, param: &ParamDecl) -> Type {
        if self.table.file_kind() == FileKind::Parameters {
            let name = param.name().and_then(|n| n.text());
            return match (self.using_interface(), name) {
                (Some(interface), Some(name)) => interface
                    .params
                    .property(&name)
                    .map(|p| p.ty.clone())
                    .unwrap_or(Type::Any),
                _ => Type::Any,
            };
        }

        let Some(declared) = param.ty().map(|t| self.resolve_type(&t)) else {
            return Type::Error;
        };
        let mut ty = declared;
        for decorator in param.decorators() {
            if decorator.name().as_deref() != Some("allowed") {
                continue;
            }
            let Some(Expr::Array(values)) = decorator.args().into_iter().next() else {
                continue;
            };
            let literals: Option<Vec<Type>> = values.items().map(|v| literal_type(&v)).collect();
            if let Some(literals) = literals.filter(|l| !l.is_empty()) {
                ty = match &ty {
                    Type::Array(_) => Type::array_of(Type::union(literals)),
                    _ => Type::union(literals),
                };
            }
        }
        apply_sealed(ty, param.decorators())
    }

    fn resource_type(&self, resource: &ResourceDecl) -> Type {
        let Some(raw) = resource.type_string().and_then(|s| s.literal_value()) else {
            return Type::Error;
        };
        let Some(reference) = ResourceTypeReference::parse(&raw) else {
            return Type::Error;
        };
        let (body, unknown) = match self
            .ctx
            .resource_types
            .lookup(&reference.type_name, &reference.api_version)
        {
            Some(shape) => (shape.body().sealed(), false),
            None => (standard_envelope(Type::Any), true),
        };
        let body = if resource.is_existing() { relax_required(body) } else { body };
        Type::Resource(Arc::new(ResourceType {
            type_name: reference.type_name,
            api_version: Some(reference.api_version),
            body,
            unknown,
        }))
    }

    fn using_interface(&self) -> Option<ModuleInterface> {
        match self.table.using_status() {
            Some(ResolutionStatus::Resolved(target)) => self.ctx.interfaces.get(target).cloned(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Type expressions
    // ------------------------------------------------------------------------

    fn resolve_type(&mut self, ty: &TypeExpr) -> Type {
        match ty {
            TypeExpr::Ref(type_ref) => {
                if let Some(alias) = self.table.type_reference(type_ref.syntax().text_range()) {
                    return self.symbol_type(alias);
                }
                match type_ref.name().as_deref() {
                    Some("string") => Type::String,
                    Some("int") => Type::Int,
                    Some("bool") => Type::Bool,
                    Some("object") => Type::any_object(),
                    Some("array") => Type::any_array(),
                    _ => Type::Error,
                }
            }
            TypeExpr::Literal(literal) => match literal.value() {
                Some(LiteralTypeValue::String(s)) => Type::string_literal(&s),
                Some(LiteralTypeValue::Int(i)) => Type::Literal(LiteralValue::Int(i)),
                Some(LiteralTypeValue::Bool(b)) => Type::Literal(LiteralValue::Bool(b)),
                None => Type::Error,
            },
            TypeExpr::Union(union) => {
                let members: Vec<Type> = union.members().map(|m| self.resolve_type(&m)).collect();
                Type::union(members)
            }
            TypeExpr::Array(array) => {
                let element = array.element().map(|e| self.resolve_type(&e)).unwrap_or(Type::Error);
                Type::array_of(element)
            }
            TypeExpr::Paren(paren) => paren.inner().map(|i| self.resolve_type(&i)).unwrap_or(Type::Error),
            TypeExpr::Object(object) => {
                let mut shape = ObjectType::new();
                for property in object.properties() {
                    let ty = property.ty().map(|t| self.resolve_type(&t)).unwrap_or(Type::Error);
                    if property.is_additional_properties() {
                        shape.additional = Some(ty);
                        continue;
                    }
                    let Some(key) = property.key().and_then(|k| k.text()) else {
                        continue;
                    };
                    let prop = if property.is_optional() {
                        PropertyType::optional(ty)
                    } else {
                        PropertyType::required(ty)
                    };
                    shape.properties.insert(SmolStr::new(key), prop);
                }
                Type::object(shape)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------------

    fn check_declaration(&mut self, id: SymbolId, statement: &Statement) {
        let declared = self.symbol_type(id);
        for property in statement.syntax().descendants().filter_map(ObjectTypeProperty::cast) {
            self.check_decorators(property.decorators(), DecoratorTarget::TypeProperty, false);
        }

        match statement {
            Statement::Param(param) => {
                if self.table.file_kind() == FileKind::Parameters {
                    // Checked against the `using` target
                    return;
                }
                self.check_decorators(param.decorators(), DecoratorTarget::Parameter, false);
                if let Some(value) = param.default_value() {
                    self.check_expr(&value, &declared);
                }
            }
            Statement::Var(var) => {
                self.check_decorators(var.decorators(), DecoratorTarget::Variable, is_loop(var.value()));
            }
            Statement::Resource(resource) => {
                self.check_decorators(resource.decorators(), DecoratorTarget::Resource, is_loop(resource.body()));
                self.check_resource_type_string(resource);
                if let Some(body) = resource.body() {
                    let shape = match declared.element_type().filter(|_| is_loop(resource.body())) {
                        Some(Type::Resource(r)) => Some(r.body.clone()),
                        _ => match &declared {
                            Type::Resource(r) => Some(r.body.clone()),
                            _ => None,
                        },
                    };
                    match shape {
                        Some(shape) => self.check_body(&body, &shape),
                        None => {
                            self.infer(&body);
                        }
                    }
                }
            }
            Statement::Module(module) => {
                self.check_decorators(module.decorators(), DecoratorTarget::Module, is_loop(module.body()));
                if let Some(path) = module.path() {
                    self.infer(&Expr::String(path));
                }
                let module_type = match &declared {
                    Type::Module(m) => Some(m.clone()),
                    Type::Array(element) => match &**element {
                        Type::Module(m) => Some(m.clone()),
                        _ => None,
                    },
                    _ => None,
                };
                if let (Some(body), Some(module_type)) = (module.body(), module_type) {
                    self.check_body(&body, &module_body(&module_type));
                }
            }
            Statement::Output(output) => {
                self.check_decorators(output.decorators(), DecoratorTarget::Output, is_loop(output.value()));
                if let Some(value) = output.value() {
                    self.check_expr(&value, &declared);
                }
            }
            Statement::Type(alias) => {
                self.check_decorators(alias.decorators(), DecoratorTarget::TypeAlias, false);
            }
            Statement::Func(func) => {
                self.check_decorators(func.decorators(), DecoratorTarget::Function, false);
                let returns = match &declared {
                    Type::Function(f) => f.overloads.first().map(|s| s.returns.clone()).unwrap_or(Type::Any),
                    _ => Type::Any,
                };
                if let Some(body) = func.body() {
                    self.check_expr(&body, &returns);
                }
            }
            Statement::Using(_) | Statement::TargetScope(_) => {}
        }
    }

    fn check_resource_type_string(&mut self, resource: &ResourceDecl) {
        let Some(type_string) = resource.type_string() else {
            return;
        };
        let range = type_string.syntax().text_range();
        self.infer(&Expr::String(type_string.clone()));
        let Some(raw) = type_string.literal_value() else {
            self.error(
                codes::INVALID_RESOURCE_TYPE,
                range,
                "the resource type must be a string literal without interpolation".to_string(),
            );
            return;
        };
        match ResourceTypeReference::parse(&raw) {
            None => self.error(
                codes::INVALID_RESOURCE_TYPE,
                range,
                format!(
                    "the resource type '{}' is not valid; expected '<namespace>/<type>@<apiVersion>'",
                    raw
                ),
            ),
            Some(reference) => {
                if self
                    .ctx
                    .resource_types
                    .lookup(&reference.type_name, &reference.api_version)
                    .is_none()
                {
                    self.warning(
                        codes::UNKNOWN_RESOURCE_TYPE,
                        range,
                        format!(
                            "resource type '{}' is not available; its properties will not be validated",
                            reference
                        ),
                    );
                }
            }
        }
    }

    /// Resource and module bodies: an object, possibly under `if` or `for`
    fn check_body(&mut self, body: &Expr, shape: &ObjectType) {
        match body {
            Expr::Object(object) => {
                let ty = self.check_object(object, shape);
                self.record(body, ty);
            }
            Expr::If(if_body) => {
                if let Some(condition) = if_body.condition() {
                    self.check_condition(&condition);
                }
                if let Some(object) = if_body.body() {
                    self.check_body(&Expr::Object(object), shape);
                }
                self.record(body, Type::object(shape.clone()));
            }
            Expr::For(for_expr) => {
                self.enter_loop(for_expr);
                if let Some(inner) = for_expr.body() {
                    self.check_body(&inner, shape);
                }
                self.record(body, Type::array_of(Type::object(shape.clone())));
            }
            other => {
                let expected = Type::object(shape.clone());
                self.check_expr(other, &expected);
            }
        }
    }

    fn check_decorators(
        &mut self,
        decorators: impl Iterator<Item = Decorator>,
        target: DecoratorTarget,
        is_loop: bool,
    ) {
        let library = self.ctx.library;
        for decorator in decorators {
            let range = decorator.syntax().text_range();
            let args = decorator.args();
            let arg_types: Vec<Type> = args.iter().map(|a| self.infer(a)).collect();
            let Some(name) = decorator.name() else {
                continue;
            };
            let Some(def) = library.decorator(&name) else {
                self.error(
                    codes::UNKNOWN_DECORATOR,
                    range,
                    format!("'{}' is not a known decorator", name),
                );
                continue;
            };
            if !def.targets.contains(&target) || (def.loops_only && !is_loop) {
                self.error(
                    codes::INVALID_DECORATOR_TARGET,
                    range,
                    format!("the decorator '@{}' cannot be used on this declaration", name),
                );
                continue;
            }
            let result = resolve_overload(std::slice::from_ref(&def.signature), &arg_types).map(|_| ());
            if let Err(error) = result {
                let name_range = decorator
                    .call()
                    .and_then(|c| c.name_range())
                    .unwrap_or(range);
                self.report_overload_error(&name, error, range, name_range, &args, &arg_types);
            }
        }
    }

    fn check_target_scope(&mut self, decl: &TargetScopeDecl) {
        let Some(value) = decl.value() else {
            return;
        };
        let ty = self.infer(&value);
        let scope = match &ty {
            Type::Literal(LiteralValue::String(s)) => TargetScope::parse(s),
            _ => None,
        };
        match scope {
            Some(scope) => self.target_scope = scope,
            None => self.error(
                codes::INVALID_TARGET_SCOPE,
                value.syntax().text_range(),
                "targetScope must be one of 'resourceGroup', 'subscription', 'managementGroup' or 'tenant'"
                    .to_string(),
            ),
        }
    }

    fn check_parameter_assignments(&mut self) {
        let table = self.table;
        let interface = self.using_interface();
        let mut assigned: Vec<SmolStr> = Vec::new();

        for id in table.of_kind(SymbolKind::Parameter) {
            let symbol = table.symbol(id);
            let Some(Statement::Param(param)) = self.declarations.get(&id).cloned() else {
                continue;
            };
            let Some(value) = param.default_value() else {
                continue;
            };
            assigned.push(symbol.name.clone());
            let expected = interface.as_ref().map(|i| i.params.property(&symbol.name).map(|p| p.ty.clone()));
            match expected {
                Some(Some(expected)) => {
                    self.check_expr(&value, &expected);
                }
                Some(None) => {
                    self.error(
                        codes::UNKNOWN_PARAMETER_ASSIGNMENT,
                        symbol.name_range,
                        format!("the parameter '{}' is not declared in the referenced template", symbol.name),
                    );
                    self.infer(&value);
                }
                None => {
                    self.infer(&value);
                }
            }
        }

        let Some(interface) = interface else {
            return;
        };
        let missing: Vec<String> = interface
            .params
            .properties
            .iter()
            .filter(|(name, p)| p.required && !assigned.contains(*name))
            .map(|(name, _)| format!("'{}'", name))
            .collect();
        if missing.is_empty() {
            return;
        }
        let range = self
            .root
            .children()
            .find(|n| n.kind() == SyntaxKind::USING_DECL)
            .map(|n| n.text_range())
            .unwrap_or_default();
        self.error(
            codes::MISSING_PARAMETER_ASSIGNMENT,
            range,
            format!("the required parameters {} are not assigned", missing.join(", ")),
        );
    }

    fn build_interface(&mut self) -> ModuleInterface {
        let table = self.table;
        let mut interface = ModuleInterface::default();
        if table.file_kind() == FileKind::Parameters {
            return interface;
        }
        for id in table.of_kind(SymbolKind::Parameter) {
            let ty = self.symbol_type(id);
            let has_default = matches!(
                self.declarations.get(&id),
                Some(Statement::Param(p)) if p.default_value().is_some()
            );
            let nullable = !ty.is_unchecked() && is_assignable(&Type::Null, &ty);
            let name = table.symbol(id).name.clone();
            interface.params.properties.insert(
                name,
                PropertyType {
                    ty,
                    required: !has_default && !nullable,
                    read_only: false,
                },
            );
        }
        for id in table.outputs().collect::<Vec<_>>() {
            let ty = self.symbol_type(id);
            let name = table.symbol(id).name.clone();
            interface.outputs.properties.insert(name, PropertyType::read_only(ty));
        }
        interface
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Check `expr` against `expected`, returning its type.
    fn check_expr(&mut self, expr: &Expr, expected: &Type) -> Type {
        if expected.is_unchecked() {
            return self.infer(expr);
        }
        let range = expr.syntax().text_range();

        match expr {
            Expr::Object(object) => {
                if let Some(target) = expected_object(expected) {
                    let ty = self.check_object(object, &target);
                    self.record(expr, ty.clone());
                    return ty;
                }
            }
            Expr::Array(array) => {
                if let Some(element) = expected_element(expected) {
                    let items: Vec<Type> = array.items().map(|item| self.check_expr(&item, &element)).collect();
                    let ty = if items.is_empty() {
                        Type::array_of(element)
                    } else {
                        Type::array_of(Type::union(items))
                    };
                    self.record(expr, ty.clone());
                    return ty;
                }
            }
            Expr::Paren(paren) => {
                let ty = match paren.inner() {
                    Some(inner) => self.check_expr(&inner, expected),
                    None => Type::Error,
                };
                self.record(expr, ty.clone());
                return ty;
            }
            Expr::Ternary(ternary) => {
                if let Some(condition) = ternary.condition() {
                    self.check_condition(&condition);
                }
                let branches: Vec<Type> = [ternary.then_branch(), ternary.else_branch()]
                    .into_iter()
                    .flatten()
                    .map(|b| self.check_expr(&b, expected))
                    .collect();
                let ty = if branches.len() == 2 { Type::union(branches) } else { Type::Error };
                self.record(expr, ty.clone());
                return ty;
            }
            Expr::For(for_expr) => {
                if let Some(element) = expected_element(expected) {
                    self.enter_loop(for_expr);
                    let body = match for_expr.body() {
                        Some(body) => self.check_expr(&body, &element),
                        None => Type::Error,
                    };
                    let ty = Type::array_of(body);
                    self.record(expr, ty.clone());
                    return ty;
                }
            }
            Expr::If(if_body) => {
                if let Some(condition) = if_body.condition() {
                    self.check_condition(&condition);
                }
                let ty = match if_body.body() {
                    Some(object) => self.check_expr(&Expr::Object(object), expected),
                    None => Type::Error,
                };
                self.record(expr, ty.clone());
                return ty;
            }
            _ => {}
        }

        let ty = self.infer(expr);
        if !is_assignable(&ty, expected) {
            self.mismatch(range, expected, &ty);
        }
        ty
    }

    fn check_object(&mut self, object: &ObjectExpr, target: &ObjectType) -> Type {
        let mut result = ObjectType::new();
        let mut seen: Vec<String> = Vec::new();

        for property in object.properties() {
            let value = property.value();
            let Some(key) = property.key() else {
                if let Some(value) = value {
                    self.infer(&value);
                }
                continue;
            };
            let key_range = key.syntax().text_range();
            let Some(name) = key.text() else {
                if let Some(string) = key.string() {
                    self.infer(&Expr::String(string));
                }
                if let Some(value) = value {
                    self.infer(&value);
                }
                continue;
            };

            let folded = name.to_ascii_lowercase();
            if seen.contains(&folded) {
                self.error(
                    codes::DUPLICATE_PROPERTY,
                    key_range,
                    format!("the property '{}' is declared multiple times in this object", name),
                );
            } else {
                seen.push(folded);
            }

            let value_ty = match target.property(&name) {
                Some(prop) => {
                    if prop.read_only {
                        self.error(
                            codes::READ_ONLY_PROPERTY,
                            key_range,
                            format!("the property '{}' is read-only and cannot be assigned", name),
                        );
                    }
                    let expected = if prop.required {
                        prop.ty.clone()
                    } else {
                        Type::union([prop.ty.clone(), Type::Null])
                    };
                    value.map(|v| self.check_expr(&v, &expected))
                }
                None => match &target.additional {
                    Some(additional) => value.map(|v| self.check_expr(&v, additional)),
                    None => {
                        if target.sealed {
                            self.error(
                                codes::DISALLOWED_PROPERTY,
                                key_range,
                                format!(
                                    "the property '{}' is not allowed on objects of type '{}'",
                                    name,
                                    Type::object(target.clone())
                                ),
                            );
                        }
                        value.map(|v| self.infer(&v))
                    }
                },
            };
            result
                .properties
                .insert(SmolStr::new(&name), PropertyType::required(value_ty.unwrap_or(Type::Error)));
        }

        let missing: Vec<String> = target
            .properties
            .iter()
            .filter(|(name, prop)| prop.required && !result.properties.contains_key(*name))
            .map(|(name, _)| format!("'{}'", name))
            .collect();
        if !missing.is_empty() {
            self.error(
                codes::MISSING_PROPERTIES,
                object.syntax().text_range(),
                format!("the object is missing the required properties {}", missing.join(", ")),
            );
        }
        Type::object(result)
    }

    fn check_condition(&mut self, condition: &Expr) {
        let ty = self.infer(condition);
        if !is_assignable(&ty, &Type::Bool) {
            self.error(
                codes::CONDITION_NOT_BOOL,
                condition.syntax().text_range(),
                format!("expected a condition of type 'bool' but the provided value is of type '{}'", ty),
            );
        }
    }

    /// Type the iterable and the loop's item and index variables
    fn enter_loop(&mut self, for_expr: &ForExpr) {
        let element = match for_expr.iterable() {
            Some(iterable) => {
                let ty = self.infer(&iterable);
                match ty.element_type() {
                    Some(element) => element,
                    None => {
                        self.error(
                            codes::LOOP_SOURCE_NOT_ARRAY,
                            iterable.syntax().text_range(),
                            format!("the loop source must be an array but is of type '{}'", ty),
                        );
                        Type::Error
                    }
                }
            }
            None => Type::Error,
        };

        let range = for_expr.syntax().text_range();
        let table = self.table;
        for (id, symbol) in table.symbols() {
            if symbol.declaration_range != range {
                continue;
            }
            match symbol.kind {
                SymbolKind::LoopVariable => self.symbol_types[id.index()] = Some(element.clone()),
                SymbolKind::LoopIndex => self.symbol_types[id.index()] = Some(Type::Int),
                _ => {}
            }
        }
    }

    /// Infer the type of `expr` and record it.
    fn infer(&mut self, expr: &Expr) -> Type {
        let ty = self.infer_inner(expr);
        self.record(expr, ty.clone());
        ty
    }

    fn infer_inner(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Literal(literal) => match literal.value() {
                Some(AstLiteral::Int(Some(value))) => Type::Literal(LiteralValue::Int(value)),
                Some(AstLiteral::Int(None)) => Type::Int,
                Some(AstLiteral::Bool(value)) => Type::Literal(LiteralValue::Bool(value)),
                Some(AstLiteral::Null) => Type::Null,
                None => Type::Error,
            },
            Expr::String(string) => {
                let mut interpolated = false;
                for segment in string.segments() {
                    if let StringSegment::Expr(hole) = segment {
                        interpolated = true;
                        self.infer(&hole);
                    }
                }
                match string.literal_value() {
                    Some(value) if !interpolated => Type::string_literal(&value),
                    _ => Type::String,
                }
            }
            Expr::NameRef(name_ref) => match self.table.reference(name_ref.syntax().text_range()) {
                Some(id) => self.symbol_type(id),
                None => Type::Error,
            },
            Expr::Call(call) => {
                let args: Vec<Expr> = call.args().collect();
                let arg_types: Vec<Type> = args.iter().map(|a| self.infer(a)).collect();
                let range = call.syntax().text_range();
                let name_range = call.name_range().unwrap_or(range);
                let name = call.function_name().unwrap_or_default();
                let result = match self.table.call_target(range).cloned() {
                    Some(CallTarget::Library { namespace, name }) => {
                        match self.ctx.library.function(Some(&namespace), &name) {
                            Some(function) => function.resolve(&arg_types),
                            None => return Type::Error,
                        }
                    }
                    Some(CallTarget::User(id)) => match self.symbol_type(id) {
                        Type::Function(function) => {
                            resolve_overload(&function.overloads, &arg_types).map(|s| s.returns.clone())
                        }
                        _ => return Type::Error,
                    },
                    Some(CallTarget::ResourceMethod { .. }) => return Type::Any,
                    None => return Type::Error,
                };
                match result {
                    Ok(ty) => ty,
                    Err(error) => {
                        self.report_overload_error(&name, error, range, name_range, &args, &arg_types);
                        Type::Error
                    }
                }
            }
            Expr::Member(member) => {
                let base = member.base().map(|b| self.infer(&b)).unwrap_or(Type::Error);
                let Some(name) = member.member_name() else {
                    return Type::Error;
                };
                let range = member
                    .member_token()
                    .map(|t| t.text_range())
                    .unwrap_or_else(|| member.syntax().text_range());
                self.member_type(&base, &name, range)
            }
            Expr::Index(index) => {
                let base = index.base().map(|b| self.infer(&b)).unwrap_or(Type::Error);
                let index_expr = index.index();
                let index_ty = index_expr.as_ref().map(|i| self.infer(i)).unwrap_or(Type::Error);
                let range = index_expr
                    .map(|i| i.syntax().text_range())
                    .unwrap_or_else(|| index.syntax().text_range());
                self.index_type(&base, &index_ty, range)
            }
            Expr::Array(array) => {
                let items: Vec<Type> = array.items().map(|item| self.infer(&item)).collect();
                if items.is_empty() {
                    Type::any_array()
                } else {
                    Type::array_of(Type::union(items))
                }
            }
            Expr::Object(object) => self.check_object(object, &ObjectType::new()),
            Expr::Paren(paren) => paren.inner().map(|i| self.infer(&i)).unwrap_or(Type::Error),
            Expr::Unary(unary) => {
                let operand = unary.operand();
                let ty = operand.as_ref().map(|o| self.infer(o)).unwrap_or(Type::Error);
                match unary.op() {
                    Some(UnaryOp::Not) => {
                        if !is_assignable(&ty, &Type::Bool) {
                            self.operator_error(unary.syntax().text_range(), "!", &[&ty]);
                        }
                        Type::Bool
                    }
                    Some(UnaryOp::Negate) => match ty {
                        Type::Literal(LiteralValue::Int(value)) => Type::Literal(LiteralValue::Int(-value)),
                        other => {
                            if !is_assignable(&other, &Type::Int) {
                                self.operator_error(unary.syntax().text_range(), "-", &[&other]);
                            }
                            Type::Int
                        }
                    },
                    None => Type::Error,
                }
            }
            Expr::Binary(binary) => self.infer_binary(binary),
            Expr::Ternary(ternary) => {
                if let Some(condition) = ternary.condition() {
                    self.check_condition(&condition);
                }
                let branches: Vec<Type> = [ternary.then_branch(), ternary.else_branch()]
                    .into_iter()
                    .flatten()
                    .map(|b| self.infer(&b))
                    .collect();
                if branches.len() == 2 { Type::union(branches) } else { Type::Error }
            }
            Expr::For(for_expr) => {
                self.enter_loop(for_expr);
                let body = for_expr.body().map(|b| self.infer(&b)).unwrap_or(Type::Error);
                Type::array_of(body)
            }
            Expr::If(if_body) => {
                if let Some(condition) = if_body.condition() {
                    self.check_condition(&condition);
                }
                match if_body.body() {
                    Some(object) => self.infer(&Expr::Object(object)),
                    None => Type::Error,
                }
            }
        }
    }

    fn infer_binary(&mut self, binary: &BinaryExpr) -> Type {
        let lhs = binary.lhs().map(|e| self.infer(&e)).unwrap_or(Type::Error);
        let rhs = binary.rhs().map(|e| self.infer(&e)).unwrap_or(Type::Error);
        let Some(op) = binary.op() else {
            return Type::Error;
        };
        let range = binary.syntax().text_range();
        let both = |ty: &Type| is_assignable(&lhs, ty) && is_assignable(&rhs, ty);

        match op {
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide | BinaryOp::Modulo => {
                if !both(&Type::Int) {
                    self.operator_error(range, op.symbol(), &[&lhs, &rhs]);
                }
                Type::Int
            }
            BinaryOp::Less | BinaryOp::Greater | BinaryOp::LessOrEquals | BinaryOp::GreaterOrEquals => {
                if !both(&Type::Int) && !both(&Type::String) {
                    self.operator_error(range, op.symbol(), &[&lhs, &rhs]);
                }
                Type::Bool
            }
            BinaryOp::Equals | BinaryOp::NotEquals => Type::Bool,
            BinaryOp::EqualsInsensitive | BinaryOp::NotEqualsInsensitive => {
                if !both(&Type::String) {
                    self.operator_error(range, op.symbol(), &[&lhs, &rhs]);
                }
                Type::Bool
            }
            BinaryOp::And | BinaryOp::Or => {
                if !both(&Type::Bool) {
                    self.operator_error(range, op.symbol(), &[&lhs, &rhs]);
                }
                Type::Bool
            }
            BinaryOp::Coalesce => Type::union([lhs.non_null(), rhs]),
        }
    }

    fn operator_error(&mut self, range: TextRange, symbol: &str, operands: &[&Type]) {
        let message = match operands {
            [operand] => format!("cannot apply operator '{}' to operand of type '{}'", symbol, operand),
            [lhs, rhs] => format!(
                "cannot apply operator '{}' to operands of type '{}' and '{}'",
                symbol, lhs, rhs
            ),
            _ => format!("cannot apply operator '{}'", symbol),
        };
        self.error(codes::OPERATOR_MISMATCH, range, message);
    }

    fn member_type(&mut self, base: &Type, name: &str, range: TextRange) -> Type {
        match base {
            Type::Any => Type::Any,
            Type::Error => Type::Error,
            Type::Object(object) => self.object_member(object, base, name, range),
            Type::Resource(resource) => self.object_member(&resource.body, base, name, range),
            Type::Module(module) => match name {
                "name" => Type::String,
                "outputs" => match &module.interface {
                    Some(interface) => Type::object(interface.outputs.clone().sealed()),
                    None => {
                        self.error(
                            codes::UNRESOLVED_MODULE_OUTPUT,
                            range,
                            format!(
                                "the outputs of module '{}' are unavailable because the module reference did not resolve",
                                module.path
                            ),
                        );
                        Type::Error
                    }
                },
                _ => {
                    self.unknown_property(base, name, range);
                    Type::Error
                }
            },
            Type::Union(members) => {
                let non_null: Vec<Type> = members.iter().filter(|m| **m != Type::Null).cloned().collect();
                if non_null.len() != members.len() && !non_null.is_empty() {
                    return self.member_type(&Type::union(non_null), name, range);
                }
                let mut found = Vec::new();
                for member in members.iter() {
                    let ty = match member {
                        Type::Object(object) => object.member_type(name),
                        Type::Resource(resource) => resource.body.member_type(name),
                        _ => None,
                    };
                    match ty {
                        Some(ty) => found.push(ty),
                        None => {
                            self.unknown_property(base, name, range);
                            return Type::Error;
                        }
                    }
                }
                Type::union(found)
            }
            _ => {
                self.unknown_property(base, name, range);
                Type::Error
            }
        }
    }

    fn object_member(&mut self, object: &ObjectType, base: &Type, name: &str, range: TextRange) -> Type {
        match object.member_type(name) {
            Some(ty) => ty,
            None => {
                self.unknown_property(base, name, range);
                Type::Error
            }
        }
    }

    fn unknown_property(&mut self, base: &Type, name: &str, range: TextRange) {
        self.error(
            codes::UNKNOWN_PROPERTY,
            range,
            format!("the type '{}' does not contain property '{}'", base, name),
        );
    }

    fn index_type(&mut self, base: &Type, index: &Type, range: TextRange) -> Type {
        if base.is_unchecked() {
            return base.clone();
        }
        if let Some(element) = base.element_type() {
            if !is_assignable(index, &Type::Int) {
                self.mismatch(range, &Type::Int, index);
            }
            return element;
        }
        let object = match base {
            Type::Object(object) => object.clone(),
            Type::Resource(resource) => Arc::new(resource.body.clone()),
            _ => {
                self.error(
                    codes::TYPE_MISMATCH,
                    range,
                    format!("cannot index a value of type '{}'", base),
                );
                return Type::Error;
            }
        };
        match index {
            Type::Literal(LiteralValue::String(key)) => self.object_member(&object, base, key, range),
            other if is_assignable(other, &Type::String) => {
                object.additional.clone().unwrap_or(Type::Any)
            }
            other => {
                self.mismatch(range, &Type::String, other);
                Type::Error
            }
        }
    }

    fn report_overload_error(
        &mut self,
        name: &str,
        error: OverloadError,
        call_range: TextRange,
        name_range: TextRange,
        args: &[Expr],
        arg_types: &[Type],
    ) {
        match error {
            OverloadError::ArgumentCount { expected, actual } => self.error(
                codes::ARGUMENT_COUNT,
                call_range,
                format!("'{}' expects {} arguments but received {}", name, expected, actual),
            ),
            OverloadError::Mismatch { index, expected } => {
                let range = args.get(index).map(|a| a.syntax().text_range()).unwrap_or(call_range);
                let actual = arg_types.get(index).cloned().unwrap_or(Type::Error);
                self.mismatch(range, &expected, &actual);
            }
            OverloadError::NoMatch { nearest } => {
                let provided: Vec<String> = arg_types.iter().map(|t| t.to_string()).collect();
                self.error(
                    codes::NO_MATCHING_OVERLOAD,
                    name_range,
                    format!(
                        "no overload of '{}' accepts arguments ({}); nearest candidate is {}{}",
                        name,
                        provided.join(", "),
                        name,
                        nearest
                    ),
                );
            }
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

/// The node of `root` spanning exactly `range`, if any
fn node_at(root: &SyntaxNode, range: TextRange) -> Option<SyntaxNode> {
    let start = match root.covering_element(range) {
        NodeOrToken::Node(node) => node,
        NodeOrToken::Token(token) => token.parent()?,
    };
    start.ancestors().find(|n| n.text_range() == range)
}

fn is_loop(value: Option<Expr>) -> bool {
    matches!(value, Some(Expr::For(_)))
}

fn apply_sealed(ty: Type, mut decorators: impl Iterator<Item = Decorator>) -> Type {
    if !decorators.any(|d| d.name().as_deref() == Some("sealed")) {
        return ty;
    }
    match ty {
        Type::Object(object) => Type::object((*object).clone().sealed()),
        other => other,
    }
}

/// Existing resources only need a name.
fn relax_required(mut body: ObjectType) -> ObjectType {
    for (name, prop) in body.properties.iter_mut() {
        if name != "name" {
            prop.required = false;
        }
    }
    body
}

fn module_body(module: &ModuleType) -> ObjectType {
    let params = match &module.interface {
        Some(interface) => {
            let ty = Type::object(interface.params.clone().sealed());
            if interface.params.properties.values().any(|p| p.required) {
                PropertyType::required(ty)
            } else {
                PropertyType::optional(ty)
            }
        }
        None => PropertyType::optional(Type::Any),
    };
    ObjectType::new()
        .with("name", PropertyType::optional(Type::String))
        .with("params", params)
        .with("dependsOn", PropertyType::optional(Type::any_array()))
        .with("scope", PropertyType::optional(Type::Any))
        .sealed()
}

fn expected_object(expected: &Type) -> Option<ObjectType> {
    match expected {
        Type::Object(object) => Some((**object).clone()),
        Type::Union(members) => {
            let mut objects = members.iter().filter_map(|m| match m {
                Type::Object(object) => Some(object),
                _ => None,
            });
            let first = objects.next()?;
            let others_null = members
                .iter()
                .all(|m| matches!(m, Type::Object(_) | Type::Null));
            if objects.next().is_none() && others_null {
                Some((**first).clone())
            } else {
                None
            }
        }
        _ => None,
    }
}

fn expected_element(expected: &Type) -> Option<Type> {
    match expected {
        Type::Array(element) => Some((**element).clone()),
        _ => None,
    }
}

/// Literal type of a constant expression, without diagnostics
fn literal_type(expr: &Expr) -> Option<Type> {
    match expr {
        Expr::Literal(literal) => match literal.value()? {
            AstLiteral::Int(Some(value)) => Some(Type::Literal(LiteralValue::Int(value))),
            AstLiteral::Bool(value) => Some(Type::Literal(LiteralValue::Bool(value))),
            AstLiteral::Null => Some(Type::Null),
            AstLiteral::Int(None) => None,
        },
        Expr::String(string) if !string.is_interpolated() => {
            string.literal_value().map(|s| Type::string_literal(&s))
        }
        Expr::Unary(unary) if unary.op() == Some(UnaryOp::Negate) => match literal_type(&unary.operand()?)? {
            Type::Literal(LiteralValue::Int(value)) => Some(Type::Literal(LiteralValue::Int(-value))),
            _ => None,
        },
        Expr::Paren(paren) => literal_type(&paren.inner()?),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceUri;
    use crate::config::CompilerConfig;
    use crate::hir::binder::bind;
    use crate::hir::resource_types::ResourceTypeCatalog;
    use crate::project::{InMemoryWorkspace, SourceFileGrouping};
    use tokio_util::sync::CancellationToken;

    fn check_text(text: &str) -> (SymbolTable, CheckedFile) {
        let workspace = InMemoryWorkspace::new().with_file("file:///main.bicep", text);
        let grouping = SourceFileGrouping::build(
            &SourceUri::new("file:///main.bicep"),
            &workspace,
            &workspace,
            &CancellationToken::new(),
        )
        .unwrap();
        let library = FunctionLibrary::builtin();
        let catalog = ResourceTypeCatalog::builtin();
        let interfaces = FxHashMap::default();
        let table = bind(grouping.entry(), &grouping, &library, &CompilerConfig::default());
        let ctx = CheckContext {
            library: &library,
            resource_types: &catalog,
            interfaces: &interfaces,
        };
        let checked = check_file(grouping.entry_file(), &table, ctx);
        (table, checked)
    }

    fn type_codes(text: &str) -> Vec<&'static str> {
        let (_, checked) = check_text(text);
        checked.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_param_and_output() {
        let (table, checked) = check_text("param name string = 'x'\noutput result string = name\n");
        assert!(checked.diagnostics().is_empty(), "{:?}", checked.diagnostics());
        let name = table.lookup("name").unwrap();
        assert_eq!(checked.symbol_type(name), &Type::String);
        let result = checked.interface().outputs.property("result").unwrap();
        assert_eq!(result.ty, Type::String);
        assert!(!checked.interface().params.property("name").unwrap().required);
    }

    #[test]
    fn test_width_subtyping() {
        let text = "type small = { a: string }\nparam p small = { a: 'x', b: 1 }\n";
        assert!(type_codes(text).is_empty());

        let sealed = "@sealed()\ntype small = { a: string }\nparam p small = { a: 'x', b: 1 }\n";
        assert_eq!(type_codes(sealed), vec![codes::DISALLOWED_PROPERTY]);
    }

    #[test]
    fn test_missing_property_and_mismatch() {
        let text = "type pair = { a: string, b: int }\nparam p pair = { a: 1 }\n";
        assert_eq!(
            type_codes(text),
            vec![codes::TYPE_MISMATCH, codes::MISSING_PROPERTIES]
        );
    }

    #[test]
    fn test_allowed_narrows_parameter() {
        let (table, checked) = check_text("@allowed(['a', 'b'])\nparam p string = 'a'\n");
        assert!(checked.diagnostics().is_empty(), "{:?}", checked.diagnostics());
        let p = table.lookup("p").unwrap();
        assert_eq!(checked.symbol_type(p).to_string(), "'a' | 'b'");

        assert_eq!(
            type_codes("@allowed(['a', 'b'])\nparam p string = 'c'\n"),
            vec![codes::TYPE_MISMATCH]
        );
    }

    #[test]
    fn test_function_calls() {
        assert!(type_codes("var a = toLower('X')\nvar b = length([1, 2])\n").is_empty());
        assert_eq!(type_codes("var a = toLower(1)\n"), vec![codes::TYPE_MISMATCH]);
        assert_eq!(type_codes("var a = toLower()\n"), vec![codes::ARGUMENT_COUNT]);
        assert_eq!(type_codes("func f(x int) int => x\nvar a = f('s')\n"), vec![codes::TYPE_MISMATCH]);
    }

    #[test]
    fn test_operators() {
        assert!(type_codes("var a = 1 + 2 * 3\nvar b = 'x' == 'y' && true\nvar c = null ?? 'd'\n").is_empty());
        assert_eq!(type_codes("var a = 'x' + 1\n"), vec![codes::OPERATOR_MISMATCH]);
        assert_eq!(type_codes("var a = 1 ? 2 : 3\n"), vec![codes::CONDITION_NOT_BOOL]);
    }

    #[test]
    fn test_resource_body() {
        let good = "resource stg 'Microsoft.Storage/storageAccounts@2022-09-01' = {\n  name: 'st'\n  location: 'west'\n  sku: { name: 'Standard_LRS' }\n  kind: 'StorageV2'\n}\noutput id string = stg.id\n";
        assert!(type_codes(good).is_empty(), "{:?}", type_codes(good));

        let bad = "resource stg 'Microsoft.Storage/storageAccounts@2022-09-01' = {\n  name: 'st'\n  id: 'x'\n  bogus: 1\n}\n";
        assert_eq!(
            type_codes(bad),
            vec![
                codes::READ_ONLY_PROPERTY,
                codes::DISALLOWED_PROPERTY,
                codes::MISSING_PROPERTIES
            ]
        );
    }

    #[test]
    fn test_unknown_resource_type_is_warning() {
        let (_, checked) = check_text("resource w 'Contoso.Widgets/widgets@2024-01-01' = {\n  name: 'w'\n  anything: 1\n}\n");
        assert_eq!(checked.diagnostics().len(), 1);
        assert_eq!(checked.diagnostics()[0].code, codes::UNKNOWN_RESOURCE_TYPE);
        assert!(!checked.diagnostics()[0].is_error());
        assert_eq!(
            type_codes("resource w 'not-a-type' = {\n  name: 'w'\n}\n"),
            vec![codes::INVALID_RESOURCE_TYPE]
        );
    }

    #[test]
    fn test_loops() {
        let (table, checked) = check_text("var names = ['a', 'b']\nvar upper = [for n in names: toUpper(n)]\n");
        assert!(checked.diagnostics().is_empty(), "{:?}", checked.diagnostics());
        let upper = table.lookup("upper").unwrap();
        assert_eq!(checked.symbol_type(upper), &Type::array_of(Type::String));
        assert_eq!(type_codes("var x = [for n in 'abc': n]\n"), vec![codes::LOOP_SOURCE_NOT_ARRAY]);
    }

    #[test]
    fn test_decorators() {
        assert!(type_codes("@description('d')\n@minLength(1)\nparam p string\n").is_empty());
        assert_eq!(type_codes("@nope()\nparam p string\n"), vec![codes::UNKNOWN_DECORATOR]);
        assert_eq!(
            type_codes("@batchSize(2)\nparam p string\n"),
            vec![codes::INVALID_DECORATOR_TARGET]
        );
    }

    #[test]
    fn test_target_scope() {
        let (_, checked) = check_text("targetScope = 'subscription'\n");
        assert_eq!(checked.target_scope(), TargetScope::Subscription);
        assert_eq!(type_codes("targetScope = 'galaxy'\n"), vec![codes::INVALID_TARGET_SCOPE]);
    }

    #[test]
    fn test_duplicate_object_property() {
        assert_eq!(type_codes("var o = {\n  a: 1\n  A: 2\n}\n"), vec![codes::DUPLICATE_PROPERTY]);
    }

    #[test]
    fn test_expression_types_are_recorded() {
        let (_, checked) = check_text("var a = 'x'\n");
        let (range, _) = checked
            .expr_types
            .keys()
            .copied()
            .find(|(_, kind)| *kind == SyntaxKind::STRING_EXPR)
            .unwrap();
        assert_eq!(
            checked.expr_type(range, SyntaxKind::STRING_EXPR),
            Some(&Type::string_literal("x"))
        );
    }
}
