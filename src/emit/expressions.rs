//! Expression lowering.
//!
//! An expression becomes either a JSON value (literals, and arrays and
//! objects of them) or template-expression text such as
//! `format('{0}-v', parameters('prefix'))`. Text is wrapped in brackets
//! when it lands in a JSON string.

use std::fmt::Write;

use serde_json::{Map, Number, Value};

use super::EmitError;
use crate::base::text::is_valid_identifier;
use super::declarations::{DEPLOYMENTS_API_VERSION, DEPLOYMENTS_TYPE, DeploymentKind, FileEmitter, LoopBinding};
use crate::hir::{CallTarget, SymbolId, SymbolKind, TargetScope};
use crate::parser::{
    AstNode, BinaryExpr, BinaryOp, CallExpr, Expr, ForExpr, IndexExpr, LiteralValue, MemberExpr,
    NameRef, ObjectExpr, StringExpr, StringSegment, SyntaxNode, UnaryExpr, UnaryOp,
};

/// `value` or an error naming the incomplete node
pub(super) fn part<T>(value: Option<T>, node: &SyntaxNode) -> Result<T, EmitError> {
    value.ok_or(EmitError::Incomplete(node.text_range()))
}

pub(super) use crate::base::text::quote_template_string as quote;

/// A JSON string holding literal text; a leading `[` is doubled so the
/// engine does not read it as an expression.
pub(super) fn literal_string(text: &str) -> Value {
    if text.starts_with('[') {
        Value::String(format!("[{}", text))
    } else {
        Value::String(text.to_string())
    }
}

/// A JSON string holding expression text
pub(super) fn expression(text: &str) -> Value {
    Value::String(format!("[{}]", text))
}

/// `.name` when `name` is an identifier, `['name']` otherwise
fn accessor(name: &str) -> String {
    if is_valid_identifier(name) {
        format!(".{}", name)
    } else {
        format!("[{}]", quote(name))
    }
}

fn binary_function(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Coalesce => "coalesce",
        BinaryOp::Or => "or",
        BinaryOp::And => "and",
        BinaryOp::Equals | BinaryOp::NotEquals => "equals",
        BinaryOp::EqualsInsensitive | BinaryOp::NotEqualsInsensitive => "equals",
        BinaryOp::Less => "less",
        BinaryOp::Greater => "greater",
        BinaryOp::LessOrEquals => "lessOrEquals",
        BinaryOp::GreaterOrEquals => "greaterOrEquals",
        BinaryOp::Add => "add",
        BinaryOp::Subtract => "sub",
        BinaryOp::Multiply => "mul",
        BinaryOp::Divide => "div",
        BinaryOp::Modulo => "mod",
    }
}

impl FileEmitter<'_> {
    // ------------------------------------------------------------------------
    // JSON values
    // ------------------------------------------------------------------------

    /// Lower `expr` to a JSON value, falling back to an expression string.
    pub(super) fn lower_value(&mut self, expr: &Expr) -> Result<Value, EmitError> {
        match expr {
            Expr::Literal(literal) => match literal.value() {
                Some(LiteralValue::Int(Some(value))) => Ok(Value::Number(value.into())),
                Some(LiteralValue::Bool(value)) => Ok(Value::Bool(value)),
                Some(LiteralValue::Null) => Ok(Value::Null),
                _ => Err(EmitError::Incomplete(literal.syntax().text_range())),
            },
            Expr::String(string) if !string.is_interpolated() => {
                let text = part(string.literal_value(), string.syntax())?;
                Ok(literal_string(&text))
            }
            Expr::Array(array) => {
                let items = array
                    .items()
                    .map(|item| self.lower_value(&item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(items))
            }
            Expr::Object(object) if object.properties().all(|p| p.key().and_then(|k| k.text()).is_some()) => {
                self.lower_object_value(object)
            }
            Expr::Paren(paren) => {
                let inner = part(paren.inner(), paren.syntax())?;
                self.lower_value(&inner)
            }
            Expr::Unary(unary) => match negated_literal(unary) {
                Some(value) => Ok(Value::Number(Number::from(value))),
                None => Ok(expression(&self.lower_expr(expr)?)),
            },
            _ => Ok(expression(&self.lower_expr(expr)?)),
        }
    }

    pub(super) fn lower_object_value(&mut self, object: &ObjectExpr) -> Result<Value, EmitError> {
        let mut map = Map::new();
        for property in object.properties() {
            let key = part(property.key().and_then(|k| k.text()), property.syntax())?;
            let value = part(property.value(), property.syntax())?;
            map.insert(key, self.lower_value(&value)?);
        }
        Ok(Value::Object(map))
    }

    // ------------------------------------------------------------------------
    // Expression text
    // ------------------------------------------------------------------------

    /// Lower `expr` to template-expression text (without brackets).
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> Result<String, EmitError> {
        match expr {
            Expr::Literal(literal) => match literal.value() {
                Some(LiteralValue::Int(Some(value))) => Ok(value.to_string()),
                Some(LiteralValue::Bool(true)) => Ok("true()".to_string()),
                Some(LiteralValue::Bool(false)) => Ok("false()".to_string()),
                Some(LiteralValue::Null) => Ok("null()".to_string()),
                _ => Err(EmitError::Incomplete(literal.syntax().text_range())),
            },
            Expr::String(string) => self.lower_string(string),
            Expr::NameRef(name_ref) => self.lower_name_ref(name_ref),
            Expr::Call(call) => self.lower_call(call),
            Expr::Member(member) => self.lower_member(member),
            Expr::Index(index) => self.lower_index(index),
            Expr::Array(array) => {
                let items = array
                    .items()
                    .map(|item| self.lower_expr(&item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("createArray({})", items.join(", ")))
            }
            Expr::Object(object) => {
                let mut args = Vec::new();
                for property in object.properties() {
                    let key = part(property.key(), property.syntax())?;
                    let key = match (key.text(), key.string()) {
                        (Some(text), _) => quote(&text),
                        (None, Some(string)) => self.lower_string(&string)?,
                        (None, None) => return Err(EmitError::Incomplete(key.syntax().text_range())),
                    };
                    let value = part(property.value(), property.syntax())?;
                    args.push(key);
                    args.push(self.lower_expr(&value)?);
                }
                Ok(format!("createObject({})", args.join(", ")))
            }
            Expr::Paren(paren) => {
                let inner = part(paren.inner(), paren.syntax())?;
                self.lower_expr(&inner)
            }
            Expr::Unary(unary) => self.lower_unary(unary),
            Expr::Binary(binary) => self.lower_binary(binary),
            Expr::Ternary(ternary) => {
                let node = ternary.syntax();
                let condition = self.lower_expr(&part(ternary.condition(), node)?)?;
                let then_branch = self.lower_expr(&part(ternary.then_branch(), node)?)?;
                let else_branch = self.lower_expr(&part(ternary.else_branch(), node)?)?;
                Ok(format!("if({}, {}, {})", condition, then_branch, else_branch))
            }
            Expr::For(_) | Expr::If(_) => Err(EmitError::Unsupported {
                construct: "a loop or condition in this position",
                range: expr.syntax().text_range(),
            }),
        }
    }

    fn lower_string(&mut self, string: &StringExpr) -> Result<String, EmitError> {
        if !string.is_interpolated() {
            let text = part(string.literal_value(), string.syntax())?;
            return Ok(quote(&text));
        }
        let mut format = String::new();
        let mut args = Vec::new();
        for segment in string.segments() {
            match segment {
                StringSegment::Text(text) => format.push_str(&text.replace('{', "{{").replace('}', "}}")),
                StringSegment::Expr(hole) => {
                    let _ = write!(format, "{{{}}}", args.len());
                    args.push(self.lower_expr(&hole)?);
                }
            }
        }
        Ok(format!("format({}, {})", quote(&format), args.join(", ")))
    }

    fn lower_unary(&mut self, unary: &UnaryExpr) -> Result<String, EmitError> {
        if let Some(value) = negated_literal(unary) {
            return Ok(value.to_string());
        }
        let operand = self.lower_expr(&part(unary.operand(), unary.syntax())?)?;
        match part(unary.op(), unary.syntax())? {
            UnaryOp::Not => Ok(format!("not({})", operand)),
            UnaryOp::Negate => Ok(format!("sub(0, {})", operand)),
        }
    }

    fn lower_binary(&mut self, binary: &BinaryExpr) -> Result<String, EmitError> {
        let node = binary.syntax();
        let op = part(binary.op(), node)?;
        let mut lhs = self.lower_expr(&part(binary.lhs(), node)?)?;
        let mut rhs = self.lower_expr(&part(binary.rhs(), node)?)?;
        if matches!(op, BinaryOp::EqualsInsensitive | BinaryOp::NotEqualsInsensitive) {
            lhs = format!("toLower({})", lhs);
            rhs = format!("toLower({})", rhs);
        }
        let call = format!("{}({}, {})", binary_function(op), lhs, rhs);
        match op {
            BinaryOp::NotEquals | BinaryOp::NotEqualsInsensitive => Ok(format!("not({})", call)),
            _ => Ok(call),
        }
    }

    fn lower_name_ref(&mut self, name_ref: &NameRef) -> Result<String, EmitError> {
        let range = name_ref.syntax().text_range();
        let file = self.file;
        let id = file.symbols.reference(range).ok_or(EmitError::Incomplete(range))?;
        let symbol = file.symbols.symbol(id);
        match symbol.kind {
            SymbolKind::Parameter | SymbolKind::FunctionParameter => {
                Ok(format!("parameters({})", quote(&symbol.name)))
            }
            SymbolKind::Variable => match self.inlined.get(&id).cloned() {
                Some(value) => self.lower_expr(&value),
                None => Ok(format!("variables({})", quote(&symbol.name))),
            },
            SymbolKind::Resource | SymbolKind::Module => {
                if self.deployment(id)?.loop_expr.is_some() {
                    return Err(EmitError::Unsupported {
                        construct: "a reference to a whole resource or module collection",
                        range,
                    });
                }
                self.deployment_reference(id, true)
            }
            SymbolKind::LoopVariable | SymbolKind::LoopIndex => {
                let binding = self
                    .loops
                    .iter()
                    .rev()
                    .find(|b| b.item == Some(id) || b.index == Some(id))
                    .ok_or(EmitError::Incomplete(range))?;
                if binding.item == Some(id) {
                    Ok(binding.item_expr.clone())
                } else {
                    Ok(binding.index_expr.clone())
                }
            }
            SymbolKind::Output | SymbolKind::TypeAlias | SymbolKind::Function => {
                Err(EmitError::Unsupported {
                    construct: "a reference to a non-value declaration",
                    range,
                })
            }
        }
    }

    fn lower_args(&mut self, call: &CallExpr) -> Result<Vec<String>, EmitError> {
        call.args().map(|arg| self.lower_expr(&arg)).collect()
    }

    fn lower_call(&mut self, call: &CallExpr) -> Result<String, EmitError> {
        let range = call.syntax().text_range();
        let file = self.file;
        let target = file.symbols.call_target(range).ok_or(EmitError::Incomplete(range))?;
        match target {
            CallTarget::User(id) => {
                let args = self.lower_args(call)?;
                Ok(format!("__bicep.{}({})", file.symbols.symbol(*id).name, args.join(", ")))
            }
            CallTarget::Library { name, .. } => {
                let mut args = self.lower_args(call)?;
                // `any` only changes the checked type
                if name == "any" && args.len() == 1 {
                    return Ok(args.remove(0));
                }
                Ok(format!("{}({})", name, args.join(", ")))
            }
            CallTarget::ResourceMethod { resource, name } => {
                let api_version = match &self.deployment(*resource)?.kind {
                    DeploymentKind::Resource { api_version, .. } => api_version.clone(),
                    DeploymentKind::Module { .. } => return Err(EmitError::Incomplete(range)),
                };
                let mut args = vec![self.deployment_id(*resource)?, quote(&api_version)];
                args.extend(self.lower_args(call)?);
                Ok(format!("{}({})", name, args.join(", ")))
            }
        }
    }

    fn lower_member(&mut self, member: &MemberExpr) -> Result<String, EmitError> {
        let node = member.syntax();
        let base = part(member.base(), node)?;
        let name = part(member.member_name(), node)?;

        if let Some((module, index)) = self.module_outputs_base(&base) {
            return self.in_deployment_loop(module, index.as_ref(), |this| {
                let reference = this.deployment_reference(module, false)?;
                Ok(format!("{}.outputs{}.value", reference, accessor(&name)))
            });
        }
        if let Some((id, index)) = self.deployment_target(&base) {
            return self.in_deployment_loop(id, index.as_ref(), |this| this.deployment_member(id, &name));
        }
        let base = self.lower_expr(&base)?;
        Ok(format!("{}{}", base, accessor(&name)))
    }

    fn lower_index(&mut self, index_expr: &IndexExpr) -> Result<String, EmitError> {
        let node = index_expr.syntax();
        let base = part(index_expr.base(), node)?;
        let index = part(index_expr.index(), node)?;

        if let Some((module, loop_index)) = self.module_outputs_base(&base) {
            let key = self.lower_expr(&index)?;
            return self.in_deployment_loop(module, loop_index.as_ref(), |this| {
                let reference = this.deployment_reference(module, false)?;
                Ok(format!("{}.outputs[{}].value", reference, key))
            });
        }
        if let Some((id, Some(loop_index))) = self.deployment_target(&Expr::Index(index_expr.clone())) {
            return self.in_deployment_loop(id, Some(&loop_index), |this| this.deployment_reference(id, true));
        }
        let base = self.lower_expr(&base)?;
        let index = self.lower_expr(&index)?;
        Ok(format!("{}[{}]", base, index))
    }

    // ------------------------------------------------------------------------
    // Resources and modules
    // ------------------------------------------------------------------------

    /// `res` or `res[i]` naming a resource or module
    fn deployment_target(&self, expr: &Expr) -> Option<(SymbolId, Option<Expr>)> {
        let (name_ref, index) = match expr.clone().unparenthesized()? {
            Expr::NameRef(name_ref) => (name_ref, None),
            Expr::Index(index) => match index.base()?.unparenthesized()? {
                Expr::NameRef(name_ref) => (name_ref, Some(index.index()?)),
                _ => return None,
            },
            _ => return None,
        };
        let id = self.file.symbols.reference(name_ref.syntax().text_range())?;
        self.deployments.contains_key(&id).then_some((id, index))
    }

    /// `mod.outputs` or `mod[i].outputs`
    fn module_outputs_base(&self, base: &Expr) -> Option<(SymbolId, Option<Expr>)> {
        let Expr::Member(member) = base.clone().unparenthesized()? else {
            return None;
        };
        if member.member_name()? != "outputs" {
            return None;
        }
        let (id, index) = self.deployment_target(&member.base()?)?;
        matches!(self.deployments.get(&id)?.kind, DeploymentKind::Module { .. }).then_some((id, index))
    }

    /// Run `f` with the loop variables of deployment `id` bound to element
    /// `index` of its collection.
    fn in_deployment_loop<T>(
        &mut self,
        id: SymbolId,
        index: Option<&Expr>,
        f: impl FnOnce(&mut Self) -> Result<T, EmitError>,
    ) -> Result<T, EmitError> {
        let loop_expr = self.deployment(id)?.loop_expr.clone();
        match (loop_expr, index) {
            (Some(loop_expr), Some(index)) => {
                let iterable = self.lower_expr(&part(loop_expr.iterable(), loop_expr.syntax())?)?;
                let index = self.lower_expr(index)?;
                let item = format!("{}[{}]", iterable, index);
                self.with_loop(&loop_expr, item, index, f)
            }
            _ => f(self),
        }
    }

    /// Run `f` with the variables of `loop_expr` bound to the given texts.
    pub(super) fn with_loop<T>(
        &mut self,
        loop_expr: &ForExpr,
        item_expr: String,
        index_expr: String,
        f: impl FnOnce(&mut Self) -> Result<T, EmitError>,
    ) -> Result<T, EmitError> {
        let file = self.file;
        let symbol = |name: Option<crate::parser::Name>| {
            name.and_then(|n| file.symbols.declared_by(n.syntax().text_range()))
        };
        self.loops.push(LoopBinding {
            item: symbol(loop_expr.item_name()),
            index: symbol(loop_expr.index_name()),
            item_expr,
            index_expr,
        });
        let result = f(self);
        self.loops.pop();
        result
    }

    /// The `name` of a deployment as expression text
    pub(super) fn deployment_name(&mut self, id: SymbolId) -> Result<String, EmitError> {
        match self.deployment(id)?.property("name") {
            Some(name) => self.lower_expr(&name),
            None => Ok(quote(&self.file.symbols.symbol(id).name)),
        }
    }

    /// Resource id function for this file's target scope
    fn resource_id_function(&self) -> (&'static str, Option<&'static str>) {
        match self.file.target_scope() {
            TargetScope::ResourceGroup => ("resourceId", None),
            TargetScope::Subscription => ("subscriptionResourceId", None),
            TargetScope::ManagementGroup => ("extensionResourceId", Some("managementGroup().id")),
            TargetScope::Tenant => ("tenantResourceId", None),
        }
    }

    pub(super) fn deployment_id(&mut self, id: SymbolId) -> Result<String, EmitError> {
        let type_name = match &self.deployment(id)?.kind {
            DeploymentKind::Resource { type_name, .. } => type_name.to_string(),
            DeploymentKind::Module { .. } => DEPLOYMENTS_TYPE.to_string(),
        };
        let name = self.deployment_name(id)?;
        let (function, scope) = self.resource_id_function();
        Ok(match scope {
            Some(scope) => format!("{}({}, {}, {})", function, scope, quote(&type_name), name),
            None => format!("{}({}, {})", function, quote(&type_name), name),
        })
    }

    /// `reference(...)` of a deployment; `full` includes the envelope
    fn deployment_reference(&mut self, id: SymbolId, full: bool) -> Result<String, EmitError> {
        let api_version = match &self.deployment(id)?.kind {
            DeploymentKind::Resource { api_version, .. } => api_version.to_string(),
            DeploymentKind::Module { .. } => DEPLOYMENTS_API_VERSION.to_string(),
        };
        let resource_id = self.deployment_id(id)?;
        if full {
            Ok(format!("reference({}, {}, 'full')", resource_id, quote(&api_version)))
        } else {
            Ok(format!("reference({}, {})", resource_id, quote(&api_version)))
        }
    }

    fn deployment_member(&mut self, id: SymbolId, member: &str) -> Result<String, EmitError> {
        let (type_name, api_version) = match &self.deployment(id)?.kind {
            DeploymentKind::Resource { type_name, api_version } => (type_name.to_string(), api_version.to_string()),
            DeploymentKind::Module { .. } => (DEPLOYMENTS_TYPE.to_string(), DEPLOYMENTS_API_VERSION.to_string()),
        };
        match member {
            "id" => self.deployment_id(id),
            "name" => self.deployment_name(id),
            "type" => Ok(quote(&type_name)),
            "apiVersion" => Ok(quote(&api_version)),
            "properties" => self.deployment_reference(id, false),
            _ => {
                let reference = self.deployment_reference(id, true)?;
                Ok(format!("{}{}", reference, accessor(member)))
            }
        }
    }
}

/// `-5` as a literal, when the operand is an integer literal
fn negated_literal(unary: &UnaryExpr) -> Option<i64> {
    if unary.op()? != UnaryOp::Negate {
        return None;
    }
    match unary.operand()? {
        Expr::Literal(literal) => match literal.value()? {
            LiteralValue::Int(Some(value)) => value.checked_neg(),
            _ => None,
        },
        _ => None,
    }
}
