//! Parameters-file emission.
//!
//! Assignments in a parameters file must fold to constants: literals,
//! arrays and objects of constants, interpolations of constants, and
//! variables holding such values.

use rustc_hash::FxHashSet;
use serde_json::{Map, Number, Value, json};

use super::EmitError;
use super::template::ParametersFile;
use crate::config::EmitOptions;
use crate::hir::{FileModel, SymbolId, SymbolKind};
use crate::parser::{AstNode, Expr, LiteralValue, Statement, StringSegment, UnaryOp};

pub(super) fn emit_parameters_file(file: &FileModel, options: &EmitOptions) -> Result<ParametersFile, EmitError> {
    let mut document = ParametersFile::new(&options.content_version);
    let Some(source_file) = file.file.source_file() else {
        return Ok(document);
    };
    let mut folder = ConstantFolder {
        file,
        visiting: FxHashSet::default(),
    };
    for statement in source_file.statements() {
        let Statement::Param(param) = statement else {
            continue;
        };
        let Some(name) = param.name().and_then(|n| n.text()) else {
            continue;
        };
        let value = param
            .default_value()
            .and_then(|value| folder.fold(&value))
            .ok_or_else(|| EmitError::NonConstantValue(name.to_string()))?;
        document.parameters.insert(name.to_string(), json!({ "value": value }));
    }
    Ok(document)
}

struct ConstantFolder<'a> {
    file: &'a FileModel,
    /// Variables being folded, to stop on self-reference
    visiting: FxHashSet<SymbolId>,
}

impl ConstantFolder<'_> {
    fn fold(&mut self, expr: &Expr) -> Option<Value> {
        match expr {
            Expr::Literal(literal) => match literal.value()? {
                LiteralValue::Int(value) => Some(Value::Number(value?.into())),
                LiteralValue::Bool(value) => Some(Value::Bool(value)),
                LiteralValue::Null => Some(Value::Null),
            },
            Expr::String(string) => {
                let mut text = String::new();
                for segment in string.segments() {
                    match segment {
                        StringSegment::Text(piece) => text.push_str(&piece),
                        StringSegment::Expr(hole) => text.push_str(&display(&self.fold(&hole)?)?),
                    }
                }
                Some(Value::String(text))
            }
            Expr::Array(array) => array.items().map(|item| self.fold(&item)).collect::<Option<Vec<_>>>().map(Value::Array),
            Expr::Object(object) => {
                let mut map = Map::new();
                for property in object.properties() {
                    let key = property.key()?.text()?;
                    map.insert(key, self.fold(&property.value()?)?);
                }
                Some(Value::Object(map))
            }
            Expr::Paren(paren) => self.fold(&paren.inner()?),
            Expr::Unary(unary) => match (unary.op()?, self.fold(&unary.operand()?)?) {
                (UnaryOp::Negate, Value::Number(n)) => Some(Value::Number(Number::from(n.as_i64()?.checked_neg()?))),
                (UnaryOp::Not, Value::Bool(b)) => Some(Value::Bool(!b)),
                _ => None,
            },
            Expr::NameRef(name_ref) => {
                let table = &self.file.symbols;
                let id = table.reference(name_ref.syntax().text_range())?;
                if table.symbol(id).kind != SymbolKind::Variable || !self.visiting.insert(id) {
                    return None;
                }
                let value = self.variable_value(id).and_then(|value| self.fold(&value));
                self.visiting.remove(&id);
                value
            }
            _ => None,
        }
    }

    fn variable_value(&self, id: SymbolId) -> Option<Expr> {
        let range = self.file.symbols.symbol(id).declaration_range;
        let source_file = self.file.file.source_file()?;
        source_file.statements().find_map(|statement| match statement {
            Statement::Var(var) if var.syntax().text_range() == range => var.value(),
            _ => None,
        })
    }
}

/// Text of a constant inside an interpolation
fn display(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
