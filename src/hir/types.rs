//! Structural types.
//!
//! Types are plain values compared by structure. Assignability is a pure
//! recursive predicate ([`is_assignable`]); the checker layers diagnostics on
//! top of it.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;

/// A type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// Accepts and is accepted by everything
    Any,
    /// Result of an expression that already produced a diagnostic
    Error,
    Null,
    Bool,
    Int,
    String,
    /// A single literal value
    Literal(LiteralValue),
    /// Normalized: flat, deduplicated, at least two members
    Union(Arc<[Type]>),
    Array(Arc<Type>),
    Object(Arc<ObjectType>),
    Resource(Arc<ResourceType>),
    Module(Arc<ModuleType>),
    Function(Arc<FunctionType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LiteralValue {
    String(SmolStr),
    Int(i64),
    Bool(bool),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::String(s) => write!(f, "'{}'", s),
            LiteralValue::Int(i) => write!(f, "{}", i),
            LiteralValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// A named property of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyType {
    pub ty: Type,
    pub required: bool,
    /// Set by the deployment engine; cannot be assigned
    pub read_only: bool,
}

impl PropertyType {
    pub fn required(ty: Type) -> Self {
        Self {
            ty,
            required: true,
            read_only: false,
        }
    }

    pub fn optional(ty: Type) -> Self {
        Self {
            ty,
            required: false,
            read_only: false,
        }
    }

    pub fn read_only(ty: Type) -> Self {
        Self {
            ty,
            required: false,
            read_only: true,
        }
    }
}

/// Object shape.
///
/// Extra properties are accepted unless the type is `sealed`; when
/// `additional` is set they must match it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectType {
    pub properties: IndexMap<SmolStr, PropertyType>,
    pub additional: Option<Type>,
    pub sealed: bool,
}

impl ObjectType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, property: PropertyType) -> Self {
        self.properties.insert(SmolStr::new(name), property);
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyType> {
        self.properties.get(name)
    }

    /// Type of `obj.name`, if the shape allows it
    pub fn member_type(&self, name: &str) -> Option<Type> {
        if let Some(prop) = self.properties.get(name) {
            return Some(prop.ty.clone());
        }
        if let Some(additional) = &self.additional {
            return Some(additional.clone());
        }
        if self.sealed { None } else { Some(Type::Any) }
    }
}

/// A resource declaration's type: `Namespace/type@apiVersion` plus body shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    pub type_name: SmolStr,
    pub api_version: Option<SmolStr>,
    pub body: ObjectType,
    /// Shape unknown to the provider; body checks are skipped
    pub unknown: bool,
}

/// A module's interface, as seen from the referencing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleType {
    pub path: SmolStr,
    /// `None` when the module did not resolve
    pub interface: Option<ModuleInterface>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleInterface {
    pub params: ObjectType,
    pub outputs: ObjectType,
}

/// A callable signature with one or more overloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    pub name: SmolStr,
    pub overloads: Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Type>,
    /// Trailing parameters that may be omitted
    pub optional: usize,
    /// Type of any further arguments
    pub variadic: Option<Type>,
    pub returns: Type,
}

impl Signature {
    pub fn new(params: Vec<Type>, returns: Type) -> Self {
        Self {
            params,
            optional: 0,
            variadic: None,
            returns,
        }
    }

    pub fn min_args(&self) -> usize {
        self.params.len() - self.optional.min(self.params.len())
    }

    pub fn accepts_arity(&self, count: usize) -> bool {
        count >= self.min_args() && (self.variadic.is_some() || count <= self.params.len())
    }

    /// Expected type of argument `index`
    pub fn param_type(&self, index: usize) -> Option<&Type> {
        self.params.get(index).or(self.variadic.as_ref())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        let required = self.min_args();
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            if idx >= required {
                write!(f, "[{}]", param)?;
            } else {
                write!(f, "{}", param)?;
            }
        }
        if let Some(variadic) = &self.variadic {
            if !self.params.is_empty() {
                f.write_str(", ")?;
            }
            write!(f, "...{}", variadic)?;
        }
        write!(f, "): {}", self.returns)
    }
}

// ============================================================================
// CONSTRUCTION
// ============================================================================

impl Type {
    pub fn string_literal(value: &str) -> Type {
        Type::Literal(LiteralValue::String(SmolStr::new(value)))
    }

    pub fn array_of(element: Type) -> Type {
        Type::Array(Arc::new(element))
    }

    /// `array`: any element type
    pub fn any_array() -> Type {
        Type::array_of(Type::Any)
    }

    /// `object`: any properties
    pub fn any_object() -> Type {
        Type::Object(Arc::new(ObjectType::new()))
    }

    pub fn object(object: ObjectType) -> Type {
        Type::Object(Arc::new(object))
    }

    /// Normalized union of `members`.
    pub fn union(members: impl IntoIterator<Item = Type>) -> Type {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            match member {
                Type::Any => return Type::Any,
                Type::Error => return Type::Error,
                Type::Union(inner) => {
                    for m in inner.iter() {
                        if !flat.contains(m) {
                            flat.push(m.clone());
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }

        // Drop members subsumed by another member; of two mutually
        // assignable members the first is kept.
        let keep: Vec<bool> = (0..flat.len())
            .map(|i| {
                !(0..flat.len()).any(|j| {
                    i != j
                        && is_assignable(&flat[i], &flat[j])
                        && (j < i || !is_assignable(&flat[j], &flat[i]))
                })
            })
            .collect();
        let mut flat: Vec<Type> = flat
            .into_iter()
            .zip(keep)
            .filter_map(|(m, keep)| keep.then_some(m))
            .collect();
        match flat.len() {
            0 => Type::Error,
            1 => flat.remove(0),
            _ => Type::Union(flat.into()),
        }
    }

    /// The primitive a literal type belongs to
    pub fn widen(&self) -> Type {
        match self {
            Type::Literal(LiteralValue::String(_)) => Type::String,
            Type::Literal(LiteralValue::Int(_)) => Type::Int,
            Type::Literal(LiteralValue::Bool(_)) => Type::Bool,
            Type::Union(members) => Type::union(members.iter().map(Type::widen)),
            Type::Array(element) => Type::array_of(element.widen()),
            other => other.clone(),
        }
    }

    /// Error or any: checks against it are skipped
    pub fn is_unchecked(&self) -> bool {
        matches!(self, Type::Any | Type::Error)
    }

    pub fn is_bool(&self) -> bool {
        is_assignable(self, &Type::Bool) && !self.is_unchecked()
    }

    pub fn is_string(&self) -> bool {
        is_assignable(self, &Type::String) && !self.is_unchecked()
    }

    pub fn is_int(&self) -> bool {
        is_assignable(self, &Type::Int) && !self.is_unchecked()
    }

    /// Element type when this is an array (or a union of arrays)
    pub fn element_type(&self) -> Option<Type> {
        match self {
            Type::Array(element) => Some((**element).clone()),
            Type::Any | Type::Error => Some(Type::Any),
            Type::Union(members) => {
                let elements: Option<Vec<Type>> = members.iter().map(Type::element_type).collect();
                elements.map(Type::union)
            }
            _ => None,
        }
    }

    /// Same type without `null` members
    pub fn non_null(&self) -> Type {
        match self {
            Type::Union(members) => Type::union(members.iter().filter(|m| **m != Type::Null).cloned()),
            other => other.clone(),
        }
    }

    /// Short name of the primitive this type is represented by in templates
    pub fn template_type_name(&self) -> &'static str {
        match self {
            Type::Bool | Type::Literal(LiteralValue::Bool(_)) => "bool",
            Type::Int | Type::Literal(LiteralValue::Int(_)) => "int",
            Type::String | Type::Literal(LiteralValue::String(_)) => "string",
            Type::Array(_) => "array",
            Type::Union(members) => {
                let mut names = members
                    .iter()
                    .filter(|m| **m != Type::Null)
                    .map(Type::template_type_name);
                match names.next() {
                    Some(first) if names.all(|n| n == first) => first,
                    _ => "object",
                }
            }
            _ => "object",
        }
    }
}

// ============================================================================
// ASSIGNABILITY
// ============================================================================

/// Whether a value of type `source` may be used where `target` is expected.
///
/// `any` and error types are compatible with everything. Literals are
/// assignable to their primitive, union members to a union containing them,
/// and objects use width subtyping: every required target property must be
/// present and compatible, and extra properties are accepted unless the
/// target is sealed.
pub fn is_assignable(source: &Type, target: &Type) -> bool {
    if source.is_unchecked() || target.is_unchecked() || source == target {
        return true;
    }

    match (source, target) {
        (Type::Union(members), _) => members.iter().all(|m| is_assignable(m, target)),
        (_, Type::Union(members)) => members.iter().any(|m| is_assignable(source, m)),

        (Type::Literal(LiteralValue::String(_)), Type::String)
        | (Type::Literal(LiteralValue::Int(_)), Type::Int)
        | (Type::Literal(LiteralValue::Bool(_)), Type::Bool) => true,

        (Type::Array(s), Type::Array(t)) => is_assignable(s, t),

        (Type::Object(s), Type::Object(t)) => is_object_assignable(s, t),
        (Type::Resource(s), Type::Object(t)) => is_object_assignable(&s.body, t),
        (Type::Resource(s), Type::Resource(t)) => {
            s.type_name.eq_ignore_ascii_case(&t.type_name)
        }

        _ => false,
    }
}

fn is_object_assignable(source: &ObjectType, target: &ObjectType) -> bool {
    for (name, expected) in &target.properties {
        match source.properties.get(name) {
            Some(actual) => {
                let accepts_null = !expected.required && actual.ty == Type::Null;
                if !accepts_null && !is_assignable(&actual.ty, &expected.ty) {
                    return false;
                }
            }
            None if expected.required => return false,
            None => {}
        }
    }

    for (name, actual) in &source.properties {
        if target.properties.contains_key(name) {
            continue;
        }
        if target.sealed {
            return false;
        }
        if let Some(additional) = &target.additional {
            if !is_assignable(&actual.ty, additional) {
                return false;
            }
        }
    }
    true
}

/// Required target properties missing from `source`
pub fn missing_properties(source: &ObjectType, target: &ObjectType) -> Vec<SmolStr> {
    target
        .properties
        .iter()
        .filter(|(name, prop)| prop.required && !source.properties.contains_key(*name))
        .map(|(name, _)| name.clone())
        .collect()
}

// ============================================================================
// DISPLAY
// ============================================================================

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => f.write_str("any"),
            Type::Error => f.write_str("error"),
            Type::Null => f.write_str("null"),
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::String => f.write_str("string"),
            Type::Literal(value) => write!(f, "{}", value),
            Type::Union(members) => {
                for (idx, member) in members.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(" | ")?;
                    }
                    write!(f, "{}", member)?;
                }
                Ok(())
            }
            Type::Array(element) => match &**element {
                Type::Any => f.write_str("array"),
                Type::Union(_) => write!(f, "({})[]", element),
                other => write!(f, "{}[]", other),
            },
            Type::Object(object) => fmt_object(object, f),
            Type::Resource(resource) => match &resource.api_version {
                Some(version) => write!(f, "resource '{}@{}'", resource.type_name, version),
                None => write!(f, "resource '{}'", resource.type_name),
            },
            Type::Module(module) => write!(f, "module '{}'", module.path),
            Type::Function(function) => match function.overloads.first() {
                Some(sig) if function.overloads.len() == 1 => write!(f, "{}{}", function.name, sig),
                _ => write!(f, "function {}", function.name),
            },
        }
    }
}

fn fmt_object(object: &ObjectType, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if object.properties.is_empty() && object.additional.is_none() && !object.sealed {
        return f.write_str("object");
    }
    f.write_str("{ ")?;
    let mut first = true;
    for (name, prop) in &object.properties {
        if !first {
            f.write_str(", ")?;
        }
        first = false;
        let marker = if prop.required { "" } else { "?" };
        write!(f, "{}{}: {}", name, marker, prop.ty)?;
    }
    if let Some(additional) = &object.additional {
        if !first {
            f.write_str(", ")?;
        }
        write!(f, "*: {}", additional)?;
    }
    f.write_str(" }")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn obj(props: &[(&str, Type, bool)]) -> ObjectType {
        props.iter().fold(ObjectType::new(), |o, (name, ty, required)| {
            o.with(
                name,
                if *required {
                    PropertyType::required(ty.clone())
                } else {
                    PropertyType::optional(ty.clone())
                },
            )
        })
    }

    #[test]
    fn test_width_subtyping() {
        let source = Type::object(obj(&[("a", Type::String, true), ("b", Type::Int, true)]));
        let target = Type::object(obj(&[("a", Type::String, true)]));
        assert!(is_assignable(&source, &target));

        let sealed = Type::object(obj(&[("a", Type::String, true)]).sealed());
        assert!(!is_assignable(&source, &sealed));
    }

    #[test]
    fn test_missing_required_property() {
        let source = obj(&[("b", Type::Int, true)]);
        let target = obj(&[("a", Type::String, true), ("c", Type::Int, false)]);
        assert!(!is_assignable(&Type::object(source.clone()), &Type::object(target.clone())));
        assert_eq!(missing_properties(&source, &target), vec![SmolStr::new("a")]);
    }

    #[test]
    fn test_additional_properties_type() {
        let target = ObjectType {
            additional: Some(Type::Int),
            ..ObjectType::new()
        };
        let ok = obj(&[("x", Type::Literal(LiteralValue::Int(1)), true)]);
        let bad = obj(&[("x", Type::String, true)]);
        assert!(is_assignable(&Type::object(ok), &Type::object(target.clone())));
        assert!(!is_assignable(&Type::object(bad), &Type::object(target)));
    }

    #[rstest]
    #[case(Type::string_literal("a"), Type::String, true)]
    #[case(Type::String, Type::string_literal("a"), false)]
    #[case(Type::string_literal("a"), Type::union([Type::string_literal("a"), Type::string_literal("b")]), true)]
    #[case(Type::union([Type::string_literal("a"), Type::Int]), Type::String, false)]
    #[case(Type::array_of(Type::string_literal("x")), Type::array_of(Type::String), true)]
    #[case(Type::Int, Type::Any, true)]
    #[case(Type::Error, Type::Bool, true)]
    #[case(Type::Null, Type::String, false)]
    fn test_assignability(#[case] source: Type, #[case] target: Type, #[case] expected: bool) {
        assert_eq!(is_assignable(&source, &target), expected);
    }

    #[test]
    fn test_union_normalization() {
        let union = Type::union([
            Type::string_literal("a"),
            Type::union([Type::string_literal("a"), Type::Int]),
            Type::Literal(LiteralValue::Int(3)),
        ]);
        assert_eq!(union.to_string(), "'a' | int");
        assert_eq!(Type::union([Type::Int]), Type::Int);
        assert_eq!(Type::union([Type::Int, Type::Any]), Type::Any);
    }

    #[test]
    fn test_display() {
        let ty = Type::array_of(Type::object(obj(&[("a", Type::String, true), ("b", Type::Int, false)])));
        assert_eq!(ty.to_string(), "{ a: string, b?: int }[]");
        assert_eq!(Type::any_array().to_string(), "array");
        assert_eq!(Type::any_object().to_string(), "object");
    }

    #[test]
    fn test_signature_arity() {
        let sig = Signature {
            params: vec![Type::String, Type::Int],
            optional: 1,
            variadic: None,
            returns: Type::String,
        };
        assert!(sig.accepts_arity(1));
        assert!(sig.accepts_arity(2));
        assert!(!sig.accepts_arity(0));
        assert!(!sig.accepts_arity(3));
        assert_eq!(sig.to_string(), "(string, [int]): string");
    }
}
