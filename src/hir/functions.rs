//! Function library and decorator catalog.
//!
//! Built-in functions are grouped by namespace (`sys`, `az`). Each function
//! has an ordered overload set; a call resolves to the first overload whose
//! arity and parameter types accept the arguments.

use indexmap::IndexMap;
use smol_str::SmolStr;

use super::types::{FunctionType, ObjectType, PropertyType, Signature, Type, is_assignable};

/// A library function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub namespace: SmolStr,
    pub name: SmolStr,
    pub overloads: Vec<Signature>,
    /// Return type computed from argument types, overriding the overload's
    pub return_rule: Option<ReturnRule>,
}

/// Argument-dependent return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnRule {
    /// Element type of the first argument
    FirstElement,
    /// Union of all argument types
    ArgumentUnion,
    /// Same type as the first argument
    FirstArgument,
}

/// What went wrong when no overload accepted a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadError {
    /// The function has a single overload and the argument count is wrong
    ArgumentCount { expected: String, actual: usize },
    /// Nothing matched; `nearest` is the best candidate
    NoMatch { nearest: Signature },
    /// Argument `index` does not fit the single candidate
    Mismatch { index: usize, expected: Type },
}

impl FunctionDef {
    pub fn new(namespace: &str, name: &str, overloads: Vec<Signature>) -> Self {
        Self {
            namespace: SmolStr::new(namespace),
            name: SmolStr::new(name),
            overloads,
            return_rule: None,
        }
    }

    pub fn with_return_rule(mut self, rule: ReturnRule) -> Self {
        self.return_rule = Some(rule);
        self
    }

    pub fn as_type(&self) -> Type {
        Type::Function(std::sync::Arc::new(FunctionType {
            name: self.name.clone(),
            overloads: self.overloads.clone(),
        }))
    }

    /// Resolve a call with the given argument types to a return type.
    pub fn resolve(&self, args: &[Type]) -> Result<Type, OverloadError> {
        let signature = resolve_overload(&self.overloads, args)?;
        Ok(match self.return_rule {
            None => signature.returns.clone(),
            Some(ReturnRule::FirstElement) => match args.first() {
                Some(arg) if arg.is_string() => Type::String,
                Some(arg) => arg.element_type().unwrap_or(Type::Any),
                None => Type::Any,
            },
            Some(ReturnRule::ArgumentUnion) => {
                if args.is_empty() {
                    signature.returns.clone()
                } else {
                    Type::union(args.iter().map(|a| a.widen()))
                }
            }
            Some(ReturnRule::FirstArgument) => args
                .first()
                .map(Type::widen)
                .unwrap_or_else(|| signature.returns.clone()),
        })
    }
}

/// Pick the first overload accepting `args`: arity first, then each
/// parameter in declaration order.
pub fn resolve_overload<'a>(
    overloads: &'a [Signature],
    args: &[Type],
) -> Result<&'a Signature, OverloadError> {
    let by_arity: Vec<&Signature> = overloads
        .iter()
        .filter(|sig| sig.accepts_arity(args.len()))
        .collect();

    for sig in &by_arity {
        let fits = args.iter().enumerate().all(|(idx, arg)| {
            sig.param_type(idx)
                .is_some_and(|expected| is_assignable(arg, expected))
        });
        if fits {
            return Ok(sig);
        }
    }

    if let [only] = overloads {
        if by_arity.is_empty() {
            let expected = match (only.optional, &only.variadic) {
                (_, Some(_)) => format!("at least {}", only.min_args()),
                (0, None) => only.params.len().to_string(),
                _ => format!("{} to {}", only.min_args(), only.params.len()),
            };
            return Err(OverloadError::ArgumentCount {
                expected,
                actual: args.len(),
            });
        }
        let index = args
            .iter()
            .enumerate()
            .position(|(idx, arg)| {
                !only
                    .param_type(idx)
                    .is_some_and(|expected| is_assignable(arg, expected))
            })
            .unwrap_or(0);
        let expected = only.param_type(index).cloned().unwrap_or(Type::Any);
        return Err(OverloadError::Mismatch { index, expected });
    }

    let nearest = by_arity
        .first()
        .copied()
        .or_else(|| {
            overloads
                .iter()
                .min_by_key(|sig| arity_distance(sig, args.len()))
        })
        .cloned()
        .unwrap_or_else(|| Signature::new(Vec::new(), Type::Any));
    Err(OverloadError::NoMatch { nearest })
}

fn arity_distance(sig: &Signature, count: usize) -> usize {
    if count < sig.min_args() {
        sig.min_args() - count
    } else if sig.variadic.is_none() && count > sig.params.len() {
        count - sig.params.len()
    } else {
        0
    }
}

// ============================================================================
// DECORATORS
// ============================================================================

/// Declaration kinds a decorator may be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecoratorTarget {
    Parameter,
    Variable,
    Resource,
    Module,
    Output,
    TypeAlias,
    Function,
    /// A property inside an object type
    TypeProperty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoratorDef {
    pub name: SmolStr,
    pub signature: Signature,
    pub targets: &'static [DecoratorTarget],
    /// For loop declarations only
    pub loops_only: bool,
}

// ============================================================================
// LIBRARY
// ============================================================================

/// All functions and decorators visible to a compilation.
#[derive(Debug, Clone, Default)]
pub struct FunctionLibrary {
    functions: IndexMap<SmolStr, FunctionDef>,
    decorators: IndexMap<SmolStr, DecoratorDef>,
}

impl FunctionLibrary {
    /// A library with no functions or decorators.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, function: FunctionDef) {
        self.functions.insert(function.name.clone(), function);
    }

    pub fn with(mut self, function: FunctionDef) -> Self {
        self.insert(function);
        self
    }

    pub fn insert_decorator(&mut self, decorator: DecoratorDef) {
        self.decorators.insert(decorator.name.clone(), decorator);
    }

    /// Look up a function by name, optionally qualified by namespace.
    pub fn function(&self, namespace: Option<&str>, name: &str) -> Option<&FunctionDef> {
        let function = self.functions.get(name)?;
        match namespace {
            Some(ns) if ns != function.namespace => None,
            _ => Some(function),
        }
    }

    pub fn decorator(&self, name: &str) -> Option<&DecoratorDef> {
        self.decorators.get(name)
    }

    pub fn is_namespace(&self, name: &str) -> bool {
        self.functions.values().any(|f| f.namespace == name)
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDef> {
        self.functions.values()
    }

    /// The standard `sys` and `az` functions and decorators.
    pub fn builtin() -> Self {
        let mut lib = Self::empty();
        for function in sys_functions().into_iter().chain(az_functions()) {
            lib.insert(function);
        }
        for decorator in decorators() {
            lib.insert_decorator(decorator);
        }
        lib
    }
}

fn sig(params: &[Type], returns: Type) -> Signature {
    Signature::new(params.to_vec(), returns)
}

fn variadic(params: &[Type], rest: Type, returns: Type) -> Signature {
    Signature {
        params: params.to_vec(),
        optional: 0,
        variadic: Some(rest),
        returns,
    }
}

fn optional(params: &[Type], optional: usize, returns: Type) -> Signature {
    Signature {
        params: params.to_vec(),
        optional,
        variadic: None,
        returns,
    }
}

fn sys_functions() -> Vec<FunctionDef> {
    use Type::{Any, Bool, Int, String};
    let array = Type::any_array();
    let object = Type::any_object();
    let string_array = Type::array_of(String);
    let f = |name: &str, overloads: Vec<Signature>| FunctionDef::new("sys", name, overloads);

    vec![
        f("any", vec![sig(&[Any], Any)]),
        f(
            "concat",
            vec![
                variadic(&[], String, String),
                variadic(&[], array.clone(), array.clone()),
            ],
        ),
        f("format", vec![variadic(&[String], Any, String)]),
        f("string", vec![sig(&[Any], String)]),
        f("int", vec![sig(&[Type::union([String, Int])], Int)]),
        f("bool", vec![sig(&[Type::union([String, Bool])], Bool)]),
        f("json", vec![sig(&[String], Any)]),
        f("toLower", vec![sig(&[String], String)]),
        f("toUpper", vec![sig(&[String], String)]),
        f("trim", vec![sig(&[String], String)]),
        f("substring", vec![optional(&[String, Int, Int], 1, String)]),
        f("replace", vec![sig(&[String, String, String], String)]),
        f("split", vec![sig(&[String, Type::union([String, string_array.clone()])], string_array.clone())]),
        f("join", vec![sig(&[string_array.clone(), String], String)]),
        f("startsWith", vec![sig(&[String, String], Bool)]),
        f("endsWith", vec![sig(&[String, String], Bool)]),
        f("indexOf", vec![sig(&[String, String], Int), sig(&[array.clone(), Any], Int)]),
        f("lastIndexOf", vec![sig(&[String, String], Int), sig(&[array.clone(), Any], Int)]),
        f(
            "contains",
            vec![
                sig(&[String, String], Bool),
                sig(&[array.clone(), Any], Bool),
                sig(&[object.clone(), String], Bool),
            ],
        ),
        f(
            "length",
            vec![
                sig(&[String], Int),
                sig(&[array.clone()], Int),
                sig(&[object.clone()], Int),
            ],
        ),
        f("empty", vec![sig(&[Type::union([String, array.clone(), object.clone(), Type::Null])], Bool)]),
        f("first", vec![sig(&[String], String), sig(&[array.clone()], Any)])
            .with_return_rule(ReturnRule::FirstElement),
        f("last", vec![sig(&[String], String), sig(&[array.clone()], Any)])
            .with_return_rule(ReturnRule::FirstElement),
        f("take", vec![sig(&[String, Int], String), sig(&[array.clone(), Int], array.clone())])
            .with_return_rule(ReturnRule::FirstArgument),
        f("skip", vec![sig(&[String, Int], String), sig(&[array.clone(), Int], array.clone())])
            .with_return_rule(ReturnRule::FirstArgument),
        f("range", vec![sig(&[Int, Int], Type::array_of(Int))]),
        f("array", vec![sig(&[Any], array.clone())]),
        f(
            "union",
            vec![
                variadic(&[object.clone()], object.clone(), object.clone()),
                variadic(&[array.clone()], array.clone(), array.clone()),
            ],
        ),
        f(
            "intersection",
            vec![
                variadic(&[object.clone()], object.clone(), object.clone()),
                variadic(&[array.clone()], array.clone(), array.clone()),
            ],
        ),
        f("min", vec![variadic(&[Int], Int, Int), sig(&[Type::array_of(Int)], Int)]),
        f("max", vec![variadic(&[Int], Int, Int), sig(&[Type::array_of(Int)], Int)]),
        f("coalesce", vec![variadic(&[Any], Any, Any)])
            .with_return_rule(ReturnRule::ArgumentUnion),
        f("uniqueString", vec![variadic(&[String], String, String)]),
        f("guid", vec![variadic(&[String], String, String)]),
        f("newGuid", vec![sig(&[], String)]),
        f("utcNow", vec![optional(&[String], 1, String)]),
        f("base64", vec![sig(&[String], String)]),
        f("base64ToString", vec![sig(&[String], String)]),
        f("uri", vec![sig(&[String, String], String)]),
    ]
}

fn az_functions() -> Vec<FunctionDef> {
    use Type::String;
    let f = |name: &str, overloads: Vec<Signature>| FunctionDef::new("az", name, overloads);
    let scope = |extra: &[&str]| {
        let mut object = ObjectType::new()
            .with("id", PropertyType::required(String))
            .with("name", PropertyType::required(String));
        for name in extra {
            object = object.with(name, PropertyType::required(String));
        }
        Type::object(object)
    };
    let resource_group = scope(&["location", "type"]);
    let subscription = scope(&["subscriptionId", "tenantId", "displayName"]);

    vec![
        f(
            "resourceGroup",
            vec![
                sig(&[], resource_group.clone()),
                sig(&[String], resource_group.clone()),
                sig(&[String, String], resource_group),
            ],
        ),
        f("subscription", vec![sig(&[], subscription.clone()), sig(&[String], subscription)]),
        f("managementGroup", vec![sig(&[], scope(&[])), sig(&[String], scope(&[]))]),
        f("tenant", vec![sig(&[], scope(&["tenantId"]))]),
        f("deployment", vec![sig(&[], Type::any_object())]),
        f("environment", vec![sig(&[], Type::any_object())]),
        f("resourceId", vec![variadic(&[String, String], String, String)]),
        f("subscriptionResourceId", vec![variadic(&[String, String], String, String)]),
        f("tenantResourceId", vec![variadic(&[String, String], String, String)]),
        f("extensionResourceId", vec![variadic(&[String, String, String], String, String)]),
        f("reference", vec![optional(&[String, String, String], 2, Type::any_object())]),
        f("listKeys", vec![sig(&[String, String], Type::any_object())]),
        f("pickZones", vec![optional(&[String, String, String, Type::Int, Type::Int], 2, Type::array_of(String))]),
    ]
}

fn decorators() -> Vec<DecoratorDef> {
    use DecoratorTarget::*;
    use Type::{Int, String};
    const ALL: &[DecoratorTarget] = &[
        Parameter,
        Variable,
        Resource,
        Module,
        Output,
        TypeAlias,
        Function,
        TypeProperty,
    ];
    const CONSTRAINTS: &[DecoratorTarget] = &[Parameter, Output, TypeAlias, TypeProperty];
    let d = |name: &str, signature: Signature, targets: &'static [DecoratorTarget]| DecoratorDef {
        name: SmolStr::new(name),
        signature,
        targets,
        loops_only: false,
    };

    vec![
        d("description", sig(&[String], Type::Any), ALL),
        d("metadata", sig(&[Type::any_object()], Type::Any), ALL),
        d("allowed", sig(&[Type::any_array()], Type::Any), &[Parameter, Output, TypeProperty]),
        d("minValue", sig(&[Int], Type::Any), CONSTRAINTS),
        d("maxValue", sig(&[Int], Type::Any), CONSTRAINTS),
        d("minLength", sig(&[Int], Type::Any), CONSTRAINTS),
        d("maxLength", sig(&[Int], Type::Any), CONSTRAINTS),
        d("secure", sig(&[], Type::Any), &[Parameter, Output, TypeAlias, TypeProperty]),
        d("sealed", sig(&[], Type::Any), &[Parameter, Output, TypeAlias, TypeProperty]),
        DecoratorDef {
            loops_only: true,
            ..d("batchSize", sig(&[Int], Type::Any), &[Resource, Module])
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_overloads() -> FunctionDef {
        FunctionDef::new(
            "sys",
            "greet",
            vec![
                sig(&[Type::String], Type::String),
                sig(&[Type::String, Type::Int], Type::String),
            ],
        )
    }

    #[test]
    fn test_second_overload_selected_by_arity() {
        let function = two_overloads();
        let resolved = resolve_overload(&function.overloads, &[Type::String, Type::Int]).unwrap();
        assert_eq!(resolved.params.len(), 2);
    }

    #[test]
    fn test_zero_arguments_has_no_matching_overload() {
        let function = two_overloads();
        match function.resolve(&[]) {
            Err(OverloadError::NoMatch { nearest }) => assert_eq!(nearest.params, vec![Type::String]),
            other => panic!("expected NoMatch, got {:?}", other),
        }
    }

    #[test]
    fn test_first_compatible_overload_wins() {
        let lib = FunctionLibrary::builtin();
        let concat = lib.function(None, "concat").unwrap();
        assert_eq!(concat.resolve(&[Type::string_literal("a"), Type::String]), Ok(Type::String));
        assert_eq!(
            concat.resolve(&[Type::any_array(), Type::array_of(Type::Int)]),
            Ok(Type::any_array())
        );
        assert!(matches!(
            concat.resolve(&[Type::String, Type::Int]),
            Err(OverloadError::NoMatch { .. })
        ));
    }

    #[test]
    fn test_single_overload_errors() {
        let lib = FunctionLibrary::builtin();
        let to_lower = lib.function(Some("sys"), "toLower").unwrap();
        assert_eq!(
            to_lower.resolve(&[]),
            Err(OverloadError::ArgumentCount {
                expected: "1".into(),
                actual: 0
            })
        );
        assert_eq!(
            to_lower.resolve(&[Type::Int]),
            Err(OverloadError::Mismatch {
                index: 0,
                expected: Type::String
            })
        );
        assert!(lib.function(Some("az"), "toLower").is_none());
    }

    #[test]
    fn test_return_rules() {
        let lib = FunctionLibrary::builtin();
        let first = lib.function(None, "first").unwrap();
        assert_eq!(first.resolve(&[Type::array_of(Type::Int)]), Ok(Type::Int));
        let coalesce = lib.function(None, "coalesce").unwrap();
        assert_eq!(
            coalesce.resolve(&[Type::Null, Type::string_literal("x")]),
            Ok(Type::union([Type::Null, Type::String]))
        );
    }

    #[test]
    fn test_decorator_catalog() {
        let lib = FunctionLibrary::builtin();
        let batch = lib.decorator("batchSize").unwrap();
        assert!(batch.loops_only);
        assert!(!batch.targets.contains(&DecoratorTarget::Parameter));
        assert!(lib.decorator("description").unwrap().targets.contains(&DecoratorTarget::Function));
        assert!(lib.is_namespace("az"));
    }
}
