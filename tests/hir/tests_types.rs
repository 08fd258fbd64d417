use rstest::rstest;

use bicep::hir::{FunctionLibrary, ObjectType, OverloadError, PropertyType, Type, is_assignable};

fn object(properties: &[(&str, Type, bool)]) -> ObjectType {
    properties.iter().fold(ObjectType::new(), |object, (name, ty, required)| {
        let property = if *required {
            PropertyType::required(ty.clone())
        } else {
            PropertyType::optional(ty.clone())
        };
        object.with(name, property)
    })
}

#[test]
fn test_width_subtyping_accepts_extra_properties() {
    let wide = Type::object(object(&[("a", Type::String, true), ("b", Type::Int, true)]));
    let narrow = object(&[("a", Type::String, true)]);
    assert!(is_assignable(&wide, &Type::object(narrow.clone())));
    assert!(!is_assignable(&wide, &Type::object(narrow.sealed())));
}

#[test]
fn test_missing_required_property_is_not_assignable() {
    let source = Type::object(object(&[("a", Type::String, true)]));
    let target = Type::object(object(&[("a", Type::String, true), ("b", Type::Int, true)]));
    assert!(!is_assignable(&source, &target));

    let optional = Type::object(object(&[("a", Type::String, true), ("b", Type::Int, false)]));
    assert!(is_assignable(&source, &optional));
}

#[rstest]
#[case(Type::string_literal("x"), Type::String, true)]
#[case(Type::String, Type::string_literal("x"), false)]
#[case(Type::Int, Type::union([Type::Int, Type::String]), true)]
#[case(Type::union([Type::Int, Type::String]), Type::Int, false)]
#[case(Type::Any, Type::Int, true)]
#[case(Type::array_of(Type::string_literal("a")), Type::array_of(Type::String), true)]
#[case(Type::array_of(Type::Int), Type::array_of(Type::String), false)]
#[case(Type::Bool, Type::any_object(), false)]
fn test_assignability(#[case] source: Type, #[case] target: Type, #[case] expected: bool) {
    assert_eq!(is_assignable(&source, &target), expected, "{} -> {}", source, target);
}

#[test]
fn test_overload_resolution_by_argument_types() {
    let library = FunctionLibrary::builtin();
    let length = library.function(None, "length").unwrap();
    assert_eq!(length.resolve(&[Type::String]), Ok(Type::Int));
    assert_eq!(length.resolve(&[Type::any_array()]), Ok(Type::Int));
    assert!(length.resolve(&[Type::Bool]).is_err());
}

#[test]
fn test_overload_resolution_by_arity() {
    let library = FunctionLibrary::builtin();
    let to_lower = library.function(None, "toLower").unwrap();
    assert!(matches!(
        to_lower.resolve(&[]),
        Err(OverloadError::ArgumentCount { actual: 0, .. })
    ));
    assert!(matches!(
        to_lower.resolve(&[Type::Int]),
        Err(OverloadError::Mismatch { index: 0, .. })
    ));
}

#[test]
fn test_namespaced_lookup() {
    let library = FunctionLibrary::builtin();
    assert!(library.function(Some("sys"), "toLower").is_some());
    assert!(library.function(Some("az"), "resourceGroup").is_some());
    assert!(library.function(Some("az"), "toLower").is_none());
    assert!(library.is_namespace("sys"));
}
