//! Type expression nodes

use super::{AstNode, Decorator, PropertyKey, ast_node, child_token, name_token};
use crate::parser::lexer::string_piece_value;
use crate::parser::{SyntaxKind, SyntaxNode};
use smol_str::SmolStr;

/// Any type expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeExpr {
    Ref(TypeRef),
    Literal(LiteralType),
    Union(UnionType),
    Array(ArrayType),
    Object(ObjectType),
    Paren(ParenType),
}

impl AstNode for TypeExpr {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::TYPE_REF
                | SyntaxKind::LITERAL_TYPE
                | SyntaxKind::UNION_TYPE
                | SyntaxKind::ARRAY_TYPE
                | SyntaxKind::OBJECT_TYPE
                | SyntaxKind::PAREN_TYPE
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        Some(match node.kind() {
            SyntaxKind::TYPE_REF => Self::Ref(TypeRef(node)),
            SyntaxKind::LITERAL_TYPE => Self::Literal(LiteralType(node)),
            SyntaxKind::UNION_TYPE => Self::Union(UnionType(node)),
            SyntaxKind::ARRAY_TYPE => Self::Array(ArrayType(node)),
            SyntaxKind::OBJECT_TYPE => Self::Object(ObjectType(node)),
            SyntaxKind::PAREN_TYPE => Self::Paren(ParenType(node)),
            _ => return None,
        })
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Ref(n) => n.syntax(),
            Self::Literal(n) => n.syntax(),
            Self::Union(n) => n.syntax(),
            Self::Array(n) => n.syntax(),
            Self::Object(n) => n.syntax(),
            Self::Paren(n) => n.syntax(),
        }
    }
}

ast_node!(TypeRef, TYPE_REF);

impl TypeRef {
    pub fn name(&self) -> Option<SmolStr> {
        name_token(&self.0).map(|t| SmolStr::new(t.text()))
    }
}

ast_node!(LiteralType, LITERAL_TYPE);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralTypeValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl LiteralType {
    pub fn value(&self) -> Option<LiteralTypeValue> {
        let negative = child_token(&self.0, SyntaxKind::MINUS).is_some();
        let token = self
            .0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| !t.kind().is_trivia() && t.kind() != SyntaxKind::MINUS)?;
        Some(match token.kind() {
            SyntaxKind::STRING_COMPLETE | SyntaxKind::MULTILINE_STRING => {
                LiteralTypeValue::String(string_piece_value(token.kind(), token.text()))
            }
            SyntaxKind::INTEGER => {
                let value: i64 = token.text().parse().ok()?;
                LiteralTypeValue::Int(if negative { -value } else { value })
            }
            SyntaxKind::TRUE_KW => LiteralTypeValue::Bool(true),
            SyntaxKind::FALSE_KW => LiteralTypeValue::Bool(false),
            _ => return None,
        })
    }
}

ast_node!(UnionType, UNION_TYPE);

impl UnionType {
    pub fn members(&self) -> impl Iterator<Item = TypeExpr> + '_ {
        self.0.children().filter_map(TypeExpr::cast)
    }
}

ast_node!(ArrayType, ARRAY_TYPE);

impl ArrayType {
    pub fn element(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }
}

ast_node!(ParenType, PAREN_TYPE);

impl ParenType {
    pub fn inner(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }
}

ast_node!(ObjectType, OBJECT_TYPE);

impl ObjectType {
    pub fn properties(&self) -> impl Iterator<Item = ObjectTypeProperty> + '_ {
        self.0.children().filter_map(ObjectTypeProperty::cast)
    }
}

ast_node!(ObjectTypeProperty, OBJECT_TYPE_PROPERTY);

impl ObjectTypeProperty {
    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    pub fn key(&self) -> Option<PropertyKey> {
        self.0.children().find_map(PropertyKey::cast)
    }

    /// `*: T` declares the type of additional properties
    pub fn is_additional_properties(&self) -> bool {
        child_token(&self.0, SyntaxKind::STAR).is_some()
    }

    pub fn is_optional(&self) -> bool {
        child_token(&self.0, SyntaxKind::QUESTION).is_some()
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }
}
