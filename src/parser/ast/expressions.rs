//! Expression nodes

use super::{AstNode, Name, ast_node, child_token, name_token};
use crate::parser::lexer::string_piece_value;
use crate::parser::{SyntaxKind, SyntaxNode, SyntaxToken};
use rowan::NodeOrToken;
use smol_str::SmolStr;

/// Any expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(LiteralExpr),
    String(StringExpr),
    NameRef(NameRef),
    Call(CallExpr),
    Member(MemberExpr),
    Index(IndexExpr),
    Array(ArrayExpr),
    Object(ObjectExpr),
    Paren(ParenExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Ternary(TernaryExpr),
    For(ForExpr),
    /// Only valid as a resource/module body or a loop body
    If(IfBody),
}

impl AstNode for Expr {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::LITERAL
                | SyntaxKind::STRING_EXPR
                | SyntaxKind::NAME_REF
                | SyntaxKind::CALL_EXPR
                | SyntaxKind::MEMBER_EXPR
                | SyntaxKind::INDEX_EXPR
                | SyntaxKind::ARRAY_EXPR
                | SyntaxKind::OBJECT_EXPR
                | SyntaxKind::PAREN_EXPR
                | SyntaxKind::UNARY_EXPR
                | SyntaxKind::BINARY_EXPR
                | SyntaxKind::TERNARY_EXPR
                | SyntaxKind::FOR_EXPR
                | SyntaxKind::IF_BODY
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        Some(match node.kind() {
            SyntaxKind::LITERAL => Self::Literal(LiteralExpr(node)),
            SyntaxKind::STRING_EXPR => Self::String(StringExpr(node)),
            SyntaxKind::NAME_REF => Self::NameRef(NameRef(node)),
            SyntaxKind::CALL_EXPR => Self::Call(CallExpr(node)),
            SyntaxKind::MEMBER_EXPR => Self::Member(MemberExpr(node)),
            SyntaxKind::INDEX_EXPR => Self::Index(IndexExpr(node)),
            SyntaxKind::ARRAY_EXPR => Self::Array(ArrayExpr(node)),
            SyntaxKind::OBJECT_EXPR => Self::Object(ObjectExpr(node)),
            SyntaxKind::PAREN_EXPR => Self::Paren(ParenExpr(node)),
            SyntaxKind::UNARY_EXPR => Self::Unary(UnaryExpr(node)),
            SyntaxKind::BINARY_EXPR => Self::Binary(BinaryExpr(node)),
            SyntaxKind::TERNARY_EXPR => Self::Ternary(TernaryExpr(node)),
            SyntaxKind::FOR_EXPR => Self::For(ForExpr(node)),
            SyntaxKind::IF_BODY => Self::If(IfBody(node)),
            _ => return None,
        })
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Literal(n) => n.syntax(),
            Self::String(n) => n.syntax(),
            Self::NameRef(n) => n.syntax(),
            Self::Call(n) => n.syntax(),
            Self::Member(n) => n.syntax(),
            Self::Index(n) => n.syntax(),
            Self::Array(n) => n.syntax(),
            Self::Object(n) => n.syntax(),
            Self::Paren(n) => n.syntax(),
            Self::Unary(n) => n.syntax(),
            Self::Binary(n) => n.syntax(),
            Self::Ternary(n) => n.syntax(),
            Self::For(n) => n.syntax(),
            Self::If(n) => n.syntax(),
        }
    }
}

impl Expr {
    /// Strip any number of enclosing parentheses
    pub fn unparenthesized(self) -> Option<Expr> {
        let mut expr = self;
        while let Expr::Paren(paren) = &expr {
            expr = paren.inner()?;
        }
        Some(expr)
    }
}

fn nth_expr(node: &SyntaxNode, n: usize) -> Option<Expr> {
    node.children().filter_map(Expr::cast).nth(n)
}

// ============================================================================
// Literals and strings
// ============================================================================

ast_node!(LiteralExpr, LITERAL);

/// Value of a non-string literal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    /// `None` when the integer does not fit in i64
    Int(Option<i64>),
    Bool(bool),
    Null,
}

impl LiteralExpr {
    pub fn value(&self) -> Option<LiteralValue> {
        let token = self.0.first_token()?;
        Some(match token.kind() {
            SyntaxKind::INTEGER => LiteralValue::Int(token.text().parse().ok()),
            SyntaxKind::TRUE_KW => LiteralValue::Bool(true),
            SyntaxKind::FALSE_KW => LiteralValue::Bool(false),
            SyntaxKind::NULL_KW => LiteralValue::Null,
            _ => return None,
        })
    }
}

ast_node!(StringExpr, STRING_EXPR);

/// A piece of a string: literal text or an interpolated expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringSegment {
    Text(String),
    Expr(Expr),
}

impl StringExpr {
    pub fn is_interpolated(&self) -> bool {
        child_token(&self.0, SyntaxKind::STRING_LEFT_PIECE).is_some()
    }

    /// Decoded value of a string without interpolation holes
    pub fn literal_value(&self) -> Option<String> {
        let token = self
            .0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| matches!(t.kind(), SyntaxKind::STRING_COMPLETE | SyntaxKind::MULTILINE_STRING))?;
        Some(string_piece_value(token.kind(), token.text()))
    }

    /// Alternating text and expression segments, in source order. Empty text
    /// pieces are omitted.
    pub fn segments(&self) -> Vec<StringSegment> {
        let mut segments = Vec::new();
        for element in self.0.children_with_tokens() {
            match element {
                NodeOrToken::Token(token) => match token.kind() {
                    SyntaxKind::STRING_COMPLETE
                    | SyntaxKind::MULTILINE_STRING
                    | SyntaxKind::STRING_LEFT_PIECE
                    | SyntaxKind::STRING_MIDDLE_PIECE
                    | SyntaxKind::STRING_RIGHT_PIECE => {
                        let text = string_piece_value(token.kind(), token.text());
                        if !text.is_empty() {
                            segments.push(StringSegment::Text(text));
                        }
                    }
                    _ => {}
                },
                NodeOrToken::Node(node) => {
                    if let Some(expr) = Expr::cast(node) {
                        segments.push(StringSegment::Expr(expr));
                    }
                }
            }
        }
        segments
    }

    /// Interpolated expressions only
    pub fn holes(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0.children().filter_map(Expr::cast)
    }
}

// ============================================================================
// Names, calls and access
// ============================================================================

ast_node!(NameRef, NAME_REF);

impl NameRef {
    pub fn token(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }

    pub fn text(&self) -> Option<SmolStr> {
        self.token().map(|t| SmolStr::new(t.text()))
    }
}

ast_node!(CallExpr, CALL_EXPR);

impl CallExpr {
    pub fn callee(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    /// Function name; for `ns.f(...)` this is `f`
    pub fn function_name(&self) -> Option<SmolStr> {
        match self.callee()? {
            Expr::NameRef(name) => name.text(),
            Expr::Member(member) => member.member_name(),
            _ => None,
        }
    }

    /// Namespace qualifier for `ns.f(...)` calls
    pub fn namespace(&self) -> Option<SmolStr> {
        match self.callee()? {
            Expr::Member(member) => match member.base()? {
                Expr::NameRef(name) => name.text(),
                _ => None,
            },
            _ => None,
        }
    }

    /// The token naming the function, for diagnostics
    pub fn name_range(&self) -> Option<rowan::TextRange> {
        match self.callee()? {
            Expr::NameRef(name) => Some(name.syntax().text_range()),
            Expr::Member(member) => member.member_token().map(|t| t.text_range()),
            other => Some(other.syntax().text_range()),
        }
    }

    pub fn arg_list(&self) -> Option<ArgList> {
        self.0.children().find_map(ArgList::cast)
    }

    pub fn args(&self) -> impl Iterator<Item = Expr> {
        self.arg_list()
            .into_iter()
            .flat_map(|list| list.0.children().filter_map(Expr::cast).collect::<Vec<_>>())
    }
}

ast_node!(ArgList, ARG_LIST);

ast_node!(MemberExpr, MEMBER_EXPR);

impl MemberExpr {
    pub fn base(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    /// The property name token after the dot
    pub fn member_token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .skip_while(|t| t.kind() != SyntaxKind::DOT)
            .skip(1)
            .find(|t| t.kind() == SyntaxKind::IDENT || t.kind().is_keyword())
    }

    pub fn member_name(&self) -> Option<SmolStr> {
        self.member_token().map(|t| SmolStr::new(t.text()))
    }
}

ast_node!(IndexExpr, INDEX_EXPR);

impl IndexExpr {
    pub fn base(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn index(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }
}

// ============================================================================
// Arrays and objects
// ============================================================================

ast_node!(ArrayExpr, ARRAY_EXPR);

impl ArrayExpr {
    pub fn items(&self) -> impl Iterator<Item = Expr> + '_ {
        self.0
            .children()
            .filter(|n| n.kind() == SyntaxKind::ARRAY_ITEM)
            .filter_map(|item| item.children().find_map(Expr::cast))
    }
}

ast_node!(ObjectExpr, OBJECT_EXPR);

impl ObjectExpr {
    pub fn properties(&self) -> impl Iterator<Item = ObjectProperty> + '_ {
        self.0.children().filter_map(ObjectProperty::cast)
    }

    /// First property with the given literal key
    pub fn property(&self, key: &str) -> Option<ObjectProperty> {
        self.properties()
            .find(|p| p.key().and_then(|k| k.text()).as_deref() == Some(key))
    }
}

ast_node!(ObjectProperty, OBJECT_PROPERTY);

impl ObjectProperty {
    pub fn key(&self) -> Option<PropertyKey> {
        self.0.children().find_map(PropertyKey::cast)
    }

    pub fn value(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

ast_node!(PropertyKey, PROPERTY_KEY);

impl PropertyKey {
    /// Key text for identifier keys and non-interpolated string keys
    pub fn text(&self) -> Option<String> {
        if let Some(token) = name_token(&self.0) {
            return Some(token.text().to_string());
        }
        let string = self.string()?;
        string.literal_value()
    }

    /// The key expression when it is written as a string
    pub fn string(&self) -> Option<StringExpr> {
        self.0.children().find_map(StringExpr::cast)
    }
}

// ============================================================================
// Operators
// ============================================================================

ast_node!(ParenExpr, PAREN_EXPR);

impl ParenExpr {
    pub fn inner(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Negate,
}

ast_node!(UnaryExpr, UNARY_EXPR);

impl UnaryExpr {
    pub fn op(&self) -> Option<UnaryOp> {
        let token = self.0.first_token()?;
        match token.kind() {
            SyntaxKind::BANG => Some(UnaryOp::Not),
            SyntaxKind::MINUS => Some(UnaryOp::Negate),
            _ => None,
        }
    }

    pub fn operand(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Coalesce,
    Or,
    And,
    Equals,
    NotEquals,
    EqualsInsensitive,
    NotEqualsInsensitive,
    Less,
    Greater,
    LessOrEquals,
    GreaterOrEquals,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOp {
    fn from_kind(kind: SyntaxKind) -> Option<Self> {
        Some(match kind {
            SyntaxKind::QUESTION_QUESTION => Self::Coalesce,
            SyntaxKind::PIPE_PIPE => Self::Or,
            SyntaxKind::AMP_AMP => Self::And,
            SyntaxKind::EQ_EQ => Self::Equals,
            SyntaxKind::BANG_EQ => Self::NotEquals,
            SyntaxKind::EQ_TILDE => Self::EqualsInsensitive,
            SyntaxKind::BANG_TILDE => Self::NotEqualsInsensitive,
            SyntaxKind::LT => Self::Less,
            SyntaxKind::GT => Self::Greater,
            SyntaxKind::LT_EQ => Self::LessOrEquals,
            SyntaxKind::GT_EQ => Self::GreaterOrEquals,
            SyntaxKind::PLUS => Self::Add,
            SyntaxKind::MINUS => Self::Subtract,
            SyntaxKind::STAR => Self::Multiply,
            SyntaxKind::SLASH => Self::Divide,
            SyntaxKind::PERCENT => Self::Modulo,
            _ => return None,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Coalesce => "??",
            Self::Or => "||",
            Self::And => "&&",
            Self::Equals => "==",
            Self::NotEquals => "!=",
            Self::EqualsInsensitive => "=~",
            Self::NotEqualsInsensitive => "!~",
            Self::Less => "<",
            Self::Greater => ">",
            Self::LessOrEquals => "<=",
            Self::GreaterOrEquals => ">=",
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        }
    }
}

ast_node!(BinaryExpr, BINARY_EXPR);

impl BinaryExpr {
    pub fn lhs(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn rhs(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }

    pub fn op_token(&self) -> Option<SyntaxToken> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| BinaryOp::from_kind(t.kind()).is_some())
    }

    pub fn op(&self) -> Option<BinaryOp> {
        self.op_token().and_then(|t| BinaryOp::from_kind(t.kind()))
    }
}

ast_node!(TernaryExpr, TERNARY_EXPR);

impl TernaryExpr {
    pub fn condition(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn then_branch(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }

    pub fn else_branch(&self) -> Option<Expr> {
        nth_expr(&self.0, 2)
    }
}

// ============================================================================
// Loops and conditions
// ============================================================================

ast_node!(ForExpr, FOR_EXPR);

impl ForExpr {
    fn names(&self) -> Vec<Name> {
        let mut names: Vec<Name> = self.0.children().filter_map(Name::cast).collect();
        if let Some(vars) = self.0.children().find(|n| n.kind() == SyntaxKind::FOR_VARIABLES) {
            names.extend(vars.children().filter_map(Name::cast));
        }
        names
    }

    pub fn item_name(&self) -> Option<Name> {
        self.names().into_iter().next()
    }

    pub fn index_name(&self) -> Option<Name> {
        self.names().into_iter().nth(1)
    }

    /// The collection being iterated
    pub fn iterable(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    /// The per-iteration body, possibly an `if` body
    pub fn body(&self) -> Option<Expr> {
        nth_expr(&self.0, 1)
    }
}

ast_node!(IfBody, IF_BODY);

impl IfBody {
    pub fn condition(&self) -> Option<Expr> {
        nth_expr(&self.0, 0)
    }

    pub fn body(&self) -> Option<ObjectExpr> {
        self.0.children().find_map(ObjectExpr::cast)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn first_expr(text: &str) -> Expr {
        parse(text)
            .syntax()
            .descendants()
            .find_map(Expr::cast)
            .unwrap()
    }

    #[test]
    fn test_string_segments() {
        let Expr::String(s) = first_expr("var x = 'pre-${a}-${b.c}'") else {
            panic!("expected string");
        };
        assert!(s.is_interpolated());
        let segments = s.segments();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[0], StringSegment::Text("pre-".into()));
        assert!(matches!(segments[1], StringSegment::Expr(Expr::NameRef(_))));
        assert_eq!(segments[2], StringSegment::Text("-".into()));
        assert!(matches!(segments[3], StringSegment::Expr(Expr::Member(_))));
        assert_eq!(s.literal_value(), None);
    }

    #[test]
    fn test_call_with_namespace() {
        let Expr::Call(call) = first_expr("var x = sys.concat('a', 'b')") else {
            panic!("expected call");
        };
        assert_eq!(call.function_name().as_deref(), Some("concat"));
        assert_eq!(call.namespace().as_deref(), Some("sys"));
        assert_eq!(call.args().count(), 2);
    }

    #[test]
    fn test_binary_operands() {
        let Expr::Binary(bin) = first_expr("var x = a =~ 'B'") else {
            panic!("expected binary");
        };
        assert_eq!(bin.op(), Some(BinaryOp::EqualsInsensitive));
        assert!(matches!(bin.lhs(), Some(Expr::NameRef(_))));
        assert!(matches!(bin.rhs(), Some(Expr::String(_))));
    }

    #[test]
    fn test_object_keys() {
        let Expr::Object(obj) = first_expr("var x = {\n  name: 1\n  'my-key': 2\n  if: 3\n}") else {
            panic!("expected object");
        };
        let keys: Vec<_> = obj
            .properties()
            .filter_map(|p| p.key()?.text())
            .collect();
        assert_eq!(keys, vec!["name", "my-key", "if"]);
        assert!(obj.property("my-key").is_some());
    }

    #[test]
    fn test_for_expr_parts() {
        let Expr::For(f) = first_expr("var x = [for (item, i) in range(0, 3): item * i]") else {
            panic!("expected for");
        };
        assert_eq!(f.item_name().and_then(|n| n.text()).as_deref(), Some("item"));
        assert_eq!(f.index_name().and_then(|n| n.text()).as_deref(), Some("i"));
        assert!(matches!(f.iterable(), Some(Expr::Call(_))));
        assert!(matches!(f.body(), Some(Expr::Binary(_))));
    }

    #[test]
    fn test_literal_values() {
        assert_eq!(
            match first_expr("var x = 42") {
                Expr::Literal(l) => l.value(),
                _ => None,
            },
            Some(LiteralValue::Int(Some(42)))
        );
        assert_eq!(
            match first_expr("var x = null") {
                Expr::Literal(l) => l.value(),
                _ => None,
            },
            Some(LiteralValue::Null)
        );
    }
}
