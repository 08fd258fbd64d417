//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree.

/// All syntax kinds (tokens and nodes)
///
/// Tokens are leaves (identifiers, keywords, literals, punctuation, trivia).
/// Nodes are composite (declarations, expressions, type expressions).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace and comments - preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,

    /// Statement terminator; insignificant inside parentheses
    NEWLINE,

    // =========================================================================
    // LITERALS
    // =========================================================================
    IDENT,
    INTEGER,
    STRING_COMPLETE,     // 'abc'
    STRING_LEFT_PIECE,   // 'abc${
    STRING_MIDDLE_PIECE, // }abc${
    STRING_RIGHT_PIECE,  // }abc'
    MULTILINE_STRING,    // '''abc'''

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    L_BRACE,           // {
    R_BRACE,           // }
    L_BRACKET,         // [
    R_BRACKET,         // ]
    L_PAREN,           // (
    R_PAREN,           // )
    COMMA,             // ,
    DOT,               // .
    COLON,             // :
    QUESTION,          // ?
    QUESTION_QUESTION, // ??
    EQ,                // =
    EQ_EQ,             // ==
    BANG_EQ,           // !=
    EQ_TILDE,          // =~
    BANG_TILDE,        // !~
    LT,                // <
    GT,                // >
    LT_EQ,             // <=
    GT_EQ,             // >=
    PLUS,              // +
    MINUS,             // -
    STAR,              // *
    SLASH,             // /
    PERCENT,           // %
    BANG,              // !
    AMP_AMP,           // &&
    PIPE_PIPE,         // ||
    PIPE,              // |
    AT,                // @
    FAT_ARROW,         // =>

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    PARAM_KW,
    VAR_KW,
    RESOURCE_KW,
    MODULE_KW,
    OUTPUT_KW,
    TYPE_KW,
    FUNC_KW,
    USING_KW,
    TARGET_SCOPE_KW,
    EXISTING_KW,
    IF_KW,
    FOR_KW,
    IN_KW,
    TRUE_KW,
    FALSE_KW,
    NULL_KW,

    // =========================================================================
    // NODES - file and declarations
    // =========================================================================
    SOURCE_FILE,
    PARAM_DECL,
    VAR_DECL,
    RESOURCE_DECL,
    MODULE_DECL,
    OUTPUT_DECL,
    TYPE_DECL,
    FUNC_DECL,
    USING_DECL,
    TARGET_SCOPE_DECL,
    DECORATOR,
    NAME,
    FUNC_PARAM_LIST,
    FUNC_PARAM,
    PARAM_DEFAULT,

    // =========================================================================
    // NODES - type expressions
    // =========================================================================
    TYPE_REF,
    LITERAL_TYPE,
    UNION_TYPE,
    ARRAY_TYPE,
    OBJECT_TYPE,
    OBJECT_TYPE_PROPERTY,
    PAREN_TYPE,

    // =========================================================================
    // NODES - expressions
    // =========================================================================
    LITERAL,
    STRING_EXPR,
    NAME_REF,
    CALL_EXPR,
    ARG_LIST,
    MEMBER_EXPR,
    INDEX_EXPR,
    ARRAY_EXPR,
    ARRAY_ITEM,
    OBJECT_EXPR,
    OBJECT_PROPERTY,
    PROPERTY_KEY,
    PAREN_EXPR,
    UNARY_EXPR,
    BINARY_EXPR,
    TERNARY_EXPR,
    FOR_EXPR,
    FOR_VARIABLES,
    IF_BODY,

    // Special
    ERROR,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::LINE_COMMENT | Self::BLOCK_COMMENT
        )
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::PARAM_KW as u16) && (self as u16) <= (Self::NULL_KW as u16)
    }

    /// Check if this is a punctuation token
    pub fn is_punct(self) -> bool {
        (self as u16) >= (Self::L_BRACE as u16) && (self as u16) <= (Self::FAT_ARROW as u16)
    }

    /// Check if this is a literal token
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::INTEGER
                | Self::STRING_COMPLETE
                | Self::STRING_LEFT_PIECE
                | Self::STRING_MIDDLE_PIECE
                | Self::STRING_RIGHT_PIECE
                | Self::MULTILINE_STRING
        )
    }

    /// Keywords that open a top-level statement
    pub fn is_declaration_keyword(self) -> bool {
        matches!(
            self,
            Self::PARAM_KW
                | Self::VAR_KW
                | Self::RESOURCE_KW
                | Self::MODULE_KW
                | Self::OUTPUT_KW
                | Self::TYPE_KW
                | Self::FUNC_KW
                | Self::USING_KW
                | Self::TARGET_SCOPE_KW
        )
    }

    /// Tokens usable as a declared name or property name: identifiers and
    /// contextual keywords. `true`, `false` and `null` are never names.
    pub fn is_name_token(self) -> bool {
        self == Self::IDENT
            || (self.is_keyword()
                && !matches!(self, Self::TRUE_KW | Self::FALSE_KW | Self::NULL_KW))
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BicepLanguage {}

impl rowan::Language for BicepLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

/// Type aliases for convenience
pub type SyntaxNode = rowan::SyntaxNode<BicepLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<BicepLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<BicepLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<BicepLanguage>;
