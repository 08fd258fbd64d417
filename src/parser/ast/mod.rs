//! Typed AST wrappers over the untyped rowan CST.
//!
//! Each struct wraps a SyntaxNode and provides methods to access children.
//! Accessors return `Option` because the tree may be incomplete.

mod declarations;
mod expressions;
mod types;

pub use declarations::*;
pub use expressions::*;
pub use types::*;

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};
use smol_str::SmolStr;

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) $crate::parser::SyntaxNode);

        impl $crate::parser::ast::AstNode for $name {
            fn can_cast(kind: $crate::parser::SyntaxKind) -> bool {
                kind == $crate::parser::SyntaxKind::$kind
            }

            fn cast(node: $crate::parser::SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &$crate::parser::SyntaxNode {
                &self.0
            }
        }
    };
}
pub(crate) use ast_node;

/// First direct child token of the given kind
pub(crate) fn child_token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

/// First direct child token usable as a name (identifier or keyword)
pub(crate) fn name_token(node: &SyntaxNode) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == SyntaxKind::IDENT || t.kind().is_keyword())
}

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    pub fn statements(&self) -> impl Iterator<Item = Statement> + '_ {
        self.0.children().filter_map(Statement::cast)
    }

    /// The `using` declaration, if this is a parameters file
    pub fn using(&self) -> Option<UsingDecl> {
        self.statements().find_map(|s| match s {
            Statement::Using(u) => Some(u),
            _ => None,
        })
    }

    pub fn target_scope(&self) -> Option<TargetScopeDecl> {
        self.statements().find_map(|s| match s {
            Statement::TargetScope(t) => Some(t),
            _ => None,
        })
    }
}

/// Any top-level statement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Statement {
    Param(ParamDecl),
    Var(VarDecl),
    Resource(ResourceDecl),
    Module(ModuleDecl),
    Output(OutputDecl),
    Type(TypeDecl),
    Func(FuncDecl),
    Using(UsingDecl),
    TargetScope(TargetScopeDecl),
}

impl AstNode for Statement {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::PARAM_DECL
                | SyntaxKind::VAR_DECL
                | SyntaxKind::RESOURCE_DECL
                | SyntaxKind::MODULE_DECL
                | SyntaxKind::OUTPUT_DECL
                | SyntaxKind::TYPE_DECL
                | SyntaxKind::FUNC_DECL
                | SyntaxKind::USING_DECL
                | SyntaxKind::TARGET_SCOPE_DECL
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::PARAM_DECL => Some(Self::Param(ParamDecl(node))),
            SyntaxKind::VAR_DECL => Some(Self::Var(VarDecl(node))),
            SyntaxKind::RESOURCE_DECL => Some(Self::Resource(ResourceDecl(node))),
            SyntaxKind::MODULE_DECL => Some(Self::Module(ModuleDecl(node))),
            SyntaxKind::OUTPUT_DECL => Some(Self::Output(OutputDecl(node))),
            SyntaxKind::TYPE_DECL => Some(Self::Type(TypeDecl(node))),
            SyntaxKind::FUNC_DECL => Some(Self::Func(FuncDecl(node))),
            SyntaxKind::USING_DECL => Some(Self::Using(UsingDecl(node))),
            SyntaxKind::TARGET_SCOPE_DECL => Some(Self::TargetScope(TargetScopeDecl(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Param(n) => n.syntax(),
            Self::Var(n) => n.syntax(),
            Self::Resource(n) => n.syntax(),
            Self::Module(n) => n.syntax(),
            Self::Output(n) => n.syntax(),
            Self::Type(n) => n.syntax(),
            Self::Func(n) => n.syntax(),
            Self::Using(n) => n.syntax(),
            Self::TargetScope(n) => n.syntax(),
        }
    }
}

impl Statement {
    /// Declared name, for statements that declare one
    pub fn name(&self) -> Option<Name> {
        match self {
            Self::Using(_) | Self::TargetScope(_) => None,
            other => other.syntax().children().find_map(Name::cast),
        }
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.syntax().children().filter_map(Decorator::cast)
    }
}

// ============================================================================
// Names and decorators
// ============================================================================

ast_node!(Name, NAME);

impl Name {
    pub fn token(&self) -> Option<SyntaxToken> {
        name_token(&self.0)
    }

    pub fn text(&self) -> Option<SmolStr> {
        self.token().map(|t| SmolStr::new(t.text()))
    }
}

ast_node!(Decorator, DECORATOR);

impl Decorator {
    pub fn expr(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }

    pub fn call(&self) -> Option<CallExpr> {
        match self.expr()? {
            Expr::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Decorator name without any `sys.` namespace qualifier
    pub fn name(&self) -> Option<SmolStr> {
        self.call()?.function_name()
    }

    pub fn args(&self) -> Vec<Expr> {
        self.call().map(|c| c.args().collect()).unwrap_or_default()
    }
}
