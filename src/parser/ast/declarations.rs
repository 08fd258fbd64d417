//! Top-level declarations

use super::{AstNode, Decorator, Expr, Name, StringExpr, TypeExpr, ast_node, child_token};
use crate::parser::SyntaxKind;

ast_node!(ParamDecl, PARAM_DECL);

impl ParamDecl {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    /// Declared type; absent for assignments in a parameters file
    pub fn ty(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }

    pub fn default_value(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

ast_node!(VarDecl, VAR_DECL);

impl VarDecl {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    pub fn value(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

ast_node!(ResourceDecl, RESOURCE_DECL);

impl ResourceDecl {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    /// The `'Namespace/type@apiVersion'` string
    pub fn type_string(&self) -> Option<StringExpr> {
        self.0.children().find_map(StringExpr::cast)
    }

    pub fn is_existing(&self) -> bool {
        child_token(&self.0, SyntaxKind::EXISTING_KW).is_some()
    }

    /// Object, `if` body or for-expression after `=`
    pub fn body(&self) -> Option<Expr> {
        self.0
            .children()
            .filter(|n| n.kind() != SyntaxKind::STRING_EXPR)
            .find_map(Expr::cast)
    }
}

ast_node!(ModuleDecl, MODULE_DECL);

impl ModuleDecl {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    /// The module reference string
    pub fn path(&self) -> Option<StringExpr> {
        self.0.children().find_map(StringExpr::cast)
    }

    pub fn body(&self) -> Option<Expr> {
        self.0
            .children()
            .filter(|n| n.kind() != SyntaxKind::STRING_EXPR)
            .find_map(Expr::cast)
    }
}

ast_node!(OutputDecl, OUTPUT_DECL);

impl OutputDecl {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }

    pub fn value(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

ast_node!(TypeDecl, TYPE_DECL);

impl TypeDecl {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }
}

ast_node!(FuncDecl, FUNC_DECL);

impl FuncDecl {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn decorators(&self) -> impl Iterator<Item = Decorator> + '_ {
        self.0.children().filter_map(Decorator::cast)
    }

    pub fn params(&self) -> impl Iterator<Item = FuncParam> + '_ {
        self.0
            .children()
            .filter(|n| n.kind() == SyntaxKind::FUNC_PARAM_LIST)
            .flat_map(|list| list.children().filter_map(FuncParam::cast))
    }

    pub fn return_type(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }

    pub fn body(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}

ast_node!(FuncParam, FUNC_PARAM);

impl FuncParam {
    pub fn name(&self) -> Option<Name> {
        self.0.children().find_map(Name::cast)
    }

    pub fn ty(&self) -> Option<TypeExpr> {
        self.0.children().find_map(TypeExpr::cast)
    }
}

ast_node!(UsingDecl, USING_DECL);

impl UsingDecl {
    pub fn path(&self) -> Option<StringExpr> {
        self.0.children().find_map(StringExpr::cast)
    }
}

ast_node!(TargetScopeDecl, TARGET_SCOPE_DECL);

impl TargetScopeDecl {
    pub fn value(&self) -> Option<Expr> {
        self.0.children().find_map(Expr::cast)
    }
}
