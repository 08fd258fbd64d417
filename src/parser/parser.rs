//! Recursive descent parser for Bicep
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST.

use super::lexer::{LexError, Lexer, Token};
use super::syntax_kind::SyntaxKind;
use rowan::{GreenNode, GreenNodeBuilder, TextRange, TextSize};

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    pub green: GreenNode,
    /// Malformed tokens, reported as lexical diagnostics
    pub lex_errors: Vec<(TextRange, LexError)>,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty() && self.lex_errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse Bicep source text into a CST
pub fn parse(input: &str) -> Parse {
    let tokens: Vec<_> = Lexer::new(input).collect();
    let lex_errors = tokens
        .iter()
        .filter_map(|t| t.error.map(|e| (t.range(), e)))
        .collect();
    let mut parser = Parser::new(&tokens);
    parser.parse_source_file();
    parser.finish(lex_errors)
}

/// Binary operator binding power, lowest first. Ternary sits below all of these.
fn binary_precedence(kind: SyntaxKind) -> Option<u8> {
    use SyntaxKind::*;
    Some(match kind {
        QUESTION_QUESTION => 1,
        PIPE_PIPE => 2,
        AMP_AMP => 3,
        EQ_EQ | BANG_EQ | EQ_TILDE | BANG_TILDE => 4,
        LT | GT | LT_EQ | GT_EQ => 5,
        PLUS | MINUS => 6,
        STAR | SLASH | PERCENT => 7,
        _ => return None,
    })
}

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
    /// One entry per open bracket; `true` while newlines are insignificant
    /// (inside parentheses and for-expression headers).
    newline_modes: Vec<bool>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>]) -> Self {
        Self {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            newline_modes: Vec::new(),
        }
    }

    fn finish(self, lex_errors: Vec<(TextRange, LexError)>) -> Parse {
        Parse {
            green: self.builder.finish(),
            lex_errors,
            errors: self.errors,
        }
    }

    // =========================================================================
    // Token inspection
    // =========================================================================

    fn current(&self) -> Option<&'a Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_eof() && self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_eof() && kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn newlines_insignificant(&self) -> bool {
        self.newline_modes.last().copied().unwrap_or(false)
    }

    fn is_skippable(&self, kind: SyntaxKind) -> bool {
        kind.is_trivia() || (kind == SyntaxKind::NEWLINE && self.newlines_insignificant())
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        // Look ahead, skipping trivia
        let mut idx = self.pos;
        let mut count = 0;
        while idx < self.tokens.len() {
            if !self.is_skippable(self.tokens[idx].kind) {
                if count == n {
                    return self.tokens[idx].kind;
                }
                count += 1;
            }
            idx += 1;
        }
        SyntaxKind::ERROR
    }

    /// A token that begins a new top-level statement, used to stop runaway
    /// object and array bodies.
    fn at_declaration_start(&self) -> bool {
        use SyntaxKind::*;
        match self.current_kind() {
            PARAM_KW | VAR_KW | RESOURCE_KW | MODULE_KW | OUTPUT_KW | TYPE_KW | FUNC_KW => {
                self.nth(1).is_name_token()
            }
            USING_KW => self.nth(1) == STRING_COMPLETE,
            TARGET_SCOPE_KW => self.nth(1) == EQ,
            AT => true,
            _ => false,
        }
    }

    /// Whether the last significant token consumed was a newline, which
    /// happens when a bracketed construct recovers at a statement boundary.
    fn after_newline(&self) -> bool {
        self.tokens[..self.pos.min(self.tokens.len())]
            .iter()
            .rev()
            .find(|t| !t.kind.is_trivia())
            .is_some_and(|t| t.kind == SyntaxKind::NEWLINE)
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump(&mut self) {
        if let Some(token) = self.current() {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind, what: &str) -> bool {
        self.skip_trivia();
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {}", what));
            false
        }
    }

    fn skip_trivia(&mut self) {
        while self
            .current()
            .map(|t| self.is_skippable(t.kind))
            .unwrap_or(false)
        {
            self.bump();
        }
    }

    fn skip_trivia_and_newlines(&mut self) {
        while self
            .current()
            .map(|t| t.kind.is_trivia() || t.kind == SyntaxKind::NEWLINE)
            .unwrap_or(false)
        {
            self.bump();
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = match self.current() {
            Some(t) => t.range(),
            None => {
                let end = self
                    .tokens
                    .last()
                    .map(|t| t.range().end())
                    .unwrap_or_else(|| TextSize::new(0));
                TextRange::empty(end)
            }
        };
        self.errors.push(SyntaxError::new(message, range));
    }

    fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.builder.start_node(SyntaxKind::ERROR.into());
        // Always consume at least one token to make progress
        let mut consumed = false;
        while !self.at_eof() && !self.at_any(recovery) {
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_eof() {
            self.bump();
        }
        self.builder.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    fn start_node(&mut self, kind: SyntaxKind) {
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn with_newlines(&mut self, insignificant: bool, f: impl FnOnce(&mut Self)) {
        self.newline_modes.push(insignificant);
        f(self);
        self.newline_modes.pop();
    }

    fn parse_name(&mut self, what: &str) -> bool {
        self.skip_trivia();
        if self.current_kind().is_name_token() && !self.at_eof() {
            self.start_node(SyntaxKind::NAME);
            self.bump();
            self.finish_node();
            true
        } else {
            self.error(format!("expected {} name", what));
            false
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    /// File = (Statement? NEWLINE)*
    fn parse_source_file(&mut self) {
        self.start_node(SyntaxKind::SOURCE_FILE);

        loop {
            self.skip_trivia_and_newlines();
            if self.at_eof() {
                break;
            }
            let pos_before = self.pos;
            self.parse_statement();

            self.skip_trivia();
            if !self.at_eof() && !self.at(SyntaxKind::NEWLINE) && !self.after_newline() {
                self.error_recover("expected a new line character at this location", &[SyntaxKind::NEWLINE]);
            }
            // Safety: if we didn't make progress, force-skip a token
            if self.pos == pos_before && !self.at_eof() {
                self.error_recover("unexpected token", &[SyntaxKind::NEWLINE]);
            }
        }

        self.finish_node();
    }

    /// Statement = Decorator* Declaration | UsingDecl | TargetScopeDecl
    fn parse_statement(&mut self) {
        let checkpoint = self.builder.checkpoint();
        let mut has_decorators = false;
        while self.at(SyntaxKind::AT) {
            self.parse_decorator();
            has_decorators = true;
            self.skip_trivia_and_newlines();
        }

        let kind = match self.current_kind() {
            _ if self.at_eof() => None,
            SyntaxKind::PARAM_KW => Some(SyntaxKind::PARAM_DECL),
            SyntaxKind::VAR_KW => Some(SyntaxKind::VAR_DECL),
            SyntaxKind::RESOURCE_KW => Some(SyntaxKind::RESOURCE_DECL),
            SyntaxKind::MODULE_KW => Some(SyntaxKind::MODULE_DECL),
            SyntaxKind::OUTPUT_KW => Some(SyntaxKind::OUTPUT_DECL),
            SyntaxKind::TYPE_KW => Some(SyntaxKind::TYPE_DECL),
            SyntaxKind::FUNC_KW => Some(SyntaxKind::FUNC_DECL),
            SyntaxKind::USING_KW if !has_decorators => Some(SyntaxKind::USING_DECL),
            SyntaxKind::TARGET_SCOPE_KW if !has_decorators => Some(SyntaxKind::TARGET_SCOPE_DECL),
            _ => None,
        };

        let Some(kind) = kind else {
            let message = if has_decorators {
                "expected a declaration after the decorators"
            } else {
                "this declaration type is not recognized; specify a param, var, resource, module, output, type or func declaration"
            };
            if self.at_eof() || self.at(SyntaxKind::NEWLINE) {
                self.error(message);
            } else {
                self.error_recover(message, &[SyntaxKind::NEWLINE]);
            }
            return;
        };

        self.builder.start_node_at(checkpoint, kind.into());
        self.bump(); // keyword
        match kind {
            SyntaxKind::PARAM_DECL => self.parse_param_decl(),
            SyntaxKind::VAR_DECL => self.parse_var_decl(),
            SyntaxKind::RESOURCE_DECL => self.parse_resource_decl(),
            SyntaxKind::MODULE_DECL => self.parse_module_decl(),
            SyntaxKind::OUTPUT_DECL => self.parse_output_decl(),
            SyntaxKind::TYPE_DECL => self.parse_type_decl(),
            SyntaxKind::FUNC_DECL => self.parse_func_decl(),
            SyntaxKind::USING_DECL => {
                self.parse_string_literal("file path");
            }
            _ => {
                if self.expect(SyntaxKind::EQ, "'='") {
                    self.parse_expr();
                }
            }
        }
        self.finish_node();
    }

    /// Decorator = '@' Expr
    fn parse_decorator(&mut self) {
        self.start_node(SyntaxKind::DECORATOR);
        self.bump(); // @
        self.parse_postfix_expr();
        self.finish_node();
    }

    /// ParamDecl = 'param' Name TypeExpr? ('=' Expr)?
    fn parse_param_decl(&mut self) {
        if !self.parse_name("parameter") {
            return;
        }
        self.skip_trivia();
        if !self.at(SyntaxKind::EQ) && !self.at(SyntaxKind::NEWLINE) && !self.at_eof() {
            self.parse_type_expr();
            self.skip_trivia();
        }
        if self.eat(SyntaxKind::EQ) {
            self.parse_expr();
        }
    }

    /// VarDecl = 'var' Name '=' Expr
    fn parse_var_decl(&mut self) {
        if self.parse_name("variable") && self.expect(SyntaxKind::EQ, "'='") {
            self.parse_expr();
        }
    }

    /// ResourceDecl = 'resource' Name String 'existing'? '=' Body
    fn parse_resource_decl(&mut self) {
        if !self.parse_name("resource") || !self.parse_string_literal("resource type") {
            return;
        }
        self.skip_trivia();
        self.eat(SyntaxKind::EXISTING_KW);
        if self.expect(SyntaxKind::EQ, "'='") {
            self.parse_body();
        }
    }

    /// ModuleDecl = 'module' Name String '=' Body
    fn parse_module_decl(&mut self) {
        if self.parse_name("module")
            && self.parse_string_literal("module path")
            && self.expect(SyntaxKind::EQ, "'='")
        {
            self.parse_body();
        }
    }

    /// OutputDecl = 'output' Name TypeExpr '=' Expr
    fn parse_output_decl(&mut self) {
        if !self.parse_name("output") {
            return;
        }
        self.skip_trivia();
        if self.at(SyntaxKind::EQ) {
            self.error("expected an output type");
        } else {
            self.parse_type_expr();
        }
        if self.expect(SyntaxKind::EQ, "'='") {
            self.parse_expr();
        }
    }

    /// TypeDecl = 'type' Name '=' TypeExpr
    fn parse_type_decl(&mut self) {
        if self.parse_name("type") && self.expect(SyntaxKind::EQ, "'='") {
            self.parse_type_expr();
        }
    }

    /// FuncDecl = 'func' Name '(' (FuncParam (',' FuncParam)*)? ')' TypeExpr '=>' Expr
    fn parse_func_decl(&mut self) {
        if !self.parse_name("function") {
            return;
        }
        self.skip_trivia();
        if !self.at(SyntaxKind::L_PAREN) {
            self.error("expected '('");
            return;
        }
        self.start_node(SyntaxKind::FUNC_PARAM_LIST);
        self.bump();
        self.with_newlines(true, |p| {
            loop {
                p.skip_trivia();
                if p.at_eof() || p.at(SyntaxKind::R_PAREN) {
                    break;
                }
                let pos_before = p.pos;
                p.start_node(SyntaxKind::FUNC_PARAM);
                if p.parse_name("parameter") {
                    p.parse_type_expr();
                }
                p.finish_node();
                p.skip_trivia();
                if !p.eat(SyntaxKind::COMMA) && !p.at(SyntaxKind::R_PAREN) {
                    p.error_recover("expected ',' or ')'", &[SyntaxKind::COMMA, SyntaxKind::R_PAREN]);
                    p.eat(SyntaxKind::COMMA);
                }
                if p.pos == pos_before {
                    break;
                }
            }
            p.expect(SyntaxKind::R_PAREN, "')'");
        });
        self.finish_node();

        self.parse_type_expr();
        if self.expect(SyntaxKind::FAT_ARROW, "'=>'") {
            self.parse_expr();
        }
    }

    /// A plain (non-interpolated) string token wrapped in STRING_EXPR
    fn parse_string_literal(&mut self, what: &str) -> bool {
        self.skip_trivia();
        if self.at_any(&[SyntaxKind::STRING_COMPLETE, SyntaxKind::STRING_LEFT_PIECE]) {
            self.parse_string_expr();
            true
        } else {
            self.error(format!("expected a {} string", what));
            false
        }
    }

    /// Body = Object | IfBody | ForExpr
    fn parse_body(&mut self) {
        self.skip_trivia();
        match self.current_kind() {
            _ if self.at_eof() => self.error("expected a body"),
            SyntaxKind::IF_KW => self.parse_if_body(),
            SyntaxKind::L_BRACE => self.parse_object_expr(),
            SyntaxKind::L_BRACKET if self.nth(1) == SyntaxKind::FOR_KW => self.parse_for_expr(),
            SyntaxKind::NEWLINE => self.error("expected '{', 'if' or '[for'"),
            _ => self.error_recover("expected '{', 'if' or '[for'", &[SyntaxKind::NEWLINE]),
        }
    }

    /// IfBody = 'if' '(' Expr ')' Object
    fn parse_if_body(&mut self) {
        self.start_node(SyntaxKind::IF_BODY);
        self.bump(); // if
        if self.expect(SyntaxKind::L_PAREN, "'('") {
            self.with_newlines(true, |p| {
                p.parse_expr();
                p.expect(SyntaxKind::R_PAREN, "')'");
            });
            self.skip_trivia();
            if self.at(SyntaxKind::L_BRACE) {
                self.parse_object_expr();
            } else {
                self.error("expected '{'");
            }
        }
        self.finish_node();
    }

    // =========================================================================
    // Type expressions
    // =========================================================================

    /// TypeExpr = PrimaryType ('|' PrimaryType)*
    fn parse_type_expr(&mut self) {
        self.skip_trivia();
        let checkpoint = self.builder.checkpoint();
        self.parse_primary_type();
        self.skip_trivia();
        if self.at(SyntaxKind::PIPE) {
            self.builder.start_node_at(checkpoint, SyntaxKind::UNION_TYPE.into());
            while self.eat(SyntaxKind::PIPE) {
                self.skip_trivia();
                self.parse_primary_type();
                self.skip_trivia();
            }
            self.finish_node();
        }
    }

    /// PrimaryType = (Ident | String | Integer | Bool | ObjectType | '(' TypeExpr ')') ('[' ']')*
    fn parse_primary_type(&mut self) {
        self.skip_trivia();
        let checkpoint = self.builder.checkpoint();
        let kind = self.current_kind();
        match kind {
            _ if self.at_eof() => {
                self.error("expected a type");
                return;
            }
            k if k.is_name_token() => {
                self.start_node(SyntaxKind::TYPE_REF);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::STRING_COMPLETE
            | SyntaxKind::MULTILINE_STRING
            | SyntaxKind::INTEGER
            | SyntaxKind::TRUE_KW
            | SyntaxKind::FALSE_KW => {
                self.start_node(SyntaxKind::LITERAL_TYPE);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::MINUS if self.nth(1) == SyntaxKind::INTEGER => {
                self.start_node(SyntaxKind::LITERAL_TYPE);
                self.bump();
                self.skip_trivia();
                self.bump();
                self.finish_node();
            }
            SyntaxKind::L_BRACE => self.parse_object_type(),
            SyntaxKind::L_PAREN => {
                self.start_node(SyntaxKind::PAREN_TYPE);
                self.bump();
                self.with_newlines(true, |p| {
                    p.parse_type_expr();
                    p.expect(SyntaxKind::R_PAREN, "')'");
                });
                self.finish_node();
            }
            SyntaxKind::NEWLINE | SyntaxKind::EQ | SyntaxKind::R_BRACE | SyntaxKind::FAT_ARROW => {
                self.error("expected a type");
                return;
            }
            _ => {
                self.error_recover(
                    "expected a type",
                    &[SyntaxKind::NEWLINE, SyntaxKind::EQ, SyntaxKind::R_BRACE],
                );
                return;
            }
        }

        // Array suffixes
        loop {
            self.skip_trivia();
            if self.at(SyntaxKind::L_BRACKET) && self.nth(1) == SyntaxKind::R_BRACKET {
                self.builder.start_node_at(checkpoint, SyntaxKind::ARRAY_TYPE.into());
                self.bump();
                self.skip_trivia();
                self.bump();
                self.finish_node();
            } else {
                break;
            }
        }
    }

    /// ObjectType = '{' (Decorator* (Name|String|'*') '?'? ':' TypeExpr)* '}'
    fn parse_object_type(&mut self) {
        self.start_node(SyntaxKind::OBJECT_TYPE);
        self.bump(); // {
        self.with_newlines(false, |p| {
            loop {
                p.skip_separators();
                if p.at_eof() || p.at(SyntaxKind::R_BRACE) {
                    break;
                }
                let pos_before = p.pos;
                p.start_node(SyntaxKind::OBJECT_TYPE_PROPERTY);
                while p.at(SyntaxKind::AT) {
                    p.parse_decorator();
                    p.skip_trivia_and_newlines();
                }
                let has_key = if p.at(SyntaxKind::STAR) {
                    p.bump();
                    true
                } else {
                    p.parse_property_key()
                };
                if has_key {
                    p.skip_trivia();
                    p.eat(SyntaxKind::QUESTION);
                    if p.expect(SyntaxKind::COLON, "':'") {
                        p.parse_type_expr();
                    }
                }
                p.finish_node();
                p.expect_separator(SyntaxKind::R_BRACE);
                if p.pos == pos_before {
                    break;
                }
            }
            p.expect(SyntaxKind::R_BRACE, "'}'");
        });
        self.finish_node();
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    /// Expr = Binary ('?' Expr ':' Expr)?
    fn parse_expr(&mut self) {
        self.skip_trivia();
        let checkpoint = self.builder.checkpoint();
        self.parse_binary_expr(1);
        self.skip_trivia();
        if self.at(SyntaxKind::QUESTION) {
            self.builder.start_node_at(checkpoint, SyntaxKind::TERNARY_EXPR.into());
            self.bump();
            self.parse_expr();
            if self.expect(SyntaxKind::COLON, "':'") {
                self.parse_expr();
            }
            self.finish_node();
        }
    }

    fn parse_binary_expr(&mut self, min_precedence: u8) {
        self.skip_trivia();
        let checkpoint = self.builder.checkpoint();
        self.parse_unary_expr();
        loop {
            self.skip_trivia();
            let Some(precedence) = binary_precedence(self.current_kind()) else {
                break;
            };
            if precedence < min_precedence || self.at_eof() {
                break;
            }
            self.builder.start_node_at(checkpoint, SyntaxKind::BINARY_EXPR.into());
            self.bump(); // operator
            self.parse_binary_expr(precedence + 1);
            self.finish_node();
        }
    }

    fn parse_unary_expr(&mut self) {
        self.skip_trivia();
        if self.at_any(&[SyntaxKind::BANG, SyntaxKind::MINUS]) {
            self.start_node(SyntaxKind::UNARY_EXPR);
            self.bump();
            self.parse_unary_expr();
            self.finish_node();
        } else {
            self.parse_postfix_expr();
        }
    }

    /// Postfix = Primary ('(' Args ')' | '.' Name | '[' Expr ']')*
    fn parse_postfix_expr(&mut self) {
        self.skip_trivia();
        let checkpoint = self.builder.checkpoint();
        if !self.parse_primary_expr() {
            return;
        }
        loop {
            self.skip_trivia();
            match self.current_kind() {
                _ if self.at_eof() => break,
                SyntaxKind::L_PAREN => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::CALL_EXPR.into());
                    self.parse_arg_list();
                    self.finish_node();
                }
                SyntaxKind::DOT => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::MEMBER_EXPR.into());
                    self.bump();
                    self.skip_trivia();
                    if self.current_kind().is_name_token() && !self.at_eof() {
                        self.bump();
                    } else {
                        self.error("expected a property name");
                    }
                    self.finish_node();
                }
                SyntaxKind::L_BRACKET => {
                    self.builder.start_node_at(checkpoint, SyntaxKind::INDEX_EXPR.into());
                    self.bump();
                    self.with_newlines(true, |p| {
                        p.parse_expr();
                        p.expect(SyntaxKind::R_BRACKET, "']'");
                    });
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    fn parse_arg_list(&mut self) {
        self.start_node(SyntaxKind::ARG_LIST);
        self.bump(); // (
        self.with_newlines(true, |p| {
            loop {
                p.skip_trivia();
                if p.at_eof() || p.at(SyntaxKind::R_PAREN) || p.at_declaration_start() {
                    break;
                }
                let pos_before = p.pos;
                p.parse_expr();
                p.skip_trivia();
                if p.at_declaration_start() {
                    break;
                }
                if !p.eat(SyntaxKind::COMMA) && !p.at(SyntaxKind::R_PAREN) {
                    p.error_recover("expected ',' or ')'", &[SyntaxKind::COMMA, SyntaxKind::R_PAREN]);
                    p.eat(SyntaxKind::COMMA);
                }
                if p.pos == pos_before {
                    break;
                }
            }
            p.expect(SyntaxKind::R_PAREN, "')'");
        });
        self.finish_node();
    }

    /// Returns false if no expression could be started here.
    fn parse_primary_expr(&mut self) -> bool {
        self.skip_trivia();
        let kind = self.current_kind();
        match kind {
            _ if self.at_eof() => {
                self.error("expected an expression");
                false
            }
            SyntaxKind::INTEGER | SyntaxKind::TRUE_KW | SyntaxKind::FALSE_KW | SyntaxKind::NULL_KW => {
                self.start_node(SyntaxKind::LITERAL);
                self.bump();
                self.finish_node();
                true
            }
            SyntaxKind::STRING_COMPLETE
            | SyntaxKind::STRING_LEFT_PIECE
            | SyntaxKind::MULTILINE_STRING => {
                self.parse_string_expr();
                true
            }
            SyntaxKind::L_BRACE => {
                self.parse_object_expr();
                true
            }
            SyntaxKind::L_BRACKET if self.nth(1) == SyntaxKind::FOR_KW => {
                self.parse_for_expr();
                true
            }
            SyntaxKind::L_BRACKET => {
                self.parse_array_expr();
                true
            }
            SyntaxKind::L_PAREN => {
                self.start_node(SyntaxKind::PAREN_EXPR);
                self.bump();
                self.with_newlines(true, |p| {
                    p.parse_expr();
                    p.expect(SyntaxKind::R_PAREN, "')'");
                });
                self.finish_node();
                true
            }
            SyntaxKind::IF_KW | SyntaxKind::FOR_KW => {
                self.error_recover("expected an expression", &[SyntaxKind::NEWLINE]);
                false
            }
            k if k.is_name_token() => {
                self.start_node(SyntaxKind::NAME_REF);
                self.bump();
                self.finish_node();
                true
            }
            SyntaxKind::NEWLINE
            | SyntaxKind::R_PAREN
            | SyntaxKind::R_BRACKET
            | SyntaxKind::R_BRACE
            | SyntaxKind::COMMA
            | SyntaxKind::COLON
            | SyntaxKind::STRING_MIDDLE_PIECE
            | SyntaxKind::STRING_RIGHT_PIECE => {
                self.error("expected an expression");
                false
            }
            _ => {
                self.error("expected an expression");
                self.start_node(SyntaxKind::ERROR);
                self.bump();
                self.finish_node();
                false
            }
        }
    }

    /// String = STRING_COMPLETE | MULTILINE_STRING | LEFT (Expr MIDDLE)* Expr RIGHT
    fn parse_string_expr(&mut self) {
        self.start_node(SyntaxKind::STRING_EXPR);
        let interpolated = self.at(SyntaxKind::STRING_LEFT_PIECE);
        self.bump();
        if interpolated {
            loop {
                self.parse_expr();
                self.skip_trivia();
                if self.eat(SyntaxKind::STRING_MIDDLE_PIECE) {
                    continue;
                }
                if !self.eat(SyntaxKind::STRING_RIGHT_PIECE) {
                    self.error("expected '}' to close the string interpolation");
                }
                break;
            }
        }
        self.finish_node();
    }

    /// Array = '[' (Item (NEWLINE | ',')*)* ']'
    fn parse_array_expr(&mut self) {
        self.start_node(SyntaxKind::ARRAY_EXPR);
        self.bump(); // [
        self.with_newlines(false, |p| {
            loop {
                p.skip_separators();
                if p.at_eof() || p.at(SyntaxKind::R_BRACKET) || p.at_declaration_start() {
                    break;
                }
                let pos_before = p.pos;
                p.start_node(SyntaxKind::ARRAY_ITEM);
                p.parse_expr();
                p.finish_node();
                p.expect_separator(SyntaxKind::R_BRACKET);
                if p.pos == pos_before {
                    break;
                }
            }
            p.expect(SyntaxKind::R_BRACKET, "']'");
        });
        self.finish_node();
    }

    /// Object = '{' (Property (NEWLINE | ',')*)* '}'
    fn parse_object_expr(&mut self) {
        self.start_node(SyntaxKind::OBJECT_EXPR);
        self.bump(); // {
        self.with_newlines(false, |p| {
            loop {
                p.skip_separators();
                if p.at_eof() || p.at(SyntaxKind::R_BRACE) || p.at_declaration_start() {
                    break;
                }
                let pos_before = p.pos;
                p.start_node(SyntaxKind::OBJECT_PROPERTY);
                if p.parse_property_key() && p.expect(SyntaxKind::COLON, "':'") {
                    p.parse_expr();
                }
                p.finish_node();
                p.expect_separator(SyntaxKind::R_BRACE);
                if p.pos == pos_before {
                    break;
                }
            }
            p.expect(SyntaxKind::R_BRACE, "'}'");
        });
        self.finish_node();
    }

    /// PropertyKey = Name | Keyword | String
    fn parse_property_key(&mut self) -> bool {
        self.skip_trivia();
        let kind = self.current_kind();
        if self.at_eof() {
            self.error("expected a property name");
            return false;
        }
        if kind.is_keyword() || kind == SyntaxKind::IDENT {
            self.start_node(SyntaxKind::PROPERTY_KEY);
            self.bump();
            self.finish_node();
            true
        } else if matches!(kind, SyntaxKind::STRING_COMPLETE | SyntaxKind::STRING_LEFT_PIECE) {
            self.start_node(SyntaxKind::PROPERTY_KEY);
            self.parse_string_expr();
            self.finish_node();
            true
        } else {
            self.error_recover(
                "expected a property name",
                &[SyntaxKind::NEWLINE, SyntaxKind::COMMA, SyntaxKind::R_BRACE],
            );
            false
        }
    }

    /// ForExpr = '[' 'for' (Name | '(' Name ',' Name ')') 'in' Expr ':' (Expr | IfBody) ']'
    fn parse_for_expr(&mut self) {
        self.start_node(SyntaxKind::FOR_EXPR);
        self.bump(); // [
        self.with_newlines(true, |p| {
            p.skip_trivia();
            p.bump(); // for
            p.skip_trivia();
            if p.at(SyntaxKind::L_PAREN) {
                p.start_node(SyntaxKind::FOR_VARIABLES);
                p.bump();
                p.parse_name("loop item");
                if p.expect(SyntaxKind::COMMA, "','") {
                    p.parse_name("loop index");
                }
                p.expect(SyntaxKind::R_PAREN, "')'");
                p.finish_node();
            } else {
                p.parse_name("loop item");
            }
            if p.expect(SyntaxKind::IN_KW, "'in'") {
                p.parse_expr();
                if p.expect(SyntaxKind::COLON, "':'") {
                    p.skip_trivia();
                    if p.at(SyntaxKind::IF_KW) {
                        p.parse_if_body();
                    } else {
                        p.parse_expr();
                    }
                }
            }
            p.skip_trivia();
            if !p.eat(SyntaxKind::R_BRACKET) {
                p.error("expected ']'");
            }
        });
        self.finish_node();
    }

    fn skip_separators(&mut self) {
        while self
            .current()
            .map(|t| t.kind.is_trivia() || matches!(t.kind, SyntaxKind::NEWLINE | SyntaxKind::COMMA))
            .unwrap_or(false)
        {
            self.bump();
        }
    }

    /// After an array item or object property: a separator or the closer.
    fn expect_separator(&mut self, closer: SyntaxKind) {
        self.skip_trivia();
        if self.at_eof() || self.at_any(&[SyntaxKind::NEWLINE, SyntaxKind::COMMA, closer]) {
            return;
        }
        self.error_recover(
            "expected a new line or comma",
            &[SyntaxKind::NEWLINE, SyntaxKind::COMMA, closer],
        );
    }
}
