//! Binder: per-file symbol tables and name resolution.
//!
//! One pass over a file registers every top-level declaration, then walks
//! all expressions resolving names through the scope chain:
//!
//! ```text
//! loop scope / function scope  →  file scope  →  function library (calls only)
//! ```
//!
//! Outputs live in their own namespace. Function bodies may only see their
//! own parameters, type aliases and other functions. Module outputs are not
//! symbols here; they are reached as properties of the module symbol.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use super::diagnostics::{Diagnostic, DiagnosticCategory, RelatedInfo, codes};
use super::functions::FunctionLibrary;
use crate::base::{FileId, TextRange, TextSize};
use crate::config::CompilerConfig;
use crate::parser::{
    AstNode, CallExpr, Expr, ForExpr, FuncDecl, Name, NameRef, Statement, SyntaxKind, SyntaxNode,
    TypeExpr,
};
use crate::project::{ResolutionStatus, SourceFileGrouping};
use crate::syntax::{FileKind, SyntaxFile};

// ============================================================================
// SYMBOLS
// ============================================================================

/// Index of a symbol within its file's [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Parameter,
    Variable,
    Resource,
    Module,
    Output,
    TypeAlias,
    Function,
    LoopVariable,
    LoopIndex,
    FunctionParameter,
}

impl SymbolKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            SymbolKind::Parameter => "parameter",
            SymbolKind::Variable => "variable",
            SymbolKind::Resource => "resource",
            SymbolKind::Module => "module",
            SymbolKind::Output => "output",
            SymbolKind::TypeAlias => "type",
            SymbolKind::Function => "function",
            SymbolKind::LoopVariable => "loop variable",
            SymbolKind::LoopIndex => "loop index",
            SymbolKind::FunctionParameter => "function parameter",
        }
    }

    /// Declared at file level
    pub fn is_top_level(&self) -> bool {
        !matches!(
            self,
            SymbolKind::LoopVariable | SymbolKind::LoopIndex | SymbolKind::FunctionParameter
        )
    }
}

/// A named declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    pub scope: ScopeId,
    /// The whole declaration, decorators included
    pub declaration_range: TextRange,
    pub name_range: TextRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    File,
    Loop,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub range: TextRange,
    pub symbols: Vec<SymbolId>,
}

/// What a call expression invokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// A `func` declared in the same file
    User(SymbolId),
    /// A library function
    Library { namespace: SmolStr, name: SmolStr },
    /// `res.listKeys()`-style call on a resource symbol
    ResourceMethod { resource: SymbolId, name: SmolStr },
}

// ============================================================================
// SYMBOL TABLE
// ============================================================================

/// Symbols, scopes and resolved references of one file.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    file: FileId,
    kind: FileKind,
    symbols: Vec<Symbol>,
    scopes: Vec<Scope>,
    /// Top-level declarations in source order, outputs included
    declarations: Vec<SymbolId>,
    values: FxHashMap<SmolStr, SymbolId>,
    outputs: IndexMap<SmolStr, SymbolId>,
    /// NAME_REF range → symbol
    references: FxHashMap<TextRange, SymbolId>,
    /// CALL_EXPR range → target
    calls: FxHashMap<TextRange, CallTarget>,
    /// TYPE_REF range → type alias
    type_references: FxHashMap<TextRange, SymbolId>,
    modules: FxHashMap<SymbolId, ResolutionStatus>,
    using: Option<ResolutionStatus>,
    diagnostics: Vec<Diagnostic>,
}

impl SymbolTable {
    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn file_kind(&self) -> FileKind {
        self.kind
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(idx, s)| (SymbolId(idx as u32), s))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Top-level declarations in source order
    pub fn declarations(&self) -> &[SymbolId] {
        &self.declarations
    }

    /// File-scope value or type named `name`
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.values.get(name).copied()
    }

    pub fn output(&self, name: &str) -> Option<SymbolId> {
        self.outputs.get(name).copied()
    }

    pub fn outputs(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.outputs.values().copied()
    }

    /// Symbols of a given kind, in declaration order
    pub fn of_kind(&self, kind: SymbolKind) -> impl Iterator<Item = SymbolId> + '_ {
        self.declarations
            .iter()
            .copied()
            .filter(move |id| self.symbol(*id).kind == kind)
    }

    /// Symbol referenced by the NAME_REF node at `range`
    pub fn reference(&self, range: TextRange) -> Option<SymbolId> {
        self.references.get(&range).copied()
    }

    pub fn references(&self) -> impl Iterator<Item = (TextRange, SymbolId)> + '_ {
        self.references.iter().map(|(r, s)| (*r, *s))
    }

    /// Number of references to `symbol`
    pub fn reference_count(&self, symbol: SymbolId) -> usize {
        self.references.values().filter(|s| **s == symbol).count()
    }

    pub fn call_target(&self, range: TextRange) -> Option<&CallTarget> {
        self.calls.get(&range)
    }

    pub fn type_reference(&self, range: TextRange) -> Option<SymbolId> {
        self.type_references.get(&range).copied()
    }

    /// Resolution status of a module declaration's reference
    pub fn module_status(&self, module: SymbolId) -> Option<&ResolutionStatus> {
        self.modules.get(&module)
    }

    /// Resolution status of the `using` declaration
    pub fn using_status(&self) -> Option<&ResolutionStatus> {
        self.using.as_ref()
    }

    /// Symbol declared or referenced at `offset`
    pub fn symbol_at(&self, offset: TextSize) -> Option<SymbolId> {
        if let Some((_, id)) = self
            .references
            .iter()
            .find(|(range, _)| range.contains_inclusive(offset))
        {
            return Some(*id);
        }
        self.symbols()
            .find(|(_, s)| s.name_range.contains_inclusive(offset))
            .map(|(id, _)| id)
    }

    /// Top-level declaration whose statement spans `range`
    pub fn declaration_at(&self, range: TextRange) -> Option<SymbolId> {
        self.declarations
            .iter()
            .copied()
            .find(|id| self.symbol(*id).declaration_range == range)
    }

    /// Symbol whose name token spans `range`
    pub fn declared_by(&self, name_range: TextRange) -> Option<SymbolId> {
        self.symbols()
            .find(|(_, s)| s.name_range == name_range)
            .map(|(id, _)| id)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

// ============================================================================
// BINDER
// ============================================================================

const BUILTIN_TYPES: &[&str] = &["string", "int", "bool", "object", "array"];

/// Build the symbol table of `file_id`.
pub fn bind(
    file_id: FileId,
    grouping: &SourceFileGrouping,
    library: &FunctionLibrary,
    config: &CompilerConfig,
) -> SymbolTable {
    let Some(file) = grouping.file(file_id) else {
        return Binder::new(file_id, FileKind::Template, library, config).table;
    };
    let mut binder = Binder::new(file_id, file.kind(), library, config);
    binder.bind_file(file, grouping);
    trace!(
        "Bound {}: {} symbols, {} references",
        file.uri(),
        binder.table.symbols.len(),
        binder.table.references.len()
    );
    binder.table
}

struct Binder<'a> {
    table: SymbolTable,
    library: &'a FunctionLibrary,
    config: &'a CompilerConfig,
    scope: ScopeId,
    /// Declaration whose body is being walked
    current: Option<SymbolId>,
    in_function: bool,
}

impl<'a> Binder<'a> {
    fn new(file: FileId, kind: FileKind, library: &'a FunctionLibrary, config: &'a CompilerConfig) -> Self {
        let table = SymbolTable {
            file,
            kind,
            symbols: Vec::new(),
            scopes: vec![Scope {
                kind: ScopeKind::File,
                parent: None,
                range: TextRange::default(),
                symbols: Vec::new(),
            }],
            declarations: Vec::new(),
            values: FxHashMap::default(),
            outputs: IndexMap::new(),
            references: FxHashMap::default(),
            calls: FxHashMap::default(),
            type_references: FxHashMap::default(),
            modules: FxHashMap::default(),
            using: None,
            diagnostics: Vec::new(),
        };
        Self {
            table,
            library,
            config,
            scope: ScopeId(0),
            current: None,
            in_function: false,
        }
    }

    fn error(&mut self, code: &'static str, range: TextRange, message: String) {
        self.table.diagnostics.push(Diagnostic::error(
            DiagnosticCategory::Binding,
            code,
            self.table.file,
            range,
            message,
        ));
    }

    fn bind_file(&mut self, file: &SyntaxFile, grouping: &SourceFileGrouping) {
        let root = file.parse().syntax();
        self.table.scopes[0].range = root.text_range();
        let Some(source_file) = file.source_file() else {
            return;
        };
        let statements: Vec<Statement> = source_file.statements().collect();

        // Pass 1: declarations
        for statement in &statements {
            self.check_statement_allowed(statement);
            self.declare_statement(statement, grouping);
        }

        // Pass 2: references
        let mut top_level = self.table.declarations.clone().into_iter();
        for statement in &statements {
            let owner = match statement.name() {
                Some(name) if name.text().is_some() => top_level.next(),
                _ => None,
            };
            self.current = owner;
            self.bind_statement(statement, owner);
            self.current = None;
        }
    }

    fn check_statement_allowed(&mut self, statement: &Statement) {
        let range = statement.syntax().text_range();
        match (self.table.kind, statement) {
            (FileKind::Parameters, Statement::Param(_) | Statement::Var(_) | Statement::Using(_)) => {}
            (FileKind::Parameters, _) => self.error(
                codes::INVALID_STATEMENT_FOR_FILE,
                range,
                "only 'using', 'param' and 'var' statements are allowed in a parameters file".to_string(),
            ),
            (FileKind::Template, Statement::Using(_)) => self.error(
                codes::INVALID_STATEMENT_FOR_FILE,
                range,
                "'using' declarations are only allowed in parameters files".to_string(),
            ),
            (FileKind::Template, Statement::Param(param)) if param.ty().is_none() => self.error(
                codes::INVALID_STATEMENT_FOR_FILE,
                param.name().map(|n| n.syntax().text_range()).unwrap_or(range),
                "parameter declarations in a template require a type".to_string(),
            ),
            _ => {}
        }
    }

    fn declare_statement(&mut self, statement: &Statement, grouping: &SourceFileGrouping) {
        let kind = match statement {
            Statement::Param(_) => SymbolKind::Parameter,
            Statement::Var(_) => SymbolKind::Variable,
            Statement::Resource(_) => SymbolKind::Resource,
            Statement::Module(_) => SymbolKind::Module,
            Statement::Output(_) => SymbolKind::Output,
            Statement::Type(_) => SymbolKind::TypeAlias,
            Statement::Func(_) => SymbolKind::Function,
            Statement::Using(using) => {
                if let Some(path) = using.path() {
                    self.table.using = grouping
                        .edge_at(self.table.file, path.syntax().text_range())
                        .map(|e| e.status.clone());
                }
                return;
            }
            Statement::TargetScope(_) => return,
        };
        let Some(name) = statement.name() else {
            return;
        };
        let Some(id) = self.declare_top_level(&name, kind, statement.syntax().text_range()) else {
            return;
        };

        if let Statement::Module(module) = statement {
            let status = module
                .path()
                .and_then(|p| grouping.edge_at(self.table.file, p.syntax().text_range()))
                .map(|e| e.status.clone())
                .unwrap_or(ResolutionStatus::Unresolved);
            self.table.modules.insert(id, status);
        }
    }

    fn push_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.table.symbols.len() as u32);
        self.table.scopes[symbol.scope.0 as usize].symbols.push(id);
        self.table.symbols.push(symbol);
        id
    }

    fn declare_top_level(&mut self, name: &Name, kind: SymbolKind, declaration_range: TextRange) -> Option<SymbolId> {
        let text = name.text()?;
        let name_range = name.syntax().text_range();
        let id = self.push_symbol(Symbol {
            name: text.clone(),
            kind,
            scope: ScopeId(0),
            declaration_range,
            name_range,
        });
        self.table.declarations.push(id);

        let existing = if kind == SymbolKind::Output {
            self.table.outputs.get(&text).copied()
        } else {
            self.table.values.get(&text).copied()
        };
        if let Some(existing) = existing {
            let previous = self.table.symbols[existing.index()].name_range;
            self.table.diagnostics.push(
                Diagnostic::error(
                    DiagnosticCategory::Binding,
                    codes::DUPLICATE_SYMBOL,
                    self.table.file,
                    name_range,
                    format!("identifier '{}' is declared multiple times; remove or rename the duplicates", text),
                )
                .with_related(RelatedInfo {
                    file: self.table.file,
                    range: previous,
                    message: format!("previous declaration of '{}'", text).into(),
                }),
            );
            return Some(id);
        }

        self.check_near_duplicate(&text, kind, name_range);
        if kind == SymbolKind::Output {
            self.table.outputs.insert(text, id);
        } else {
            self.table.values.insert(text, id);
        }
        Some(id)
    }

    fn check_near_duplicate(&mut self, text: &SmolStr, kind: SymbolKind, range: TextRange) {
        let Some(severity) = self.config.near_duplicate_names.severity() else {
            return;
        };
        let similar = if kind == SymbolKind::Output {
            self.table.outputs.keys().find(|k| k.eq_ignore_ascii_case(text)).cloned()
        } else {
            self.table.values.keys().find(|k| k.eq_ignore_ascii_case(text)).cloned()
        };
        if let Some(similar) = similar {
            self.table.diagnostics.push(Diagnostic::new(
                severity,
                DiagnosticCategory::Binding,
                codes::NEAR_DUPLICATE_SYMBOL,
                self.table.file,
                range,
                format!("'{}' differs from '{}' only by case", text, similar),
            ));
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    fn bind_statement(&mut self, statement: &Statement, owner: Option<SymbolId>) {
        for decorator in statement.decorators() {
            for arg in decorator.args() {
                self.bind_expr(&arg, false);
            }
        }

        match statement {
            Statement::Param(param) => {
                if let Some(ty) = param.ty() {
                    self.bind_type(&ty);
                }
                if let Some(value) = param.default_value() {
                    self.bind_expr(&value, false);
                }
            }
            Statement::Var(var) => {
                if let Some(value) = var.value() {
                    self.bind_expr(&value, true);
                }
            }
            Statement::Resource(resource) => {
                if let Some(body) = resource.body() {
                    self.bind_expr(&body, true);
                }
            }
            Statement::Module(module) => {
                if let Some(body) = module.body() {
                    self.bind_expr(&body, true);
                }
            }
            Statement::Output(output) => {
                if let Some(ty) = output.ty() {
                    self.bind_type(&ty);
                }
                if let Some(value) = output.value() {
                    self.bind_expr(&value, true);
                }
            }
            Statement::Type(alias) => {
                if let Some(ty) = alias.ty() {
                    self.bind_type(&ty);
                }
            }
            Statement::Func(func) => self.bind_function(func, owner),
            Statement::TargetScope(target) => {
                if let Some(value) = target.value() {
                    self.bind_expr(&value, false);
                }
            }
            Statement::Using(_) => {}
        }
    }

    fn bind_function(&mut self, func: &FuncDecl, owner: Option<SymbolId>) {
        let scope = self.push_scope(ScopeKind::Function, func.syntax().text_range());
        let outer = std::mem::replace(&mut self.scope, scope);

        for param in func.params() {
            if let Some(ty) = param.ty() {
                self.bind_type(&ty);
            }
            if let Some(name) = param.name() {
                self.declare_local(&name, SymbolKind::FunctionParameter, param.syntax().text_range());
            }
        }
        if let Some(ty) = func.return_type() {
            self.bind_type(&ty);
        }

        self.in_function = true;
        self.current = owner;
        if let Some(body) = func.body() {
            self.bind_expr(&body, false);
        }
        self.in_function = false;
        self.scope = outer;
    }

    fn push_scope(&mut self, kind: ScopeKind, range: TextRange) -> ScopeId {
        let id = ScopeId(self.table.scopes.len() as u32);
        self.table.scopes.push(Scope {
            kind,
            parent: Some(self.scope),
            range,
            symbols: Vec::new(),
        });
        id
    }

    fn declare_local(&mut self, name: &Name, kind: SymbolKind, declaration_range: TextRange) -> Option<SymbolId> {
        let text = name.text()?;
        let name_range = name.syntax().text_range();
        let clash = self.table.scopes[self.scope.0 as usize]
            .symbols
            .iter()
            .copied()
            .find(|id| self.table.symbols[id.index()].name == text);
        if let Some(existing) = clash {
            let previous = self.table.symbols[existing.index()].name_range;
            self.table.diagnostics.push(
                Diagnostic::error(
                    DiagnosticCategory::Binding,
                    codes::DUPLICATE_SYMBOL,
                    self.table.file,
                    name_range,
                    format!("identifier '{}' is declared multiple times; remove or rename the duplicates", text),
                )
                .with_related(RelatedInfo {
                    file: self.table.file,
                    range: previous,
                    message: format!("previous declaration of '{}'", text).into(),
                }),
            );
        }
        Some(self.push_symbol(Symbol {
            name: text,
            kind,
            scope: self.scope,
            declaration_range,
            name_range,
        }))
    }

    // ------------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------------

    fn bind_type(&mut self, ty: &TypeExpr) {
        match ty {
            TypeExpr::Ref(type_ref) => {
                let Some(name) = type_ref.name() else {
                    return;
                };
                let range = type_ref.syntax().text_range();
                match self.table.values.get(&name).copied() {
                    Some(id) if self.table.symbols[id.index()].kind == SymbolKind::TypeAlias => {
                        if self.current == Some(id) {
                            self.error(
                                codes::SELF_REFERENCE,
                                range,
                                format!("the type '{}' cannot reference itself", name),
                            );
                            return;
                        }
                        self.table.type_references.insert(range, id);
                    }
                    _ if BUILTIN_TYPES.contains(&name.as_str()) => {}
                    Some(id) => {
                        let kind = self.table.symbols[id.index()].kind.display_name();
                        self.error(
                            codes::WRONG_SYMBOL_KIND,
                            range,
                            format!("'{}' is a {}, not a type", name, kind),
                        );
                    }
                    None => self.error(
                        codes::UNKNOWN_TYPE,
                        range,
                        format!("the type '{}' does not exist", name),
                    ),
                }
            }
            TypeExpr::Literal(_) => {}
            TypeExpr::Union(union) => {
                for member in union.members() {
                    self.bind_type(&member);
                }
            }
            TypeExpr::Array(array) => {
                if let Some(element) = array.element() {
                    self.bind_type(&element);
                }
            }
            TypeExpr::Paren(paren) => {
                if let Some(inner) = paren.inner() {
                    self.bind_type(&inner);
                }
            }
            TypeExpr::Object(object) => {
                for property in object.properties() {
                    for decorator in property.decorators() {
                        for arg in decorator.args() {
                            self.bind_expr(&arg, false);
                        }
                    }
                    if let Some(ty) = property.ty() {
                        self.bind_type(&ty);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    fn bind_expr(&mut self, expr: &Expr, loop_allowed: bool) {
        match expr {
            Expr::Literal(_) => {}
            Expr::String(string) => {
                for hole in string.holes() {
                    self.bind_expr(&hole, false);
                }
            }
            Expr::NameRef(name_ref) => self.bind_name_ref(name_ref),
            Expr::Call(call) => self.bind_call(call),
            Expr::Member(member) => {
                if let Some(base) = member.base() {
                    self.bind_expr(&base, false);
                }
            }
            Expr::Index(index) => {
                if let Some(base) = index.base() {
                    self.bind_expr(&base, false);
                }
                if let Some(idx) = index.index() {
                    self.bind_expr(&idx, false);
                }
            }
            Expr::Array(array) => {
                for item in array.items() {
                    self.bind_expr(&item, false);
                }
            }
            Expr::Object(object) => {
                for property in object.properties() {
                    if let Some(key) = property.key().and_then(|k| k.string()) {
                        for hole in key.holes() {
                            self.bind_expr(&hole, false);
                        }
                    }
                    if let Some(value) = property.value() {
                        self.bind_expr(&value, false);
                    }
                }
            }
            Expr::Paren(paren) => {
                if let Some(inner) = paren.inner() {
                    self.bind_expr(&inner, false);
                }
            }
            Expr::Unary(unary) => {
                if let Some(operand) = unary.operand() {
                    self.bind_expr(&operand, false);
                }
            }
            Expr::Binary(binary) => {
                for side in [binary.lhs(), binary.rhs()].into_iter().flatten() {
                    self.bind_expr(&side, false);
                }
            }
            Expr::Ternary(ternary) => {
                for part in [ternary.condition(), ternary.then_branch(), ternary.else_branch()]
                    .into_iter()
                    .flatten()
                {
                    self.bind_expr(&part, false);
                }
            }
            Expr::For(for_expr) => self.bind_for(for_expr, loop_allowed),
            Expr::If(if_body) => {
                if let Some(condition) = if_body.condition() {
                    self.bind_expr(&condition, false);
                }
                if let Some(body) = if_body.body() {
                    self.bind_expr(&Expr::Object(body), false);
                }
            }
        }
    }

    fn bind_for(&mut self, for_expr: &ForExpr, loop_allowed: bool) {
        if !loop_allowed || self.in_function {
            self.error(
                codes::INVALID_LOOP_POSITION,
                for_expr.syntax().text_range(),
                "for-expressions are only allowed as the value of a variable, resource, module or output declaration".to_string(),
            );
        }
        if let Some(iterable) = for_expr.iterable() {
            self.bind_expr(&iterable, false);
        }

        let scope = self.push_scope(ScopeKind::Loop, for_expr.syntax().text_range());
        let outer = std::mem::replace(&mut self.scope, scope);
        let range = for_expr.syntax().text_range();
        if let Some(item) = for_expr.item_name() {
            self.declare_local(&item, SymbolKind::LoopVariable, range);
        }
        if let Some(index) = for_expr.index_name() {
            self.declare_local(&index, SymbolKind::LoopIndex, range);
        }
        if let Some(body) = for_expr.body() {
            self.bind_expr(&body, false);
        }
        self.scope = outer;
    }

    /// Nearest local symbol, then the file scope
    fn resolve(&self, name: &str) -> Option<SymbolId> {
        let mut scope = Some(self.scope);
        while let Some(id) = scope {
            let data = &self.table.scopes[id.0 as usize];
            if data.kind == ScopeKind::File {
                break;
            }
            if let Some(found) = data
                .symbols
                .iter()
                .rev()
                .copied()
                .find(|s| self.table.symbols[s.index()].name == name)
            {
                return Some(found);
            }
            scope = data.parent;
        }
        self.table.values.get(name).copied()
    }

    fn bind_name_ref(&mut self, name_ref: &NameRef) {
        let Some(name) = name_ref.text() else {
            return;
        };
        let range = name_ref.syntax().text_range();
        let Some(id) = self.resolve(&name) else {
            self.error(
                codes::UNDEFINED_SYMBOL,
                range,
                format!("the name '{}' does not exist in the current context", name),
            );
            return;
        };

        let symbol = &self.table.symbols[id.index()];
        if self.in_function
            && symbol.kind.is_top_level()
            && !matches!(symbol.kind, SymbolKind::TypeAlias | SymbolKind::Function)
        {
            let kind = symbol.kind.display_name();
            self.error(
                codes::FUNCTION_SCOPE_VIOLATION,
                range,
                format!("function bodies cannot reference the {} '{}'", kind, name),
            );
            return;
        }
        if symbol.kind == SymbolKind::TypeAlias {
            self.error(
                codes::WRONG_SYMBOL_KIND,
                range,
                format!("the type '{}' cannot be used as a value", name),
            );
            return;
        }
        if self.current == Some(id) && symbol.kind.is_top_level() {
            self.error(
                codes::SELF_REFERENCE,
                range,
                format!("the expression is referencing its own declaration '{}'", name),
            );
            return;
        }

        trace!("Resolved '{}' -> {:?}", name, id);
        self.table.references.insert(range, id);
    }

    fn bind_call(&mut self, call: &CallExpr) {
        let range = call.syntax().text_range();
        let name_range = call.name_range().unwrap_or(range);

        match call.callee() {
            Some(Expr::NameRef(callee)) => {
                if let Some(name) = callee.text() {
                    self.bind_function_name(&name, None, range, name_range);
                }
            }
            Some(Expr::Member(member)) => {
                let name = member.member_name();
                match (member.base(), name) {
                    (Some(Expr::NameRef(base)), Some(name)) => {
                        let base_name = base.text().unwrap_or_default();
                        let local = self.resolve(&base_name);
                        match local {
                            Some(id) if self.table.symbols[id.index()].kind == SymbolKind::Resource => {
                                self.bind_name_ref(&base);
                                self.table.calls.insert(
                                    range,
                                    CallTarget::ResourceMethod { resource: id, name },
                                );
                            }
                            None if self.library.is_namespace(&base_name) => {
                                self.bind_function_name(&name, Some(&base_name), range, name_range);
                            }
                            Some(_) => {
                                self.bind_name_ref(&base);
                                self.error(
                                    codes::UNDEFINED_FUNCTION,
                                    name_range,
                                    format!("'{}' has no function named '{}'", base_name, name),
                                );
                            }
                            None => self.bind_name_ref(&base),
                        }
                    }
                    (Some(base), name) => {
                        self.bind_expr(&base, false);
                        if let Some(name) = name {
                            self.error(
                                codes::UNDEFINED_FUNCTION,
                                name_range,
                                format!("the function '{}' does not exist", name),
                            );
                        }
                    }
                    _ => {}
                }
            }
            Some(other) => self.bind_expr(&other, false),
            None => {}
        }

        for arg in call.args() {
            self.bind_expr(&arg, false);
        }
    }

    fn bind_function_name(&mut self, name: &str, namespace: Option<&str>, range: TextRange, name_range: TextRange) {
        if namespace.is_none() {
            match self.table.values.get(name).copied() {
                Some(id) if self.table.symbols[id.index()].kind == SymbolKind::Function => {
                    self.table.calls.insert(range, CallTarget::User(id));
                    if self.current == Some(id) {
                        self.error(
                            codes::SELF_REFERENCE,
                            name_range,
                            format!("the function '{}' cannot call itself", name),
                        );
                    }
                    return;
                }
                Some(id) if self.library.function(None, name).is_none() => {
                    let kind = self.table.symbols[id.index()].kind.display_name();
                    self.error(
                        codes::WRONG_SYMBOL_KIND,
                        name_range,
                        format!("'{}' is a {}, not a function", name, kind),
                    );
                    return;
                }
                _ => {}
            }
        }

        match self.library.function(namespace, name) {
            Some(function) => {
                self.table.calls.insert(
                    range,
                    CallTarget::Library {
                        namespace: function.namespace.clone(),
                        name: function.name.clone(),
                    },
                );
            }
            None => self.error(
                codes::UNDEFINED_FUNCTION,
                name_range,
                format!("the function '{}' does not exist", name),
            ),
        }
    }
}

/// Declarations referenced from the subtree of `node`, in source order.
pub fn referenced_symbols(table: &SymbolTable, node: &SyntaxNode) -> Vec<(TextRange, SymbolId)> {
    node.descendants()
        .filter(|n| n.kind() == SyntaxKind::NAME_REF)
        .filter_map(|n| {
            let range = n.text_range();
            table.reference(range).map(|id| (range, id))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::InMemoryWorkspace;
    use crate::base::SourceUri;
    use tokio_util::sync::CancellationToken;

    fn bind_text(text: &str) -> SymbolTable {
        bind_with(text, &CompilerConfig::default())
    }

    fn bind_with(text: &str, config: &CompilerConfig) -> SymbolTable {
        let workspace = InMemoryWorkspace::new().with_file("file:///main.bicep", text);
        let grouping = SourceFileGrouping::build(
            &SourceUri::new("file:///main.bicep"),
            &workspace,
            &workspace,
            &CancellationToken::new(),
        )
        .unwrap();
        bind(grouping.entry(), &grouping, &FunctionLibrary::builtin(), config)
    }

    fn codes_of(table: &SymbolTable) -> Vec<&'static str> {
        table.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_declarations_and_references() {
        let table = bind_text("param name string\nvar greeting = 'hi ${name}'\noutput result string = greeting\n");
        assert!(table.diagnostics().is_empty(), "{:?}", table.diagnostics());
        let name = table.lookup("name").unwrap();
        let greeting = table.lookup("greeting").unwrap();
        assert_eq!(table.symbol(name).kind, SymbolKind::Parameter);
        assert_eq!(table.reference_count(name), 1);
        assert_eq!(table.reference_count(greeting), 1);
        assert!(table.output("result").is_some());
        assert!(table.lookup("result").is_none());
        assert_eq!(table.declarations().len(), 3);
    }

    #[test]
    fn test_outputs_have_their_own_namespace() {
        let table = bind_text("var x = 1\noutput x int = x\n");
        assert!(table.diagnostics().is_empty());
    }

    #[test]
    fn test_duplicate_and_near_duplicate() {
        let table = bind_text("var a = 1\nvar a = 2\nvar A = 3\n");
        assert_eq!(codes_of(&table), vec![codes::DUPLICATE_SYMBOL, codes::NEAR_DUPLICATE_SYMBOL]);
        assert!(table.diagnostics()[0].is_error());
        assert!(!table.diagnostics()[1].is_error());

        let mut config = CompilerConfig::default();
        config.near_duplicate_names = crate::config::DiagnosticLevel::Off;
        let table = bind_with("var a = 1\nvar A = 3\n", &config);
        assert!(table.diagnostics().is_empty());
    }

    #[test]
    fn test_undefined_and_self_reference() {
        let table = bind_text("var a = b\nvar c = c\n");
        assert_eq!(codes_of(&table), vec![codes::UNDEFINED_SYMBOL, codes::SELF_REFERENCE]);
    }

    #[test]
    fn test_loop_scope() {
        let table = bind_text("param names array\nvar upper = [for (n, i) in names: '${i}:${n}']\n");
        assert!(table.diagnostics().is_empty(), "{:?}", table.diagnostics());
        let locals: Vec<_> = table
            .symbols()
            .filter(|(_, s)| !s.kind.is_top_level())
            .map(|(_, s)| (s.name.as_str(), s.kind))
            .collect();
        assert_eq!(
            locals,
            vec![("n", SymbolKind::LoopVariable), ("i", SymbolKind::LoopIndex)]
        );
    }

    #[test]
    fn test_loop_position() {
        let table = bind_text("var a = {\n  x: [for i in range(0, 2): i]\n}\n");
        assert_eq!(codes_of(&table), vec![codes::INVALID_LOOP_POSITION]);
    }

    #[test]
    fn test_function_scope() {
        let table = bind_text(
            "var prefix = 'x'\ntype name = string\nfunc ok(n name) string => toUpper(n)\nfunc bad(n string) string => '${prefix}${n}'\n",
        );
        assert_eq!(codes_of(&table), vec![codes::FUNCTION_SCOPE_VIOLATION]);
        let ok = table.lookup("ok").unwrap();
        assert_eq!(table.symbol(ok).kind, SymbolKind::Function);
    }

    #[test]
    fn test_call_targets() {
        let text = "func f() string => 'x'\nvar a = f()\nvar b = sys.toLower('A')\nvar c = nope()\nvar d = a()\n";
        let table = bind_text(text);
        assert_eq!(
            codes_of(&table),
            vec![codes::UNDEFINED_FUNCTION, codes::WRONG_SYMBOL_KIND]
        );
        let targets: Vec<_> = table.calls.values().cloned().collect();
        assert!(targets.contains(&CallTarget::User(table.lookup("f").unwrap())));
        assert!(targets.contains(&CallTarget::Library {
            namespace: "sys".into(),
            name: "toLower".into()
        }));
    }

    #[test]
    fn test_unknown_type() {
        let table = bind_text("type t = { a: string, b: widget }\nparam p t\n");
        assert_eq!(codes_of(&table), vec![codes::UNKNOWN_TYPE]);
        assert_eq!(table.type_references.len(), 1);
    }

    #[test]
    fn test_statement_kinds_per_file() {
        let table = bind_text("using './main.bicep'\nparam p = 1\n");
        // A file with `using` is a parameters file
        assert_eq!(table.file_kind(), FileKind::Parameters);
        assert!(!codes_of(&table).contains(&codes::INVALID_STATEMENT_FOR_FILE));

        let table = bind_text("param p = 1\n");
        assert_eq!(codes_of(&table), vec![codes::INVALID_STATEMENT_FOR_FILE]);
    }

    #[test]
    fn test_template_param_without_type() {
        // Parses cleanly; the missing type is a binding error
        let table = bind_text("param x\n");
        assert_eq!(codes_of(&table), vec![codes::INVALID_STATEMENT_FOR_FILE]);
        assert_eq!(table.diagnostics()[0].range, TextRange::new(TextSize::new(6), TextSize::new(7)));
    }

    #[test]
    fn test_symbol_at_offset() {
        let text = "param name string\noutput result string = name\n";
        let table = bind_text(text);
        let offset = TextSize::new(text.rfind("name").unwrap() as u32 + 1);
        let id = table.symbol_at(offset).unwrap();
        assert_eq!(table.symbol(id).name, "name");
    }
}
