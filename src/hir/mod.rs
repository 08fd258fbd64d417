//! High-level IR (HIR): binding, type checking and the semantic model.
//!
//! Each file of a grouping runs through the same stages. Files are processed
//! so that every module a file references is finished first, which lets the
//! checker type `module` declarations from the referenced file's interface.
//!
//! ## Stages
//!
//! ```text
//! SyntaxFile                 ← lossless parse (see `parser`)
//!     │
//!     ▼
//! bind(file)                 ← scopes, symbols, reference resolution
//!     │
//!     ▼
//! check_file(file)           ← declared/inferred types, assignability,
//!     │                        overloads, decorators, module interface
//!     ▼
//! DependencyGraph::build     ← declaration dependencies, cycle detection
//!     │
//!     ▼
//! run_linter(file)           ← configurable lint rules
//!     │
//!     ▼
//! SemanticModel              ← per-file results + ordered diagnostics
//! ```
//!
//! [`RootDatabase`] memoizes per-file parsing for long-lived hosts.

mod binder;
mod checker;
mod db;
mod dependencies;
mod diagnostics;
pub mod functions;
pub mod linter;
mod model;
pub mod resource_types;
pub mod types;

pub use binder::{
    CallTarget, Scope, ScopeId, ScopeKind, Symbol, SymbolId, SymbolKind, SymbolTable, bind,
    referenced_symbols,
};
pub use checker::{CheckContext, CheckedFile, TargetScope, check_file};
pub use db::{FileText, ParseResult, RootDatabase, file_references, parse_file};
pub use dependencies::DependencyGraph;
pub use diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticCollector, RelatedInfo, Severity, codes,
    parse_diagnostics,
};
pub use functions::{FunctionDef, FunctionLibrary, OverloadError};
pub use linter::{LinterRule, default_rules, run_linter};
pub use model::{AnalysisContext, FileModel, SemanticModel};
pub use resource_types::{
    ResourceTypeCatalog, ResourceTypeProvider, ResourceTypeReference, ResourceTypeShape,
};
pub use types::{ModuleInterface, ObjectType, PropertyType, Type, is_assignable};
