//! # bicep-core
//!
//! Compiler core for a declarative infrastructure language: lexing,
//! lossless parsing, module grouping, binding, type checking and template
//! emission.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! ide          → AnalysisHost, hover, parallel compilation
//!   ↓
//! compilation  → compile(): grouping → model → template
//!   ↓
//! emit         → Template / deployment parameters JSON
//!   ↓
//! hir          → Binder, type checker, linter, salsa parse queries
//!   ↓
//! project      → Module references, resolvers, source-file grouping
//!   ↓
//! syntax       → SyntaxFile: parsed file with identity
//!   ↓
//! parser       → Logos lexer, rowan parser, typed AST
//!   ↓
//! base         → Primitives (FileId, SourceUri, TextRange, LineIndex)
//! ```

// ============================================================================
// MODULES (dependency order: base → parser → syntax → project → hir → emit → ide)
// ============================================================================

/// Foundation types: FileId, SourceUri, TextRange
pub mod base;

/// Parser: Logos lexer, recursive-descent parser, typed AST
pub mod parser;

/// Syntax: parsed source files with identity
pub mod syntax;

/// Compiler configuration
pub mod config;

/// Module references, resolvers and source-file grouping
pub mod project;

/// High-level IR: binder, type checker, semantic model
pub mod hir;

/// Template emission
pub mod emit;

/// One-shot compilation entry point
pub mod compilation;

/// IDE features: analysis host, hover
pub mod ide;

// Re-export commonly needed items
pub use compilation::{CompilationResult, CompileContext, CompileError, compile, compile_with_defaults};
pub use config::CompilerConfig;
pub use emit::{EmitError, ParametersFile, Template, emit, emit_parameters, emit_with};

// Re-export foundation types
pub use base::{FileId, LineCol, LineIndex, Position, SourceUri, Span, TextRange, TextSize};
