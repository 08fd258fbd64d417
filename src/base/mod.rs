//! Foundation types for the compiler.
//!
//! This module provides fundamental types used throughout the pipeline:
//! - [`FileId`] - Arena index of a source file within one grouping
//! - [`SourceUri`] - Normalized file identity
//! - [`TextRange`], [`TextSize`] - Source positions (byte offsets)
//! - [`LineCol`], [`LineIndex`] - Line/column conversion
//! - [`Position`], [`Span`] - Line/column positions for tooling queries
//! - Identifier rules shared by the lexer and the emitter
//!
//! This module has NO dependencies on other crate modules.

mod file_id;
mod position;
mod span;
pub mod text;
mod uri;

pub use file_id::FileId;
pub use position::{Position, Span};
pub use span::{LineCol, LineIndex, TextRange, TextSize};
pub use uri::SourceUri;

// Re-export text-size types for convenience
pub use text_size;
