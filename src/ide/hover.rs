//! Hover information implementation.

use std::sync::Arc;

use crate::base::{FileId, Position};
use crate::hir::{SemanticModel, SymbolKind};

/// Result of a hover request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HoverResult {
    /// The hover content (markdown).
    pub contents: String,
    pub name: Arc<str>,
    pub kind: SymbolKind,
    /// Whether the position is on the declaration itself.
    pub is_definition: bool,
    /// Start line of the declared name (0-indexed).
    pub start_line: u32,
    /// Start column (0-indexed).
    pub start_col: u32,
    /// End line (0-indexed).
    pub end_line: u32,
    /// End column (0-indexed).
    pub end_col: u32,
}

/// Describe the symbol declared or referenced at `position`.
pub fn hover(model: &SemanticModel, file: FileId, position: Position) -> Option<HoverResult> {
    let file_model = model.file(file)?;
    let line_index = file_model.file.line_index();
    let offset = line_index.offset_of_position(position)?;
    let (symbol, ty) = model.symbol_at(file, offset)?;

    let contents = format!("```bicep\n{} {}: {}\n```", symbol.kind.display_name(), symbol.name, ty);
    let span = line_index.span(symbol.name_range);
    Some(HoverResult {
        contents,
        name: Arc::from(symbol.name.as_str()),
        kind: symbol.kind,
        is_definition: symbol.name_range.contains_inclusive(offset),
        start_line: span.start.line as u32,
        start_col: span.start.column as u32,
        end_line: span.end.line as u32,
        end_col: span.end.column as u32,
    })
}
