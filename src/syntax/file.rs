//! Syntax file wrapper for parsed Bicep files.
//!
//! A `SyntaxFile` pairs a source URI with its text, its lossless parse and a
//! line index. It is immutable and cheap to share between compilations.

use std::sync::Arc;

use crate::base::{LineIndex, SourceUri, TextRange};
use crate::parser::{AstNode, Parse, SourceFile, Statement, parse};

/// A parsed syntax file.
#[derive(Debug, Clone)]
pub struct SyntaxFile {
    uri: SourceUri,
    text: Arc<str>,
    /// The underlying rowan parse result
    parse: Parse,
    line_index: LineIndex,
    kind: FileKind,
}

// Two SyntaxFiles are equal if they have the same identity and text; the
// parse is a pure function of the text.
impl PartialEq for SyntaxFile {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri && self.text == other.text
    }
}

impl Eq for SyntaxFile {}

/// Template files declare resources; parameters files assign the parameters
/// of the template named by their `using` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Template,
    Parameters,
}

/// Which statement introduced a file reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Module,
    Using,
}

/// A `module` or `using` reference found in a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSite {
    pub kind: ReferenceKind,
    /// Name of the module declaration, if any
    pub declaration: Option<smol_str::SmolStr>,
    /// The decoded path string; `None` when missing or interpolated
    pub path: Option<String>,
    pub interpolated: bool,
    /// Range of the path string, or of the statement when it is missing
    pub range: TextRange,
}

impl SyntaxFile {
    /// Parse `text` as the file identified by `uri`
    pub fn new(uri: SourceUri, text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let parse = parse(&text);
        let line_index = LineIndex::new(&text);
        let has_using = SourceFile::cast(parse.syntax())
            .and_then(|f| f.using())
            .is_some();
        let kind = if has_using || uri.extension() == Some("bicepparam") {
            FileKind::Parameters
        } else {
            FileKind::Template
        };
        Self {
            uri,
            text,
            parse,
            line_index,
            kind,
        }
    }

    pub fn uri(&self) -> &SourceUri {
        &self.uri
    }

    pub fn text(&self) -> &Arc<str> {
        &self.text
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Get the underlying parse result
    pub fn parse(&self) -> &Parse {
        &self.parse
    }

    /// Get the root source file AST node
    pub fn source_file(&self) -> Option<SourceFile> {
        SourceFile::cast(self.parse.syntax())
    }

    /// Check if lexing or parsing had errors
    pub fn has_errors(&self) -> bool {
        !self.parse.ok()
    }

    /// Get parse errors
    pub fn errors(&self) -> &[crate::parser::SyntaxError] {
        &self.parse.errors
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Extract `module` and `using` references in declaration order
    pub fn references(&self) -> Vec<ReferenceSite> {
        let Some(source_file) = self.source_file() else {
            return Vec::new();
        };

        source_file
            .statements()
            .filter_map(|statement| {
                let (kind, declaration, path) = match &statement {
                    Statement::Module(module) => (
                        ReferenceKind::Module,
                        module.name().and_then(|n| n.text()),
                        module.path(),
                    ),
                    Statement::Using(using) => (ReferenceKind::Using, None, using.path()),
                    _ => return None,
                };
                let range = path
                    .as_ref()
                    .map(|p| p.syntax().text_range())
                    .unwrap_or_else(|| statement.syntax().text_range());
                Some(ReferenceSite {
                    kind,
                    declaration,
                    interpolated: path.as_ref().is_some_and(|p| p.is_interpolated()),
                    path: path.and_then(|p| p.literal_value()),
                    range,
                })
            })
            .collect()
    }
}
