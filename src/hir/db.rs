//! Salsa database definition and queries.

use std::sync::Arc;

use crate::base::SourceUri;
use crate::syntax::{ReferenceSite, SyntaxFile};

// ============================================================================
// INPUTS
// ============================================================================

/// Input: The raw text content of a file.
///
/// Set this explicitly when a file is opened or changed.
#[salsa::input]
pub struct FileText {
    #[return_ref]
    pub uri: SourceUri,
    #[return_ref]
    pub text: String,
}

// ============================================================================
// DATABASE
// ============================================================================

/// The root Salsa database for per-file syntax queries.
///
/// Parsing is memoized per file; results are invalidated when the file's
/// text changes.
#[salsa::db]
#[derive(Default, Clone)]
pub struct RootDatabase {
    storage: salsa::Storage<Self>,
}

#[salsa::db]
impl salsa::Database for RootDatabase {
    fn salsa_event(&self, _event: &dyn Fn() -> salsa::Event) {
        // Default no-op implementation
    }
}

impl RootDatabase {
    /// Create a new, empty database.
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// PARSE RESULT
// ============================================================================

/// A parsed file plus its rendered syntax errors.
#[derive(Clone, Debug, PartialEq)]
pub struct ParseResult {
    pub syntax_file: Arc<SyntaxFile>,
    /// Lexical and syntax error messages, in source order
    pub errors: Vec<String>,
}

// Manual Eq impl for Salsa tracking
impl Eq for ParseResult {}

impl ParseResult {
    fn new(syntax_file: SyntaxFile) -> Self {
        let parse = syntax_file.parse();
        let mut located: Vec<_> = parse
            .lex_errors
            .iter()
            .map(|(range, e)| (*range, e.to_string()))
            .chain(parse.errors.iter().map(|e| (e.range, e.message.clone())))
            .collect();
        located.sort_by_key(|(range, _)| range.start());
        Self {
            syntax_file: Arc::new(syntax_file),
            errors: located.into_iter().map(|(_, message)| message).collect(),
        }
    }

    /// The file parsed without lexical or syntax errors
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn syntax_file(&self) -> &Arc<SyntaxFile> {
        &self.syntax_file
    }
}

// ============================================================================
// TRACKED QUERIES
// ============================================================================

/// Parse a file.
///
/// This is a tracked Salsa query - results are memoized and automatically
/// invalidated when the input `FileText` changes.
#[salsa::tracked]
pub fn parse_file(db: &dyn salsa::Database, file_text: FileText) -> ParseResult {
    let uri = file_text.uri(db).clone();
    let text = file_text.text(db);
    ParseResult::new(SyntaxFile::new(uri, text.as_str()))
}

/// The `module` and `using` references of a file.
#[salsa::tracked]
pub fn file_references(db: &dyn salsa::Database, file_text: FileText) -> Vec<ReferenceSite> {
    parse_file(db, file_text).syntax_file.references()
}

#[cfg(test)]
mod tests {
    use super::*;
    use salsa::Setter;

    fn uri() -> SourceUri {
        SourceUri::new("file:///main.bicep")
    }

    #[test]
    fn test_database_creation() {
        let _db = RootDatabase::new();
    }

    #[test]
    fn test_salsa_tracked_parse_query() {
        let db = RootDatabase::new();
        let file_text = FileText::new(&db, uri(), "param a string\noutput b string = a\n".to_string());

        let result = parse_file(&db, file_text);
        assert!(result.is_ok(), "Parse failed with errors: {:?}", result.errors);
        assert_eq!(result.syntax_file().uri(), &uri());
    }

    #[test]
    fn test_parse_errors_are_reported() {
        let db = RootDatabase::new();
        let file_text = FileText::new(&db, uri(), "param a\nvar = 1\n".to_string());

        let result = parse_file(&db, file_text);
        assert!(result.has_errors());
        // The tree is still lossless
        assert_eq!(
            result.syntax_file().parse().syntax().to_string(),
            "param a\nvar = 1\n"
        );
    }

    #[test]
    fn test_salsa_memoization() {
        let db = RootDatabase::new();
        let file_text = FileText::new(&db, uri(), "var x = 1\n".to_string());

        let first = parse_file(&db, file_text);
        let second = parse_file(&db, file_text);
        assert!(Arc::ptr_eq(&first.syntax_file, &second.syntax_file));
    }

    #[test]
    fn test_salsa_invalidation() {
        let mut db = RootDatabase::new();
        let file_text = FileText::new(&db, uri(), "module m './a.bicep' = {}\n".to_string());
        assert_eq!(file_references(&db, file_text).len(), 1);

        file_text.set_text(&mut db).to("var x = 1\n".to_string());
        assert!(file_references(&db, file_text).is_empty());
    }
}
