//! Diagnostics: structured error reporting for every compilation stage.
//!
//! Every diagnostic carries a severity, a stable code, a message, the file
//! and range it applies to, and the pipeline stage that produced it. The
//! core never prints diagnostics; callers decide how to render them.

use std::sync::Arc;

use crate::base::{FileId, LineIndex, Span, TextRange};
use crate::syntax::SyntaxFile;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
        }
    }
}

/// Pipeline stage that produced a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Lexical,
    Syntactic,
    Resolution,
    Binding,
    Type,
    Emission,
    /// Configurable analyzer rules
    Linter,
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// The file containing this diagnostic.
    pub file: FileId,
    /// Byte range within the file.
    pub range: TextRange,
    /// Severity level.
    pub severity: Severity,
    /// Stable code (e.g., "BCP033").
    pub code: &'static str,
    /// The diagnostic message.
    pub message: Arc<str>,
    pub category: DiagnosticCategory,
    /// Optional related information.
    pub related: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelatedInfo {
    /// The file containing this info.
    pub file: FileId,
    pub range: TextRange,
    /// The message.
    pub message: Arc<str>,
}

impl Diagnostic {
    pub fn new(
        severity: Severity,
        category: DiagnosticCategory,
        code: &'static str,
        file: FileId,
        range: TextRange,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            file,
            range,
            severity,
            code,
            message: message.into(),
            category,
            related: Vec::new(),
        }
    }

    /// Create a new error diagnostic.
    pub fn error(
        category: DiagnosticCategory,
        code: &'static str,
        file: FileId,
        range: TextRange,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self::new(Severity::Error, category, code, file, range, message)
    }

    /// Create a new warning diagnostic.
    pub fn warning(
        category: DiagnosticCategory,
        code: &'static str,
        file: FileId,
        range: TextRange,
        message: impl Into<Arc<str>>,
    ) -> Self {
        Self::new(Severity::Warning, category, code, file, range, message)
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related.push(info);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Line/column span of this diagnostic.
    pub fn span(&self, line_index: &LineIndex) -> Span {
        line_index.span(self.range)
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Stable diagnostic codes.
///
/// Lexical codes come from [`crate::parser::LexError::code`]. Linter rule
/// diagnostics use the rule name as their code.
#[allow(dead_code)]
pub mod codes {
    // ========================================================================
    // SYNTAX
    // ========================================================================

    /// Unexpected or missing token.
    pub const UNEXPECTED_TOKEN: &str = "BCP018";

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// Referenced file does not exist.
    pub const MODULE_NOT_FOUND: &str = "BCP091";
    /// String interpolation in a module path.
    pub const INTERPOLATED_PATH: &str = "BCP092";
    /// Reference string cannot be parsed.
    pub const MALFORMED_REFERENCE: &str = "BCP097";
    /// Module references form a cycle.
    pub const MODULE_CYCLE: &str = "BCP095";
    /// External artifact has not been restored locally.
    pub const MODULE_RESTORE_PENDING: &str = "BCP190";
    /// Registry requires credentials.
    pub const MODULE_AUTH_REQUIRED: &str = "BCP192";

    // ========================================================================
    // BINDING
    // ========================================================================

    /// Duplicate declaration.
    pub const DUPLICATE_SYMBOL: &str = "BCP028";
    /// Declarations differing only by case.
    pub const NEAR_DUPLICATE_SYMBOL: &str = "BCP300";
    /// Name not found.
    pub const UNDEFINED_SYMBOL: &str = "BCP057";
    /// Function name not found.
    pub const UNDEFINED_FUNCTION: &str = "BCP082";
    /// Function body references something outside its scope.
    pub const FUNCTION_SCOPE_VIOLATION: &str = "BCP341";
    /// A declaration refers to itself.
    pub const SELF_REFERENCE: &str = "BCP079";
    /// Duplicate property in an object literal.
    pub const DUPLICATE_PROPERTY: &str = "BCP025";
    /// Symbol used in a position that needs a different kind.
    pub const WRONG_SYMBOL_KIND: &str = "BCP063";

    // ========================================================================
    // TYPE
    // ========================================================================

    /// Value not assignable to the expected type.
    pub const TYPE_MISMATCH: &str = "BCP033";
    /// Required properties missing.
    pub const MISSING_PROPERTIES: &str = "BCP035";
    /// Property not allowed on a sealed type.
    pub const DISALLOWED_PROPERTY: &str = "BCP037";
    /// No overload accepts the arguments.
    pub const NO_MATCHING_OVERLOAD: &str = "BCP048";
    /// Operator applied to unsupported operand types.
    pub const OPERATOR_MISMATCH: &str = "BCP045";
    /// Condition is not a bool.
    pub const CONDITION_NOT_BOOL: &str = "BCP046";
    /// Property does not exist on the type.
    pub const UNKNOWN_PROPERTY: &str = "BCP053";
    /// Outputs of a module that failed to resolve.
    pub const UNRESOLVED_MODULE_OUTPUT: &str = "BCP062";
    /// Wrong number of arguments.
    pub const ARGUMENT_COUNT: &str = "BCP071";
    /// Write to a read-only property.
    pub const READ_ONLY_PROPERTY: &str = "BCP073";
    /// Dependency cycle between declarations.
    pub const DEPENDENCY_CYCLE: &str = "BCP080";
    /// Resource type not known to the provider.
    pub const UNKNOWN_RESOURCE_TYPE: &str = "BCP081";
    /// Resource type string is malformed.
    pub const INVALID_RESOURCE_TYPE: &str = "BCP029";
    /// Decorator not valid on this declaration.
    pub const INVALID_DECORATOR_TARGET: &str = "BCP124";
    /// Unknown decorator.
    pub const UNKNOWN_DECORATOR: &str = "BCP152";
    /// Loop source is not an array.
    pub const LOOP_SOURCE_NOT_ARRAY: &str = "BCP137";
    /// For-expression in an unsupported position.
    pub const INVALID_LOOP_POSITION: &str = "BCP138";
    /// Unknown type name.
    pub const UNKNOWN_TYPE: &str = "BCP302";
    /// Invalid targetScope value.
    pub const INVALID_TARGET_SCOPE: &str = "BCP074";
    /// Parameters file assigns an unknown parameter.
    pub const UNKNOWN_PARAMETER_ASSIGNMENT: &str = "BCP259";
    /// Parameters file omits a required parameter.
    pub const MISSING_PARAMETER_ASSIGNMENT: &str = "BCP258";
    /// Statement not allowed in this kind of file.
    pub const INVALID_STATEMENT_FOR_FILE: &str = "BCP337";

    // ========================================================================
    // EMISSION
    // ========================================================================

    /// Checked construct with no template lowering.
    pub const EMIT_FAILED: &str = "BCP339";
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects diagnostics during analysis.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    /// Create a new empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    /// Get all diagnostics.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Get the number of errors.
    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// Check if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Lexical and syntactic diagnostics of one parsed file.
pub fn parse_diagnostics(file_id: FileId, file: &SyntaxFile) -> Vec<Diagnostic> {
    let parse = file.parse();
    let lexical = parse.lex_errors.iter().map(|(range, error)| {
        Diagnostic::error(
            DiagnosticCategory::Lexical,
            error.code(),
            file_id,
            *range,
            error.to_string(),
        )
    });
    let syntactic = parse.errors.iter().map(|error| {
        Diagnostic::error(
            DiagnosticCategory::Syntactic,
            codes::UNEXPECTED_TOKEN,
            file_id,
            error.range,
            error.message.clone(),
        )
    });
    let mut all: Vec<_> = lexical.chain(syntactic).collect();
    all.sort_by_key(|d| d.range.start());
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{SourceUri, TextSize};

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn test_collector_counts() {
        let mut collector = DiagnosticCollector::new();
        collector.add(Diagnostic::error(
            DiagnosticCategory::Binding,
            codes::UNDEFINED_SYMBOL,
            FileId::new(0),
            range(0, 1),
            "the name 'a' does not exist in the current context",
        ));
        collector.extend([Diagnostic::warning(
            DiagnosticCategory::Linter,
            "no-unused-vars",
            FileId::new(0),
            range(2, 3),
            "unused",
        )]);
        assert_eq!(collector.error_count(), 1);
        assert!(collector.has_errors());
        assert_eq!(collector.diagnostics().len(), 2);
        assert_eq!(collector.finish().len(), 2);
    }

    #[test]
    fn test_related_info() {
        let diag = Diagnostic::error(
            DiagnosticCategory::Binding,
            codes::DUPLICATE_SYMBOL,
            FileId::new(0),
            range(10, 11),
            "identifier 'x' is declared multiple times",
        )
        .with_related(RelatedInfo {
            file: FileId::new(0),
            range: range(0, 1),
            message: Arc::from("previous declaration of 'x'"),
        });
        assert_eq!(diag.related[0].range, range(0, 1));
    }

    #[test]
    fn test_parse_diagnostics_categories() {
        let file = SyntaxFile::new(SourceUri::new("file:///a.bicep"), "var x = 'abc\nparam\n");
        let diags = parse_diagnostics(FileId::new(0), &file);
        assert!(diags.iter().any(|d| d.category == DiagnosticCategory::Lexical && d.code == "BCP004"));
        assert!(diags.iter().any(|d| d.category == DiagnosticCategory::Syntactic));
        assert!(diags.iter().all(|d| d.is_error()));
    }

    #[test]
    fn test_severity_to_lsp() {
        assert_eq!(Severity::Error.to_lsp(), 1);
        assert_eq!(Severity::Info.to_lsp(), 3);
    }
}
