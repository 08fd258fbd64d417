//! Diagnostic assertion helpers.

use bicep::CompilationResult;
use bicep::hir::{Diagnostic, Severity};

use crate::helpers::compile_helpers::compile_source;

/// Codes of all diagnostics for a source string, in reported order.
pub fn codes_from(source: &str) -> Vec<&'static str> {
    diagnostic_codes(&compile_source(source))
}

pub fn diagnostic_codes(result: &CompilationResult) -> Vec<&'static str> {
    result.diagnostics.iter().map(|d| d.code).collect()
}

/// Get only error-level diagnostics.
pub fn errors_from(source: &str) -> Vec<Diagnostic> {
    compile_source(source)
        .diagnostics
        .into_iter()
        .filter(|d| d.severity == Severity::Error)
        .collect()
}

/// Assert a source has no errors.
pub fn assert_no_errors(source: &str) {
    let errors = errors_from(source);
    assert!(
        errors.is_empty(),
        "Expected no errors, got {} error(s):\n{}",
        errors.len(),
        errors
            .iter()
            .map(|e| format!("  {:?} {}: {}", e.range, e.code, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    );
}
