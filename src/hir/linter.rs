//! Linter rules.
//!
//! Rules run after binding and report through the `Linter` category with
//! the rule name as code. Each rule has a default level that configuration
//! may override or switch off.

use super::binder::{SymbolKind, SymbolTable};
use super::diagnostics::{Diagnostic, DiagnosticCategory};
use crate::base::TextRange;
use crate::config::{CompilerConfig, DiagnosticLevel};
use crate::syntax::FileKind;

/// A lint over one file's symbol table.
pub trait LinterRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn default_level(&self) -> DiagnosticLevel {
        DiagnosticLevel::Warning
    }

    /// Findings as (range, message)
    fn check(&self, table: &SymbolTable) -> Vec<(TextRange, String)>;
}

pub struct NoUnusedParams;

impl LinterRule for NoUnusedParams {
    fn name(&self) -> &'static str {
        "no-unused-params"
    }

    fn check(&self, table: &SymbolTable) -> Vec<(TextRange, String)> {
        // Assignments in a parameters file are consumed by the target template
        if table.file_kind() == FileKind::Parameters {
            return Vec::new();
        }
        unused(table, SymbolKind::Parameter, "parameter")
    }
}

pub struct NoUnusedVars;

impl LinterRule for NoUnusedVars {
    fn name(&self) -> &'static str {
        "no-unused-vars"
    }

    fn check(&self, table: &SymbolTable) -> Vec<(TextRange, String)> {
        unused(table, SymbolKind::Variable, "variable")
    }
}

fn unused(table: &SymbolTable, kind: SymbolKind, noun: &str) -> Vec<(TextRange, String)> {
    table
        .of_kind(kind)
        .filter(|id| table.reference_count(*id) == 0)
        .map(|id| {
            let symbol = table.symbol(id);
            (
                symbol.name_range,
                format!("the {} '{}' is declared but never used", noun, symbol.name),
            )
        })
        .collect()
}

pub fn default_rules() -> Vec<Box<dyn LinterRule>> {
    vec![Box::new(NoUnusedParams), Box::new(NoUnusedVars)]
}

/// Run `rules` over `table` at their configured levels.
pub fn run_linter(table: &SymbolTable, rules: &[Box<dyn LinterRule>], config: &CompilerConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for rule in rules {
        let Some(severity) = config.rule_level(rule.name(), rule.default_level()).severity() else {
            continue;
        };
        for (range, message) in rule.check(table) {
            diagnostics.push(Diagnostic::new(
                severity,
                DiagnosticCategory::Linter,
                rule.name(),
                table.file(),
                range,
                message,
            ));
        }
    }
    diagnostics
}
