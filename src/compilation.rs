//! One-shot compilation: entry file in, diagnostics and template out.
//!
//! ```text
//! entry uri ──► SourceFileGrouping ──► SemanticModel ──► emit / emit_parameters
//!                (resolver, cancel)     (bind, check,
//!                                        lint, levels)
//! ```

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::base::{SourceUri, TextRange};
use crate::config::CompilerConfig;
use crate::emit::{self, EmitError, ParametersFile, Template};
use crate::hir::{
    AnalysisContext, Diagnostic, DiagnosticCategory, FunctionLibrary, LinterRule, ResourceTypeProvider,
    SemanticModel, codes, default_rules,
};
use crate::project::{ModuleResolver, SourceFileGrouping, SourceTextProvider};
use crate::syntax::FileKind;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CompileError {
    #[error("compilation was cancelled")]
    Cancelled,
}

impl From<crate::project::Cancelled> for CompileError {
    fn from(_: crate::project::Cancelled) -> Self {
        CompileError::Cancelled
    }
}

/// Capabilities and settings shared by compilations.
///
/// Nothing here is mutated by a compilation, so one context can serve any
/// number of concurrent compilations.
pub struct CompileContext<'a> {
    pub resolver: &'a dyn ModuleResolver,
    pub resource_types: &'a dyn ResourceTypeProvider,
    pub functions: &'a FunctionLibrary,
    pub config: &'a CompilerConfig,
    pub rules: &'a [Box<dyn LinterRule>],
    pub cancel: CancellationToken,
}

/// Everything a compilation produced.
#[derive(Debug, Clone)]
pub struct CompilationResult {
    /// Sorted by file, position and code
    pub diagnostics: Vec<Diagnostic>,
    /// `None` when an error blocks emission or the entry is a parameters file
    pub template: Option<Template>,
    /// `Some` only for a parameters-file entry that emitted cleanly
    pub parameters: Option<ParametersFile>,
    pub model: Arc<SemanticModel>,
}

impl CompilationResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Compile the file at `entry`.
///
/// Only cancellation fails a compilation; every other problem is reported as
/// a diagnostic.
pub fn compile(
    entry: &SourceUri,
    sources: &dyn SourceTextProvider,
    ctx: &CompileContext<'_>,
) -> Result<CompilationResult, CompileError> {
    let grouping = SourceFileGrouping::build(entry, sources, ctx.resolver, &ctx.cancel).inspect_err(|_| {
        warn!(entry = entry.as_str(), "compilation cancelled while resolving modules");
    })?;

    if ctx.cancel.is_cancelled() {
        warn!(entry = entry.as_str(), "compilation cancelled before type checking");
        return Err(CompileError::Cancelled);
    }

    let model = SemanticModel::build(
        Arc::new(grouping),
        &AnalysisContext {
            library: ctx.functions,
            resource_types: ctx.resource_types,
            config: ctx.config,
            rules: ctx.rules,
        },
    );

    let mut diagnostics = model.diagnostics().to_vec();
    let kind = model.entry_model().map(|file| file.file.kind());
    let (template, parameters) = match kind {
        Some(FileKind::Parameters) => {
            let parameters = emit::emit_parameters(&model, &ctx.config.emit);
            (None, emission(&model, parameters, &mut diagnostics))
        }
        _ => {
            let template = emit::emit_with(&model, &ctx.config.emit);
            (emission(&model, template, &mut diagnostics), None)
        }
    };

    info!(
        entry = entry.as_str(),
        files = model.files().len(),
        diagnostics = diagnostics.len(),
        emitted = template.is_some() || parameters.is_some(),
        "compiled"
    );

    Ok(CompilationResult {
        diagnostics,
        template,
        parameters,
        model: Arc::new(model),
    })
}

/// Compile with the built-in function library and the default linter rules.
pub fn compile_with_defaults(
    entry: &SourceUri,
    sources: &dyn SourceTextProvider,
    resolver: &dyn ModuleResolver,
    resource_types: &dyn ResourceTypeProvider,
    config: &CompilerConfig,
) -> Result<CompilationResult, CompileError> {
    let functions = FunctionLibrary::builtin();
    let rules = default_rules();
    compile(
        entry,
        sources,
        &CompileContext {
            resolver,
            resource_types,
            functions: &functions,
            config,
            rules: &rules,
            cancel: CancellationToken::new(),
        },
    )
}

/// Keep emitted output, reporting emission failures as diagnostics on the
/// entry file.
fn emission<T>(model: &SemanticModel, result: Result<T, EmitError>, diagnostics: &mut Vec<Diagnostic>) -> Option<T> {
    let error = match result {
        Ok(output) => return Some(output),
        // Already reported
        Err(EmitError::Blocked(_) | EmitError::NotATemplate | EmitError::NotAParametersFile) => return None,
        Err(error) => error,
    };
    let range = match &error {
        EmitError::Unsupported { range, .. } | EmitError::Incomplete(range) => *range,
        _ => TextRange::default(),
    };
    diagnostics.push(Diagnostic::error(
        DiagnosticCategory::Emission,
        codes::EMIT_FAILED,
        model.entry(),
        range,
        error.to_string(),
    ));
    None
}
