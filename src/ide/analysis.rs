//! AnalysisHost: owns the editor-side state of a workspace.
//!
//! File text lives in salsa inputs, so per-file parses are memoized and
//! recomputed only after an edit. Compilations take a snapshot of the current
//! text and of those parses, so an unchanged open file is never parsed twice.
//! They run independently; [`AnalysisHost::compile_all`] runs them in parallel.
//!
//! ## Usage
//!
//! ```ignore
//! let mut host = AnalysisHost::new();
//! host.set_file_content("file:///main.bicep", "param name string\n");
//!
//! let errors = host.syntax_errors(&uri);
//! let result = host.compile(&uri)?;
//! ```

use std::sync::Arc;

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use salsa::Setter;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::base::{Position, SourceUri};
use crate::compilation::{CompilationResult, CompileContext, CompileError, compile};
use crate::config::CompilerConfig;
use crate::hir::{
    FileText, FunctionLibrary, LinterRule, ParseResult, ResourceTypeCatalog, ResourceTypeProvider, RootDatabase,
    default_rules, file_references, parse_file,
};
use crate::project::{InMemoryWorkspace, ModuleResolver, SourceTextProvider};
use crate::syntax::{ReferenceSite, SyntaxFile};

use super::hover::{HoverResult, hover};

/// Owns all mutable state for the IDE layer.
///
/// Apply changes via `set_file_content()` and `remove_file()`, then query
/// syntax or compile.
pub struct AnalysisHost {
    db: RootDatabase,
    inputs: FxHashMap<SourceUri, FileText>,
    /// Text snapshot served to compilations
    workspace: InMemoryWorkspace,
    /// Resolves references the workspace does not hold, such as files on disk
    fallback: Option<Arc<dyn ModuleResolver>>,
    resource_types: Arc<dyn ResourceTypeProvider>,
    functions: FunctionLibrary,
    rules: Vec<Box<dyn LinterRule>>,
    config: CompilerConfig,
    cancel: CancellationToken,
}

impl Default for AnalysisHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisHost {
    /// Create a host with the built-in function library, resource catalog
    /// and linter rules.
    pub fn new() -> Self {
        Self {
            db: RootDatabase::new(),
            inputs: FxHashMap::default(),
            workspace: InMemoryWorkspace::new(),
            fallback: None,
            resource_types: Arc::new(ResourceTypeCatalog::builtin()),
            functions: FunctionLibrary::builtin(),
            rules: default_rules(),
            config: CompilerConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_resource_types(mut self, provider: Arc<dyn ResourceTypeProvider>) -> Self {
        self.resource_types = provider;
        self
    }

    /// Consult `resolver` for references to files the host does not hold.
    pub fn with_fallback_resolver(mut self, resolver: Arc<dyn ModuleResolver>) -> Self {
        self.fallback = Some(resolver);
        self
    }

    pub fn set_config(&mut self, config: CompilerConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Set the content of a file, creating it if needed.
    pub fn set_file_content(&mut self, uri: impl Into<SourceUri>, content: &str) {
        let uri = uri.into();
        match self.inputs.get(&uri).copied() {
            Some(input) => {
                if input.text(&self.db).as_str() != content {
                    input.set_text(&mut self.db).to(content.to_string());
                }
            }
            None => {
                let input = FileText::new(&self.db, uri.clone(), content.to_string());
                self.inputs.insert(uri.clone(), input);
            }
        }
        debug!(uri = uri.as_str(), "file content set");
        self.workspace.insert(uri, content);
    }

    /// Remove a file. Returns whether it was present.
    pub fn remove_file(&mut self, uri: &SourceUri) -> bool {
        self.workspace.remove(uri);
        self.inputs.remove(uri).is_some()
    }

    pub fn file_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn contains(&self, uri: &SourceUri) -> bool {
        self.inputs.contains_key(uri)
    }

    /// The memoized parse of a file.
    pub fn parse(&self, uri: &SourceUri) -> Option<ParseResult> {
        let input = self.inputs.get(uri)?;
        Some(parse_file(&self.db, *input))
    }

    /// Lexical and syntax error messages of a file, in source order.
    pub fn syntax_errors(&self, uri: &SourceUri) -> Vec<String> {
        self.parse(uri).map(|parse| parse.errors).unwrap_or_default()
    }

    /// The `module` and `using` references of a file.
    pub fn references(&self, uri: &SourceUri) -> Vec<ReferenceSite> {
        match self.inputs.get(uri) {
            Some(input) => file_references(&self.db, *input),
            None => Vec::new(),
        }
    }

    /// Cancel in-flight compilations. Later compilations get a fresh token.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
    }

    /// A token that cancels compilations started from now on.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Compile the file at `entry` against the current contents.
    pub fn compile(&self, entry: &SourceUri) -> Result<CompilationResult, CompileError> {
        let resolver = self.resolver();
        compile(entry, &self.sources(), &self.context(&resolver))
    }

    /// Compile several entries in parallel.
    ///
    /// Results are in the order of `entries`.
    pub fn compile_all(&self, entries: &[SourceUri]) -> Vec<Result<CompilationResult, CompileError>> {
        let resolver = self.resolver();
        let ctx = self.context(&resolver);
        let sources = self.sources();
        entries.par_iter().map(|entry| compile(entry, &sources, &ctx)).collect()
    }

    /// Hover information at a position of an entry file.
    pub fn hover(&self, entry: &SourceUri, position: Position) -> Option<HoverResult> {
        let result = self.compile(entry).ok()?;
        let model = &result.model;
        hover(model, model.entry(), position)
    }

    /// Current text plus the memoized parse of every open file.
    fn sources(&self) -> HostSources<'_> {
        let parsed = self
            .inputs
            .iter()
            .map(|(uri, input)| (uri.clone(), parse_file(&self.db, *input).syntax_file))
            .collect();
        HostSources {
            workspace: &self.workspace,
            parsed,
        }
    }

    fn resolver(&self) -> HostResolver<'_> {
        HostResolver {
            workspace: &self.workspace,
            fallback: self.fallback.as_deref(),
        }
    }

    fn context<'a>(&'a self, resolver: &'a HostResolver<'a>) -> CompileContext<'a> {
        CompileContext {
            resolver,
            resource_types: self.resource_types.as_ref(),
            functions: &self.functions,
            config: &self.config,
            rules: &self.rules,
            cancel: self.cancel.clone(),
        }
    }
}

struct HostSources<'a> {
    workspace: &'a InMemoryWorkspace,
    parsed: FxHashMap<SourceUri, Arc<SyntaxFile>>,
}

impl SourceTextProvider for HostSources<'_> {
    fn source_text(&self, uri: &SourceUri) -> Option<Arc<str>> {
        self.workspace.source_text(uri)
    }

    fn parsed_file(&self, uri: &SourceUri, text: &str) -> Option<Arc<SyntaxFile>> {
        self.parsed
            .get(uri)
            .filter(|file| file.text().as_ref() == text)
            .cloned()
    }
}

/// Workspace first, then the fallback resolver.
struct HostResolver<'a> {
    workspace: &'a InMemoryWorkspace,
    fallback: Option<&'a dyn ModuleResolver>,
}

impl ModuleResolver for HostResolver<'_> {
    fn resolve(
        &self,
        from: &SourceUri,
        reference: &crate::project::ModuleReference,
    ) -> Result<crate::project::ResolvedFile, crate::project::ResolutionError> {
        match (self.workspace.resolve(from, reference), self.fallback) {
            (Ok(file), _) => Ok(file),
            (Err(_), Some(fallback)) => fallback.resolve(from, reference),
            (Err(e), None) => Err(e),
        }
    }
}
