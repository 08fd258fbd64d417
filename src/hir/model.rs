//! Semantic model: the checked result of one compilation.
//!
//! Built once from a grouping; immutable afterwards. Files are analyzed in
//! the grouping's post-order so a module's interface is known before any
//! file referencing it is checked.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use super::binder::{Symbol, SymbolId, SymbolTable, bind};
use super::checker::{CheckContext, CheckedFile, TargetScope, check_file};
use super::dependencies::DependencyGraph;
use super::diagnostics::{Diagnostic, DiagnosticCollector, parse_diagnostics};
use super::functions::FunctionLibrary;
use super::linter::{LinterRule, run_linter};
use super::resource_types::ResourceTypeProvider;
use super::types::{ModuleInterface, Type};
use crate::base::{FileId, Position, TextSize};
use crate::config::CompilerConfig;
use crate::parser::{SyntaxKind, SyntaxNode};
use crate::project::SourceFileGrouping;
use crate::syntax::SyntaxFile;

/// Capabilities and settings for building a model.
pub struct AnalysisContext<'a> {
    pub library: &'a FunctionLibrary,
    pub resource_types: &'a dyn ResourceTypeProvider,
    pub config: &'a CompilerConfig,
    pub rules: &'a [Box<dyn LinterRule>],
}

/// Analysis results for one file.
#[derive(Debug, Clone)]
pub struct FileModel {
    pub id: FileId,
    pub file: Arc<SyntaxFile>,
    pub symbols: SymbolTable,
    pub checked: CheckedFile,
    pub dependencies: DependencyGraph,
}

impl FileModel {
    pub fn symbol_type(&self, id: SymbolId) -> &Type {
        self.checked.symbol_type(id)
    }

    pub fn target_scope(&self) -> TargetScope {
        self.checked.target_scope()
    }
}

#[derive(Debug, Clone)]
pub struct SemanticModel {
    grouping: Arc<SourceFileGrouping>,
    files: Vec<FileModel>,
    diagnostics: Vec<Diagnostic>,
}

impl SemanticModel {
    pub fn build(grouping: Arc<SourceFileGrouping>, ctx: &AnalysisContext<'_>) -> Self {
        let mut order: Vec<FileId> = grouping.post_order().to_vec();
        for (id, _) in grouping.files() {
            if !order.contains(&id) {
                order.push(id);
            }
        }

        let mut interfaces: FxHashMap<FileId, ModuleInterface> = FxHashMap::default();
        let mut models: Vec<Option<FileModel>> = vec![None; grouping.file_count()];
        let mut diagnostics = DiagnosticCollector::new();
        diagnostics.extend(grouping.diagnostics().iter().cloned());

        for id in order {
            let Some(file) = grouping.file(id).cloned() else {
                continue;
            };
            debug!("Analyzing {}", file.uri());

            diagnostics.extend(parse_diagnostics(id, &file));
            let symbols = bind(id, &grouping, ctx.library, ctx.config);
            diagnostics.extend(symbols.diagnostics().iter().cloned());

            let checked = check_file(
                &file,
                &symbols,
                CheckContext {
                    library: ctx.library,
                    resource_types: ctx.resource_types,
                    interfaces: &interfaces,
                },
            );
            diagnostics.extend(checked.diagnostics().iter().cloned());

            let dependencies = DependencyGraph::build(&file, &symbols);
            diagnostics.extend(dependencies.diagnostics(&symbols));
            diagnostics.extend(run_linter(&symbols, ctx.rules, ctx.config));

            interfaces.insert(id, checked.interface().clone());
            if let Some(slot) = models.get_mut(id.index()) {
                *slot = Some(FileModel {
                    id,
                    file,
                    symbols,
                    checked,
                    dependencies,
                });
            }
        }

        let mut diagnostics = ctx.config.apply_levels(diagnostics.finish());
        diagnostics.sort_by(|a, b| {
            (a.file, a.range.start(), a.range.end(), a.code, &a.message)
                .cmp(&(b.file, b.range.start(), b.range.end(), b.code, &b.message))
        });
        diagnostics.dedup();

        Self {
            grouping,
            files: models.into_iter().flatten().collect(),
            diagnostics,
        }
    }

    pub fn grouping(&self) -> &SourceFileGrouping {
        &self.grouping
    }

    pub fn entry(&self) -> FileId {
        self.grouping.entry()
    }

    pub fn file(&self, id: FileId) -> Option<&FileModel> {
        self.files.iter().find(|f| f.id == id)
    }

    pub fn entry_model(&self) -> Option<&FileModel> {
        self.file(self.entry())
    }

    pub fn files(&self) -> &[FileModel] {
        &self.files
    }

    /// Symbol declared or referenced at `offset`
    pub fn symbol_at(&self, file: FileId, offset: TextSize) -> Option<(&Symbol, &Type)> {
        let model = self.file(file)?;
        let id = model.symbols.symbol_at(offset)?;
        Some((model.symbols.symbol(id), model.symbol_type(id)))
    }

    /// Same as [`symbol_at`](Self::symbol_at) for a line/column position
    pub fn symbol_at_position(&self, file: FileId, position: Position) -> Option<(&Symbol, &Type)> {
        let model = self.file(file)?;
        let offset = model.file.line_index().offset_of_position(position)?;
        self.symbol_at(file, offset)
    }

    /// Type of an expression node, or of the symbol a NAME node declares
    pub fn type_of(&self, file: FileId, node: &SyntaxNode) -> Option<Type> {
        let model = self.file(file)?;
        let range = node.text_range();
        if let Some(ty) = model.checked.expr_type(range, node.kind()) {
            return Some(ty.clone());
        }
        if node.kind() == SyntaxKind::NAME {
            let id = model.symbols.declared_by(range)?;
            return Some(model.symbol_type(id).clone());
        }
        None
    }

    /// All diagnostics, ordered by file then position
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostics_for(&self, file: FileId) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.file == file).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::SourceUri;
    use crate::hir::codes;
    use crate::hir::linter::default_rules;
    use crate::hir::resource_types::ResourceTypeCatalog;
    use crate::parser::AstNode;
    use crate::project::InMemoryWorkspace;
    use tokio_util::sync::CancellationToken;

    fn model(workspace: &InMemoryWorkspace, entry: &str) -> SemanticModel {
        let grouping = SourceFileGrouping::build(
            &SourceUri::new(entry),
            workspace,
            workspace,
            &CancellationToken::new(),
        )
        .unwrap();
        let library = FunctionLibrary::builtin();
        let catalog = ResourceTypeCatalog::builtin();
        let config = CompilerConfig::default();
        let rules = default_rules();
        SemanticModel::build(
            Arc::new(grouping),
            &AnalysisContext {
                library: &library,
                resource_types: &catalog,
                config: &config,
                rules: &rules,
            },
        )
    }

    #[test]
    fn test_module_outputs_cross_files() {
        let workspace = InMemoryWorkspace::new()
            .with_file(
                "file:///main.bicep",
                "module m './mod.bicep' = {\n  name: 'm'\n  params: { prefix: 'x' }\n}\noutput v string = m.outputs.value\n",
            )
            .with_file(
                "file:///mod.bicep",
                "param prefix string\noutput value string = '${prefix}-v'\n",
            );
        let model = model(&workspace, "file:///main.bicep");
        assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
        assert_eq!(model.files().len(), 2);
    }

    #[test]
    fn test_module_params_are_checked() {
        let workspace = InMemoryWorkspace::new()
            .with_file(
                "file:///main.bicep",
                "module m './mod.bicep' = {\n  name: 'm'\n  params: { prefix: 1, extra: 2 }\n}\n",
            )
            .with_file("file:///mod.bicep", "param prefix string\noutput p string = prefix\n");
        let model = model(&workspace, "file:///main.bicep");
        let found: Vec<_> = model.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(found, vec![codes::TYPE_MISMATCH, codes::DISALLOWED_PROPERTY]);
    }

    #[test]
    fn test_unresolved_module_outputs_are_errors() {
        let workspace = InMemoryWorkspace::new().with_file(
            "file:///main.bicep",
            "param p string = 'a'\nmodule m './missing.bicep' = {\n  name: 'm'\n}\noutput o string = p\n",
        );
        let quiet = model(&workspace, "file:///main.bicep");
        let found: Vec<_> = quiet.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(found, vec![codes::MODULE_NOT_FOUND]);

        let workspace = workspace.with_file(
            "file:///main.bicep",
            "module m './missing.bicep' = {\n  name: 'm'\n}\noutput o string = m.outputs.x\n",
        );
        let loud = model(&workspace, "file:///main.bicep");
        let found: Vec<_> = loud.diagnostics().iter().map(|d| d.code).collect();
        assert_eq!(found, vec![codes::MODULE_NOT_FOUND, codes::UNRESOLVED_MODULE_OUTPUT]);
    }

    #[test]
    fn test_queries() {
        let text = "param name string = 'x'\noutput result string = name\n";
        let workspace = InMemoryWorkspace::new().with_file("file:///main.bicep", text);
        let model = model(&workspace, "file:///main.bicep");
        let entry = model.entry();

        let offset = TextSize::new(text.rfind("name").unwrap() as u32);
        let (symbol, ty) = model.symbol_at(entry, offset).unwrap();
        assert_eq!(symbol.name, "name");
        assert_eq!(ty, &Type::String);

        let (symbol, _) = model.symbol_at_position(entry, Position::new(1, 8)).unwrap();
        assert_eq!(symbol.name, "result");

        let root = model.entry_model().unwrap().file.parse().syntax();
        let name_ref = root
            .descendants()
            .find(|n| n.kind() == SyntaxKind::NAME_REF)
            .unwrap();
        assert_eq!(model.type_of(entry, &name_ref), Some(Type::String));
        let declaration = crate::parser::Name::cast(
            root.descendants().find(|n| n.kind() == SyntaxKind::NAME).unwrap(),
        )
        .unwrap();
        assert_eq!(model.type_of(entry, declaration.syntax()), Some(Type::String));
        assert!(model.diagnostics_for(entry).is_empty());
    }
}
