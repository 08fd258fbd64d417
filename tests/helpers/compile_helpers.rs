//! Compilation helpers for integration tests.

use once_cell::sync::Lazy;

use bicep::config::CompilerConfig;
use bicep::hir::ResourceTypeCatalog;
use bicep::project::InMemoryWorkspace;
use bicep::{CompilationResult, SourceUri, Template, compile_with_defaults};

pub const MAIN: &str = "file:///main.bicep";

/// The built-in catalog, shared across tests.
pub static CATALOG: Lazy<ResourceTypeCatalog> = Lazy::new(ResourceTypeCatalog::builtin);

/// Compile `entry` from `workspace` with the default configuration.
pub fn compile_workspace(workspace: &InMemoryWorkspace, entry: &str) -> CompilationResult {
    compile_workspace_with(workspace, entry, &CompilerConfig::default())
}

pub fn compile_workspace_with(workspace: &InMemoryWorkspace, entry: &str, config: &CompilerConfig) -> CompilationResult {
    compile_with_defaults(&SourceUri::new(entry), workspace, workspace, &*CATALOG, config)
        .expect("compilation is not cancelled")
}

/// Compile a single template held at [`MAIN`].
pub fn compile_source(source: &str) -> CompilationResult {
    compile_workspace(&InMemoryWorkspace::new().with_file(MAIN, source), MAIN)
}

/// Compile a single template and return its emitted template.
pub fn template_from(source: &str) -> Template {
    let result = compile_source(source);
    match result.template {
        Some(template) => template,
        None => panic!("no template emitted; diagnostics: {:#?}", result.diagnostics),
    }
}
