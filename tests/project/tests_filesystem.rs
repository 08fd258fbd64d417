use std::fs;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;

use bicep::config::CompilerConfig;
use bicep::hir::codes;
use bicep::project::{CachingResolver, FileSystemResolver};
use bicep::{SourceUri, compile_with_defaults};

use crate::helpers::compile_helpers::CATALOG;

fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("modules")).unwrap();
    fs::write(
        dir.path().join("main.bicep"),
        "module app 'modules/app.bicep' = {\n  name: 'app'\n  params: { size: 2 }\n}\noutput total int = app.outputs.doubled\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("modules/app.bicep"),
        "param size int\noutput doubled int = size * 2\n",
    )
    .unwrap();
    dir
}

#[test]
fn test_compile_from_disk() {
    let dir = project();
    let resolver = FileSystemResolver::new();
    let entry = SourceUri::from_file_path(&dir.path().join("main.bicep"));
    let result = compile_with_defaults(&entry, &resolver, &resolver, &*CATALOG, &CompilerConfig::default()).unwrap();
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.model.files().len(), 2);

    let template = result.template.unwrap();
    assert_eq!(
        template.resources[0]["properties"]["parameters"],
        json!({ "size": { "value": 2 } })
    );
}

#[test]
fn test_missing_file_on_disk() {
    let dir = project();
    fs::remove_file(dir.path().join("modules/app.bicep")).unwrap();
    let resolver = FileSystemResolver::new();
    let entry = SourceUri::from_file_path(&dir.path().join("main.bicep"));
    let result = compile_with_defaults(&entry, &resolver, &resolver, &*CATALOG, &CompilerConfig::default()).unwrap();
    let found: Vec<_> = result.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(found, vec![codes::MODULE_NOT_FOUND, codes::UNRESOLVED_MODULE_OUTPUT]);
    assert!(result.template.is_none());
}

#[test]
fn test_caching_resolver_across_compilations() {
    let dir = project();
    let sources = FileSystemResolver::new();
    let resolver = Arc::new(CachingResolver::new(FileSystemResolver::new()));
    let entry = SourceUri::from_file_path(&dir.path().join("main.bicep"));

    let first = compile_with_defaults(&entry, &sources, &resolver, &*CATALOG, &CompilerConfig::default()).unwrap();
    assert_eq!(resolver.cached_len(), 1);

    // The cached text wins until the entry is invalidated
    fs::write(dir.path().join("modules/app.bicep"), "param size int\n").unwrap();
    let second = compile_with_defaults(&entry, &sources, &resolver, &*CATALOG, &CompilerConfig::default()).unwrap();
    assert_eq!(first.template, second.template);

    resolver.clear();
    let third = compile_with_defaults(&entry, &sources, &resolver, &*CATALOG, &CompilerConfig::default()).unwrap();
    assert!(third.has_errors());
}

#[test]
fn test_restore_pending_registry_module() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("main.bicep"),
        "module reg 'br:contoso.azurecr.io/app:v1' = {\n  name: 'reg'\n}\n",
    )
    .unwrap();
    let resolver = FileSystemResolver::with_restore_root(dir.path().join(".restore"));
    let entry = SourceUri::from_file_path(&dir.path().join("main.bicep"));
    let result = compile_with_defaults(&entry, &resolver, &resolver, &*CATALOG, &CompilerConfig::default()).unwrap();
    let found: Vec<_> = result.diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(found, vec![codes::MODULE_RESTORE_PENDING]);
}
