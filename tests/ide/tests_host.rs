use bicep::SourceUri;
use bicep::base::Position;
use bicep::hir::{SymbolKind, codes};
use bicep::ide::AnalysisHost;

use crate::helpers::source_fixtures::{PARAM_OUTPUT, STORAGE_ACCOUNT};

fn uri(raw: &str) -> SourceUri {
    SourceUri::new(raw)
}

#[test]
fn test_edit_then_compile() {
    let mut host = AnalysisHost::new();
    let main = uri("file:///main.bicep");
    host.set_file_content(main.clone(), "param name string\noutput result int = name\n");
    let result = host.compile(&main).unwrap();
    assert!(result.diagnostics.iter().any(|d| d.code == codes::TYPE_MISMATCH));

    host.set_file_content(main.clone(), PARAM_OUTPUT);
    let result = host.compile(&main).unwrap();
    assert!(result.diagnostics.is_empty());
    assert!(result.template.is_some());
}

#[test]
fn test_compile_all_matches_sequential() {
    let mut host = AnalysisHost::new();
    let entries: Vec<SourceUri> = [PARAM_OUTPUT, STORAGE_ACCOUNT, "output o int = missing\n"]
        .iter()
        .enumerate()
        .map(|(i, source)| {
            let entry = uri(&format!("file:///entry{i}.bicep"));
            host.set_file_content(entry.clone(), source);
            entry
        })
        .collect();

    let parallel = host.compile_all(&entries);
    for (entry, result) in entries.iter().zip(parallel) {
        let parallel = result.unwrap();
        let sequential = host.compile(entry).unwrap();
        assert_eq!(parallel.diagnostics, sequential.diagnostics);
        assert_eq!(parallel.template, sequential.template);
    }
}

#[test]
fn test_hover_describes_symbol() {
    let mut host = AnalysisHost::new();
    let main = uri("file:///main.bicep");
    host.set_file_content(main.clone(), STORAGE_ACCOUNT);
    // `account` in the output expression
    let hover = host.hover(&main, Position::new(11, 26)).unwrap();
    assert_eq!(hover.kind, SymbolKind::Resource);
    assert!(hover.contents.contains("resource account"), "{}", hover.contents);
    assert_eq!(hover.start_line, 2);
}
