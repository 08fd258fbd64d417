use rstest::rstest;

use bicep::parser::{AstNode, SourceFile, Statement, parse};

use crate::helpers::source_fixtures::{
    LOOPS_AND_CONDITIONS, MALFORMED_INPUTS, PARAM_OUTPUT, STORAGE_ACCOUNT, UNRESOLVED_MODULE,
};

fn assert_lossless(source: &str) {
    let parse = parse(source);
    assert_eq!(parse.syntax().to_string(), source, "tree text differs from input");
}

#[rstest]
#[case::param_output(PARAM_OUTPUT)]
#[case::storage(STORAGE_ACCOUNT)]
#[case::module(UNRESOLVED_MODULE)]
#[case::loops(LOOPS_AND_CONDITIONS)]
#[case::comments("// leading\nparam a int /* trailing */\n\n\n/* block\n */ output o int = a // end")]
#[case::crlf("param a string\r\noutput b string = a\r\n")]
#[case::nested_interpolation("var s = '${'${'${1}'}'}'\n")]
#[case::multiline_string("var s = '''\nline 1\n  line 2\n'''\n")]
fn test_valid_sources_round_trip(#[case] source: &str) {
    let parse = parse(source);
    assert!(parse.ok(), "unexpected errors: {:?} {:?}", parse.lex_errors, parse.errors);
    assert_lossless(source);
}

#[test]
fn test_malformed_sources_round_trip() {
    for source in MALFORMED_INPUTS {
        assert_lossless(source);
    }
}

#[test]
fn test_malformed_sources_report_errors() {
    for source in MALFORMED_INPUTS.iter().filter(|s| !s.is_empty()) {
        let parse = parse(source);
        assert!(!parse.ok(), "expected errors for {:?}", source);
    }
}

#[test]
fn test_every_prefix_parses() {
    // Truncation at any character boundary must still give a lossless tree
    for source in [STORAGE_ACCOUNT, LOOPS_AND_CONDITIONS] {
        for (idx, _) in source.char_indices() {
            assert_lossless(&source[..idx]);
        }
    }
}

#[test]
fn test_recovery_keeps_later_statements() {
    let source = "param a string =\nvar b = 1\noutput c int = b\n";
    let parse = parse(source);
    assert!(!parse.ok());
    let file = SourceFile::cast(parse.syntax()).unwrap();
    let kinds: Vec<&str> = file
        .statements()
        .map(|s| match s {
            Statement::Param(_) => "param",
            Statement::Var(_) => "var",
            Statement::Output(_) => "output",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["param", "var", "output"]);
}
