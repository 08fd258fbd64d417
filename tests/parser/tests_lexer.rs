use bicep::parser::{SyntaxKind, tokenize};

fn kinds(source: &str) -> Vec<SyntaxKind> {
    tokenize(source)
        .into_iter()
        .map(|t| t.kind)
        .filter(|k| *k != SyntaxKind::WHITESPACE)
        .collect()
}

#[test]
fn test_tokens_cover_input() {
    let source = "param a int = 1 // c\nvar s = 'x${a}y'\n";
    let text: String = tokenize(source).iter().map(|t| t.text).collect();
    assert_eq!(text, source);
}

#[test]
fn test_unterminated_string_is_a_lexical_error() {
    let tokens = tokenize("var s = 'abc");
    assert!(tokens.iter().any(|t| t.error.is_some()));
}

#[test]
fn test_keywords_and_operators() {
    let kinds = kinds("a ?? b != c && !d");
    assert!(kinds.contains(&SyntaxKind::QUESTION_QUESTION));
    assert!(kinds.contains(&SyntaxKind::BANG_EQ));
    assert!(kinds.contains(&SyntaxKind::AMP_AMP));
    assert!(kinds.contains(&SyntaxKind::BANG));
}
