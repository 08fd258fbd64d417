//! Identifier rules and string escaping helpers.

/// Check if a character can start an identifier.
#[inline]
pub fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Check if a character can continue an identifier.
#[inline]
pub fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Check if `text` can be written as a bare identifier (for example as a
/// property accessor `a.name` instead of `a['name']`).
pub fn is_valid_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if is_ident_start(first) => chars.all(is_ident_continue),
        _ => false,
    }
}

/// Quote a string for the template expression language: single quotes are
/// doubled.
pub fn quote_template_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_identifiers() {
        assert!(is_valid_identifier("storageAccount"));
        assert!(is_valid_identifier("_private1"));
        assert!(is_valid_identifier("größe"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("my-key"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_quote_template_string() {
        assert_eq!(quote_template_string("it's"), "'it''s'");
        assert_eq!(quote_template_string(""), "''");
    }
}
