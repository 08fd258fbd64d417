//! Logos-based lexer for Bicep
//!
//! Logos handles the fixed token set. String literals, interpolation holes,
//! multi-line strings and block comments are scanned by hand on top of the
//! logos token so that malformed input still yields one contiguous token.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
    /// Set when the token is a malformed literal or an unrecognized character
    pub error: Option<LexError>,
}

impl Token<'_> {
    pub fn range(&self) -> rowan::TextRange {
        rowan::TextRange::at(self.offset, TextSize::of(self.text))
    }
}

/// Problems found while scanning a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LexError {
    #[error("the following token is not recognized")]
    UnrecognizedCharacter,
    #[error("the multi-line comment at this location is not terminated; terminate it with \"*/\"")]
    UnterminatedBlockComment,
    #[error("the string at this location is not terminated; terminate the string with a single quote character")]
    UnterminatedString,
    #[error("the string at this location is not terminated due to an unexpected new line character")]
    UnterminatedStringNewline,
    #[error("the multi-line string at this location is not terminated; terminate it with \"'''\"")]
    UnterminatedMultilineString,
    #[error("the specified escape sequence is not recognized; only \\\\ \\' \\n \\r \\t \\$ and \\u{{...}} are permitted")]
    InvalidEscape,
    #[error("expected a valid 64-bit signed integer")]
    IntegerOverflow,
}

impl LexError {
    /// Stable diagnostic code
    pub fn code(self) -> &'static str {
        match self {
            Self::UnrecognizedCharacter => "BCP001",
            Self::UnterminatedBlockComment => "BCP002",
            Self::UnterminatedString => "BCP003",
            Self::UnterminatedStringNewline => "BCP004",
            Self::UnterminatedMultilineString => "BCP005",
            Self::InvalidEscape => "BCP006",
            Self::IntegerOverflow => "BCP010",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    Plain,
    Interpolation,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
    braces: Vec<Brace>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
            braces: Vec::new(),
        }
    }

    /// Scan the body of a string piece. The opening delimiter (`'` or the `}`
    /// closing an interpolation hole) has already been consumed.
    fn scan_string(&mut self, after_hole: bool) -> (SyntaxKind, Option<LexError>) {
        let closing = if after_hole {
            SyntaxKind::STRING_RIGHT_PIECE
        } else {
            SyntaxKind::STRING_COMPLETE
        };
        let opening_hole = if after_hole {
            SyntaxKind::STRING_MIDDLE_PIECE
        } else {
            SyntaxKind::STRING_LEFT_PIECE
        };

        let rest = self.inner.remainder();
        let bytes = rest.as_bytes();
        let mut error = None;
        let mut i = 0;
        loop {
            match bytes.get(i) {
                None => {
                    self.inner.bump(i);
                    return (closing, Some(LexError::UnterminatedString));
                }
                Some(b'\'') => {
                    self.inner.bump(i + 1);
                    return (closing, error);
                }
                Some(b'$') if bytes.get(i + 1) == Some(&b'{') => {
                    self.inner.bump(i + 2);
                    self.braces.push(Brace::Interpolation);
                    return (opening_hole, error);
                }
                Some(b'\n' | b'\r') => {
                    self.inner.bump(i);
                    return (closing, Some(LexError::UnterminatedStringNewline));
                }
                Some(b'\\') => match bytes.get(i + 1) {
                    Some(b'\\' | b'\'' | b'n' | b'r' | b't' | b'$') => i += 2,
                    Some(b'u') => match unicode_escape_len(&bytes[i + 2..]) {
                        Some(len) => i += 2 + len,
                        None => {
                            error.get_or_insert(LexError::InvalidEscape);
                            i += 2;
                        }
                    },
                    // Leave the terminator for the next iteration
                    Some(b'\n' | b'\r') | None => {
                        error.get_or_insert(LexError::InvalidEscape);
                        i += 1;
                    }
                    Some(_) => {
                        error.get_or_insert(LexError::InvalidEscape);
                        i += 1;
                    }
                },
                Some(_) => i += 1,
            }
        }
    }

    fn scan_until(&mut self, terminator: &str, error: LexError) -> Option<LexError> {
        let rest = self.inner.remainder();
        match rest.find(terminator) {
            Some(idx) => {
                self.inner.bump(idx + terminator.len());
                None
            }
            None => {
                self.inner.bump(rest.len());
                Some(error)
            }
        }
    }
}

/// Length of `{hex}` after `\u`, if it is a valid code point escape.
fn unicode_escape_len(bytes: &[u8]) -> Option<usize> {
    if bytes.first() != Some(&b'{') {
        return None;
    }
    let digits = bytes[1..].iter().take_while(|b| b.is_ascii_hexdigit()).count();
    if digits == 0 || digits > 6 || bytes.get(1 + digits) != Some(&b'}') {
        return None;
    }
    let hex = std::str::from_utf8(&bytes[1..1 + digits]).ok()?;
    let value = u32::from_str_radix(hex, 16).ok()?;
    char::from_u32(value).map(|_| digits + 2)
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;

        let (kind, error) = match logos_token {
            Ok(LogosToken::Quote) => self.scan_string(false),
            Ok(LogosToken::TripleQuote) => (
                SyntaxKind::MULTILINE_STRING,
                self.scan_until("'''", LexError::UnterminatedMultilineString),
            ),
            Ok(LogosToken::BlockCommentStart) => (
                SyntaxKind::BLOCK_COMMENT,
                self.scan_until("*/", LexError::UnterminatedBlockComment),
            ),
            Ok(LogosToken::LBrace) => {
                self.braces.push(Brace::Plain);
                (SyntaxKind::L_BRACE, None)
            }
            Ok(LogosToken::RBrace) => match self.braces.pop() {
                Some(Brace::Interpolation) => self.scan_string(true),
                _ => (SyntaxKind::R_BRACE, None),
            },
            Ok(LogosToken::Newline) => {
                // An interpolation hole cannot span lines; drop any open holes
                // so that later braces lex as plain punctuation.
                if let Some(idx) = self.braces.iter().position(|b| *b == Brace::Interpolation) {
                    self.braces.truncate(idx);
                }
                (SyntaxKind::NEWLINE, None)
            }
            Ok(LogosToken::Integer) => {
                let error = self
                    .inner
                    .slice()
                    .parse::<i64>()
                    .err()
                    .map(|_| LexError::IntegerOverflow);
                (SyntaxKind::INTEGER, error)
            }
            Ok(t) => (t.into(), None),
            Err(()) => {
                // Keep error tokens on a char boundary
                let end = self.inner.span().end;
                let source = self.inner.source();
                let mut extra = 0;
                while end + extra < source.len() && !source.is_char_boundary(end + extra) {
                    extra += 1;
                }
                self.inner.bump(extra);
                (SyntaxKind::ERROR, Some(LexError::UnrecognizedCharacter))
            }
        };

        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        Some(Token {
            kind,
            text,
            offset,
            error,
        })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

/// Decoded text of a string token or interpolation piece, delimiters removed
/// and escapes applied.
pub fn string_piece_value(kind: SyntaxKind, text: &str) -> String {
    match kind {
        SyntaxKind::MULTILINE_STRING => {
            let inner = text.strip_prefix("'''").unwrap_or(text);
            let inner = inner.strip_suffix("'''").unwrap_or(inner);
            let inner = inner
                .strip_prefix("\r\n")
                .or_else(|| inner.strip_prefix('\n'))
                .unwrap_or(inner);
            inner.to_string()
        }
        _ => {
            let inner = text
                .strip_prefix('\'')
                .or_else(|| text.strip_prefix('}'))
                .unwrap_or(text);
            let inner = inner
                .strip_suffix("${")
                .or_else(|| inner.strip_suffix('\''))
                .unwrap_or(inner);
            unescape(inner)
        }
    }
}

/// Apply string escapes. Unrecognized escapes are kept verbatim; the lexer
/// has already reported them.
pub fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('$') => out.push('$'),
            Some('u') => {
                let rest: String = chars.clone().skip(1).collect();
                match unicode_escape_len(rest.as_bytes()) {
                    Some(len) => {
                        let hex = &rest[1..len - 1];
                        if let Some(ch) =
                            u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
                        {
                            out.push(ch);
                        }
                        // 'u' plus the braces and digits
                        for _ in 0..=len {
                            chars.next();
                        }
                        continue;
                    }
                    None => {
                        out.push('\\');
                        continue;
                    }
                }
            }
            _ => {
                out.push('\\');
                continue;
            }
        }
        chars.next();
    }
    out
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t]+")]
    Whitespace,

    #[regex(r"\r\n|\r|\n")]
    Newline,

    #[regex(r"//[^\r\n]*")]
    LineComment,

    #[token("/*")]
    BlockCommentStart,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"[0-9]+")]
    Integer,

    #[token("'")]
    Quote,

    #[token("'''")]
    TripleQuote,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("??")]
    QuestionQuestion,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("=~")]
    EqTilde,
    #[token("!~")]
    BangTilde,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("=>")]
    FatArrow,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("!")]
    Bang,
    #[token("|")]
    Pipe,
    #[token("@")]
    At,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("param")]
    ParamKw,
    #[token("var")]
    VarKw,
    #[token("resource")]
    ResourceKw,
    #[token("module")]
    ModuleKw,
    #[token("output")]
    OutputKw,
    #[token("type")]
    TypeKw,
    #[token("func")]
    FuncKw,
    #[token("using")]
    UsingKw,
    #[token("targetScope")]
    TargetScopeKw,
    #[token("existing")]
    ExistingKw,
    #[token("if")]
    IfKw,
    #[token("for")]
    ForKw,
    #[token("in")]
    InKw,
    #[token("true")]
    TrueKw,
    #[token("false")]
    FalseKw,
    #[token("null")]
    NullKw,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken::*;
        match token {
            Whitespace => SyntaxKind::WHITESPACE,
            Newline => SyntaxKind::NEWLINE,
            LineComment => SyntaxKind::LINE_COMMENT,
            BlockCommentStart => SyntaxKind::BLOCK_COMMENT,
            Ident => SyntaxKind::IDENT,
            Integer => SyntaxKind::INTEGER,
            Quote => SyntaxKind::STRING_COMPLETE,
            TripleQuote => SyntaxKind::MULTILINE_STRING,
            QuestionQuestion => SyntaxKind::QUESTION_QUESTION,
            EqEq => SyntaxKind::EQ_EQ,
            BangEq => SyntaxKind::BANG_EQ,
            EqTilde => SyntaxKind::EQ_TILDE,
            BangTilde => SyntaxKind::BANG_TILDE,
            LtEq => SyntaxKind::LT_EQ,
            GtEq => SyntaxKind::GT_EQ,
            AmpAmp => SyntaxKind::AMP_AMP,
            PipePipe => SyntaxKind::PIPE_PIPE,
            FatArrow => SyntaxKind::FAT_ARROW,
            LBrace => SyntaxKind::L_BRACE,
            RBrace => SyntaxKind::R_BRACE,
            LBracket => SyntaxKind::L_BRACKET,
            RBracket => SyntaxKind::R_BRACKET,
            LParen => SyntaxKind::L_PAREN,
            RParen => SyntaxKind::R_PAREN,
            Comma => SyntaxKind::COMMA,
            Dot => SyntaxKind::DOT,
            Colon => SyntaxKind::COLON,
            Question => SyntaxKind::QUESTION,
            Eq => SyntaxKind::EQ,
            Lt => SyntaxKind::LT,
            Gt => SyntaxKind::GT,
            Plus => SyntaxKind::PLUS,
            Minus => SyntaxKind::MINUS,
            Star => SyntaxKind::STAR,
            Slash => SyntaxKind::SLASH,
            Percent => SyntaxKind::PERCENT,
            Bang => SyntaxKind::BANG,
            Pipe => SyntaxKind::PIPE,
            At => SyntaxKind::AT,
            ParamKw => SyntaxKind::PARAM_KW,
            VarKw => SyntaxKind::VAR_KW,
            ResourceKw => SyntaxKind::RESOURCE_KW,
            ModuleKw => SyntaxKind::MODULE_KW,
            OutputKw => SyntaxKind::OUTPUT_KW,
            TypeKw => SyntaxKind::TYPE_KW,
            FuncKw => SyntaxKind::FUNC_KW,
            UsingKw => SyntaxKind::USING_KW,
            TargetScopeKw => SyntaxKind::TARGET_SCOPE_KW,
            ExistingKw => SyntaxKind::EXISTING_KW,
            IfKw => SyntaxKind::IF_KW,
            ForKw => SyntaxKind::FOR_KW,
            InKw => SyntaxKind::IN_KW,
            TrueKw => SyntaxKind::TRUE_KW,
            FalseKw => SyntaxKind::FALSE_KW,
            NullKw => SyntaxKind::NULL_KW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        Lexer::new(input).map(|t| t.kind).collect()
    }

    #[test]
    fn test_lex_param() {
        let tokens: Vec<_> = Lexer::new("param name string").collect();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[0].kind, SyntaxKind::PARAM_KW);
        assert_eq!(tokens[1].kind, SyntaxKind::WHITESPACE);
        assert_eq!(tokens[2].kind, SyntaxKind::IDENT);
        assert_eq!(tokens[4].kind, SyntaxKind::IDENT);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        assert_eq!(kinds("params"), vec![SyntaxKind::IDENT]);
        assert_eq!(kinds("for_each"), vec![SyntaxKind::IDENT]);
    }

    #[test]
    fn test_lex_interpolated_string() {
        let tokens: Vec<_> = Lexer::new("'a${b}c${d}e'").collect();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SyntaxKind::STRING_LEFT_PIECE,
                SyntaxKind::IDENT,
                SyntaxKind::STRING_MIDDLE_PIECE,
                SyntaxKind::IDENT,
                SyntaxKind::STRING_RIGHT_PIECE,
            ]
        );
        assert_eq!(tokens[0].text, "'a${");
        assert_eq!(tokens[2].text, "}c${");
        assert_eq!(tokens[4].text, "}e'");
    }

    #[test]
    fn test_object_inside_interpolation_hole() {
        let kinds = kinds("'${f({a: 1})}'");
        assert_eq!(kinds.first(), Some(&SyntaxKind::STRING_LEFT_PIECE));
        assert!(kinds.contains(&SyntaxKind::R_BRACE));
        assert_eq!(kinds.last(), Some(&SyntaxKind::STRING_RIGHT_PIECE));
    }

    #[test]
    fn test_unterminated_string_stops_at_newline() {
        let tokens: Vec<_> = Lexer::new("'abc\nvar").collect();
        assert_eq!(tokens[0].kind, SyntaxKind::STRING_COMPLETE);
        assert_eq!(tokens[0].text, "'abc");
        assert_eq!(tokens[0].error, Some(LexError::UnterminatedStringNewline));
        assert_eq!(tokens[1].kind, SyntaxKind::NEWLINE);
        assert_eq!(tokens[2].kind, SyntaxKind::VAR_KW);
    }

    #[test]
    fn test_invalid_escape_is_tagged() {
        let tokens: Vec<_> = Lexer::new(r"'a\qb'").collect();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].error, Some(LexError::InvalidEscape));
    }

    #[test]
    fn test_integer_overflow_is_tagged() {
        let tokens: Vec<_> = Lexer::new("99999999999999999999").collect();
        assert_eq!(tokens[0].kind, SyntaxKind::INTEGER);
        assert_eq!(tokens[0].error, Some(LexError::IntegerOverflow));
    }

    #[test]
    fn test_multiline_string_and_block_comment() {
        let tokens: Vec<_> = Lexer::new("'''\nline ${x}\n''' /* c */").collect();
        assert_eq!(tokens[0].kind, SyntaxKind::MULTILINE_STRING);
        assert_eq!(string_piece_value(tokens[0].kind, tokens[0].text), "line ${x}\n");
        assert_eq!(tokens[2].kind, SyntaxKind::BLOCK_COMMENT);
        assert_eq!(tokens[2].text, "/* c */");

        let unterminated: Vec<_> = Lexer::new("/* open").collect();
        assert_eq!(unterminated.len(), 1);
        assert_eq!(unterminated[0].error, Some(LexError::UnterminatedBlockComment));
    }

    #[test]
    fn test_unrecognized_character() {
        let tokens: Vec<_> = Lexer::new("a # b").collect();
        assert_eq!(tokens[2].kind, SyntaxKind::ERROR);
        assert_eq!(tokens[2].error, Some(LexError::UnrecognizedCharacter));
    }

    #[test]
    fn test_tokens_partition_input() {
        let input = "var x = 'a${1 + 2}' // note\r\n@description('d')\nparam p int\t= -1 ¤";
        let mut rebuilt = String::new();
        let mut expected_offset = TextSize::new(0);
        for token in Lexer::new(input) {
            assert_eq!(token.offset, expected_offset);
            expected_offset += TextSize::of(token.text);
            rebuilt.push_str(token.text);
        }
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"it\'s\n\$\{"), "it's\n$\\{");
        assert_eq!(unescape(r"\u{1F600}x"), "\u{1F600}x");
        assert_eq!(
            string_piece_value(SyntaxKind::STRING_COMPLETE, r"'a\tb'"),
            "a\tb"
        );
        assert_eq!(string_piece_value(SyntaxKind::STRING_MIDDLE_PIECE, "}-${"), "-");
    }
}
