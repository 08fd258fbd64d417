//! Byte-offset ranges and line/column conversion.

pub use text_size::{TextRange, TextSize};

use super::position::{Position, Span};

/// A 0-indexed line/column pair. Columns count UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Maps byte offsets to line/column positions for one text.
///
/// `\n`, `\r\n` and a lone `\r` all terminate a line, matching the lexer's
/// newline token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
    len: TextSize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::new(0)];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\n' => line_starts.push(TextSize::new((i + 1) as u32)),
                b'\r' => {
                    if bytes.get(i + 1) == Some(&b'\n') {
                        i += 1;
                    }
                    line_starts.push(TextSize::new((i + 1) as u32));
                }
                _ => {}
            }
            i += 1;
        }
        Self {
            line_starts,
            len: TextSize::of(text),
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Convert a byte offset to a line/column pair. Offsets past the end clamp
    /// to the end of the text.
    pub fn line_col(&self, offset: TextSize) -> LineCol {
        let offset = offset.min(self.len);
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        LineCol {
            line: line as u32,
            col: u32::from(offset - self.line_starts[line]),
        }
    }

    /// Convert a line/column pair back to a byte offset.
    pub fn offset(&self, line_col: LineCol) -> Option<TextSize> {
        let start = *self.line_starts.get(line_col.line as usize)?;
        let end = self
            .line_starts
            .get(line_col.line as usize + 1)
            .copied()
            .unwrap_or(self.len);
        let offset = start + TextSize::new(line_col.col);
        (offset <= end).then_some(offset)
    }

    pub fn position(&self, offset: TextSize) -> Position {
        let lc = self.line_col(offset);
        Position::new(lc.line as usize, lc.col as usize)
    }

    pub fn span(&self, range: TextRange) -> Span {
        Span::new(self.position(range.start()), self.position(range.end()))
    }

    pub fn offset_of_position(&self, position: Position) -> Option<TextSize> {
        self.offset(LineCol {
            line: position.line as u32,
            col: position.column as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col_roundtrip() {
        let index = LineIndex::new("param a string\nvar b = 1\r\noutput c int = b");
        assert_eq!(index.line_count(), 3);

        let lc = index.line_col(TextSize::new(19));
        assert_eq!(lc, LineCol { line: 1, col: 4 });
        assert_eq!(index.offset(lc), Some(TextSize::new(19)));

        let third = index.line_col(TextSize::new(26));
        assert_eq!(third, LineCol { line: 2, col: 0 });
    }

    #[test]
    fn test_lone_carriage_return_ends_line() {
        let index = LineIndex::new("a\rb");
        assert_eq!(index.line_col(TextSize::new(2)), LineCol { line: 1, col: 0 });
    }

    #[test]
    fn test_offset_past_end_clamps() {
        let index = LineIndex::new("abc");
        assert_eq!(index.line_col(TextSize::new(99)), LineCol { line: 0, col: 3 });
        assert_eq!(index.offset(LineCol { line: 4, col: 0 }), None);
    }
}
