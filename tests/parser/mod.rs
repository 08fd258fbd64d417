//! Parser layer tests
//!
//! - Lossless round-trip over valid and malformed input
//! - Totality: every input produces a tree
//! - Lexer token coverage

pub mod tests_lexer;
pub mod tests_roundtrip;
