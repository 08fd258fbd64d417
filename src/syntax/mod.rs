// Syntax layer: parsed source files with identity
pub mod file;

pub use file::{FileKind, ReferenceKind, ReferenceSite, SyntaxFile};
