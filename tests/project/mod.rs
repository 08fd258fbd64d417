//! Project layer tests
//!
//! - Compiling from disk through `FileSystemResolver`
//! - Memoized resolution shared between compilations

pub mod tests_filesystem;
