//! IDE features: editor-facing APIs on top of the compiler.
//!
//! This module provides the interface between the semantic model (HIR)
//! and an editor integration. It owns no protocol types; callers convert
//! at their boundary.
//!
//! ## Usage
//!
//! The recommended way to use this module is through `AnalysisHost`:
//!
//! ```ignore
//! use bicep::ide::AnalysisHost;
//!
//! let mut host = AnalysisHost::new();
//! host.set_file_content("file:///main.bicep", "param name string\n");
//!
//! let result = host.compile(&"file:///main.bicep".into())?;
//! ```

mod analysis;
mod hover;

pub use analysis::AnalysisHost;
pub use hover::{HoverResult, hover};
