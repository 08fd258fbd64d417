//! HIR layer tests
//!
//! - Structural typing and overload resolution
//! - End-to-end diagnostics through `compile`
//! - Configuration of diagnostic levels

pub mod tests_config;
pub mod tests_diagnostics;
pub mod tests_types;
