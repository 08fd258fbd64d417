//! Emission tests
//!
//! - Literal scenarios from the language reference
//! - Determinism of emitted JSON
//! - Parameters files

pub mod tests_parameters;
pub mod tests_scenarios;
