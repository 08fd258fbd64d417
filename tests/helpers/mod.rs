//! Shared test helpers.

#![allow(dead_code)]

pub mod compile_helpers;
pub mod diagnostic_helpers;
pub mod source_fixtures;
