//! IDE layer tests

pub mod tests_host;
