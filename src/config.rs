//! Compiler configuration.
//!
//! Loaded from a `bicepconfig.json`-shaped document:
//!
//! ```json
//! {
//!   "analyzers": {
//!     "core": {
//!       "enabled": true,
//!       "rules": { "no-unused-params": { "level": "error" } }
//!     }
//!   },
//!   "nearDuplicateNames": "warning",
//!   "diagnosticLevels": { "BCP081": "off" },
//!   "emit": { "contentVersion": "1.0.0.0", "includeGeneratorMetadata": false }
//! }
//! ```

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::hir::{Diagnostic, Severity};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid diagnostic level '{0}'; expected off, info, warning or error")]
    InvalidLevel(String),
}

/// Reporting level of a configurable diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticLevel {
    Off,
    Info,
    Warning,
    Error,
}

impl DiagnosticLevel {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(DiagnosticLevel::Off),
            "info" => Ok(DiagnosticLevel::Info),
            "warning" => Ok(DiagnosticLevel::Warning),
            "error" => Ok(DiagnosticLevel::Error),
            _ => Err(ConfigError::InvalidLevel(raw.to_string())),
        }
    }

    /// `None` for `Off`
    pub fn severity(self) -> Option<Severity> {
        match self {
            DiagnosticLevel::Off => None,
            DiagnosticLevel::Info => Some(Severity::Info),
            DiagnosticLevel::Warning => Some(Severity::Warning),
            DiagnosticLevel::Error => Some(Severity::Error),
        }
    }
}

/// Options for template emission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    pub content_version: String,
    /// Add `metadata._generator` to emitted templates
    pub include_generator_metadata: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            content_version: "1.0.0.0".to_string(),
            include_generator_metadata: false,
        }
    }
}

/// Configuration for one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    /// Linter rules run only when enabled
    pub linter_enabled: bool,
    /// Per-rule level overrides, keyed by rule name
    pub rule_levels: IndexMap<String, DiagnosticLevel>,
    /// Level for declarations differing only by case
    pub near_duplicate_names: DiagnosticLevel,
    /// Level overrides for non-error diagnostics, keyed by code
    pub diagnostic_levels: IndexMap<String, DiagnosticLevel>,
    pub emit: EmitOptions,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            linter_enabled: true,
            rule_levels: IndexMap::new(),
            near_duplicate_names: DiagnosticLevel::Warning,
            diagnostic_levels: IndexMap::new(),
            emit: EmitOptions::default(),
        }
    }
}

// Raw document shape
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(default)]
    analyzers: RawAnalyzers,
    near_duplicate_names: Option<String>,
    #[serde(default)]
    diagnostic_levels: IndexMap<String, String>,
    #[serde(default)]
    emit: RawEmit,
}

#[derive(Deserialize, Default)]
struct RawAnalyzers {
    #[serde(default)]
    core: RawCore,
}

#[derive(Deserialize, Default)]
struct RawCore {
    enabled: Option<bool>,
    #[serde(default)]
    rules: IndexMap<String, RawRule>,
}

#[derive(Deserialize)]
struct RawRule {
    level: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawEmit {
    content_version: Option<String>,
    include_generator_metadata: Option<bool>,
}

impl CompilerConfig {
    /// Parse a configuration document. Missing sections keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(text)?;
        let mut config = CompilerConfig::default();

        if let Some(enabled) = raw.analyzers.core.enabled {
            config.linter_enabled = enabled;
        }
        for (name, rule) in raw.analyzers.core.rules {
            config.rule_levels.insert(name, DiagnosticLevel::parse(&rule.level)?);
        }
        if let Some(level) = raw.near_duplicate_names {
            config.near_duplicate_names = DiagnosticLevel::parse(&level)?;
        }
        for (code, level) in raw.diagnostic_levels {
            config.diagnostic_levels.insert(code, DiagnosticLevel::parse(&level)?);
        }
        if let Some(version) = raw.emit.content_version {
            config.emit.content_version = version;
        }
        if let Some(include) = raw.emit.include_generator_metadata {
            config.emit.include_generator_metadata = include;
        }
        Ok(config)
    }

    /// Effective level of a linter rule
    pub fn rule_level(&self, rule: &str, default: DiagnosticLevel) -> DiagnosticLevel {
        if !self.linter_enabled {
            return DiagnosticLevel::Off;
        }
        self.rule_levels.get(rule).copied().unwrap_or(default)
    }

    pub fn set_rule_level(&mut self, rule: &str, level: DiagnosticLevel) {
        self.rule_levels.insert(rule.to_string(), level);
    }

    /// Apply code-level overrides. Errors are never downgraded.
    pub fn apply_levels(&self, diagnostics: Vec<Diagnostic>) -> Vec<Diagnostic> {
        if self.diagnostic_levels.is_empty() {
            return diagnostics;
        }
        diagnostics
            .into_iter()
            .filter_map(|diagnostic| {
                if diagnostic.is_error() {
                    return Some(diagnostic);
                }
                match self.diagnostic_levels.get(diagnostic.code) {
                    Some(level) => level.severity().map(|s| diagnostic.with_severity(s)),
                    None => Some(diagnostic),
                }
            })
            .collect()
    }
}
