//! Emitted documents.
//!
//! Both documents serialize with keys in insertion order (`serde_json` is
//! built with `preserve_order`), so equal inputs give byte-identical JSON.

use serde::Serialize;
use serde_json::{Map, Value};

use super::EmitError;

pub const DEPLOYMENT_PARAMETERS_SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentParameters.json#";

/// A declarative deployment template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Template {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "contentVersion")]
    pub content_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub parameters: Map<String, Value>,
    /// User function namespaces; omitted when empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<Value>,
    pub variables: Map<String, Value>,
    pub resources: Vec<Value>,
    pub outputs: Map<String, Value>,
}

impl Template {
    pub fn new(schema: &str, content_version: &str) -> Self {
        Self {
            schema: schema.to_string(),
            content_version: content_version.to_string(),
            metadata: None,
            parameters: Map::new(),
            functions: Vec::new(),
            variables: Map::new(),
            resources: Vec::new(),
            outputs: Map::new(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    pub fn to_value(&self) -> Result<Value, EmitError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Pretty-printed JSON with two-space indentation
    pub fn to_json_string(&self) -> Result<String, EmitError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A deployment parameters document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParametersFile {
    #[serde(rename = "$schema")]
    pub schema: String,
    #[serde(rename = "contentVersion")]
    pub content_version: String,
    /// `name → { "value": ... }`
    pub parameters: Map<String, Value>,
}

impl ParametersFile {
    pub fn new(content_version: &str) -> Self {
        Self {
            schema: DEPLOYMENT_PARAMETERS_SCHEMA.to_string(),
            content_version: content_version.to_string(),
            parameters: Map::new(),
        }
    }

    /// The assigned value of `name`
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)?.get("value")
    }

    pub fn to_json_string(&self) -> Result<String, EmitError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
