//! Resource-type provider capability.
//!
//! Resource declarations name their type as `Namespace/type@apiVersion`. The
//! checker asks an injected [`ResourceTypeProvider`] for the body shape of
//! that type; there is no process-wide catalog.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::types::{ObjectType, PropertyType, Type};

/// Shape of a resource type at one API version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeShape {
    pub type_name: SmolStr,
    pub api_version: SmolStr,
    /// Type of the `properties` object
    pub properties: ObjectType,
    /// Extra top-level body properties beyond the standard envelope
    pub extra: ObjectType,
}

impl ResourceTypeShape {
    pub fn new(type_name: &str, api_version: &str, properties: ObjectType) -> Self {
        Self {
            type_name: SmolStr::new(type_name),
            api_version: SmolStr::new(api_version),
            properties,
            extra: ObjectType::new(),
        }
    }

    pub fn with_extra(mut self, name: &str, property: PropertyType) -> Self {
        self.extra.properties.insert(SmolStr::new(name), property);
        self
    }

    /// Full body type: the standard envelope plus the provider's properties.
    pub fn body(&self) -> ObjectType {
        let mut body = standard_envelope(Type::object(self.properties.clone()));
        for (name, prop) in &self.extra.properties {
            body.properties.insert(name.clone(), prop.clone());
        }
        body
    }
}

/// Properties every resource body carries.
pub fn standard_envelope(properties: Type) -> ObjectType {
    ObjectType::new()
        .with("id", PropertyType::read_only(Type::String))
        .with("name", PropertyType::required(Type::String))
        .with("type", PropertyType::read_only(Type::String))
        .with("apiVersion", PropertyType::read_only(Type::String))
        .with("location", PropertyType::optional(Type::String))
        .with("tags", PropertyType::optional(tags_type()))
        .with("properties", PropertyType::optional(properties))
        .with("dependsOn", PropertyType::optional(Type::any_array()))
        .with("scope", PropertyType::optional(Type::Any))
        .with("parent", PropertyType::optional(Type::Any))
}

fn tags_type() -> Type {
    Type::object(ObjectType {
        additional: Some(Type::String),
        ..ObjectType::new()
    })
}

/// Looks up resource body shapes by type name and API version.
pub trait ResourceTypeProvider: Send + Sync {
    fn lookup(&self, type_name: &str, api_version: &str) -> Option<ResourceTypeShape>;
}

impl<T: ResourceTypeProvider + ?Sized> ResourceTypeProvider for Arc<T> {
    fn lookup(&self, type_name: &str, api_version: &str) -> Option<ResourceTypeShape> {
        (**self).lookup(type_name, api_version)
    }
}

/// A parsed `Namespace/type@apiVersion` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeReference {
    pub type_name: SmolStr,
    pub api_version: SmolStr,
}

impl ResourceTypeReference {
    pub fn parse(raw: &str) -> Option<Self> {
        let (type_name, api_version) = raw.split_once('@')?;
        let mut segments = type_name.split('/');
        let namespace = segments.next()?;
        let types: Vec<&str> = segments.collect();
        let valid_segment = |s: &str| {
            !s.is_empty()
                && s.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
        };
        if !valid_segment(namespace)
            || types.is_empty()
            || !types.iter().all(|s| valid_segment(s))
            || !valid_segment(api_version)
        {
            return None;
        }
        Some(Self {
            type_name: SmolStr::new(type_name),
            api_version: SmolStr::new(api_version),
        })
    }
}

impl std::fmt::Display for ResourceTypeReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.type_name, self.api_version)
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// An in-memory resource type catalog.
#[derive(Debug, Clone, Default)]
pub struct ResourceTypeCatalog {
    /// Keyed by lowercase type name, then API version
    types: FxHashMap<SmolStr, FxHashMap<SmolStr, ResourceTypeShape>>,
}

impl ResourceTypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shape: ResourceTypeShape) {
        self.types
            .entry(SmolStr::new(shape.type_name.to_ascii_lowercase()))
            .or_default()
            .insert(shape.api_version.clone(), shape);
    }

    pub fn with(mut self, shape: ResourceTypeShape) -> Self {
        self.insert(shape);
        self
    }

    pub fn len(&self) -> usize {
        self.types.values().map(|versions| versions.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// A small catalog of common resource types.
    pub fn builtin() -> Self {
        let sku = || {
            Type::object(
                ObjectType::new()
                    .with("name", PropertyType::required(Type::String))
                    .with("tier", PropertyType::optional(Type::String))
                    .with("capacity", PropertyType::optional(Type::Int)),
            )
        };

        let storage = ObjectType::new()
            .with("accessTier", PropertyType::optional(Type::union([
                Type::string_literal("Hot"),
                Type::string_literal("Cool"),
                Type::string_literal("Premium"),
            ])))
            .with("supportsHttpsTrafficOnly", PropertyType::optional(Type::Bool))
            .with("minimumTlsVersion", PropertyType::optional(Type::String))
            .with("allowBlobPublicAccess", PropertyType::optional(Type::Bool))
            .with("primaryEndpoints", PropertyType::read_only(Type::any_object()));

        let vnet = ObjectType::new()
            .with(
                "addressSpace",
                PropertyType::optional(Type::object(
                    ObjectType::new().with("addressPrefixes", PropertyType::required(Type::array_of(Type::String))),
                )),
            )
            .with("subnets", PropertyType::optional(Type::any_array()));

        let plan = ObjectType::new()
            .with("reserved", PropertyType::optional(Type::Bool))
            .with("perSiteScaling", PropertyType::optional(Type::Bool));

        let site = ObjectType::new()
            .with("serverFarmId", PropertyType::optional(Type::String))
            .with("httpsOnly", PropertyType::optional(Type::Bool))
            .with("siteConfig", PropertyType::optional(Type::any_object()))
            .with("defaultHostName", PropertyType::read_only(Type::String));

        let vault = ObjectType::new()
            .with("tenantId", PropertyType::required(Type::String))
            .with("sku", PropertyType::required(sku()))
            .with("accessPolicies", PropertyType::optional(Type::any_array()))
            .with("enableRbacAuthorization", PropertyType::optional(Type::Bool))
            .with("vaultUri", PropertyType::read_only(Type::String));

        let mut catalog = Self::new();
        for version in ["2022-09-01", "2023-01-01"] {
            catalog.insert(
                ResourceTypeShape::new("Microsoft.Storage/storageAccounts", version, storage.clone())
                    .with_extra("sku", PropertyType::required(sku()))
                    .with_extra("kind", PropertyType::required(Type::String)),
            );
            catalog.insert(ResourceTypeShape::new(
                "Microsoft.Storage/storageAccounts/blobServices/containers",
                version,
                ObjectType::new().with("publicAccess", PropertyType::optional(Type::String)),
            ));
        }
        for version in ["2022-07-01", "2023-04-01"] {
            catalog.insert(ResourceTypeShape::new(
                "Microsoft.Network/virtualNetworks",
                version,
                vnet.clone(),
            ));
        }
        for version in ["2022-03-01", "2022-09-01"] {
            catalog.insert(
                ResourceTypeShape::new("Microsoft.Web/serverfarms", version, plan.clone())
                    .with_extra("sku", PropertyType::optional(sku()))
                    .with_extra("kind", PropertyType::optional(Type::String)),
            );
            catalog.insert(
                ResourceTypeShape::new("Microsoft.Web/sites", version, site.clone())
                    .with_extra("kind", PropertyType::optional(Type::String)),
            );
        }
        catalog.insert(ResourceTypeShape::new("Microsoft.KeyVault/vaults", "2022-07-01", vault));
        catalog.insert(ResourceTypeShape::new(
            "Microsoft.Resources/resourceGroups",
            "2022-09-01",
            ObjectType::new(),
        ));
        catalog
    }
}

impl ResourceTypeProvider for ResourceTypeCatalog {
    fn lookup(&self, type_name: &str, api_version: &str) -> Option<ResourceTypeShape> {
        self.types
            .get(type_name.to_ascii_lowercase().as_str())?
            .get(api_version)
            .cloned()
    }
}
