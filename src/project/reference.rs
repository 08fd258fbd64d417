//! Module reference strings and their resolution outcomes.
//!
//! A reference is the path string of a `module` or `using` declaration:
//!
//! - local: `./storage.bicep`, `../shared/net.bicep`, `x.bicep`
//! - registry: `br:<registry>/<repository>:<tag>` or `...@<digest>`
//! - template spec: `ts:<subscription>/<resourceGroup>/<name>:<version>`

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

use crate::base::{FileId, SourceUri};

/// A parsed module reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleReference {
    /// Relative path, resolved against the referencing file
    Local { path: SmolStr },
    /// OCI registry artifact
    Registry {
        registry: SmolStr,
        repository: SmolStr,
        version: ArtifactVersion,
    },
    TemplateSpec {
        subscription: SmolStr,
        resource_group: SmolStr,
        name: SmolStr,
        version: SmolStr,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactVersion {
    Tag(SmolStr),
    Digest(SmolStr),
}

impl ModuleReference {
    /// Parse a reference string.
    pub fn parse(raw: &str) -> Result<Self, ResolutionError> {
        let malformed = |reason: &str| {
            ResolutionError::MalformedReference(format!("'{}': {}", raw, reason))
        };

        if raw.trim().is_empty() {
            return Err(malformed("the path is empty"));
        }

        if let Some(rest) = raw.strip_prefix("br:") {
            return Self::parse_registry(rest).ok_or_else(|| {
                malformed("expected 'br:<registry>/<repository>:<tag>' or 'br:<registry>/<repository>@<digest>'")
            });
        }
        if let Some(rest) = raw.strip_prefix("ts:") {
            return Self::parse_template_spec(rest).ok_or_else(|| {
                malformed("expected 'ts:<subscription>/<resourceGroup>/<name>:<version>'")
            });
        }

        if raw.contains("://") {
            return Err(malformed("unsupported URI scheme"));
        }
        if raw.contains('\\') {
            return Err(malformed("use '/' as the path separator"));
        }
        if raw.starts_with('/') || has_drive_prefix(raw) {
            return Err(malformed("the path must be relative"));
        }
        if raw.ends_with('/') {
            return Err(malformed("the path must name a file"));
        }

        Ok(ModuleReference::Local {
            path: SmolStr::new(raw),
        })
    }

    fn parse_registry(rest: &str) -> Option<Self> {
        let (registry, artifact) = rest.split_once('/')?;
        let (repository, version) = match artifact.rsplit_once('@') {
            Some((repo, digest)) => (repo, ArtifactVersion::Digest(SmolStr::new(digest))),
            None => {
                let (repo, tag) = artifact.rsplit_once(':')?;
                (repo, ArtifactVersion::Tag(SmolStr::new(tag)))
            }
        };
        let version_text = match &version {
            ArtifactVersion::Tag(t) | ArtifactVersion::Digest(t) => t,
        };
        if registry.is_empty() || repository.is_empty() || version_text.is_empty() {
            return None;
        }
        Some(ModuleReference::Registry {
            registry: SmolStr::new(registry),
            repository: SmolStr::new(repository),
            version,
        })
    }

    fn parse_template_spec(rest: &str) -> Option<Self> {
        let (path, version) = rest.rsplit_once(':')?;
        let mut parts = path.split('/');
        let subscription = parts.next()?;
        let resource_group = parts.next()?;
        let name = parts.next()?;
        if parts.next().is_some()
            || [subscription, resource_group, name, version]
                .iter()
                .any(|p| p.is_empty())
        {
            return None;
        }
        Some(ModuleReference::TemplateSpec {
            subscription: SmolStr::new(subscription),
            resource_group: SmolStr::new(resource_group),
            name: SmolStr::new(name),
            version: SmolStr::new(version),
        })
    }

    pub fn is_local(&self) -> bool {
        matches!(self, ModuleReference::Local { .. })
    }

    /// Target URI of a local reference made from `from`
    pub fn local_target(&self, from: &SourceUri) -> Option<SourceUri> {
        match self {
            ModuleReference::Local { path } => Some(from.join(path)),
            _ => None,
        }
    }
}

fn has_drive_prefix(raw: &str) -> bool {
    matches!(raw.as_bytes(), [drive, b':', ..] if drive.is_ascii_alphabetic())
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleReference::Local { path } => f.write_str(path),
            ModuleReference::Registry {
                registry,
                repository,
                version: ArtifactVersion::Tag(tag),
            } => write!(f, "br:{}/{}:{}", registry, repository, tag),
            ModuleReference::Registry {
                registry,
                repository,
                version: ArtifactVersion::Digest(digest),
            } => write!(f, "br:{}/{}@{}", registry, repository, digest),
            ModuleReference::TemplateSpec {
                subscription,
                resource_group,
                name,
                version,
            } => write!(f, "ts:{}/{}/{}:{}", subscription, resource_group, name, version),
        }
    }
}

/// Why a resolver could not produce a file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("unable to find module '{0}'")]
    NotFound(String),

    #[error("authentication is required to fetch module '{0}'")]
    AuthRequired(String),

    #[error("module '{0}' has not been restored")]
    RestorePending(String),

    #[error("malformed module reference {0}")]
    MalformedReference(String),
}

impl ResolutionError {
    /// Diagnostic code for this failure
    pub fn code(&self) -> &'static str {
        use crate::hir::codes;
        match self {
            ResolutionError::NotFound(_) => codes::MODULE_NOT_FOUND,
            ResolutionError::AuthRequired(_) => codes::MODULE_AUTH_REQUIRED,
            ResolutionError::RestorePending(_) => codes::MODULE_RESTORE_PENDING,
            ResolutionError::MalformedReference(_) => codes::MALFORMED_REFERENCE,
        }
    }
}

/// A reference edge that did not produce a usable file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// The edge closes a cycle; the path starts and ends at the same file.
    #[error("module references form a cycle: {}", format_cycle(.0))]
    Cycle(Vec<SourceUri>),

    #[error("module paths cannot contain string interpolation")]
    Interpolated,
}

fn format_cycle(path: &[SourceUri]) -> String {
    path.iter()
        .map(|uri| uri.file_name().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// State of one reference edge in a grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionStatus {
    Unresolved,
    Resolved(FileId),
    Failed(ReferenceFailure),
}

impl ResolutionStatus {
    pub fn resolved(&self) -> Option<FileId> {
        match self {
            ResolutionStatus::Resolved(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResolutionStatus::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("./storage.bicep")]
    #[case("../shared/net.bicep")]
    #[case("x.bicep")]
    fn test_local_references(#[case] raw: &str) {
        let reference = ModuleReference::parse(raw).unwrap();
        assert!(reference.is_local());
        assert_eq!(reference.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("/abs/x.bicep")]
    #[case("C:/x.bicep")]
    #[case("https://example.com/x.bicep")]
    #[case("dir\\x.bicep")]
    #[case("br:registry.io")]
    #[case("br:registry.io/repo")]
    #[case("ts:sub/rg:1.0")]
    #[case("ts:sub/rg/name:")]
    fn test_malformed_references(#[case] raw: &str) {
        assert!(matches!(
            ModuleReference::parse(raw),
            Err(ResolutionError::MalformedReference(_))
        ));
    }

    #[test]
    fn test_registry_tag_and_digest() {
        let tag = ModuleReference::parse("br:contoso.io/bicep/storage:v1").unwrap();
        assert_eq!(
            tag,
            ModuleReference::Registry {
                registry: "contoso.io".into(),
                repository: "bicep/storage".into(),
                version: ArtifactVersion::Tag("v1".into()),
            }
        );
        let digest = ModuleReference::parse("br:contoso.io/storage@sha256:abc").unwrap();
        assert!(matches!(
            digest,
            ModuleReference::Registry {
                version: ArtifactVersion::Digest(_),
                ..
            }
        ));
        assert_eq!(digest.to_string(), "br:contoso.io/storage@sha256:abc");
    }

    #[test]
    fn test_template_spec() {
        let spec = ModuleReference::parse("ts:0000/rg/spec:2.0").unwrap();
        assert_eq!(spec.to_string(), "ts:0000/rg/spec:2.0");
        assert_eq!(spec.local_target(&SourceUri::new("file:///a.bicep")), None);
    }

    #[test]
    fn test_cycle_message_names_path() {
        let failure = ReferenceFailure::Cycle(vec![
            SourceUri::new("file:///a.bicep"),
            SourceUri::new("file:///b.bicep"),
            SourceUri::new("file:///a.bicep"),
        ]);
        assert_eq!(
            failure.to_string(),
            "module references form a cycle: a.bicep -> b.bicep -> a.bicep"
        );
    }
}
