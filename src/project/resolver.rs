//! Resolver capabilities consumed by source-file grouping.
//!
//! The compiler never fetches anything itself. It asks a [`ModuleResolver`]
//! for the text behind each reference and a [`SourceTextProvider`] for the
//! entry file. Both are injected, so a compilation can run entirely in memory.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use super::reference::{ModuleReference, ResolutionError};
use crate::base::SourceUri;
use crate::syntax::SyntaxFile;

/// Text of a referenced file together with its canonical identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub uri: SourceUri,
    pub text: Arc<str>,
}

/// Turns a module reference into file content.
///
/// Implementations must tolerate concurrent and repeated calls for the same
/// reference; any memoization is theirs to do.
pub trait ModuleResolver: Send + Sync {
    fn resolve(
        &self,
        from: &SourceUri,
        reference: &ModuleReference,
    ) -> Result<ResolvedFile, ResolutionError>;
}

/// Supplies the current text of a file, such as an open editor buffer.
pub trait SourceTextProvider: Send + Sync {
    fn source_text(&self, uri: &SourceUri) -> Option<Arc<str>>;

    /// A parse of `uri` made earlier from exactly `text`, if one is kept.
    fn parsed_file(&self, _uri: &SourceUri, _text: &str) -> Option<Arc<SyntaxFile>> {
        None
    }
}

impl<T: ModuleResolver + ?Sized> ModuleResolver for Arc<T> {
    fn resolve(
        &self,
        from: &SourceUri,
        reference: &ModuleReference,
    ) -> Result<ResolvedFile, ResolutionError> {
        (**self).resolve(from, reference)
    }
}

impl<T: SourceTextProvider + ?Sized> SourceTextProvider for Arc<T> {
    fn source_text(&self, uri: &SourceUri) -> Option<Arc<str>> {
        (**self).source_text(uri)
    }

    fn parsed_file(&self, uri: &SourceUri, text: &str) -> Option<Arc<SyntaxFile>> {
        (**self).parsed_file(uri, text)
    }
}

// ============================================================================
// IN-MEMORY WORKSPACE
// ============================================================================

/// A set of files and restored artifacts held in memory.
///
/// Serves as both the source provider and the resolver. Remote references
/// resolve only if an artifact was registered for their canonical string;
/// otherwise they report `RestorePending`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkspace {
    files: FxHashMap<SourceUri, Arc<str>>,
    artifacts: FxHashMap<String, ResolvedFile>,
    auth_required: Vec<String>,
}

impl InMemoryWorkspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with_file(mut self, uri: impl Into<SourceUri>, text: impl Into<Arc<str>>) -> Self {
        self.insert(uri, text);
        self
    }

    pub fn insert(&mut self, uri: impl Into<SourceUri>, text: impl Into<Arc<str>>) {
        self.files.insert(uri.into(), text.into());
    }

    pub fn remove(&mut self, uri: &SourceUri) -> Option<Arc<str>> {
        self.files.remove(uri)
    }

    /// Register a restored registry or template-spec artifact.
    pub fn insert_artifact(&mut self, reference: &ModuleReference, file: ResolvedFile) {
        self.artifacts.insert(reference.to_string(), file);
    }

    /// Make a remote reference fail with `AuthRequired`.
    pub fn require_auth(&mut self, reference: &ModuleReference) {
        self.auth_required.push(reference.to_string());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl SourceTextProvider for InMemoryWorkspace {
    fn source_text(&self, uri: &SourceUri) -> Option<Arc<str>> {
        self.files.get(uri).cloned()
    }
}

impl ModuleResolver for InMemoryWorkspace {
    fn resolve(
        &self,
        from: &SourceUri,
        reference: &ModuleReference,
    ) -> Result<ResolvedFile, ResolutionError> {
        if let Some(target) = reference.local_target(from) {
            return self
                .files
                .get(&target)
                .map(|text| ResolvedFile {
                    uri: target.clone(),
                    text: text.clone(),
                })
                .ok_or_else(|| ResolutionError::NotFound(target.to_string()));
        }

        let key = reference.to_string();
        if self.auth_required.contains(&key) {
            return Err(ResolutionError::AuthRequired(key));
        }
        self.artifacts
            .get(&key)
            .cloned()
            .ok_or(ResolutionError::RestorePending(key))
    }
}

// ============================================================================
// FILESYSTEM RESOLVER
// ============================================================================

/// Reads local references from disk.
///
/// Remote references are never fetched; they report `RestorePending` unless a
/// restore directory holds a `main.bicep` under the artifact's cache path.
#[derive(Debug, Clone, Default)]
pub struct FileSystemResolver {
    restore_root: Option<PathBuf>,
}

impl FileSystemResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for restored artifacts under `root`.
    pub fn with_restore_root(root: impl Into<PathBuf>) -> Self {
        Self {
            restore_root: Some(root.into()),
        }
    }

    fn read(&self, uri: SourceUri, path: PathBuf) -> Result<ResolvedFile, ResolutionError> {
        trace!("Reading module file: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(ResolvedFile {
                uri,
                text: Arc::from(text),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ResolutionError::NotFound(path.display().to_string()))
            }
            Err(e) => Err(ResolutionError::NotFound(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn artifact_path(&self, reference: &ModuleReference) -> Option<PathBuf> {
        let root = self.restore_root.as_ref()?;
        let relative: String = reference
            .to_string()
            .chars()
            .map(|c| match c {
                ':' | '@' => '/',
                c => c,
            })
            .collect();
        Some(root.join(relative).join("main.bicep"))
    }
}

impl SourceTextProvider for FileSystemResolver {
    fn source_text(&self, uri: &SourceUri) -> Option<Arc<str>> {
        let path = uri.to_file_path()?;
        std::fs::read_to_string(path).ok().map(Arc::from)
    }
}

impl ModuleResolver for FileSystemResolver {
    fn resolve(
        &self,
        from: &SourceUri,
        reference: &ModuleReference,
    ) -> Result<ResolvedFile, ResolutionError> {
        if let Some(target) = reference.local_target(from) {
            let path = target
                .to_file_path()
                .ok_or_else(|| ResolutionError::NotFound(target.to_string()))?;
            return self.read(target, path);
        }

        match self.artifact_path(reference) {
            Some(path) if path.is_file() => {
                let uri = SourceUri::from_file_path(&path);
                self.read(uri, path)
            }
            _ => Err(ResolutionError::RestorePending(reference.to_string())),
        }
    }
}

// ============================================================================
// CACHING RESOLVER
// ============================================================================

/// Memoizes successful resolutions of an inner resolver.
///
/// Failures are not cached so that a later restore or file creation is seen
/// on the next compilation.
pub struct CachingResolver<R> {
    inner: R,
    cache: RwLock<FxHashMap<(SourceUri, String), ResolvedFile>>,
}

impl<R: ModuleResolver> CachingResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Drop every cached entry.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// Drop entries resolved to `uri`.
    pub fn invalidate(&self, uri: &SourceUri) {
        self.cache.write().retain(|_, file| &file.uri != uri);
    }

    pub fn cached_len(&self) -> usize {
        self.cache.read().len()
    }

    fn cache_key(from: &SourceUri, reference: &ModuleReference) -> (SourceUri, String) {
        // Local references depend on the referencing directory, remote ones do not
        match reference.local_target(from) {
            Some(target) => (target, String::new()),
            None => (SourceUri::new(""), reference.to_string()),
        }
    }
}

impl<R: ModuleResolver> ModuleResolver for CachingResolver<R> {
    fn resolve(
        &self,
        from: &SourceUri,
        reference: &ModuleReference,
    ) -> Result<ResolvedFile, ResolutionError> {
        let key = Self::cache_key(from, reference);
        if let Some(hit) = self.cache.read().get(&key) {
            trace!("Resolver cache hit: {}", reference);
            return Ok(hit.clone());
        }

        let resolved = self.inner.resolve(from, reference)?;
        debug!("Resolved {} -> {}", reference, resolved.uri);
        self.cache.write().insert(key, resolved.clone());
        Ok(resolved)
    }
}

impl<R: SourceTextProvider> SourceTextProvider for CachingResolver<R> {
    fn source_text(&self, uri: &SourceUri) -> Option<Arc<str>> {
        self.inner.source_text(uri)
    }

    fn parsed_file(&self, uri: &SourceUri, text: &str) -> Option<Arc<SyntaxFile>> {
        self.inner.parsed_file(uri, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reference(raw: &str) -> ModuleReference {
        ModuleReference::parse(raw).unwrap()
    }

    #[test]
    fn test_in_memory_resolves_relative_to_referencing_file() {
        let workspace = InMemoryWorkspace::new()
            .with_file("file:///infra/main.bicep", "")
            .with_file("file:///infra/modules/storage.bicep", "param name string\n");
        let from = SourceUri::new("file:///infra/main.bicep");
        let resolved = workspace
            .resolve(&from, &reference("./modules/storage.bicep"))
            .unwrap();
        assert_eq!(resolved.uri.as_str(), "file:///infra/modules/storage.bicep");
        assert_eq!(&*resolved.text, "param name string\n");

        assert!(matches!(
            workspace.resolve(&from, &reference("missing.bicep")),
            Err(ResolutionError::NotFound(_))
        ));
    }

    #[test]
    fn test_in_memory_remote_references() {
        let mut workspace = InMemoryWorkspace::new();
        let from = SourceUri::new("file:///main.bicep");
        let pending = reference("br:contoso.io/a:v1");
        let secured = reference("br:contoso.io/b:v1");
        let restored = reference("ts:sub/rg/spec:1.0");
        workspace.require_auth(&secured);
        workspace.insert_artifact(
            &restored,
            ResolvedFile {
                uri: SourceUri::new("ts://sub/rg/spec/1.0/main.bicep"),
                text: Arc::from("output x int = 1\n"),
            },
        );

        assert!(matches!(
            workspace.resolve(&from, &pending),
            Err(ResolutionError::RestorePending(_))
        ));
        assert!(matches!(
            workspace.resolve(&from, &secured),
            Err(ResolutionError::AuthRequired(_))
        ));
        assert!(workspace.resolve(&from, &restored).is_ok());
    }

    #[test]
    fn test_filesystem_resolver_reads_local_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("modules")).unwrap();
        std::fs::write(dir.path().join("modules/app.bicep"), "param p int\n").unwrap();
        let from = SourceUri::from_file_path(&dir.path().join("main.bicep"));

        let resolver = FileSystemResolver::new();
        let resolved = resolver.resolve(&from, &reference("modules/app.bicep")).unwrap();
        assert_eq!(&*resolved.text, "param p int\n");
        assert!(matches!(
            resolver.resolve(&from, &reference("modules/none.bicep")),
            Err(ResolutionError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve(&from, &reference("br:contoso.io/x:v1")),
            Err(ResolutionError::RestorePending(_))
        ));
    }

    struct Counting {
        workspace: InMemoryWorkspace,
        calls: AtomicUsize,
    }

    impl ModuleResolver for Counting {
        fn resolve(
            &self,
            from: &SourceUri,
            reference: &ModuleReference,
        ) -> Result<ResolvedFile, ResolutionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.workspace.resolve(from, reference)
        }
    }

    #[test]
    fn test_caching_resolver_memoizes_successes_only() {
        let resolver = CachingResolver::new(Counting {
            workspace: InMemoryWorkspace::new().with_file("file:///a.bicep", ""),
            calls: AtomicUsize::new(0),
        });
        let main = SourceUri::new("file:///main.bicep");
        let nested = SourceUri::new("file:///nested/../other.bicep");

        resolver.resolve(&main, &reference("./a.bicep")).unwrap();
        resolver.resolve(&nested, &reference("a.bicep")).unwrap();
        assert_eq!(resolver.inner().calls.load(Ordering::SeqCst), 1);

        assert!(resolver.resolve(&main, &reference("b.bicep")).is_err());
        assert!(resolver.resolve(&main, &reference("b.bicep")).is_err());
        assert_eq!(resolver.inner().calls.load(Ordering::SeqCst), 3);
        assert_eq!(resolver.cached_len(), 1);

        resolver.invalidate(&SourceUri::new("file:///a.bicep"));
        assert_eq!(resolver.cached_len(), 0);
    }
}
