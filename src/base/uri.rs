use std::path::{Path, PathBuf};

use smol_str::SmolStr;

/// Normalized identity of a source file.
///
/// Two files with the same normalized URI are the same entity. Normalization
/// converts backslashes to `/`, lowercases the scheme, and collapses `.`,
/// `..` and empty path segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceUri(SmolStr);

impl SourceUri {
    pub fn new(raw: &str) -> Self {
        Self(SmolStr::new(normalize(raw)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve `relative` against the directory containing this file.
    pub fn join(&self, relative: &str) -> SourceUri {
        let relative = relative.replace('\\', "/");
        match self.0.rfind('/') {
            Some(idx) => SourceUri::new(&format!("{}/{}", &self.0[..idx], relative)),
            None => SourceUri::new(&relative),
        }
    }

    /// The final path segment.
    pub fn file_name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        name.rfind('.').map(|idx| &name[idx + 1..])
    }

    /// `file://` URI for a filesystem path
    pub fn from_file_path(path: &Path) -> SourceUri {
        let raw = path.to_string_lossy().replace('\\', "/");
        if raw.starts_with('/') {
            SourceUri::new(&format!("file://{}", raw))
        } else {
            SourceUri::new(&format!("file:///{}", raw))
        }
    }

    /// Filesystem path of a `file://` URI
    pub fn to_file_path(&self) -> Option<PathBuf> {
        let path = self.0.strip_prefix("file://")?;
        // file:///C:/x -> C:/x on Windows-style paths
        let path = match path.as_bytes() {
            [b'/', drive, b':', ..] if drive.is_ascii_alphabetic() => &path[1..],
            _ => path,
        };
        Some(PathBuf::from(path))
    }
}

impl std::fmt::Display for SourceUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceUri {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

fn normalize(raw: &str) -> String {
    let raw = raw.replace('\\', "/");
    let (mut out, path) = match raw.find("://") {
        Some(idx) => (raw[..idx + 3].to_ascii_lowercase(), &raw[idx + 3..]),
        None => (String::new(), raw.as_str()),
    };

    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(last) if *last != ".." => {
                    segments.pop();
                }
                _ if !absolute => segments.push(".."),
                _ => {}
            },
            other => segments.push(other),
        }
    }

    if absolute {
        out.push('/');
    }
    out.push_str(&segments.join("/"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_dot_segments() {
        let uri = SourceUri::new("file:///path/./to/../to/main.bicep");
        assert_eq!(uri.as_str(), "file:///path/to/main.bicep");
    }

    #[test]
    fn test_backslashes_and_scheme_case() {
        let uri = SourceUri::new("FILE://C:\\work\\main.bicep");
        assert_eq!(uri.as_str(), "file://C:/work/main.bicep");
    }

    #[test]
    fn test_join_relative_module_path() {
        let entry = SourceUri::new("file:///path/to/main.bicep");
        assert_eq!(
            entry.join("../modules/storage.bicep").as_str(),
            "file:///path/modules/storage.bicep"
        );
        assert_eq!(entry.join("./a.bicep"), SourceUri::new("file:///path/to/a.bicep"));
    }

    #[test]
    fn test_file_path_round_trip() {
        let uri = SourceUri::from_file_path(Path::new("/work/infra/main.bicep"));
        assert_eq!(uri.as_str(), "file:///work/infra/main.bicep");
        assert_eq!(uri.to_file_path(), Some(PathBuf::from("/work/infra/main.bicep")));
        assert_eq!(SourceUri::new("inmemory://x").to_file_path(), None);
    }

    #[test]
    fn test_relative_uri_keeps_leading_parent_segments() {
        let uri = SourceUri::new("../shared/x.bicep");
        assert_eq!(uri.as_str(), "../shared/x.bicep");
        assert_eq!(uri.file_name(), "x.bicep");
        assert_eq!(uri.extension(), Some("bicep"));
    }
}
