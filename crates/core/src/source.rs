//! Source provider abstraction for loading domain documents.
//!
//! The [`SourceProvider`] trait abstracts file I/O so analysis can run over
//! documents that never touch the filesystem (editors, tests, embedding).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::ast::Domain;
use crate::error::LoadError;

/// Trait that abstracts reading a serialized domain AST.
pub trait SourceProvider {
    /// Read the document text for a given path.
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error>;
}

/// Default filesystem-backed source provider.
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        std::fs::read_to_string(path)
    }
}

/// Documents held in memory, keyed by the path they are requested under.
///
/// Used when the AST is produced in-process (an editor buffer, a generator)
/// rather than written to disk first.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    documents: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    pub fn new(documents: HashMap<PathBuf, String>) -> Self {
        Self { documents }
    }

    /// Add or replace one document.
    pub fn with_document(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.documents.insert(path.into(), text.into());
        self
    }
}

impl SourceProvider for InMemoryProvider {
    fn read_source(&self, path: &Path) -> Result<String, std::io::Error> {
        self.documents.get(path).cloned().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no in-memory document for {}", path.display()),
            )
        })
    }
}

/// Read and deserialize the domain document at `path`.
pub fn load_domain(provider: &dyn SourceProvider, path: &Path) -> Result<Domain, LoadError> {
    let text = provider.read_source(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_domain(&text, &path.display().to_string())
}

/// Deserialize an already-read domain document. `path` is only used in errors.
pub fn parse_domain(text: &str, path: &str) -> Result<Domain, LoadError> {
    serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{ "name": "Auth", "version": "1.0.0" }"#;

    #[test]
    fn in_memory_load_domain() {
        let provider = InMemoryProvider::default().with_document("specs/auth.json", MINIMAL);
        let domain = load_domain(&provider, Path::new("specs/auth.json")).unwrap();
        assert_eq!(domain.name, "Auth");
        assert!(domain.behaviors.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let provider = InMemoryProvider::new(HashMap::new());
        let err = load_domain(&provider, Path::new("/missing.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert_eq!(err.path(), "/missing.json");
    }

    #[test]
    fn malformed_document_is_json_error() {
        let err = parse_domain("{ \"name\": ", "broken.json").unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
        let value = err.to_json_value();
        assert_eq!(value["error"], "json");
        assert_eq!(value["file"], "broken.json");
    }
}
