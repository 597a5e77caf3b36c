//! TemplateStore trait for abstracting where templates come from.
//!
//! The service only needs to turn a template code plus a template kind into
//! bytes, and to enumerate what is available. Everything else (directory
//! layout, caching, remote storage) is the store's business.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, RwLock};
use stencil_types::{TemplateCode, TemplateEntry, TemplateKind};
use thiserror::Error;

/// Error type for template store operations.
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("failed to load template '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("template path rejected: {0}")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

/// Template bytes shared between the store and in-flight renders.
pub type SharedTemplateData = Arc<Vec<u8>>;

/// Read-only source of template files.
///
/// # Implementations
///
/// - `FilesystemTemplateStore` (stencil-resource): a directory of
///   `<code>.<ext>` files
/// - `InMemoryTemplateStore`: pre-populated map, used by tests and embedders
pub trait TemplateStore: Send + Sync + Debug {
    /// Load the template `code` of the given kind.
    fn load(&self, code: &TemplateCode, kind: TemplateKind)
    -> Result<SharedTemplateData, StoreError>;

    /// Check whether a template exists without loading it.
    fn exists(&self, code: &TemplateCode, kind: TemplateKind) -> bool;

    /// Every template the store can serve, sorted by name then format.
    fn list(&self) -> Result<Vec<TemplateEntry>, StoreError>;

    /// Root the store resolves against, if it has one.
    fn base_path(&self) -> Option<&str> {
        None
    }

    /// Returns a human-readable name for this store (for logging/debugging).
    fn name(&self) -> &'static str;
}

/// An in-memory template store.
///
/// Templates are keyed by their file name (`<code>.<ext>`), the same key the
/// filesystem store uses.
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<HashMap<String, SharedTemplateData>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a template under `code` and `kind`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::LoadFailed` if the internal lock is poisoned.
    pub fn add(
        &self,
        code: impl Into<TemplateCode>,
        kind: TemplateKind,
        data: Vec<u8>,
    ) -> Result<(), StoreError> {
        let key = code.into().file_name(kind);
        let mut templates = self.templates.write().map_err(|_| StoreError::LoadFailed {
            path: key.clone(),
            message: "template store lock poisoned".to_string(),
        })?;
        templates.insert(key, Arc::new(data));
        Ok(())
    }

    /// Builder-style variant of [`add`](Self::add) for fixtures.
    pub fn with(self, code: impl Into<TemplateCode>, kind: TemplateKind, data: Vec<u8>) -> Self {
        // A fresh store cannot be poisoned.
        let _ = self.add(code, kind, data);
        self
    }

    /// Returns 0 if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.templates.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Returns `true` if the lock is poisoned.
    pub fn is_empty(&self) -> bool {
        self.templates.read().map(|t| t.is_empty()).unwrap_or(true)
    }
}

impl TemplateStore for InMemoryTemplateStore {
    fn load(
        &self,
        code: &TemplateCode,
        kind: TemplateKind,
    ) -> Result<SharedTemplateData, StoreError> {
        let key = code.file_name(kind);
        let templates = self.templates.read().map_err(|_| StoreError::LoadFailed {
            path: key.clone(),
            message: "template store lock poisoned".to_string(),
        })?;
        templates
            .get(&key)
            .cloned()
            .ok_or(StoreError::NotFound(key))
    }

    fn exists(&self, code: &TemplateCode, kind: TemplateKind) -> bool {
        self.templates
            .read()
            .map(|t| t.contains_key(&code.file_name(kind)))
            .unwrap_or(false)
    }

    fn list(&self) -> Result<Vec<TemplateEntry>, StoreError> {
        let templates = self.templates.read().map_err(|_| StoreError::LoadFailed {
            path: String::new(),
            message: "template store lock poisoned".to_string(),
        })?;
        let mut entries: Vec<TemplateEntry> = templates
            .keys()
            .filter_map(|key| {
                let (name, ext) = key.rsplit_once('.')?;
                Some(TemplateEntry {
                    name: name.to_string(),
                    format: ext.to_string(),
                })
            })
            .collect();
        entries.sort();
        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "InMemoryTemplateStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> TemplateCode {
        TemplateCode::from(s)
    }

    #[test]
    fn test_in_memory_store_add_and_load() {
        let store = InMemoryTemplateStore::new();
        store
            .add("invoice", TemplateKind::Html, b"<p>{{ n }}</p>".to_vec())
            .unwrap();

        let data = store.load(&code("invoice"), TemplateKind::Html).unwrap();
        assert_eq!(&*data, b"<p>{{ n }}</p>");
    }

    #[test]
    fn test_in_memory_store_kind_is_part_of_key() {
        let store = InMemoryTemplateStore::new().with("invoice", TemplateKind::Html, vec![1]);
        let result = store.load(&code("invoice"), TemplateKind::Xlsx);
        assert!(matches!(result, Err(StoreError::NotFound(ref k)) if k == "invoice.xlsx"));
        assert!(store.exists(&code("invoice"), TemplateKind::Html));
        assert!(!store.exists(&code("invoice"), TemplateKind::Docx));
    }

    #[test]
    fn test_in_memory_store_overwrite() {
        let store = InMemoryTemplateStore::new();
        store.add("a", TemplateKind::Html, b"one".to_vec()).unwrap();
        store.add("a", TemplateKind::Html, b"two".to_vec()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(&*store.load(&code("a"), TemplateKind::Html).unwrap(), b"two");
    }

    #[test]
    fn test_in_memory_store_list_sorted() {
        let store = InMemoryTemplateStore::new()
            .with("zeta", TemplateKind::Docx, vec![])
            .with("alpha", TemplateKind::Xlsx, vec![])
            .with("alpha", TemplateKind::Html, vec![]);

        let names: Vec<(String, String)> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.format))
            .collect();
        assert_eq!(
            names,
            vec![
                ("alpha".to_string(), "html".to_string()),
                ("alpha".to_string(), "xlsx".to_string()),
                ("zeta".to_string(), "docx".to_string()),
            ]
        );
    }

    #[test]
    fn test_in_memory_store_empty() {
        let store = InMemoryTemplateStore::new();
        assert!(store.is_empty());
        assert!(store.list().unwrap().is_empty());
        assert!(store.base_path().is_none());
        assert_eq!(store.name(), "InMemoryTemplateStore");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::LoadFailed {
            path: "a.docx".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("a.docx"));
        assert!(err.to_string().contains("permission denied"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StoreError = io_err.into();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
