//! Filesystem-based template store.
//!
//! Templates live flat in one directory as `<code>.<ext>`. Codes are
//! validated before they ever touch a path, and resolved paths are checked
//! to stay under the template directory.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use stencil_traits::{SharedTemplateData, StoreError, TemplateStore};
use stencil_types::{TemplateCode, TemplateEntry, TemplateKind};

/// A template store backed by one directory on the local filesystem.
///
/// Templates are re-read on every load, so edits on disk are picked up
/// without a restart.
#[derive(Debug)]
pub struct FilesystemTemplateStore {
    base_path: PathBuf,
    /// Canonicalized base path for containment checks
    canonical_base: Option<PathBuf>,
}

impl FilesystemTemplateStore {
    /// The base path is canonicalized when it exists; a missing directory
    /// is not an error until something is loaded from it.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        let base = base_path.as_ref().to_path_buf();
        let canonical = base.canonicalize().ok();
        Self {
            base_path: base,
            canonical_base: canonical,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    /// Resolves a template file name below the base path.
    ///
    /// Returns `None` if the name would escape the template directory.
    fn resolve_path_safe(&self, file_name: &str) -> Option<PathBuf> {
        let relative = Path::new(file_name);
        if relative.is_absolute() {
            return None;
        }
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }

        let full_path = self.base_path.join(relative);

        if let Ok(canonical) = full_path.canonicalize()
            && let Some(ref base) = self.canonical_base
        {
            if canonical.starts_with(base) {
                return Some(canonical);
            }
            // Symlink pointing outside the template directory.
            return None;
        }

        Some(full_path)
    }
}

impl TemplateStore for FilesystemTemplateStore {
    fn load(
        &self,
        code: &TemplateCode,
        kind: TemplateKind,
    ) -> Result<SharedTemplateData, StoreError> {
        if !code.is_valid() {
            return Err(StoreError::Rejected(code.to_string()));
        }
        let file_name = code.file_name(kind);
        let full_path = self
            .resolve_path_safe(&file_name)
            .ok_or_else(|| StoreError::Rejected(file_name.clone()))?;

        log::debug!("Loading template '{}'", full_path.display());
        std::fs::read(&full_path).map(Arc::new).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(file_name)
            } else {
                StoreError::LoadFailed {
                    path: file_name,
                    message: e.to_string(),
                }
            }
        })
    }

    fn exists(&self, code: &TemplateCode, kind: TemplateKind) -> bool {
        code.is_valid()
            && self
                .resolve_path_safe(&code.file_name(kind))
                .map(|p| p.is_file())
                .unwrap_or(false)
    }

    /// Lists regular files in the template directory. Subdirectories are
    /// skipped; a file without an extension is reported with an empty format.
    fn list(&self) -> Result<Vec<TemplateEntry>, StoreError> {
        let read_dir = std::fs::read_dir(&self.base_path).map_err(|e| StoreError::LoadFailed {
            path: self.base_path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry?;
            if dir_entry.file_type()?.is_dir() {
                continue;
            }
            let path = dir_entry.path();
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                log::warn!("Skipping non UTF-8 template file name {:?}", path);
                continue;
            };
            let format = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default();
            entries.push(TemplateEntry {
                name: name.to_string(),
                format: format.to_string(),
            });
        }
        entries.sort();
        Ok(entries)
    }

    fn base_path(&self) -> Option<&str> {
        self.base_path.to_str()
    }

    fn name(&self) -> &'static str {
        "FilesystemTemplateStore"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn code(s: &str) -> TemplateCode {
        TemplateCode::from(s)
    }

    #[test]
    fn test_filesystem_store_load_existing_template() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("invoice.html"), b"<p>{{ total }}</p>").unwrap();

        let store = FilesystemTemplateStore::new(dir.path());
        let data = store.load(&code("invoice"), TemplateKind::Html).unwrap();
        assert_eq!(&*data, b"<p>{{ total }}</p>");
    }

    #[test]
    fn test_filesystem_store_not_found() {
        let dir = tempdir().unwrap();
        let store = FilesystemTemplateStore::new(dir.path());

        let result = store.load(&code("missing"), TemplateKind::Xlsx);
        assert!(matches!(result, Err(StoreError::NotFound(ref n)) if n == "missing.xlsx"));
    }

    #[test]
    fn test_filesystem_store_exists() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("report.docx"), b"").unwrap();

        let store = FilesystemTemplateStore::new(dir.path());
        assert!(store.exists(&code("report"), TemplateKind::Docx));
        assert!(!store.exists(&code("report"), TemplateKind::Xlsx));
    }

    #[test]
    fn test_filesystem_store_blocks_traversal() {
        let dir = tempdir().unwrap();
        let store = FilesystemTemplateStore::new(dir.path());

        let result = store.load(&code("../../etc/passwd"), TemplateKind::Html);
        assert!(matches!(result, Err(StoreError::Rejected(_))));
        assert!(!store.exists(&code(".."), TemplateKind::Html));
        assert!(!store.exists(&code("/etc/passwd"), TemplateKind::Html));
    }

    #[test]
    fn test_filesystem_store_list_skips_directories() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("statement.xlsx"), b"").unwrap();
        fs::write(dir.path().join("letter.docx"), b"").unwrap();
        fs::write(dir.path().join("letter.html"), b"").unwrap();
        fs::create_dir(dir.path().join("archive.d")).unwrap();

        let store = FilesystemTemplateStore::new(dir.path());
        let listed = store.list().unwrap();
        assert_eq!(
            listed,
            vec![
                TemplateEntry {
                    name: "letter".into(),
                    format: "docx".into()
                },
                TemplateEntry {
                    name: "letter".into(),
                    format: "html".into()
                },
                TemplateEntry {
                    name: "statement".into(),
                    format: "xlsx".into()
                },
            ]
        );
    }

    #[test]
    fn test_filesystem_store_list_missing_dir() {
        let dir = tempdir().unwrap();
        let store = FilesystemTemplateStore::new(dir.path().join("nope"));
        assert!(matches!(store.list(), Err(StoreError::LoadFailed { .. })));
    }
}
