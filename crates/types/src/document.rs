use serde::Serialize;

use crate::{OutputFormat, TemplateKind};

/// The finished document produced by one render.
///
/// Immutable once built; the caller takes ownership and streams the bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    bytes: Vec<u8>,
    format: OutputFormat,
    filename: String,
}

impl RenderedDocument {
    pub fn new(bytes: Vec<u8>, format: OutputFormat, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            format,
            filename: filename.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Value for the `Content-Disposition` header.
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.filename)
    }
}

/// One template as reported by a store listing.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TemplateEntry {
    pub name: String,
    pub format: String,
}

impl TemplateEntry {
    pub fn kind(&self) -> Option<TemplateKind> {
        TemplateKind::from_extension(&self.format)
    }
}
