//! Newtype wrapper for template codes.
//!
//! A template code names a template independently of its file format, so
//! `invoice` can resolve to `invoice.html`, `invoice.docx` or `invoice.xlsx`.

use std::fmt;
use std::sync::Arc;

/// The code a request uses to select a template.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct TemplateCode(Arc<str>);

impl TemplateCode {
    pub fn new(code: impl Into<Arc<str>>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the code is usable as a single file stem: non-blank and free
    /// of path separators.
    pub fn is_valid(&self) -> bool {
        let code = self.0.trim();
        !code.is_empty() && !code.contains(['/', '\\']) && code != "." && code != ".."
    }

    /// The file name of this template for the given kind, e.g. `invoice.xlsx`.
    pub fn file_name(&self, kind: crate::TemplateKind) -> String {
        format!("{}.{}", self.0, kind.extension())
    }
}

impl From<String> for TemplateCode {
    fn from(s: String) -> Self {
        Self(s.into())
    }
}

impl From<&str> for TemplateCode {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

impl AsRef<str> for TemplateCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
