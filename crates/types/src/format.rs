use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::RequestError;

/// The document formats a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Html,
    Pdf,
    Docx,
    Xlsx,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 4] = [
        OutputFormat::Html,
        OutputFormat::Pdf,
        OutputFormat::Docx,
        OutputFormat::Xlsx,
    ];

    /// Canonical MIME type sent as `Content-Type`.
    pub fn mime_type(self) -> &'static str {
        match self {
            OutputFormat::Html => "text/html",
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Docx => "docx",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(OutputFormat::Html),
            "pdf" => Ok(OutputFormat::Pdf),
            "docx" => Ok(OutputFormat::Docx),
            "xlsx" => Ok(OutputFormat::Xlsx),
            _ => Err(RequestError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// The kinds of template file the store can hold.
///
/// This is distinct from [`OutputFormat`]: a PDF is produced from an HTML
/// template, and a spreadsheet can be produced from either an HTML or an
/// XLSX template depending on the configured strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Html,
    Docx,
    Xlsx,
}

impl TemplateKind {
    pub fn extension(self) -> &'static str {
        match self {
            TemplateKind::Html => "html",
            TemplateKind::Docx => "docx",
            TemplateKind::Xlsx => "xlsx",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(TemplateKind::Html),
            "docx" => Some(TemplateKind::Docx),
            "xlsx" => Some(TemplateKind::Xlsx),
            _ => None,
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_formats() {
        assert_eq!("html".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!(" docx ".parse::<OutputFormat>().unwrap(), OutputFormat::Docx);
        assert_eq!("xlsx".parse::<OutputFormat>().unwrap(), OutputFormat::Xlsx);
    }

    #[test]
    fn test_parse_unsupported_format() {
        let err = "odt".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedFormat(ref f) if f == "odt"));
        assert!(err.to_string().contains("odt"));
    }

    #[test]
    fn test_mime_types() {
        assert_eq!(OutputFormat::Pdf.mime_type(), "application/pdf");
        assert!(OutputFormat::Xlsx.mime_type().ends_with("spreadsheetml.sheet"));
        assert!(OutputFormat::Docx.mime_type().ends_with("wordprocessingml.document"));
    }

    #[test]
    fn test_template_kind_extensions() {
        assert_eq!(TemplateKind::from_extension("HTM"), Some(TemplateKind::Html));
        assert_eq!(TemplateKind::from_extension("xlsx"), Some(TemplateKind::Xlsx));
        assert_eq!(TemplateKind::from_extension("txt"), None);
    }
}
