use serde_json::{Value, json};
use stencil_backend::BackendError;
use stencil_grid::GridError;
use stencil_html::HtmlError;
use stencil_markup::MarkupError;
use stencil_traits::StoreError;
use stencil_types::RequestError;
use thiserror::Error;

/// Every way a render can fail, across the whole pipeline.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("{0}")]
    Request(#[from] RequestError),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("Template is not valid UTF-8: {0}")]
    TemplateEncoding(String),

    #[error("Document fill failed: {0}")]
    Markup(#[from] MarkupError),

    #[error("Spreadsheet fill failed: {0}")]
    Grid(#[from] GridError),

    #[error("HTML layout failed: {0}")]
    Html(#[from] HtmlError),

    #[error("Conversion failed: {0}")]
    Backend(#[from] BackendError),

    #[error("Render worker failed: {0}")]
    Worker(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    BadRequest,
    Internal,
}

impl RenderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RenderError::Request(_)
            | RenderError::Store(StoreError::NotFound(_) | StoreError::Rejected(_)) => {
                ErrorClass::BadRequest
            }
            _ => ErrorClass::Internal,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self.class() {
            ErrorClass::BadRequest => 400,
            ErrorClass::Internal => 500,
        }
    }

    /// The outbound error body, `{"error": "<message>"}`.
    pub fn to_body(&self) -> Value {
        json!({ "error": self.to_string() })
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_bad_requests() {
        let err = RenderError::from(RequestError::UnsupportedFormat("odt".into()));
        assert_eq!(err.class(), ErrorClass::BadRequest);
        assert_eq!(err.status_code(), 400);
        assert_eq!(err.to_body(), json!({ "error": "unsupported format 'odt'" }));
    }

    #[test]
    fn test_missing_template_is_bad_request() {
        let err = RenderError::from(StoreError::NotFound("invoice.xlsx".into()));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_backend_and_structure_errors_are_internal() {
        let err = RenderError::from(BackendError::Process("exit 1".into()));
        assert_eq!(err.class(), ErrorClass::Internal);
        assert_eq!(err.status_code(), 500);

        let err = RenderError::from(GridError::Structure("bad sheet".into()));
        assert_eq!(err.status_code(), 500);

        let err = RenderError::from(StoreError::Io("disk".into()));
        assert_eq!(err.status_code(), 500);
    }
}
