use stencil_grid::GridError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HtmlError {
    /// HTML too large
    #[error("HTML too large: {0} bytes (max 10MB)")]
    TooLarge(usize),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Template render error: {0}")]
    Template(String),

    #[error("Spreadsheet write error: {0}")]
    Grid(#[from] GridError),
}
