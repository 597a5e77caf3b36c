use stencil_ooxml::OoxmlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkupError {
    #[error("Document package error: {0}")]
    Ooxml(#[from] OoxmlError),

    #[error("Not a word-processing document: {0} is missing")]
    NotADocument(String),
}
