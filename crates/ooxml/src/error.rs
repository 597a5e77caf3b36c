use thiserror::Error;

#[derive(Error, Debug)]
pub enum OoxmlError {
    #[error("Zip container error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Quick-XML error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    #[error("UTF-8 string error: {0}")]
    Utf8Str(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Package part not found: {0}")]
    MissingPart(String),

    #[error("Malformed XML in '{part}': {message}")]
    Malformed { part: String, message: String },
}

impl From<quick_xml::events::attributes::AttrError> for OoxmlError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        OoxmlError::QuickXml(quick_xml::Error::InvalidAttr(e))
    }
}
