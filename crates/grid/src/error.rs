use stencil_ooxml::OoxmlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Workbook package error: {0}")]
    Ooxml(#[from] OoxmlError),

    #[error("Invalid cell reference '{0}'")]
    InvalidCellRef(String),

    #[error("Workbook structure error: {0}")]
    Structure(String),

    #[error("Cell {0} not found")]
    MissingCell(String),

    #[error("Tables '{first}' and '{second}' share template row {row}")]
    OverlappingTables {
        first: String,
        second: String,
        row: u32,
    },
}
