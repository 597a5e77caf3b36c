//! Spreadsheet fill engine.
//!
//! [`fill_workbook`] runs two passes over every worksheet of an `.xlsx`
//! template. The scalar pass replaces `{{ key }}` and `{{ a.b.c }}` tokens
//! with values from the request data. The table pass finds
//! `{{ table.field }}` tokens, picks the lowest row holding a table's tokens
//! as its template row, and repeats that row once per record of the matching
//! array, shifting everything below it.
//!
//! [`NewSheet`] is the other direction: a blank workbook built cell by cell,
//! used when the layout comes from HTML rather than a spreadsheet template.

pub mod cellref;
pub mod error;
pub mod fill;
pub mod formula;
pub mod sheet;
pub mod table;
pub mod value;
pub mod workbook;
pub mod writer;

pub use cellref::{CellRef, column_index, column_name};
pub use error::GridError;
pub use fill::{FilledWorkbook, fill_sheet, fill_workbook};
pub use sheet::Sheet;
pub use table::{CellLocation, Expansion, TableBinding, discover_tables, expand_table};
pub use value::CellValue;
pub use workbook::{SharedStrings, SheetEntry, Workbook};
pub use writer::{BOLD_STYLE, GridCell, NewSheet};
