//! HTML templates: rendering with request data, and laying rendered HTML
//! out on a spreadsheet grid.

pub mod error;
pub mod mapper;
pub mod numeric;
pub mod render;

pub use error::HtmlError;
pub use mapper::{BodyRows, MappedRow, layout_workbook, map_body};
pub use numeric::parse_number;
pub use render::{RenderedHtml, render_template};
