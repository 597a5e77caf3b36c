//! Placeholder filling for `.docx` templates.
//!
//! Runs (`w:r`) are the unit of substitution. A run's text is the
//! concatenation of its `w:t` children; when it contains a brace every
//! `{key}` / `{{ key }}` token is resolved against the request data and the
//! run is rewritten with the result in its first `w:t`. Run properties are
//! untouched, so the run keeps its styling. A token split across two runs is
//! not recognised.

pub mod error;
pub mod region;

pub use error::MarkupError;
pub use region::{FilledDocument, Region, fill_document, fill_runs};
