//! Shared vocabulary of the stencil workspace: what a render request looks
//! like, which formats exist, and what a finished document carries.

pub mod document;
pub mod format;
pub mod ids;
pub mod request;

pub use document::{RenderedDocument, TemplateEntry};
pub use format::{OutputFormat, TemplateKind};
pub use ids::TemplateCode;
pub use request::{RenderRequest, RequestError, ValidatedRequest};
