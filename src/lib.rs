//! Stencil: template-driven document assembly.
//!
//! A [`RenderRequest`] names a template, an output format and a JSON data
//! tree. The [`DocumentService`] loads the template, fills it, and hands the
//! result to whichever backend the configuration selects for that format.
//!
//! ```no_run
//! use stencil::{Config, DocumentService, RenderRequest};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), stencil::RenderError> {
//! let service = DocumentService::from_config(&Config::load(None)?)?;
//! let request = RenderRequest::new("invoice", "xlsx", json!({ "client": { "name": "Acme" } }));
//! let document = service.render(request).await?;
//! std::fs::write(document.filename(), document.bytes()).ok();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::{BackendsConfig, Config, DocxStrategy, StrategiesConfig, TemplatesConfig, XlsxStrategy};
pub use error::{ErrorClass, RenderError};
pub use service::{Backends, DocumentService};

pub use stencil_types::{
    OutputFormat, RenderRequest, RenderedDocument, RequestError, TemplateEntry, TemplateKind,
};
