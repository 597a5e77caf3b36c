//! Collaborators that turn rendered HTML or filled templates into final bytes.
//!
//! None of them retry: a non-2xx status, a timeout or a failed process is
//! returned to the caller as a [`BackendError`].

pub mod converter;
pub mod error;
pub mod http;
pub mod process;
pub mod remote;

pub use converter::Converter;
pub use error::BackendError;
pub use http::{GOTENBERG_HTML_ROUTE, HttpConverter, build_client};
pub use process::ProcessConverter;
pub use remote::TemplateServiceClient;
