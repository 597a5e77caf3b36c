//! Template stores for the stencil document service.
//!
//! This crate provides the platform implementations of the `TemplateStore`
//! trait from stencil-traits.
//!
//! ## Available Stores
//!
//! - [`FilesystemTemplateStore`]: Serves `<code>.<ext>` files from a directory
//!
//! ## Re-exports
//!
//! For convenience, we also re-export the in-memory store from stencil-traits:
//! - [`InMemoryTemplateStore`]: Pre-populated in-memory storage

mod filesystem;

pub use filesystem::FilesystemTemplateStore;

pub use stencil_traits::InMemoryTemplateStore;
