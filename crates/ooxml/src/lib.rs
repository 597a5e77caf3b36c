//! Office Open XML plumbing for the native fill engines.
//!
//! A `.docx` or `.xlsx` file is a zip of XML parts. [`Package`] keeps every
//! part in archive order and hands out [`XmlDocument`] trees for the parts an
//! engine wants to edit; everything else is written back unchanged.

pub mod error;
pub mod package;
pub mod xml;

pub use error::OoxmlError;
pub use package::Package;
pub use xml::{NodeId, NodeKind, XmlDocument};
