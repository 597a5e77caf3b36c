use std::fmt::Debug;

use async_trait::async_trait;

use crate::BackendError;

/// Converts one rendered HTML document into another format.
#[async_trait]
pub trait Converter: Send + Sync + Debug {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Returns the converted bytes. Fails on any collaborator error.
    async fn convert(&self, html: &str) -> Result<Vec<u8>, BackendError>;
}
