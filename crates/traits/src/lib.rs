pub mod store;

pub use store::{InMemoryTemplateStore, SharedTemplateData, StoreError, TemplateStore};
