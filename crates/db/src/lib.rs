//! Channel store: one in-memory document, persisted wholesale after every
//! mutation through a pluggable [`backend::StorageBackend`].

pub mod backend;
pub mod models;
pub mod queries;
pub mod store;

pub use backend::{JsonFileBackend, MemoryBackend, StorageBackend};
pub use store::Store;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("document encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}
