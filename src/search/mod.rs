//! Retrieval: semantic and keyword search with hybrid score fusion.

mod engine;
mod fusion;

pub use engine::{ContextualResult, RetrievalEngine};
pub use fusion::fuse;
