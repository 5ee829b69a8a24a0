//! Storage traits.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::KnowledgeHit;

/// Persists generated documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Save `bytes` under a name derived from `suggested_name` (`<title>.<ext>`).
    async fn save(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf>;
}

/// Reference knowledge lookup.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Best matches first, at most `top_k`.
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>>;
}
