//! Storage for the document agent.
//!
//! Generated documents go to the filesystem; reference knowledge is searched
//! in a built-in keyword index, an in-memory embedding index or Qdrant.

pub mod document;
pub mod knowledge;
pub mod qdrant;

pub use document::{sanitize_title, FileDocumentStore};
pub use knowledge::{
    cosine_similarity, BuiltinKnowledgeBase, EmbeddingKnowledgeStore, FallbackKnowledgeStore,
};
pub use qdrant::QdrantKnowledgeStore;
