//! Core traits for the document agent.
//!
//! Traits are organized by layer:
//! - `gateway`: request classification (IntentClassifier, ModelClassifier, ClassificationCache)
//! - `controller`: request submission (Controller)
//! - `skills`: skill handlers and external tools (SkillHandler, ToolInvoker)
//! - `store`: generated documents and reference knowledge (DocumentStore, KnowledgeStore)
//! - `llm`: model access (LlmClient)

pub mod controller;
pub mod gateway;
pub mod llm;
pub mod skills;
pub mod store;

pub use controller::*;
pub use gateway::*;
pub use llm::*;
pub use skills::*;
pub use store::*;
