//! Controller for the document agent.
//!
//! This crate provides the capability registry, the skill handlers and the
//! dispatcher that routes classified requests to them.

pub mod dispatcher;
pub mod handlers;
pub mod prompts;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use handlers::{DocumentHandler, GeneralQaHandler, KnowledgeHandler, UrlSummaryHandler, WebSearchHandler};
pub use prompts::default_prompts;
pub use registry::{CapabilityRegistry, CapabilityRegistryBuilder};
