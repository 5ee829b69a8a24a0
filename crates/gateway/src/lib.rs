//! HTTP gateway and intent classification for the document agent.
//!
//! This crate provides the HTTP entry point, the two-tier classifier and the
//! classification cache.

pub mod agent_card;
pub mod classification_cache;
pub mod model_classifier;
pub mod router;
pub mod server;

pub use agent_card::AgentCard;
pub use classification_cache::MokaClassificationCache;
pub use model_classifier::{parse_intent_label, LlmModelClassifier};
pub use router::{RuleClassifier, RuleMatch, TwoTierClassifier};
pub use server::{status_for, AppState, GatewayServer, HealthResponse};
