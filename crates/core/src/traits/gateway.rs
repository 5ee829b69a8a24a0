//! Classification traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{AgentRequest, ClassificationResult, Intent};

/// Maps a request to exactly one intent.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify a request. Fails only for empty or oversized questions.
    async fn classify(&self, request: &AgentRequest) -> Result<ClassificationResult>;
}

/// Model-backed second tier, consulted when no rule matches.
#[async_trait]
pub trait ModelClassifier: Send + Sync {
    /// Ask the model for a label. Unknown labels resolve to GeneralQa.
    async fn classify_with_model(&self, text: &str) -> Result<Intent>;
}

/// Read-through cache for classification results.
#[async_trait]
pub trait ClassificationCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<ClassificationResult>;

    async fn insert(&self, key: String, result: ClassificationResult);
}
