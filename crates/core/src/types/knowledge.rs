use serde::{Deserialize, Serialize};

/// A piece of reference knowledge the agent can answer from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeDoc {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl KnowledgeDoc {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One knowledge search match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub text: String,
    pub score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl KnowledgeHit {
    pub fn from_doc(doc: &KnowledgeDoc, score: f32) -> Self {
        Self {
            text: doc.text.clone(),
            score,
            category: doc.category.clone(),
        }
    }
}

/// Sort hits best-first and keep at most `top_k`.
pub fn rank_hits(mut hits: Vec<KnowledgeHit>, top_k: usize) -> Vec<KnowledgeHit> {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(top_k);
    hits
}
