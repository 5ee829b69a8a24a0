use serde::{Deserialize, Serialize};

// =============================================================================
// Intent Types
// =============================================================================

/// Closed set of skills the agent can route a request to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DocumentGeneration,
    WebSearch,
    UrlSummary,
    KnowledgeQa,
    GeneralQa,
}

impl Intent {
    /// Every intent, highest priority first.
    pub const BY_PRIORITY: [Intent; 5] = [
        Intent::UrlSummary,
        Intent::DocumentGeneration,
        Intent::WebSearch,
        Intent::KnowledgeQa,
        Intent::GeneralQa,
    ];

    /// Tie-break rank; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            Intent::UrlSummary => 0,
            Intent::DocumentGeneration => 1,
            Intent::WebSearch => 2,
            Intent::KnowledgeQa => 3,
            Intent::GeneralQa => 4,
        }
    }

    /// Identifier used in logs, metrics and agent cards.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::DocumentGeneration => "document_generation",
            Intent::WebSearch => "web_search",
            Intent::UrlSummary => "url_summary",
            Intent::KnowledgeQa => "knowledge_qa",
            Intent::GeneralQa => "general_qa",
        }
    }

    /// Upper-case label a model is asked to answer with.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::DocumentGeneration => "DOCUMENT_GENERATION",
            Intent::WebSearch => "WEB_SEARCH",
            Intent::UrlSummary => "URL_SUMMARY",
            Intent::KnowledgeQa => "KNOWLEDGE_QA",
            Intent::GeneralQa => "GENERAL_QA",
        }
    }

    /// Parse a model label. Legacy labels from the first-generation router
    /// are accepted as aliases.
    pub fn from_label(label: &str) -> Option<Intent> {
        match label {
            "DOCUMENT_GENERATION" | "HTML_GENERATION" | "MARKDOWN_GENERATION" => {
                Some(Intent::DocumentGeneration)
            }
            "WEB_SEARCH" => Some(Intent::WebSearch),
            "URL_SUMMARY" | "URL_QA" => Some(Intent::UrlSummary),
            "KNOWLEDGE_QA" | "RAG_QA" => Some(Intent::KnowledgeQa),
            "GENERAL_QA" => Some(Intent::GeneralQa),
            _ => None,
        }
    }

    /// Whether a failure may fall back to a direct model answer.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Intent::WebSearch | Intent::UrlSummary | Intent::KnowledgeQa
        )
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationTier {
    /// Deterministic keyword and pattern rules.
    Rules,
    /// Model-based classification.
    Model,
    /// Neither tier produced an answer; GeneralQa was assumed.
    Fallback,
}

impl ClassificationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationTier::Rules => "rules",
            ClassificationTier::Model => "model",
            ClassificationTier::Fallback => "fallback",
        }
    }
}

/// Outcome of classifying one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: Intent,
    /// Informational score in [0, 1].
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    pub tier: ClassificationTier,
}

impl ClassificationResult {
    pub fn new(intent: Intent, confidence: f32, tier: ClassificationTier) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            rationale: None,
            tier,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Fallback results reflect a failing collaborator and must not be reused.
    pub fn is_cacheable(&self) -> bool {
        self.tier != ClassificationTier::Fallback
    }
}
