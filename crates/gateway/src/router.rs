//! Intent classification for incoming questions.
//!
//! Tier 1 is a set of keyword and pattern rules that never performs I/O.
//! Tier 2 asks a model, and only runs when no rule matched.

use std::sync::Arc;

use async_trait::async_trait;

use doc_agent_core::{
    config::ClassifierConfig,
    text::{find_url, normalize_query},
    traits::{ClassificationCache, IntentClassifier, ModelClassifier},
    types::{AgentRequest, ClassificationResult, ClassificationTier, Intent},
    Error, Result,
};
use doc_agent_governance::track_classification;

/// Verbs that ask for something to be produced.
const GENERATION_VERBS: &[&str] = &[
    "generate", "create", "write", "make", "draft", "produce", "compose", "prepare",
    "생성", "만들", "작성",
];

/// Output formats a document can be written in.
const FORMAT_KEYWORDS: &[&str] = &["html", "markdown", "md", "마크다운"];

/// Nouns naming a document-like artifact.
const DOCUMENT_NOUNS: &[&str] = &[
    "document", "doc", "report", "page", "web page", "webpage", "article", "guide",
    "manual", "tutorial", "readme", "summary sheet", "문서", "보고서", "페이지",
];

/// Search and recency vocabulary.
const SEARCH_KEYWORDS: &[&str] = &[
    "search", "look up", "lookup", "google", "latest", "recent", "news", "current",
    "today", "this week", "trending", "검색", "최신", "뉴스", "오늘",
];

/// Questions about the agent itself.
const SELF_REFERENCE_PHRASES: &[&str] = &[
    "what can you do", "who are you", "what are you", "your capabilities",
    "your features", "your skills", "introduce yourself", "what do you do",
    "how do you work", "너는 무엇", "에이전트 소개", "어떤 기능", "누구야",
];

/// Messages that are nothing but a greeting or courtesy.
const GREETINGS: &[&str] = &[
    "hello", "hi", "hey", "hello there", "hi there", "good morning", "good afternoon",
    "good evening", "thanks", "thank you", "thanks a lot", "bye", "goodbye",
    "안녕", "안녕하세요", "고마워", "감사합니다",
];

/// Confidence when exactly one rule matched.
const SINGLE_MATCH_CONFIDENCE: f32 = 0.9;
/// Confidence when the priority order had to break a tie.
const TIE_BREAK_CONFIDENCE: f32 = 0.75;

/// Question prepared for keyword matching.
struct Tokens {
    /// Lower-cased, whitespace-collapsed question.
    normalized: String,
    /// Alphanumeric words joined by single spaces.
    words: String,
    /// `words` padded with a space on both sides for whole-word search.
    padded: String,
}

impl Tokens {
    fn new(question: &str) -> Self {
        let normalized = normalize_query(question);
        let words = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let padded = format!(" {} ", words);
        Self {
            normalized,
            words,
            padded,
        }
    }

    /// Whole-word match for ASCII terms; substring match otherwise, since
    /// Korean attaches particles directly to the stem.
    fn has(&self, term: &str) -> bool {
        if term.is_ascii() {
            self.padded.contains(&format!(" {} ", term))
        } else {
            self.normalized.contains(term)
        }
    }

    fn first_of(&self, terms: &[&'static str]) -> Option<&'static str> {
        terms.iter().copied().find(|t| self.has(t))
    }
}

/// One rule that fired.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub intent: Intent,
    /// What triggered the rule.
    pub evidence: String,
}

/// Deterministic first tier.
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Every rule that matches, highest priority first.
    pub fn evaluate(&self, request: &AgentRequest) -> Vec<RuleMatch> {
        let question = request.trimmed_question();
        let tokens = Tokens::new(question);
        let mut matches = Vec::new();

        if let Some(url) = find_url(question) {
            matches.push(RuleMatch {
                intent: Intent::UrlSummary,
                evidence: url.url,
            });
        }

        if let Some(verb) = tokens.first_of(GENERATION_VERBS) {
            let target = tokens
                .first_of(FORMAT_KEYWORDS)
                .map(str::to_string)
                .or_else(|| request.format.map(|f| format!("format={}", f)))
                .or_else(|| tokens.first_of(DOCUMENT_NOUNS).map(str::to_string));
            if let Some(target) = target {
                matches.push(RuleMatch {
                    intent: Intent::DocumentGeneration,
                    evidence: format!("{} + {}", verb, target),
                });
            }
        }

        if let Some(term) = tokens.first_of(SEARCH_KEYWORDS) {
            matches.push(RuleMatch {
                intent: Intent::WebSearch,
                evidence: term.to_string(),
            });
        }

        if let Some(phrase) = tokens.first_of(SELF_REFERENCE_PHRASES) {
            matches.push(RuleMatch {
                intent: Intent::KnowledgeQa,
                evidence: phrase.to_string(),
            });
        }

        if GREETINGS.contains(&tokens.words.as_str()) {
            matches.push(RuleMatch {
                intent: Intent::GeneralQa,
                evidence: tokens.words.clone(),
            });
        }

        matches.sort_by_key(|m| m.intent.priority());
        matches
    }

    /// Winning rule, or `None` when nothing matched.
    pub fn classify(&self, request: &AgentRequest) -> Option<ClassificationResult> {
        let matches = self.evaluate(request);
        let winner = matches.first()?;
        let confidence = if matches.len() == 1 {
            SINGLE_MATCH_CONFIDENCE
        } else {
            TIE_BREAK_CONFIDENCE
        };
        let rationale = matches
            .iter()
            .map(|m| format!("{} ({})", m.intent, m.evidence))
            .collect::<Vec<_>>()
            .join(", ");

        Some(
            ClassificationResult::new(winner.intent, confidence, ClassificationTier::Rules)
                .with_rationale(format!("rules matched: {}", rationale)),
        )
    }
}

/// Rules first, then the model, behind an optional read-through cache.
pub struct TwoTierClassifier {
    rules: RuleClassifier,
    model: Option<Arc<dyn ModelClassifier>>,
    cache: Option<Arc<dyn ClassificationCache>>,
    max_question_chars: usize,
}

impl TwoTierClassifier {
    pub fn new(max_question_chars: usize) -> Self {
        Self {
            rules: RuleClassifier::new(),
            model: None,
            cache: None,
            max_question_chars,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.max_question_chars)
    }

    pub fn with_model(mut self, model: Arc<dyn ModelClassifier>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ClassificationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Requests with the same format and the same normalized question share a key.
    pub fn cache_key(request: &AgentRequest) -> String {
        let format = request.format.map(|f| f.as_str()).unwrap_or("-");
        format!("{}|{}", format, normalize_query(request.trimmed_question()))
    }

    async fn model_tier(&self, question: &str) -> ClassificationResult {
        let Some(model) = &self.model else {
            return ClassificationResult::new(Intent::GeneralQa, 0.5, ClassificationTier::Fallback)
                .with_rationale("no rule matched and no model is configured");
        };

        match model.classify_with_model(question).await {
            Ok(intent) => ClassificationResult::new(intent, 0.7, ClassificationTier::Model)
                .with_rationale(format!("model label {}", intent.label())),
            Err(e) => {
                tracing::warn!(error = %e, "Model classification failed, assuming general_qa");
                ClassificationResult::new(Intent::GeneralQa, 0.3, ClassificationTier::Fallback)
                    .with_rationale(format!("model unavailable: {}", e))
            }
        }
    }
}

#[async_trait]
impl IntentClassifier for TwoTierClassifier {
    async fn classify(&self, request: &AgentRequest) -> Result<ClassificationResult> {
        let question = request.trimmed_question();
        if question.is_empty() {
            return Err(Error::classification("question is empty"));
        }
        let chars = question.chars().count();
        if chars > self.max_question_chars {
            return Err(Error::classification(format!(
                "question is {} characters, at most {} allowed",
                chars, self.max_question_chars
            )));
        }

        let key = Self::cache_key(request);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&key).await {
                tracing::debug!(intent = %hit.intent, tier = hit.tier.as_str(), "Classification cache hit");
                track_classification(hit.tier.as_str(), true);
                return Ok(hit);
            }
        }

        let result = match self.rules.classify(request) {
            Some(result) => result,
            None => self.model_tier(question).await,
        };

        tracing::debug!(
            intent = %result.intent,
            tier = result.tier.as_str(),
            confidence = result.confidence,
            "Classified request"
        );
        track_classification(result.tier.as_str(), false);

        if result.is_cacheable() {
            if let Some(cache) = &self.cache {
                cache.insert(key, result.clone()).await;
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_agent_core::mocks::{MockClassificationCache, MockModelClassifier};
    use doc_agent_core::types::DocumentFormat;

    fn rules(question: &str) -> Option<Intent> {
        RuleClassifier::new()
            .classify(&AgentRequest::new(question))
            .map(|r| r.intent)
    }

    #[test]
    fn test_url_rule() {
        assert_eq!(rules("Summarize https://example.com/post please"), Some(Intent::UrlSummary));
        assert_eq!(rules("what does www.rust-lang.org say?"), Some(Intent::UrlSummary));
        assert_eq!(rules("I like example.com a lot"), None);
    }

    #[test]
    fn test_document_rule_needs_verb_and_target() {
        assert_eq!(rules("Generate an HTML page about Rust"), Some(Intent::DocumentGeneration));
        assert_eq!(rules("write a report on solar power"), Some(Intent::DocumentGeneration));
        assert_eq!(rules("마크다운 문서 작성해줘"), Some(Intent::DocumentGeneration));
        assert_eq!(rules("what is html"), None);
        assert_eq!(rules("make it faster"), None);
    }

    #[test]
    fn test_explicit_format_completes_document_rule() {
        let request = AgentRequest::new("create something about tides").with_format(DocumentFormat::Markdown);
        let result = RuleClassifier::new().classify(&request).unwrap();
        assert_eq!(result.intent, Intent::DocumentGeneration);
        assert!(result.rationale.unwrap().contains("format=markdown"));
    }

    #[test]
    fn test_search_knowledge_and_greeting_rules() {
        assert_eq!(rules("latest news on the Mars rover"), Some(Intent::WebSearch));
        assert_eq!(rules("What can you do?"), Some(Intent::KnowledgeQa));
        assert_eq!(rules("Hello!"), Some(Intent::GeneralQa));
        assert_eq!(rules("hello, explain ownership"), None);
    }

    #[test]
    fn test_whole_word_matching() {
        // "research" contains "search"
        assert_eq!(rules("research methods for biology"), None);
    }

    #[test]
    fn test_priority_breaks_ties() {
        let result = RuleClassifier::new()
            .classify(&AgentRequest::new("search for the latest on https://news.example.com"))
            .unwrap();
        assert_eq!(result.intent, Intent::UrlSummary);
        assert_eq!(result.confidence, TIE_BREAK_CONFIDENCE);

        let result = RuleClassifier::new()
            .classify(&AgentRequest::new("create a markdown report of today's news"))
            .unwrap();
        assert_eq!(result.intent, Intent::DocumentGeneration);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized() {
        let classifier = TwoTierClassifier::new(10);
        let err = classifier.classify(&AgentRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
        let err = classifier.classify(&AgentRequest::new("x".repeat(11))).await.unwrap_err();
        assert!(matches!(err, Error::Classification(_)));
        assert!(classifier.classify(&AgentRequest::new("x".repeat(10))).await.is_ok());
    }

    #[tokio::test]
    async fn test_model_only_consulted_without_rule_match() {
        let model = Arc::new(MockModelClassifier::returning(Intent::WebSearch));
        let classifier = TwoTierClassifier::new(4000).with_model(model.clone());

        let result = classifier.classify(&AgentRequest::new("hi")).await.unwrap();
        assert_eq!(result.tier, ClassificationTier::Rules);
        assert_eq!(model.call_count(), 0);

        let result = classifier
            .classify(&AgentRequest::new("how tall is the eiffel tower"))
            .await
            .unwrap();
        assert_eq!(result.intent, Intent::WebSearch);
        assert_eq!(result.tier, ClassificationTier::Model);
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_model_failure_falls_back_and_is_not_cached() {
        let model = Arc::new(MockModelClassifier::failing("model down"));
        let cache = Arc::new(MockClassificationCache::default());
        let classifier = TwoTierClassifier::new(4000)
            .with_model(model.clone())
            .with_cache(cache.clone());

        let result = classifier.classify(&AgentRequest::new("tell me about owls")).await.unwrap();
        assert_eq!(result.intent, Intent::GeneralQa);
        assert_eq!(result.tier, ClassificationTier::Fallback);
        assert!(cache.is_empty());

        classifier.classify(&AgentRequest::new("tell me about owls")).await.unwrap();
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cache_hit_skips_model() {
        let model = Arc::new(MockModelClassifier::returning(Intent::KnowledgeQa));
        let cache = Arc::new(MockClassificationCache::default());
        let classifier = TwoTierClassifier::new(4000)
            .with_model(model.clone())
            .with_cache(cache.clone());

        let first = classifier.classify(&AgentRequest::new("Tell me   about OWLS")).await.unwrap();
        let second = classifier.classify(&AgentRequest::new("tell me about owls")).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(model.call_count(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_key_includes_format() {
        let plain = TwoTierClassifier::cache_key(&AgentRequest::new("Owls"));
        let html = TwoTierClassifier::cache_key(&AgentRequest::new("owls").with_format(DocumentFormat::Html));
        assert_eq!(plain, "-|owls");
        assert_eq!(html, "html|owls");
    }
}
