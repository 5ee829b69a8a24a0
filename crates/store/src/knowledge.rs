//! Knowledge lookup backends.
//!
//! - `BuiltinKnowledgeBase`: keyword scoring over a static set of documents
//!   describing the agent itself. Always available.
//! - `EmbeddingKnowledgeStore`: in-memory cosine search over embeddings.
//! - `FallbackKnowledgeStore`: answers from a secondary store when the primary fails.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use doc_agent_core::{
    rank_hits,
    traits::{KnowledgeStore, LlmClient},
    KnowledgeDoc, KnowledgeHit, Result,
};

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "am", "do", "does", "can", "you", "your", "i", "me", "my",
    "what", "which", "who", "how", "of", "to", "in", "on", "for", "and", "or", "it", "be", "about",
];

fn keywords(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2 && !STOPWORDS.contains(w))
        .map(str::to_string)
        .collect()
}

/// Static knowledge about the agent, searched by keyword overlap.
#[derive(Debug, Clone)]
pub struct BuiltinKnowledgeBase {
    docs: Vec<KnowledgeDoc>,
}

impl BuiltinKnowledgeBase {
    pub fn from_docs(docs: Vec<KnowledgeDoc>) -> Self {
        Self { docs }
    }

    /// Self-description of the agent's skills and design.
    pub fn agent_defaults() -> Self {
        Self::from_docs(default_docs())
    }

    pub fn docs(&self) -> &[KnowledgeDoc] {
        &self.docs
    }

    /// Fraction of the query's keywords found in each document.
    fn score(&self, query: &str) -> Vec<KnowledgeHit> {
        let wanted = keywords(query);
        if wanted.is_empty() {
            return Vec::new();
        }

        self.docs
            .iter()
            .filter_map(|doc| {
                let have = keywords(&doc.text);
                let matched = wanted.iter().filter(|w| have.contains(*w)).count();
                (matched > 0).then(|| KnowledgeHit::from_doc(doc, matched as f32 / wanted.len() as f32))
            })
            .collect()
    }
}

#[async_trait]
impl KnowledgeStore for BuiltinKnowledgeBase {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>> {
        let hits = rank_hits(self.score(query), top_k);
        tracing::debug!(hits = hits.len(), "Built-in knowledge search");
        Ok(hits)
    }
}

fn default_docs() -> Vec<KnowledgeDoc> {
    let entries: &[(&str, &str, &str)] = &[
        ("identity-1", "identity", "I am a document agent. I generate documents, search the web, summarize web pages and answer questions, routing every request to the skill that fits it best."),
        ("capability-html", "capabilities", "HTML document generation: I write complete, styled HTML5 documents such as web pages, reports and guides, and save them as files."),
        ("capability-markdown", "capabilities", "Markdown document generation: I write clean Markdown documents such as technical notes, manuals and blog posts, and save them as files."),
        ("capability-url", "capabilities", "URL summary: give me a link and I read the page through a summarization tool, then answer your question about its content."),
        ("capability-search", "capabilities", "Web search: I look up recent news and current information on the web and cite the sources I used."),
        ("capability-knowledge", "capabilities", "Knowledge questions: I answer questions about myself, my skills and how I work from my own knowledge base."),
        ("capability-general", "capabilities", "General conversation: I answer everyday questions and chat naturally when no special skill is needed."),
        ("skills-overview", "skills_overview", "My skills are document generation (HTML, Markdown, plain text), web search, URL summary, knowledge questions about the agent, and general question answering."),
        ("technology", "technology", "I am built in Rust with an HTTP interface, a rule-based and model-based request classifier, external tool servers speaking the Model Context Protocol, and an optional vector database for knowledge search."),
        ("feature-saving", "features", "Generated documents are saved immediately with a timestamped file name so they can be downloaded later."),
        ("feature-degrade", "features", "When an external tool is unavailable I still answer directly from the language model and tell you the answer may be less current."),
    ];

    entries
        .iter()
        .map(|(id, category, text)| KnowledgeDoc::new(*id, *text).with_category(*category))
        .collect()
}

// =============================================================================
// Embedding store
// =============================================================================

/// In-memory vector index using an `LlmClient` for embeddings.
pub struct EmbeddingKnowledgeStore {
    embedder: Arc<dyn LlmClient>,
    entries: RwLock<Vec<(KnowledgeDoc, Vec<f32>)>>,
}

impl EmbeddingKnowledgeStore {
    pub fn new(embedder: Arc<dyn LlmClient>) -> Self {
        Self {
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Embed and add documents.
    pub async fn index(&self, docs: Vec<KnowledgeDoc>) -> Result<usize> {
        let mut embedded = Vec::with_capacity(docs.len());
        for doc in docs {
            let vector = self.embedder.embed(&doc.text).await?;
            embedded.push((doc, vector));
        }
        let count = embedded.len();
        self.entries.write().await.extend(embedded);
        Ok(count)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Cosine similarity; 0 for mismatched or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl KnowledgeStore for EmbeddingKnowledgeStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>> {
        let query_vector = self.embedder.embed(query).await?;
        let entries = self.entries.read().await;
        let hits = entries
            .iter()
            .map(|(doc, vector)| KnowledgeHit::from_doc(doc, cosine_similarity(&query_vector, vector)))
            .filter(|hit| hit.score > 0.0)
            .collect();
        Ok(rank_hits(hits, top_k))
    }
}

// =============================================================================
// Fallback
// =============================================================================

/// Uses `primary`, switching to `fallback` for any request the primary fails.
pub struct FallbackKnowledgeStore {
    primary: Arc<dyn KnowledgeStore>,
    fallback: Arc<dyn KnowledgeStore>,
}

impl FallbackKnowledgeStore {
    pub fn new(primary: Arc<dyn KnowledgeStore>, fallback: Arc<dyn KnowledgeStore>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl KnowledgeStore for FallbackKnowledgeStore {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>> {
        match self.primary.search(query, top_k).await {
            Ok(hits) => Ok(hits),
            Err(e) => {
                tracing::warn!(error = %e, "Primary knowledge store failed, using fallback");
                self.fallback.search(query, top_k).await
            }
        }
    }
}
