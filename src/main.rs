//! doc-agent - document generation agent.
//!
//! Routes natural-language requests to document generation, web search, URL
//! summarization, knowledge Q&A or direct answers, and serves them over HTTP.

use std::sync::Arc;
use std::time::Duration;

use doc_agent_controller::{
    default_prompts, CapabilityRegistry, Dispatcher, DocumentHandler, GeneralQaHandler, KnowledgeHandler,
    UrlSummaryHandler, WebSearchHandler,
};
use doc_agent_core::config::AppConfig;
use doc_agent_core::traits::{ClassificationCache, KnowledgeStore, LlmClient, ToolInvoker};
use doc_agent_core::types::Intent;
use doc_agent_gateway::{AgentCard, GatewayServer, LlmModelClassifier, MokaClassificationCache, TwoTierClassifier};
use doc_agent_skills::McpRegistry;
use doc_agent_store::{BuiltinKnowledgeBase, FallbackKnowledgeStore, FileDocumentStore, QdrantKnowledgeStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    doc_agent_governance::configure_tracing(config.telemetry.json_logs)?;

    tracing::info!("Starting doc-agent v{}", env!("CARGO_PKG_VERSION"));

    let metrics_handle = if config.telemetry.metrics_enabled {
        Some(doc_agent_governance::setup_metrics_recorder()?)
    } else {
        None
    };

    // =========================================================================
    // Model
    // =========================================================================
    let llm: Arc<dyn LlmClient> = Arc::new(doc_agent_model_gateway::create_client_from_config(&config.model_gateway)?);

    // =========================================================================
    // Tool servers
    // =========================================================================
    let mcp = McpRegistry::load(&config.mcp.config_path).await?;
    tracing::info!(servers = mcp.len(), path = %config.mcp.config_path.display(), "Tool server registry loaded");
    let adapter = Arc::new(mcp.connect_all(config.mcp.health_check_timeout()).await);
    let availability = adapter.availability();
    for server in availability.servers() {
        if server.available {
            tracing::info!(server = %server.name, tools = ?server.tools, "Tool server available");
        } else {
            tracing::warn!(server = %server.name, detail = ?server.detail, "Tool server unavailable");
        }
    }
    let tools: Arc<dyn ToolInvoker> = adapter.clone();

    // =========================================================================
    // Stores
    // =========================================================================
    let builtin = Arc::new(BuiltinKnowledgeBase::agent_defaults());
    let knowledge: Arc<dyn KnowledgeStore> = match &config.knowledge.qdrant_url {
        Some(url) => {
            let connected = QdrantKnowledgeStore::connect(&config.knowledge, url, llm.clone(), builtin.docs()).await;
            match connected {
                Ok(qdrant) => {
                    tracing::info!(url = %url, collection = %config.knowledge.collection, "Using Qdrant knowledge store");
                    Arc::new(FallbackKnowledgeStore::new(Arc::new(qdrant), builtin))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Qdrant unavailable, using built-in knowledge base");
                    builtin
                }
            }
        }
        None => builtin,
    };

    let documents = Arc::new(FileDocumentStore::new(&config.store.output_dir));
    tracing::info!(dir = %documents.root().display(), "Saving documents");

    // =========================================================================
    // Capabilities
    // =========================================================================
    let prompts = Arc::new(default_prompts()?);
    let skills = &config.skills;
    let tool_timeout = skills.tool_call_timeout();
    // Handlers finish a little before the dispatcher deadline so fallbacks still land.
    let budget = |intent: Intent| config.dispatcher.timeout_for(intent).saturating_sub(Duration::from_secs(2));

    let registry = CapabilityRegistry::builder()
        .with(Arc::new(GeneralQaHandler::new(llm.clone(), prompts.clone(), &config.agent.name)))?
        .with(Arc::new(
            DocumentHandler::new(llm.clone(), tools.clone(), documents, prompts.clone())
                .with_default_format(config.store.default_format)
                .with_convert_tool(&skills.convert_tool, tool_timeout)
                .with_budget(budget(Intent::DocumentGeneration)),
        ))?
        .with(Arc::new(
            WebSearchHandler::new(llm.clone(), tools.clone(), prompts.clone(), &skills.web_search_tool)
                .with_limits(skills.max_search_results as usize, tool_timeout)
                .with_budget(budget(Intent::WebSearch)),
        ))?
        .with(Arc::new(
            UrlSummaryHandler::new(llm.clone(), tools.clone(), prompts.clone(), &skills.url_summary_tool)
                .with_tool_timeout(tool_timeout)
                .with_budget(budget(Intent::UrlSummary)),
        ))?
        .with(Arc::new(
            KnowledgeHandler::new(llm.clone(), knowledge, prompts, &config.agent.name)
                .with_top_k(config.knowledge.top_k),
        ))?
        .build()?;
    let registry = Arc::new(registry);

    // =========================================================================
    // Classifier and dispatcher
    // =========================================================================
    let mut classifier = TwoTierClassifier::from_config(&config.classifier)
        .with_model(Arc::new(LlmModelClassifier::new(llm.clone(), &config.classifier)));
    if config.cache.enabled {
        let cache: Arc<dyn ClassificationCache> = Arc::new(MokaClassificationCache::from_config(&config.cache));
        classifier = classifier.with_cache(cache);
    }
    let classifier = Arc::new(classifier);

    let dispatcher = Arc::new(Dispatcher::new(
        classifier.clone(),
        registry.clone(),
        availability.clone(),
        config.dispatcher.clone(),
    ));

    // =========================================================================
    // HTTP
    // =========================================================================
    let card = AgentCard::build(&config, &registry.contracts(), &availability);
    let mut server = GatewayServer::new(config.server.clone(), classifier, dispatcher, availability, card);
    if let Some(handle) = metrics_handle {
        server = server.with_metrics(handle);
    }

    let served = server.run().await;
    adapter.shutdown().await;
    served?;

    tracing::info!("doc-agent stopped");
    Ok(())
}
