use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::types::{DocumentFormat, Intent};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub agent: AgentConfig,
    pub classifier: ClassifierConfig,
    pub cache: CacheConfig,
    pub dispatcher: DispatcherConfig,
    pub skills: SkillsConfig,
    pub store: StoreConfig,
    pub knowledge: KnowledgeConfig,
    pub mcp: McpConfig,
    pub model_gateway: ModelGatewayConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8004,
            enable_cors: true,
        }
    }
}

/// Identity published on the agent card.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub name: String,
    pub description: String,
    /// Public base URL; derived from the bind address when unset.
    pub public_url: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "Document Agent".to_string(),
            description: "Generates HTML and Markdown documents, searches the web, \
                          summarizes URLs and answers questions."
                .to_string(),
            public_url: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub max_question_chars: usize,
    pub model_timeout_ms: u64,
    pub model_max_tokens: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_question_chars: 4000,
            model_timeout_ms: 10_000,
            model_max_tokens: 20,
        }
    }
}

impl ClassifierConfig {
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 600,
            max_entries: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DispatcherConfig {
    pub generation_timeout_ms: u64,
    pub tool_timeout_ms: u64,
    pub knowledge_timeout_ms: u64,
    pub conversation_timeout_ms: u64,
    pub max_context_entries: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            generation_timeout_ms: 60_000,
            tool_timeout_ms: 45_000,
            knowledge_timeout_ms: 30_000,
            conversation_timeout_ms: 20_000,
            max_context_entries: 64,
        }
    }
}

impl DispatcherConfig {
    /// Handler timeout for an intent.
    pub fn timeout_for(&self, intent: Intent) -> Duration {
        let ms = match intent {
            Intent::DocumentGeneration => self.generation_timeout_ms,
            Intent::WebSearch | Intent::UrlSummary => self.tool_timeout_ms,
            Intent::KnowledgeQa => self.knowledge_timeout_ms,
            Intent::GeneralQa => self.conversation_timeout_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Tool names and limits used by skill handlers.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SkillsConfig {
    pub web_search_tool: String,
    pub url_summary_tool: String,
    pub convert_tool: String,
    pub max_search_results: u32,
    pub tool_call_timeout_ms: u64,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            web_search_tool: "web-search".to_string(),
            url_summary_tool: "summarize-content".to_string(),
            convert_tool: "pandoc_convert".to_string(),
            max_search_results: 5,
            tool_call_timeout_ms: 30_000,
        }
    }
}

impl SkillsConfig {
    pub fn tool_call_timeout(&self) -> Duration {
        Duration::from_millis(self.tool_call_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub output_dir: PathBuf,
    pub default_format: DocumentFormat,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
            default_format: DocumentFormat::Html,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub top_k: usize,
    /// Qdrant endpoint; the built-in knowledge base is used alone when unset.
    pub qdrant_url: Option<String>,
    pub collection: String,
    pub vector_size: u64,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            qdrant_url: None,
            collection: "agent_knowledge".to_string(),
            vector_size: 1536,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct McpConfig {
    /// Path of the `mcpServers` JSON file.
    pub config_path: PathBuf,
    pub health_check_timeout_ms: u64,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("mcpserver.json"),
            health_check_timeout_ms: 5_000,
        }
    }
}

impl McpConfig {
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelGatewayConfig {
    /// `openai` or `anthropic`; API keys are read from the provider's usual variable.
    pub provider: String,
    pub model: String,
}

impl Default for ModelGatewayConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetryConfig {
    pub json_logs: bool,
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("DOC_AGENT_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map APP__SERVER__PORT=3000 to server.port
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Base URL advertised on the agent card.
    pub fn public_url(&self) -> String {
        self.agent
            .public_url
            .clone()
            .unwrap_or_else(|| format!("http://{}:{}", self.server.host, self.server.port))
    }
}
