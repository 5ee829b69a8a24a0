//! Agent card served at `/.well-known/agent.json`.

use serde::{Deserialize, Serialize};

use doc_agent_core::{
    config::AppConfig,
    types::{HandlerContract, OutputShape, ToolAvailability},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub streaming: bool,
    pub push_notifications: bool,
    pub state_transition_history: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

/// Self-description other agents use for discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    pub version: String,
    pub default_input_modes: Vec<String>,
    pub default_output_modes: Vec<String>,
    pub capabilities: AgentCapabilities,
    pub skills: Vec<AgentSkill>,
}

impl AgentCard {
    /// One skill per registered handler, then one per available tool server.
    pub fn build(config: &AppConfig, contracts: &[HandlerContract], tools: &ToolAvailability) -> Self {
        let mut skills: Vec<AgentSkill> = contracts.iter().map(skill_from_contract).collect();

        skills.extend(tools.servers().filter(|s| s.available).map(|server| AgentSkill {
            id: format!("mcp_{}", server.name.replace('-', "_")),
            name: format!("{} tools", server.name),
            description: format!("External tools: {}", server.tools.join(", ")),
            tags: vec!["mcp".to_string(), server.name.clone()],
            examples: Vec::new(),
        }));

        Self {
            name: config.agent.name.clone(),
            description: config.agent.description.clone(),
            url: config.public_url(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_input_modes: vec!["text".to_string(), "text/plain".to_string()],
            default_output_modes: vec!["text".to_string(), "application/json".to_string()],
            capabilities: AgentCapabilities {
                streaming: false,
                push_notifications: false,
                state_transition_history: false,
            },
            skills,
        }
    }
}

fn skill_from_contract(contract: &HandlerContract) -> AgentSkill {
    let mut tags = vec![contract.intent.as_str().to_string()];
    if contract.output == OutputShape::Document {
        tags.push("document".to_string());
    }
    tags.extend(contract.required_tools.iter().cloned());

    AgentSkill {
        id: contract.intent.as_str().to_string(),
        name: contract.name.clone(),
        description: contract.description.clone(),
        tags,
        examples: contract.examples.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_agent_core::types::{Intent, ServerStatus};

    #[test]
    fn test_card_lists_handlers_and_live_servers() {
        let contracts = vec![
            HandlerContract::new(Intent::GeneralQa, "General Q&A", "Direct answers"),
            HandlerContract::new(Intent::WebSearch, "Web Search", "Answers from the web")
                .requires_tool("web-search")
                .with_example("latest rust release"),
        ];
        let tools = ToolAvailability::empty()
            .with_server(ServerStatus::available("webresearch", vec!["web-search".into()]))
            .with_server(ServerStatus::unavailable("mcp-pandoc", vec![], "spawn failed"));

        let card = AgentCard::build(&AppConfig::default(), &contracts, &tools);

        let ids: Vec<&str> = card.skills.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["general_qa", "web_search", "mcp_webresearch"]);
        assert!(card.skills[1].tags.contains(&"web-search".to_string()));

        let json = serde_json::to_value(&card).unwrap();
        assert!(json.get("defaultInputModes").is_some());
        assert_eq!(json["capabilities"]["streaming"], false);
    }
}
