// apps/a4s-core/src/models.rs
// Purpose: Core data model shared by the registry facade, scheduler, runtime
// driver and channel orchestrator.
// Architecture: Shared Data Layer
// Dependencies: Serde, Chrono

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Openai,
    Anthropic,
    Google,
    Openrouter,
}

impl Default for ModelProvider {
    fn default() -> Self {
        ModelProvider::Google
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct AgentModel {
    #[serde(default)]
    pub provider: ModelProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
}

fn default_model_id() -> String {
    "gemini-3-flash-preview".to_string()
}

impl Default for AgentModel {
    fn default() -> Self {
        Self {
            provider: ModelProvider::default(),
            model_id: default_model_id(),
        }
    }
}

/// Everything the runtime driver needs to spawn a managed (containerized) agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpawnConfig {
    pub image: String,
    #[serde(default)]
    pub model: AgentModel,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub mcp_tool_filter: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Pending,
    Running,
    Stopped,
    Error,
}

/// Serverless agents are cold-started on demand and reaped when idle;
/// permanent agents (e.g. the backbone router) are assumed always running.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    Serverless,
    Permanent,
}

/// Identity of a registered AI agent.
///
/// `status` as stored in the registry is advisory only; the scheduler and
/// proxy always consult the runtime driver for the authoritative status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub url: String,
    pub port: u16,
    pub owner_id: String,
    #[serde(default = "default_status")]
    pub status: AgentStatus,
    pub created_at: DateTime<Utc>,
    pub mode: AgentMode,
    pub spawn_config: Option<SpawnConfig>,
}

fn default_status() -> AgentStatus {
    AgentStatus::Pending
}

impl Agent {
    pub fn container_name(&self) -> String {
        format!("a4s-agent-{}", self.id)
    }
}

/// A named, owned group of agent ids that chat messages fan out to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub agent_ids: Vec<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Channel {
    pub fn add_agent_ids(&mut self, ids: impl IntoIterator<Item = String>) {
        for id in ids {
            if !self.agent_ids.contains(&id) {
                self.agent_ids.push(id);
            }
        }
        self.updated_at = Utc::now();
    }

    pub fn remove_agent_ids(&mut self, ids: &[String]) {
        self.agent_ids.retain(|a| !ids.contains(a));
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_model_default_matches_backbone_defaults() {
        let model = AgentModel::default();
        assert_eq!(model.provider, ModelProvider::Google);
        assert_eq!(model.model_id, "gemini-3-flash-preview");
    }

    #[test]
    fn channel_add_agent_ids_is_idempotent() {
        let mut channel = Channel {
            id: "c1".into(),
            name: "test".into(),
            description: String::new(),
            agent_ids: vec!["a1".into()],
            owner_id: "u1".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        channel.add_agent_ids(vec!["a1".to_string(), "a2".to_string()]);
        assert_eq!(channel.agent_ids, vec!["a1".to_string(), "a2".to_string()]);
    }

    #[test]
    fn channel_remove_agent_ids_drops_only_named() {
        let mut channel = Channel {
            id: "c1".into(),
            name: "test".into(),
            description: String::new(),
            agent_ids: vec!["a1".into(), "a2".into(), "a3".into()],
            owner_id: "u1".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        channel.remove_agent_ids(&["a2".to_string()]);
        assert_eq!(channel.agent_ids, vec!["a1".to_string(), "a3".to_string()]);
    }
}
