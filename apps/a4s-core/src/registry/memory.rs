// apps/a4s-core/src/registry/memory.rs
// Purpose: In-memory default AgentRegistry impl.
// Architecture: Registry Facade (C4)
// Dependencies: dashmap

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::Agent;

use super::{AgentRegistry, RegistryError};

/// `DashMap`-backed registry. `search` is a naive token-overlap ranking over
/// name/description — a stand-in for the vector-store-backed search the
/// contract only requires to tolerate irrelevant hits, not to be exact.
#[derive(Default)]
pub struct InMemoryAgentRegistry {
    agents: DashMap<String, Agent>,
}

impl InMemoryAgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn overlap_score(query: &str, haystack: &str) -> usize {
    let query_tokens: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
    let haystack_lower = haystack.to_lowercase();
    query_tokens
        .iter()
        .filter(|t| haystack_lower.contains(t.as_str()))
        .count()
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn get(&self, id: &str) -> Result<Agent, RegistryError> {
        self.agents
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotRegistered(id.to_string()))
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Agent>, RegistryError> {
        let mut all: Vec<Agent> = self.agents.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Agent>, RegistryError> {
        let mut scored: Vec<(usize, Agent)> = self
            .agents
            .iter()
            .map(|entry| {
                let agent = entry.value().clone();
                let haystack = format!("{} {}", agent.name, agent.description);
                (overlap_score(query, &haystack), agent)
            })
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, a)| a).collect())
    }

    async fn register(&self, agent: Agent) -> Result<(), RegistryError> {
        self.agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    async fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        self.agents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RegistryError::NotRegistered(id.to_string()))
    }
}
