// apps/a4s-core/src/registry/mod.rs
// Purpose: Read-mostly facade over agent/channel metadata storage.
// Architecture: Registry Facade (C4)
// Dependencies: async-trait, dashmap

mod channel_memory;
mod memory;

pub use channel_memory::InMemoryChannelRegistry;
pub use memory::InMemoryAgentRegistry;

use async_trait::async_trait;

use crate::models::{Agent, Channel};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("agent not registered: {0}")]
    NotRegistered(String),
    #[error("registry connection error: {0}")]
    ConnectionError(String),
}

/// Contract the core consumes for agent metadata. A real deployment backs
/// this with a vector store for `search`; the in-memory default here is
/// sufficient to exercise the contract and is not itself semantic search.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    async fn get(&self, id: &str) -> Result<Agent, RegistryError>;
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Agent>, RegistryError>;
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Agent>, RegistryError>;
    async fn register(&self, agent: Agent) -> Result<(), RegistryError>;
    async fn unregister(&self, id: &str) -> Result<(), RegistryError>;
    async fn close(&self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelRegistryError {
    #[error("channel not found: {0}")]
    NotFound(String),
    #[error("channel registry connection error: {0}")]
    ConnectionError(String),
}

#[async_trait]
pub trait ChannelRegistry: Send + Sync {
    async fn create(&self, channel: Channel) -> Result<Channel, ChannelRegistryError>;
    async fn get(&self, id: &str) -> Result<Channel, ChannelRegistryError>;
    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Channel>, ChannelRegistryError>;
    async fn update(&self, channel: Channel) -> Result<Channel, ChannelRegistryError>;
    async fn delete(&self, id: &str) -> Result<(), ChannelRegistryError>;
    async fn close(&self) {}
}
