// apps/a4s-core/src/runtime/mod.rs
// Purpose: Container-runtime driver contract (C1).
// Architecture: Runtime Driver
// Dependencies: async-trait

mod docker;
mod null;

pub use docker::BollardRuntimeDriver;
pub use null::NullRuntimeDriver;

use async_trait::async_trait;

use crate::models::{AgentModel, AgentStatus};

#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub agent_id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    pub image: String,
    pub port: u16,
    pub model: AgentModel,
    pub instruction: String,
    pub tools: Vec<String>,
    pub mcp_tool_filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("image not found: {0}")]
    ImageNotFound(String),
    #[error("failed to spawn container: {0}")]
    SpawnError(String),
    #[error("container not found: {0}")]
    NotFound(String),
}

/// Thin, synchronous-in-spirit adapter over a container daemon: pull, start,
/// stop, list, status. The driver is stateless beyond its daemon connection.
#[async_trait]
pub trait RuntimeDriver: Send + Sync {
    async fn ensure_network(&self) -> Result<(), RuntimeError>;
    async fn spawn(&self, request: SpawnRequest) -> Result<(), RuntimeError>;
    async fn stop(&self, container_name: &str) -> Result<(), RuntimeError>;
    async fn list(&self) -> Result<Vec<String>, RuntimeError>;
    async fn status(&self, container_name: &str) -> Result<AgentStatus, RuntimeError>;
    async fn close(&self) {}
}

/// Maps a Docker container state string to the core's status vocabulary,
/// per the fixed table in spec.md §4.1.
pub fn map_docker_status(state: &str) -> AgentStatus {
    match state {
        "created" | "restarting" => AgentStatus::Pending,
        "running" | "paused" => AgentStatus::Running,
        "removing" | "exited" => AgentStatus::Stopped,
        "dead" => AgentStatus::Error,
        _ => AgentStatus::Error,
    }
}
