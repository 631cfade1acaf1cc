// apps/a4s-core/src/runtime/null.rs
// Purpose: In-memory RuntimeDriver standing in for a Docker daemon in tests.
// Architecture: Runtime Driver (C1)
// Dependencies: dashmap

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::AgentStatus;

use super::{RuntimeDriver, RuntimeError, SpawnRequest};

/// Tracks spawn counts per container name so tests can assert
/// serializability of cold start (spec.md §8 property 1) without a daemon.
#[derive(Default)]
pub struct NullRuntimeDriver {
    containers: DashMap<String, AgentStatus>,
    spawn_counts: DashMap<String, usize>,
    fail_images: DashMap<String, ()>,
}

impl NullRuntimeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn_count(&self, container_name: &str) -> usize {
        self.spawn_counts.get(container_name).map(|v| *v).unwrap_or(0)
    }

    /// Makes the next `spawn` for this image fail with `ImageNotFound`.
    pub fn fail_image(&self, image: &str) {
        self.fail_images.insert(image.to_string(), ());
    }

    pub fn set_status(&self, container_name: &str, status: AgentStatus) {
        self.containers.insert(container_name.to_string(), status);
    }
}

#[async_trait]
impl RuntimeDriver for NullRuntimeDriver {
    async fn ensure_network(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    async fn spawn(&self, request: SpawnRequest) -> Result<(), RuntimeError> {
        if self.fail_images.remove(&request.image).is_some() {
            return Err(RuntimeError::ImageNotFound(request.image));
        }
        let container_name = format!("a4s-agent-{}", request.agent_id);
        *self.spawn_counts.entry(container_name.clone()).or_insert(0) += 1;
        self.containers.insert(container_name, AgentStatus::Running);
        Ok(())
    }

    async fn stop(&self, container_name: &str) -> Result<(), RuntimeError> {
        self.containers
            .remove(container_name)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotFound(container_name.to_string()))
    }

    async fn list(&self) -> Result<Vec<String>, RuntimeError> {
        Ok(self.containers.iter().map(|e| e.key().clone()).collect())
    }

    async fn status(&self, container_name: &str) -> Result<AgentStatus, RuntimeError> {
        self.containers
            .get(container_name)
            .map(|v| *v)
            .ok_or_else(|| RuntimeError::NotFound(container_name.to_string()))
    }
}
