// apps/a4s-core/src/memory.rs
// Purpose: Minimal memory-manager contract; out of scope beyond a no-op
// default so the lifespan hook and error mapping (permission denied,
// missing requester id) have a concrete home.
// Architecture: External collaborator facade
// Dependencies: async-trait

use async_trait::async_trait;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

#[async_trait]
pub trait MemoryManager: Send + Sync {
    async fn add(&self, owner_id: &str, content: Value) -> Result<(), MemoryError>;
    async fn search(&self, owner_id: &str, query: &str, limit: usize) -> Result<Vec<Value>, MemoryError>;
    async fn update(&self, owner_id: &str, id: &str, content: Value) -> Result<(), MemoryError>;
    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), MemoryError>;
    async fn close(&self) {}
}

/// Out-of-scope feature stub: accepts writes, never surfaces anything.
#[derive(Default)]
pub struct NoopMemoryManager;

#[async_trait]
impl MemoryManager for NoopMemoryManager {
    async fn add(&self, _owner_id: &str, _content: Value) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn search(&self, _owner_id: &str, _query: &str, _limit: usize) -> Result<Vec<Value>, MemoryError> {
        Ok(vec![])
    }

    async fn update(&self, _owner_id: &str, _id: &str, _content: Value) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn delete(&self, _owner_id: &str, _id: &str) -> Result<(), MemoryError> {
        Ok(())
    }
}
