// apps/a4s-core/src/registry/channel_memory.rs
// Purpose: In-memory default ChannelRegistry impl.
// Architecture: Registry Facade (C4)
// Dependencies: dashmap

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::Channel;

use super::{ChannelRegistry, ChannelRegistryError};

#[derive(Default)]
pub struct InMemoryChannelRegistry {
    channels: DashMap<String, Channel>,
}

impl InMemoryChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelRegistry for InMemoryChannelRegistry {
    async fn create(&self, channel: Channel) -> Result<Channel, ChannelRegistryError> {
        self.channels.insert(channel.id.clone(), channel.clone());
        Ok(channel)
    }

    async fn get(&self, id: &str) -> Result<Channel, ChannelRegistryError> {
        self.channels
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ChannelRegistryError::NotFound(id.to_string()))
    }

    async fn list(&self, offset: usize, limit: usize) -> Result<Vec<Channel>, ChannelRegistryError> {
        let mut all: Vec<Channel> = self.channels.iter().map(|entry| entry.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all.into_iter().skip(offset).take(limit).collect())
    }

    async fn update(&self, channel: Channel) -> Result<Channel, ChannelRegistryError> {
        if !self.channels.contains_key(&channel.id) {
            return Err(ChannelRegistryError::NotFound(channel.id));
        }
        self.channels.insert(channel.id.clone(), channel.clone());
        Ok(channel)
    }

    async fn delete(&self, id: &str) -> Result<(), ChannelRegistryError> {
        self.channels
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ChannelRegistryError::NotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_channel(id: &str) -> Channel {
        let now = Utc::now();
        Channel {
            id: id.to_string(),
            name: "test".to_string(),
            description: String::new(),
            agent_ids: vec![],
            owner_id: "owner".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn get_unknown_channel_is_not_found() {
        let registry = InMemoryChannelRegistry::new();
        let err = registry.get("missing").await.unwrap_err();
        assert!(matches!(err, ChannelRegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn create_then_update_round_trips() {
        let registry = InMemoryChannelRegistry::new();
        let channel = registry.create(make_channel("c1")).await.unwrap();
        let mut updated = channel.clone();
        updated.name = "renamed".to_string();
        registry.update(updated.clone()).await.unwrap();
        let fetched = registry.get("c1").await.unwrap();
        assert_eq!(fetched.name, "renamed");
    }

    #[tokio::test]
    async fn update_unknown_channel_fails() {
        let registry = InMemoryChannelRegistry::new();
        let err = registry.update(make_channel("missing")).await.unwrap_err();
        assert!(matches!(err, ChannelRegistryError::NotFound(_)));
    }
}
