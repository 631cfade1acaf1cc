// apps/a4s-core/src/app_state.rs
// Purpose: Wires C1-C6 into the shared Axum state, and owns lifespan
// construction/teardown order (C7).
// Architecture: Lifespan & surface
// Dependencies: axum, reqwest

use std::sync::Arc;

use chrono::Utc;

use crate::channel::ChannelOrchestrator;
use crate::config::Settings;
use crate::error::AppError;
use crate::models::{Agent, AgentMode, AgentModel, AgentStatus, SpawnConfig};
use crate::registry::{AgentRegistry, ChannelRegistry, InMemoryAgentRegistry, InMemoryChannelRegistry};
use crate::runtime::{BollardRuntimeDriver, RuntimeDriver};
use crate::scheduler::AgentScheduler;
use crate::memory::{MemoryManager, NoopMemoryManager};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub agent_registry: Arc<dyn AgentRegistry>,
    pub channel_registry: Arc<dyn ChannelRegistry>,
    pub runtime: Arc<dyn RuntimeDriver>,
    pub scheduler: Arc<AgentScheduler>,
    pub channels: Arc<ChannelOrchestrator>,
    pub memory: Arc<dyn MemoryManager>,
    pub http_client: reqwest::Client,
    pub proxy_client: reqwest::Client,
}

impl AppState {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let settings = Arc::new(settings);

        let agent_registry: Arc<dyn AgentRegistry> = Arc::new(InMemoryAgentRegistry::new());
        let channel_registry: Arc<dyn ChannelRegistry> = Arc::new(InMemoryChannelRegistry::new());
        let memory: Arc<dyn MemoryManager> = Arc::new(NoopMemoryManager::default());

        let runtime: Arc<dyn RuntimeDriver> = Arc::new(BollardRuntimeDriver::connect(
            &settings.docker_base_url,
            settings.agent_network.clone(),
            settings.api_base_url.clone(),
            settings.agent_gateway_url.clone(),
        )?);
        runtime.ensure_network().await?;

        let scheduler = Arc::new(AgentScheduler::new(
            agent_registry.clone(),
            runtime.clone(),
            settings.idle_timeout(),
            settings.reaper_interval(),
        ));
        scheduler.start().await;

        let channels = Arc::new(ChannelOrchestrator::new(
            agent_registry.clone(),
            scheduler.clone(),
            settings.backbone_agent_id.clone(),
        ));

        let proxy_client = reqwest::Client::builder()
            .timeout(crate::server::proxy::PROXY_TOTAL_TIMEOUT)
            .connect_timeout(crate::server::proxy::PROXY_CONNECT_TIMEOUT)
            .build()?;

        let state = Self {
            settings,
            agent_registry,
            channel_registry,
            runtime,
            scheduler,
            channels,
            memory,
            http_client: reqwest::Client::new(),
            proxy_client,
        };

        state.ensure_backbone_agent().await?;

        Ok(state)
    }

    /// Registers the backbone router agent if it isn't already present,
    /// per spec.md §4.7 / §3 (Backbone agent).
    async fn ensure_backbone_agent(&self) -> Result<(), AppError> {
        let id = self.settings.backbone_agent_id.clone();
        if self.agent_registry.get(&id).await.is_ok() {
            tracing::info!(agent_id = %id, "backbone agent already registered");
            return Ok(());
        }

        let container_name = format!("a4s-agent-{id}");
        let agent = Agent {
            id: id.clone(),
            name: "backbone-router".to_string(),
            description: "Routes user messages to the most relevant agents in a channel".to_string(),
            version: "1.0.0".to_string(),
            url: format!("http://{container_name}:8000"),
            port: 8000,
            owner_id: "system".to_string(),
            status: AgentStatus::Pending,
            created_at: Utc::now(),
            mode: AgentMode::Permanent,
            spawn_config: Some(SpawnConfig {
                image: self.settings.backbone_agent_image.clone(),
                model: AgentModel {
                    provider: self.settings.backbone_agent_model_provider,
                    model_id: self.settings.backbone_agent_model_id.clone(),
                },
                instruction: "Instruction managed via container environment".to_string(),
                tools: vec![],
                mcp_tool_filter: "search_agents,send_a2a_message".to_string(),
            }),
        };

        self.agent_registry
            .register(agent)
            .await
            .map_err(|e| AppError::RegistryError(e.to_string()))?;
        tracing::info!(agent_id = %id, "registered backbone agent");
        Ok(())
    }

    /// Shutdown in the order spec.md §4.7 mandates: scheduler, registries,
    /// runtime driver, memory manager.
    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.agent_registry.close().await;
        self.channel_registry.close().await;
        self.runtime.close().await;
        self.memory.close().await;
    }
}
