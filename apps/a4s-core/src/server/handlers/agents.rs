// apps/a4s-core/src/server/handlers/agents.rs
// Purpose: Agent registry + lifecycle HTTP handlers (C4, part of C3/C1 surface).
// Architecture: Lifespan & surface
// Dependencies: axum, rand

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{Agent, AgentMode, AgentStatus, SpawnConfig};
use crate::runtime::SpawnRequest;

fn generate_agent_id(name: &str) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..5)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    format!("{slug}-{suffix}")
}

#[derive(Debug, Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub version: String,
    pub url: Option<String>,
    pub port: u16,
    pub owner_id: String,
    pub mode: AgentMode,
    pub spawn_config: Option<SpawnConfig>,
}

pub async fn register_agent(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterAgentRequest>,
) -> AppResult<(StatusCode, Json<Agent>)> {
    let id = generate_agent_id(&request.name);
    let container_name = format!("a4s-agent-{id}");
    let url = request
        .url
        .unwrap_or_else(|| format!("http://{container_name}:{}", request.port));

    let agent = Agent {
        id,
        name: request.name,
        description: request.description,
        version: request.version,
        url,
        port: request.port,
        owner_id: request.owner_id,
        status: AgentStatus::Pending,
        created_at: Utc::now(),
        mode: request.mode,
        spawn_config: request.spawn_config,
    };

    state
        .agent_registry
        .register(agent.clone())
        .await
        .map_err(|e| AppError::RegistryError(e.to_string()))?;

    tracing::info!(agent_id = %agent.id, "registered agent");
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn unregister_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .agent_registry
        .unregister(&id)
        .await
        .map_err(|_| AppError::AgentNotRegistered(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, 100)
}

pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Vec<Agent>>> {
    let agents = state
        .agent_registry
        .list(params.offset, clamp_limit(params.limit))
        .await
        .map_err(|e| AppError::RegistryError(e.to_string()))?;
    Ok(Json(agents))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub async fn search_agents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Agent>>> {
    let hits = state
        .agent_registry
        .search(&params.query, clamp_limit(params.limit))
        .await
        .map_err(|e| AppError::RegistryError(e.to_string()))?;
    let backbone_id = &state.settings.backbone_agent_id;
    Ok(Json(hits.into_iter().filter(|a| &a.id != backbone_id).collect()))
}

pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Agent>> {
    let agent = state
        .agent_registry
        .get(&id)
        .await
        .map_err(|_| AppError::AgentNotRegistered(id))?;
    Ok(Json(agent))
}

#[derive(Debug, Serialize)]
pub struct AgentStatusBody {
    pub agent_id: String,
    pub status: AgentStatus,
}

pub async fn start_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<AgentStatusBody>> {
    let agent = state
        .agent_registry
        .get(&id)
        .await
        .map_err(|_| AppError::AgentNotRegistered(id.clone()))?;

    let spawn_config = agent
        .spawn_config
        .clone()
        .ok_or_else(|| AppError::InvalidRequest(format!("agent {id} has no spawn_config")))?;

    state
        .runtime
        .spawn(SpawnRequest {
            agent_id: agent.id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            version: agent.version.clone(),
            image: spawn_config.image,
            port: agent.port,
            model: spawn_config.model,
            instruction: spawn_config.instruction,
            tools: spawn_config.tools,
            mcp_tool_filter: spawn_config.mcp_tool_filter,
        })
        .await?;

    Ok(Json(AgentStatusBody {
        agent_id: id,
        status: AgentStatus::Running,
    }))
}

pub async fn stop_agent(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<AgentStatusBody>> {
    let agent = state
        .agent_registry
        .get(&id)
        .await
        .map_err(|_| AppError::AgentNotRegistered(id.clone()))?;
    state.runtime.stop(&agent.container_name()).await?;
    Ok(Json(AgentStatusBody {
        agent_id: id,
        status: AgentStatus::Stopped,
    }))
}

pub async fn get_agent_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<AgentStatusBody>> {
    let agent = state
        .agent_registry
        .get(&id)
        .await
        .map_err(|_| AppError::AgentNotRegistered(id.clone()))?;
    let status = state.runtime.status(&agent.container_name()).await?;
    Ok(Json(AgentStatusBody { agent_id: id, status }))
}

pub async fn ensure_running(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.scheduler.ensure_running(&id).await?;
    Ok(StatusCode::OK)
}
