// apps/a4s-core/src/server/handlers/channels.rs
// Purpose: Channel CRUD and chat HTTP handlers (C6).
// Architecture: Lifespan & surface
// Dependencies: axum, uuid

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use crate::app_state::AppState;
use crate::channel::ChannelChatResponse;
use crate::error::{AppError, AppResult};
use crate::models::{Agent, Channel};

use super::agents::PageParams;

fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, 100)
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: String,
    #[serde(default)]
    pub agent_ids: Vec<String>,
}

pub async fn create_channel(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateChannelRequest>,
) -> AppResult<(StatusCode, Json<Channel>)> {
    let now = Utc::now();
    let channel = Channel {
        id: uuid::Uuid::new_v4().to_string(),
        name: request.name,
        description: request.description,
        agent_ids: request.agent_ids,
        owner_id: request.owner_id,
        created_at: now,
        updated_at: now,
    };
    let created = state
        .channel_registry
        .create(channel)
        .await
        .map_err(|e| AppError::RegistryError(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_channels(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> AppResult<Json<Vec<Channel>>> {
    let channels = state
        .channel_registry
        .list(params.offset, clamp_limit(params.limit))
        .await
        .map_err(|e| AppError::RegistryError(e.to_string()))?;
    Ok(Json(channels))
}

pub async fn get_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Channel>> {
    let channel = state
        .channel_registry
        .get(&id)
        .await
        .map_err(|_| AppError::ChannelNotFound(id))?;
    Ok(Json(channel))
}

#[derive(Debug, Deserialize)]
pub struct UpdateChannelRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn update_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<UpdateChannelRequest>,
) -> AppResult<Json<Channel>> {
    let mut channel = state
        .channel_registry
        .get(&id)
        .await
        .map_err(|_| AppError::ChannelNotFound(id.clone()))?;

    if let Some(name) = request.name {
        channel.name = name;
    }
    if let Some(description) = request.description {
        channel.description = description;
    }
    channel.updated_at = Utc::now();

    let updated = state
        .channel_registry
        .update(channel)
        .await
        .map_err(|_| AppError::ChannelNotFound(id))?;
    Ok(Json(updated))
}

pub async fn delete_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state
        .channel_registry
        .delete(&id)
        .await
        .map_err(|_| AppError::ChannelNotFound(id))?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct AgentIdsRequest {
    pub agent_ids: Vec<String>,
}

pub async fn add_agents_to_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AgentIdsRequest>,
) -> AppResult<Json<Channel>> {
    let mut channel = state
        .channel_registry
        .get(&id)
        .await
        .map_err(|_| AppError::ChannelNotFound(id.clone()))?;
    channel.add_agent_ids(request.agent_ids);
    let updated = state
        .channel_registry
        .update(channel)
        .await
        .map_err(|_| AppError::ChannelNotFound(id))?;
    Ok(Json(updated))
}

pub async fn remove_agents_from_channel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AgentIdsRequest>,
) -> AppResult<Json<Channel>> {
    let mut channel = state
        .channel_registry
        .get(&id)
        .await
        .map_err(|_| AppError::ChannelNotFound(id.clone()))?;
    channel.remove_agent_ids(&request.agent_ids);
    let updated = state
        .channel_registry
        .update(channel)
        .await
        .map_err(|_| AppError::ChannelNotFound(id))?;
    Ok(Json(updated))
}

#[derive(Debug, Deserialize)]
pub struct ChannelAgentSearchParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

fn default_search_limit() -> usize {
    50
}

/// Members ∩ semantic search, backbone excluded (spec.md §8 property 4).
pub async fn search_relevant_agents(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ChannelAgentSearchParams>,
) -> AppResult<Json<Vec<Agent>>> {
    let channel = state
        .channel_registry
        .get(&id)
        .await
        .map_err(|_| AppError::ChannelNotFound(id))?;

    let hits = state
        .agent_registry
        .search(&params.query, clamp_limit(params.limit))
        .await
        .map_err(|e| AppError::RegistryError(e.to_string()))?;

    let backbone_id = &state.settings.backbone_agent_id;
    Ok(Json(
        hits.into_iter()
            .filter(|a| channel.agent_ids.contains(&a.id) && &a.id != backbone_id)
            .collect(),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ChannelChatRequest {
    pub message: String,
    #[serde(default)]
    pub agent_ids: Option<Vec<String>>,
}

pub async fn channel_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<ChannelChatRequest>,
) -> AppResult<Json<ChannelChatResponse>> {
    let channel = state
        .channel_registry
        .get(&id)
        .await
        .map_err(|_| AppError::ChannelNotFound(id))?;

    let response = state
        .channels
        .chat(&channel, &request.message, request.agent_ids)
        .await;

    Ok(Json(response))
}
