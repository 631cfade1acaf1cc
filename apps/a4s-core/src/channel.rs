// apps/a4s-core/src/channel.rs
// Purpose: Two-phase channel chat orchestrator — backbone routing with
// semantic-search fallback, then concurrent fan-out to selected peers (C6).
// Architecture: Channel Orchestrator
// Dependencies: reqwest, serde_json, regex, futures, uuid

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{Agent, Channel};
use crate::registry::AgentRegistry;
use crate::scheduler::AgentScheduler;

const A2A_TIMEOUT: Duration = Duration::from_secs(120);

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").unwrap());

#[derive(Debug, Serialize)]
struct A2aPart {
    kind: &'static str,
    text: String,
}

#[derive(Debug, Serialize)]
struct A2aMetadata {
    depth: u32,
}

#[derive(Debug, Serialize)]
struct A2aMessage {
    role: &'static str,
    parts: Vec<A2aPart>,
    #[serde(rename = "messageId")]
    message_id: String,
    metadata: A2aMetadata,
}

#[derive(Debug, Serialize)]
struct A2aParams {
    message: A2aMessage,
}

#[derive(Debug, Serialize)]
struct A2aRequest {
    jsonrpc: &'static str,
    id: String,
    method: &'static str,
    params: A2aParams,
}

#[derive(Debug, Deserialize)]
struct A2aResponse {
    result: Option<Value>,
    error: Option<Value>,
}

fn build_a2a_request(text: String, depth: u32) -> A2aRequest {
    A2aRequest {
        jsonrpc: "2.0",
        id: uuid::Uuid::new_v4().to_string(),
        method: "message/send",
        params: A2aParams {
            message: A2aMessage {
                role: "user",
                parts: vec![A2aPart { kind: "text", text }],
                message_id: uuid::Uuid::new_v4().to_string(),
                metadata: A2aMetadata { depth },
            },
        },
    }
}

fn text_from_parts(parts: &Value) -> String {
    parts
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default()
}

/// Concatenates, in order, artifacts' parts' text, then top-level parts'
/// text, then `status.message.parts` text — returns `None` if empty.
pub fn extract_text_from_a2a_response(result: &Value) -> Option<String> {
    let mut chunks = vec![];

    if let Some(artifacts) = result.get("artifacts").and_then(Value::as_array) {
        for artifact in artifacts {
            if let Some(parts) = artifact.get("parts") {
                let text = text_from_parts(parts);
                if !text.is_empty() {
                    chunks.push(text);
                }
            }
        }
    }

    if let Some(parts) = result.get("parts") {
        let text = text_from_parts(parts);
        if !text.is_empty() {
            chunks.push(text);
        }
    }

    if let Some(parts) = result.pointer("/status/message/parts") {
        let text = text_from_parts(parts);
        if !text.is_empty() {
            chunks.push(text);
        }
    }

    if chunks.is_empty() {
        None
    } else {
        Some(chunks.join("\n"))
    }
}

/// Sends an A2A `message/send` call to `agent.url` and returns the
/// extracted reply text, or an error string per spec.md §4.6 step 3.
async fn send_a2a_to_agent(
    client: &reqwest::Client,
    agent: &Agent,
    message: &str,
    depth: u32,
) -> Result<Option<String>, String> {
    let request = build_a2a_request(message.to_string(), depth);

    let response = client
        .post(format!("{}/", agent.url.trim_end_matches('/')))
        .timeout(A2A_TIMEOUT)
        .json(&request)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                "Request timed out".to_string()
            } else if e.is_connect() {
                "Failed to connect to agent".to_string()
            } else {
                e.to_string()
            }
        })?;

    if !response.status().is_success() {
        return Err(format!("HTTP {}", response.status().as_u16()));
    }

    let body: A2aResponse = response.json().await.map_err(|e| e.to_string())?;

    if let Some(error) = body.error {
        return Err(error.to_string());
    }

    let result = body.result.ok_or_else(|| "No response from agent".to_string())?;
    Ok(extract_text_from_a2a_response(&result))
}

/// Parses a JSON object out of backbone free text: either the raw body, or
/// the contents of the first fenced code block.
fn parse_json_from_response(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }
    let captured = CODE_FENCE.captures(text)?;
    serde_json::from_str::<Value>(captured.get(1)?.as_str().trim()).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAgent {
    pub id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentChatResult {
    pub agent_id: String,
    #[serde(default)]
    pub agent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelChatResponse {
    Candidates { candidates: Vec<CandidateAgent> },
    Direct { message: String },
    Results { results: Vec<AgentChatResult> },
}

pub struct ChannelOrchestrator {
    registry: Arc<dyn AgentRegistry>,
    scheduler: Arc<AgentScheduler>,
    http_client: reqwest::Client,
    backbone_agent_id: String,
}

impl ChannelOrchestrator {
    pub fn new(
        registry: Arc<dyn AgentRegistry>,
        scheduler: Arc<AgentScheduler>,
        backbone_agent_id: String,
    ) -> Self {
        Self {
            registry,
            scheduler,
            http_client: reqwest::Client::new(),
            backbone_agent_id,
        }
    }

    pub async fn chat(
        &self,
        channel: &Channel,
        message: &str,
        agent_ids: Option<Vec<String>>,
    ) -> ChannelChatResponse {
        match agent_ids {
            Some(ids) => self.fan_out(channel, message, ids).await,
            None => self.route(channel, message).await,
        }
    }

    async fn peers(&self, channel: &Channel) -> Vec<Agent> {
        let mut peers = vec![];
        for id in &channel.agent_ids {
            if id == &self.backbone_agent_id {
                continue;
            }
            if let Ok(agent) = self.registry.get(id).await {
                peers.push(agent);
            }
        }
        peers
    }

    async fn route(&self, channel: &Channel, message: &str) -> ChannelChatResponse {
        if self.backbone_agent_id.is_empty() {
            return self.fallback_search(channel, message).await;
        }

        let backbone = match self.registry.get(&self.backbone_agent_id).await {
            Ok(agent) => agent,
            Err(_) => return self.fallback_search(channel, message).await,
        };

        let (backbone, _) = match self.scheduler.ensure_running(&backbone.id).await {
            Ok(result) => result,
            Err(_) => return self.fallback_search(channel, message).await,
        };

        let peers = self.peers(channel).await;
        let peer_json = serde_json::to_string(
            &peers
                .iter()
                .map(|p| serde_json::json!({"id": p.id, "name": p.name, "description": p.description}))
                .collect::<Vec<_>>(),
        )
        .unwrap_or_default();

        let prompt = format!(
            "Channel: {} ({})\nAgents: {}\nUser message: {}",
            channel.name, channel.id, peer_json, message
        );

        let reply = match send_a2a_to_agent(&self.http_client, &backbone, &prompt, 1).await {
            Ok(Some(text)) => text,
            _ => return self.fallback_search(channel, message).await,
        };

        match parse_json_from_response(&reply) {
            Some(parsed) => {
                if let Some(candidates) = parsed.get("candidates").and_then(Value::as_array) {
                    let valid: Vec<CandidateAgent> = candidates
                        .iter()
                        .filter_map(|c| {
                            let id = c.get("id").and_then(Value::as_str)?.to_string();
                            if !channel.agent_ids.contains(&id) {
                                return None;
                            }
                            Some(CandidateAgent {
                                id,
                                name: c.get("name").and_then(Value::as_str).unwrap_or_default().to_string(),
                                reason: c.get("reason").and_then(Value::as_str).unwrap_or_default().to_string(),
                            })
                        })
                        .collect();
                    ChannelChatResponse::Candidates { candidates: valid }
                } else {
                    ChannelChatResponse::Direct { message: reply }
                }
            }
            None => ChannelChatResponse::Direct { message: reply },
        }
    }

    async fn fallback_search(&self, channel: &Channel, message: &str) -> ChannelChatResponse {
        let hits = self.registry.search(message, 50).await.unwrap_or_default();
        let candidates = hits
            .into_iter()
            .filter(|a| channel.agent_ids.contains(&a.id) && a.id != self.backbone_agent_id)
            .take(5)
            .map(|a| CandidateAgent {
                id: a.id,
                name: a.name,
                reason: a.description,
            })
            .collect();
        ChannelChatResponse::Candidates { candidates }
    }

    async fn fan_out(&self, channel: &Channel, message: &str, agent_ids: Vec<String>) -> ChannelChatResponse {
        let invalid: Vec<String> = agent_ids
            .iter()
            .filter(|id| !channel.agent_ids.contains(id))
            .cloned()
            .collect();
        if !invalid.is_empty() {
            let results = invalid
                .into_iter()
                .map(|id| AgentChatResult {
                    agent_id: id,
                    agent_name: String::new(),
                    response: None,
                    error: Some("Agent not in channel".to_string()),
                })
                .collect();
            return ChannelChatResponse::Results { results };
        }

        let futures = agent_ids.iter().map(|id| self.process_agent(id, message));
        let results = join_all(futures).await;
        ChannelChatResponse::Results { results }
    }

    async fn process_agent(&self, agent_id: &str, message: &str) -> AgentChatResult {
        let agent = match self.registry.get(agent_id).await {
            Ok(agent) => agent,
            Err(_) => {
                return AgentChatResult {
                    agent_id: agent_id.to_string(),
                    agent_name: String::new(),
                    response: None,
                    error: Some("Agent not in channel".to_string()),
                }
            }
        };

        if agent.mode == crate::models::AgentMode::Serverless {
            if let Err(e) = self.scheduler.ensure_running(agent_id).await {
                return AgentChatResult {
                    agent_id: agent_id.to_string(),
                    agent_name: agent.name.clone(),
                    response: None,
                    error: Some(e.to_string()),
                };
            }
            self.scheduler.record_activity(agent_id);
        }

        match send_a2a_to_agent(&self.http_client, &agent, message, 1).await {
            Ok(Some(text)) => AgentChatResult {
                agent_id: agent_id.to_string(),
                agent_name: agent.name.clone(),
                response: Some(text),
                error: None,
            },
            Ok(None) => AgentChatResult {
                agent_id: agent_id.to_string(),
                agent_name: agent.name.clone(),
                response: None,
                error: Some("No response from agent".to_string()),
            },
            Err(e) => AgentChatResult {
                agent_id: agent_id.to_string(),
                agent_name: agent.name.clone(),
                response: None,
                error: Some(e),
            },
        }
    }
}
