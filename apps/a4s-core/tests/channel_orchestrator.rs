// apps/a4s-core/tests/channel_orchestrator.rs
// Purpose: Exercises the channel chat scenarios from spec.md §8 (S3-S6)
// against faked agent/backbone HTTP endpoints.

use std::sync::Arc;
use std::time::Duration;

use a4s_core::channel::{ChannelChatResponse, ChannelOrchestrator};
use a4s_core::models::{Agent, AgentMode, AgentStatus, AgentModel, SpawnConfig, Channel};
use a4s_core::registry::{AgentRegistry, InMemoryAgentRegistry};
use a4s_core::runtime::NullRuntimeDriver;
use a4s_core::scheduler::AgentScheduler;
use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn peer_agent(id: &str, name: &str, url: &str) -> Agent {
    Agent {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{name} description"),
        version: "1.0.0".to_string(),
        url: url.to_string(),
        port: 8000,
        owner_id: "owner".to_string(),
        status: AgentStatus::Running,
        created_at: Utc::now(),
        mode: AgentMode::Permanent,
        spawn_config: None,
    }
}

fn backbone_agent(id: &str, url: &str) -> Agent {
    Agent {
        id: id.to_string(),
        name: "backbone-router".to_string(),
        description: "routes messages".to_string(),
        version: "1.0.0".to_string(),
        url: url.to_string(),
        port: 8000,
        owner_id: "system".to_string(),
        status: AgentStatus::Running,
        created_at: Utc::now(),
        mode: AgentMode::Permanent,
        spawn_config: Some(SpawnConfig {
            image: "a4s/backbone:latest".to_string(),
            model: AgentModel::default(),
            instruction: String::new(),
            tools: vec![],
            mcp_tool_filter: "search_agents,send_a2a_message".to_string(),
        }),
    }
}

fn a2a_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": "whatever",
        "result": {
            "parts": [{"kind": "text", "text": text}]
        }
    })
}

async fn make_orchestrator(backbone_id: &str) -> (ChannelOrchestrator, Arc<dyn AgentRegistry>) {
    let registry: Arc<dyn AgentRegistry> = Arc::new(InMemoryAgentRegistry::new());
    let runtime = Arc::new(NullRuntimeDriver::new());
    let scheduler = Arc::new(AgentScheduler::new(
        registry.clone(),
        runtime,
        Duration::from_secs(300),
        Duration::from_secs(30),
    ));
    let orchestrator = ChannelOrchestrator::new(registry.clone(), scheduler, backbone_id.to_string());
    (orchestrator, registry)
}

#[tokio::test]
async fn s3_backbone_returns_candidates() {
    let backbone_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(a2a_body(
            r#"{"candidates":[{"id":"p1","name":"P1","reason":"matches"}]}"#,
        )))
        .mount(&backbone_server)
        .await;

    let (orchestrator, registry) = make_orchestrator("backbone-router").await;
    registry
        .register(backbone_agent("backbone-router", &backbone_server.uri()))
        .await
        .unwrap();
    registry.register(peer_agent("p1", "P1", "http://p1:8000")).await.unwrap();
    registry.register(peer_agent("p2", "P2", "http://p2:8000")).await.unwrap();

    let channel = Channel {
        id: "c1".to_string(),
        name: "C".to_string(),
        description: String::new(),
        agent_ids: vec!["p1".to_string(), "p2".to_string(), "backbone-router".to_string()],
        owner_id: "owner".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let response = orchestrator.chat(&channel, "hi", None).await;
    match response {
        ChannelChatResponse::Candidates { candidates } => {
            assert_eq!(candidates.len(), 1);
            assert_eq!(candidates[0].id, "p1");
            assert_eq!(candidates[0].reason, "matches");
        }
        other => panic!("expected candidates, got {other:?}"),
    }
}

#[tokio::test]
async fn s4_backbone_absent_falls_back_to_search() {
    let (orchestrator, registry) = make_orchestrator("backbone-router").await;
    registry
        .register(peer_agent("p1", "weather-bot", "http://p1:8000"))
        .await
        .unwrap();
    registry.register(peer_agent("p2", "notes-bot", "http://p2:8000")).await.unwrap();

    let channel = Channel {
        id: "c1".to_string(),
        name: "C".to_string(),
        description: String::new(),
        agent_ids: vec!["p1".to_string(), "p2".to_string()],
        owner_id: "owner".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let response = orchestrator.chat(&channel, "weather-bot", None).await;
    match response {
        ChannelChatResponse::Candidates { candidates } => {
            assert!(!candidates.is_empty());
            assert!(candidates.iter().all(|c| c.id != "backbone-router"));
        }
        other => panic!("expected candidates, got {other:?}"),
    }
}

#[tokio::test]
async fn s5_invalid_agent_id_in_fanout_skips_outbound_calls() {
    let (orchestrator, registry) = make_orchestrator("backbone-router").await;
    registry.register(peer_agent("p1", "P1", "http://p1:8000")).await.unwrap();

    let channel = Channel {
        id: "c1".to_string(),
        name: "C".to_string(),
        description: String::new(),
        agent_ids: vec!["p1".to_string()],
        owner_id: "owner".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let response = orchestrator.chat(&channel, "hi", Some(vec!["px".to_string()])).await;
    match response {
        ChannelChatResponse::Results { results } => {
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].agent_id, "px");
            assert_eq!(results[0].error.as_deref(), Some("Agent not in channel"));
        }
        other => panic!("expected results, got {other:?}"),
    }
}

#[tokio::test]
async fn s6_mixed_fanout_failures_are_isolated() {
    let p1_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(a2a_body("hello from p1")))
        .mount(&p1_server)
        .await;

    let (orchestrator, registry) = make_orchestrator("backbone-router").await;
    registry.register(peer_agent("p1", "P1", &p1_server.uri())).await.unwrap();
    registry
        .register(peer_agent("p2", "P2", "http://127.0.0.1:1"))
        .await
        .unwrap();

    let channel = Channel {
        id: "c1".to_string(),
        name: "C".to_string(),
        description: String::new(),
        agent_ids: vec!["p1".to_string(), "p2".to_string()],
        owner_id: "owner".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let response = orchestrator
        .chat(&channel, "hi", Some(vec!["p1".to_string(), "p2".to_string()]))
        .await;

    match response {
        ChannelChatResponse::Results { results } => {
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].agent_id, "p1");
            assert_eq!(results[0].response.as_deref(), Some("hello from p1"));
            assert_eq!(results[1].agent_id, "p2");
            assert!(results[1].error.is_some());
        }
        other => panic!("expected results, got {other:?}"),
    }
}
