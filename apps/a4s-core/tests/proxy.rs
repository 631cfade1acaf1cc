// apps/a4s-core/tests/proxy.rs
// Purpose: Exercises cold-start-gated proxying and CORS headers (spec.md
// §8 properties 1 and 7, scenario S1) against a faked agent endpoint.

use std::sync::Arc;
use std::time::Duration;

use a4s_core::app_state::AppState;
use a4s_core::config::Settings;
use a4s_core::memory::NoopMemoryManager;
use a4s_core::models::{Agent, AgentMode, AgentModel, AgentStatus, SpawnConfig};
use a4s_core::registry::{AgentRegistry, ChannelRegistry, InMemoryAgentRegistry, InMemoryChannelRegistry};
use a4s_core::runtime::{NullRuntimeDriver, RuntimeDriver};
use a4s_core::scheduler::AgentScheduler;
use a4s_core::server::build_router;
use a4s_core::channel::ChannelOrchestrator;
use chrono::Utc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_settings() -> Settings {
    config::Config::builder()
        .set_default("port", 0i64)
        .unwrap()
        .set_default("cors_origins", Vec::<String>::new())
        .unwrap()
        .set_default("api_base_url", "http://localhost:8000")
        .unwrap()
        .set_default("agent_gateway_url", "http://localhost:8000")
        .unwrap()
        .set_default("agent_network", "a4s-network")
        .unwrap()
        .set_default("docker_base_url", "unix:///var/run/docker.sock")
        .unwrap()
        .set_default("agent_idle_timeout_secs", 300i64)
        .unwrap()
        .set_default("agent_reaper_interval_secs", 30i64)
        .unwrap()
        .set_default("backbone_agent_id", "backbone-router")
        .unwrap()
        .set_default("backbone_agent_image", "a4s/backbone:latest")
        .unwrap()
        .set_default("backbone_agent_model_provider", "google")
        .unwrap()
        .set_default("backbone_agent_model_id", "gemini-3-flash-preview")
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap()
}

async fn test_app_state(runtime: Arc<NullRuntimeDriver>) -> Arc<AppState> {
    let agent_registry: Arc<dyn AgentRegistry> = Arc::new(InMemoryAgentRegistry::new());
    let channel_registry: Arc<dyn ChannelRegistry> = Arc::new(InMemoryChannelRegistry::new());
    let runtime: Arc<dyn RuntimeDriver> = runtime;
    let scheduler = Arc::new(AgentScheduler::new(
        agent_registry.clone(),
        runtime.clone(),
        Duration::from_secs(300),
        Duration::from_secs(30),
    ));
    let channels = Arc::new(ChannelOrchestrator::new(
        agent_registry.clone(),
        scheduler.clone(),
        "backbone-router".to_string(),
    ));

    Arc::new(AppState {
        settings: Arc::new(test_settings()),
        agent_registry,
        channel_registry,
        runtime,
        scheduler,
        channels,
        memory: Arc::new(NoopMemoryManager::default()),
        http_client: reqwest::Client::new(),
        proxy_client: reqwest::Client::new(),
    })
}

#[tokio::test]
async fn cold_start_proxy_hits_upstream_and_sets_cors_header() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&upstream)
        .await;

    let runtime = Arc::new(NullRuntimeDriver::new());
    let state = test_app_state(runtime.clone()).await;

    state
        .agent_registry
        .register(Agent {
            id: "alpha-abcde".to_string(),
            name: "alpha".to_string(),
            description: String::new(),
            version: "1.0.0".to_string(),
            url: upstream.uri(),
            port: 8000,
            owner_id: "owner".to_string(),
            status: AgentStatus::Pending,
            created_at: Utc::now(),
            mode: AgentMode::Serverless,
            spawn_config: Some(SpawnConfig {
                image: "svc:1".to_string(),
                model: AgentModel::default(),
                instruction: String::new(),
                tools: vec![],
                mcp_tool_filter: String::new(),
            }),
        })
        .await
        .unwrap();

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let url = format!("http://{addr}/api/v1/agents/alpha-abcde/proxy/health");

    let (r1, r2) = tokio::join!(client.get(&url).send(), client.get(&url).send());
    let r1 = r1.unwrap();
    let r2 = r2.unwrap();

    assert_eq!(r1.status(), 200);
    assert_eq!(r2.status(), 200);
    assert_eq!(
        r1.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    assert_eq!(runtime.spawn_count("a4s-agent-alpha-abcde"), 1);
}
