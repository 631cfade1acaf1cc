// apps/a4s-core/src/scheduler/mod.rs
// Purpose: Cold-start gate and idle reaper for serverless agents (C3).
// Architecture: Agent Scheduler
// Dependencies: dashmap, tokio, tokio-util, reqwest

pub mod activity;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::models::{Agent, AgentMode, AgentStatus};
use crate::registry::AgentRegistry;
use crate::runtime::{RuntimeDriver, RuntimeError, SpawnRequest};

use activity::ActivityMonitor;

const READINESS_TIMEOUT: Duration = Duration::from_secs(30);
const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);
const READINESS_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

impl From<RuntimeError> for AppError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::ImageNotFound(msg) => AppError::ImageNotFound(msg),
            RuntimeError::SpawnError(msg) => AppError::SpawnError(msg),
            RuntimeError::NotFound(msg) => AppError::AgentNotFound(msg),
        }
    }
}

/// `ensureRunning`, `recordActivity`, and the idle-reaper loop for
/// serverless agents (spec.md §4.3). The per-id mutex table wraps the
/// spawn-or-check sequence so concurrent callers for the same id coalesce
/// onto a single spawn.
pub struct AgentScheduler {
    registry: Arc<dyn AgentRegistry>,
    runtime: Arc<dyn RuntimeDriver>,
    activity: Arc<ActivityMonitor>,
    spawn_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    idle_timeout: Duration,
    reaper_interval: Duration,
    reaper_handle: AsyncMutex<Option<JoinHandle<()>>>,
    reaper_cancel: CancellationToken,
    http_client: reqwest::Client,
}

impl AgentScheduler {
    pub fn new(
        registry: Arc<dyn AgentRegistry>,
        runtime: Arc<dyn RuntimeDriver>,
        idle_timeout: Duration,
        reaper_interval: Duration,
    ) -> Self {
        Self {
            registry,
            runtime,
            activity: Arc::new(ActivityMonitor::new()),
            spawn_locks: DashMap::new(),
            idle_timeout,
            reaper_interval,
            reaper_handle: AsyncMutex::new(None),
            reaper_cancel: CancellationToken::new(),
            http_client: reqwest::Client::new(),
        }
    }

    fn lock_for(&self, id: &str) -> Arc<AsyncMutex<()>> {
        self.spawn_locks
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Cold-start gate. Returns the agent and, when a spawn was issued, the
    /// elapsed milliseconds — `None` when the agent was already running or
    /// is permanent.
    pub async fn ensure_running(&self, id: &str) -> Result<(Agent, Option<u64>), AppError> {
        let agent = self
            .registry
            .get(id)
            .await
            .map_err(|_| AppError::AgentNotRegistered(id.to_string()))?;

        if agent.mode != AgentMode::Serverless {
            return Ok((agent, None));
        }

        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let container_name = agent.container_name();
        if let Ok(AgentStatus::Running) = self.runtime.status(&container_name).await {
            return Ok((agent, None));
        }

        let start = Instant::now();
        let spawn_config = agent
            .spawn_config
            .clone()
            .ok_or_else(|| AppError::SpawnError(format!("agent {id} has no spawn_config")))?;

        let request = SpawnRequest {
            agent_id: agent.id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            version: agent.version.clone(),
            image: spawn_config.image.clone(),
            port: agent.port,
            model: spawn_config.model.clone(),
            instruction: spawn_config.instruction.clone(),
            tools: spawn_config.tools.clone(),
            mcp_tool_filter: spawn_config.mcp_tool_filter.clone(),
        };

        self.runtime.spawn(request).await?;
        self.wait_for_ready(&agent.url).await;

        Ok((agent, Some(start.elapsed().as_millis() as u64)))
    }

    /// Polls the agent's base URL until it responds with a non-5xx status
    /// or the deadline elapses. Non-readiness is logged, never failed —
    /// the proxy will surface a real error if the agent truly isn't up.
    async fn wait_for_ready(&self, url: &str) {
        let deadline = Instant::now() + READINESS_TIMEOUT;
        loop {
            let probe = self
                .http_client
                .get(url)
                .timeout(READINESS_PROBE_TIMEOUT)
                .send()
                .await;

            match probe {
                Ok(resp) if resp.status().as_u16() < 500 => return,
                _ => {}
            }

            if Instant::now() >= deadline {
                tracing::warn!(url, "agent did not become ready within deadline");
                return;
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    pub fn record_activity(&self, id: &str) {
        self.activity.record(id);
    }

    pub async fn start(self: &Arc<Self>) {
        let mut guard = self.reaper_handle.lock().await;
        if guard.is_some() {
            return;
        }
        let scheduler = Arc::clone(self);
        let cancel = self.reaper_cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("reaper cancelled");
                        break;
                    }
                    _ = tokio::time::sleep(scheduler.reaper_interval) => {
                        scheduler.reap_once().await;
                    }
                }
            }
        });
        *guard = Some(handle);
    }

    pub async fn stop(&self) {
        self.reaper_cancel.cancel();
        let mut guard = self.reaper_handle.lock().await;
        if let Some(handle) = guard.take() {
            let _ = handle.await;
        }
    }

    async fn reap_once(&self) {
        for id in self.activity.get_idle(self.idle_timeout) {
            let agent = match self.registry.get(&id).await {
                Ok(agent) => agent,
                Err(_) => {
                    self.activity.remove(&id);
                    continue;
                }
            };
            if agent.mode != AgentMode::Serverless {
                self.activity.remove(&id);
                continue;
            }
            match self.runtime.stop(&agent.container_name()).await {
                Ok(()) => {
                    tracing::info!(agent_id = %id, "reaped idle agent");
                    self.activity.remove(&id);
                }
                Err(RuntimeError::NotFound(_)) => {
                    self.activity.remove(&id);
                }
                Err(e) => {
                    tracing::warn!(agent_id = %id, error = %e, "reaper stop failed, retrying next cycle");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AgentModel, SpawnConfig};
    use crate::registry::InMemoryAgentRegistry;
    use crate::runtime::NullRuntimeDriver;
    use chrono::Utc;

    fn serverless_agent(id: &str) -> Agent {
        Agent {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            version: "1.0.0".to_string(),
            url: "http://127.0.0.1:1/".to_string(),
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
        }
    }

    #[tokio::test]
    async fn ensure_running_spawns_exactly_once_for_concurrent_callers() {
        let registry: Arc<dyn AgentRegistry> = Arc::new(InMemoryAgentRegistry::new());
        let runtime = Arc::new(NullRuntimeDriver::new());
        registry.register(serverless_agent("alpha-abcde")).await.unwrap();

        let scheduler = Arc::new(AgentScheduler::new(
            registry,
            runtime.clone(),
            Duration::from_secs(300),
            Duration::from_secs(30),
        ));

        let mut handles = vec![];
        for _ in 0..8 {
            let scheduler = Arc::clone(&scheduler);
            handles.push(tokio::spawn(async move {
                scheduler.ensure_running("alpha-abcde").await.unwrap()
            }));
        }
        for h in handles {
            let (agent, _) = h.await.unwrap();
            assert_eq!(agent.id, "alpha-abcde");
        }

        assert_eq!(runtime.spawn_count("a4s-agent-alpha-abcde"), 1);
    }

    #[tokio::test]
    async fn ensure_running_on_permanent_agent_is_a_noop() {
        let registry: Arc<dyn AgentRegistry> = Arc::new(InMemoryAgentRegistry::new());
        let runtime = Arc::new(NullRuntimeDriver::new());
        let mut agent = serverless_agent("backbone-router");
        agent.mode = AgentMode::Permanent;
        registry.register(agent).await.unwrap();

        let scheduler = AgentScheduler::new(
            registry,
            runtime.clone(),
            Duration::from_secs(300),
            Duration::from_secs(30),
        );

        let (_, cold_start) = scheduler.ensure_running("backbone-router").await.unwrap();
        assert!(cold_start.is_none());
        assert_eq!(runtime.spawn_count("a4s-agent-backbone-router"), 0);
    }

    #[tokio::test]
    async fn reaper_never_stops_permanent_agents() {
        let registry: Arc<dyn AgentRegistry> = Arc::new(InMemoryAgentRegistry::new());
        let runtime = Arc::new(NullRuntimeDriver::new());
        let mut agent = serverless_agent("backbone-router");
        agent.mode = AgentMode::Permanent;
        registry.register(agent).await.unwrap();
        runtime.set_status("a4s-agent-backbone-router", AgentStatus::Running);

        let scheduler = AgentScheduler::new(
            registry,
            runtime.clone(),
            Duration::from_secs(0),
            Duration::from_secs(30),
        );
        scheduler.record_activity("backbone-router");
        scheduler.reap_once().await;

        assert!(runtime.status("a4s-agent-backbone-router").await.is_ok());
    }

    #[tokio::test]
    async fn reaper_stops_idle_serverless_agents() {
        let registry: Arc<dyn AgentRegistry> = Arc::new(InMemoryAgentRegistry::new());
        let runtime = Arc::new(NullRuntimeDriver::new());
        registry.register(serverless_agent("alpha-abcde")).await.unwrap();
        runtime.set_status("a4s-agent-alpha-abcde", AgentStatus::Running);

        let scheduler = AgentScheduler::new(
            registry,
            runtime.clone(),
            Duration::from_secs(0),
            Duration::from_secs(30),
        );
        scheduler.record_activity("alpha-abcde");
        tokio::time::sleep(Duration::from_millis(5)).await;
        scheduler.reap_once().await;

        assert!(runtime.status("a4s-agent-alpha-abcde").await.is_err());
    }
}
