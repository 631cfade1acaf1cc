// apps/a4s-core/src/scheduler/activity.rs
// Purpose: Monotonic-clock activity tracking for serverless agents (C2).
// Architecture: Agent Scheduler
// Dependencies: dashmap

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// `agent-id -> last observed activity`, in-memory only.
#[derive(Default)]
pub struct ActivityMonitor {
    last_seen: DashMap<String, Instant>,
}

impl ActivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, id: &str) {
        self.last_seen.insert(id.to_string(), Instant::now());
    }

    pub fn get_idle(&self, threshold: Duration) -> Vec<String> {
        let now = Instant::now();
        self.last_seen
            .iter()
            .filter(|entry| now.duration_since(*entry.value()) > threshold)
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn remove(&self, id: &str) {
        self.last_seen.remove(id);
    }
}
