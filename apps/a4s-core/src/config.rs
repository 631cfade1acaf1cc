// apps/a4s-core/src/config.rs
// Purpose: Environment-driven settings for the control plane.
// Architecture: Cross-cutting
// Dependencies: config, dotenvy, serde

use serde::Deserialize;

use crate::models::ModelProvider;

fn default_port() -> u16 {
    8000
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_agent_gateway_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_agent_network() -> String {
    "a4s-network".to_string()
}

fn default_docker_base_url() -> String {
    "unix:///var/run/docker.sock".to_string()
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_reaper_interval_secs() -> u64 {
    30
}

fn default_backbone_agent_id() -> String {
    "backbone-router".to_string()
}

fn default_backbone_agent_image() -> String {
    "a4s/backbone-agent:latest".to_string()
}

fn default_backbone_agent_model_id() -> String {
    "gemini-3-flash-preview".to_string()
}

/// Settings for the control-plane process, loaded from the environment
/// (optionally seeded by a `.env` file) with the `config` crate.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_agent_gateway_url")]
    pub agent_gateway_url: String,

    #[serde(default = "default_agent_network")]
    pub agent_network: String,

    #[serde(default = "default_docker_base_url")]
    pub docker_base_url: String,

    #[serde(default = "default_idle_timeout_secs")]
    pub agent_idle_timeout_secs: u64,

    #[serde(default = "default_reaper_interval_secs")]
    pub agent_reaper_interval_secs: u64,

    #[serde(default = "default_backbone_agent_id")]
    pub backbone_agent_id: String,

    #[serde(default = "default_backbone_agent_image")]
    pub backbone_agent_image: String,

    #[serde(default)]
    pub backbone_agent_model_provider: ModelProvider,

    #[serde(default = "default_backbone_agent_model_id")]
    pub backbone_agent_model_id: String,
}

impl Settings {
    /// Loads configuration from the process environment, prefixed `A4S__`
    /// (double underscore for nested keys), after seeding from a `.env`
    /// file if one is present.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let builder = config::Config::builder()
            .set_default("port", default_port() as i64)?
            .set_default("cors_origins", Vec::<String>::new())?
            .set_default("api_base_url", default_api_base_url())?
            .set_default("agent_gateway_url", default_agent_gateway_url())?
            .set_default("agent_network", default_agent_network())?
            .set_default("docker_base_url", default_docker_base_url())?
            .set_default("agent_idle_timeout_secs", default_idle_timeout_secs() as i64)?
            .set_default(
                "agent_reaper_interval_secs",
                default_reaper_interval_secs() as i64,
            )?
            .set_default("backbone_agent_id", default_backbone_agent_id())?
            .set_default("backbone_agent_image", default_backbone_agent_image())?
            .set_default("backbone_agent_model_provider", "google")?
            .set_default("backbone_agent_model_id", default_backbone_agent_model_id())?
            .add_source(
                config::Environment::with_prefix("A4S")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.agent_idle_timeout_secs)
    }

    pub fn reaper_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.agent_reaper_interval_secs)
    }
}
