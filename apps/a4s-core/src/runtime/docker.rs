// apps/a4s-core/src/runtime/docker.rs
// Purpose: Docker Engine API backed RuntimeDriver.
// Architecture: Runtime Driver (C1)
// Dependencies: bollard

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerStateStatusEnum, EndpointSettings, HostConfig};
use bollard::network::{CreateNetworkOptions, InspectNetworkOptions};
use bollard::Docker;
use futures::StreamExt;

use crate::models::AgentStatus;

use super::{map_docker_status, RuntimeDriver, RuntimeError, SpawnRequest};

const MANAGED_LABEL: &str = "a4s.managed";

/// Host environment variables passed through to spawned agents when present,
/// per spec.md §4.1 / §6.
const PASSTHROUGH_ENV_KEYS: &[&str] = &[
    "GOOGLE_API_KEY",
    "OPENAI_API_KEY",
    "OPENROUTER_API_KEY",
    "GITHUB_TOKEN",
    "LINEAR_API_KEY",
];

pub struct BollardRuntimeDriver {
    docker: Docker,
    network_name: String,
    api_base_url: String,
    agent_gateway_url: String,
}

impl BollardRuntimeDriver {
    pub fn connect(
        base_url: &str,
        network_name: String,
        api_base_url: String,
        agent_gateway_url: String,
    ) -> Result<Self, RuntimeError> {
        let docker = if base_url.starts_with("unix://") {
            Docker::connect_with_unix_defaults()
        } else {
            Docker::connect_with_http_defaults()
        }
        .map_err(|e| RuntimeError::SpawnError(format!("docker connect failed: {e}")))?;

        Ok(Self {
            docker,
            network_name,
            api_base_url,
            agent_gateway_url,
        })
    }

    fn is_not_found(err: &BollardError) -> bool {
        matches!(err, BollardError::DockerResponseServerError { status_code, .. } if *status_code == 404)
    }
}

#[async_trait]
impl RuntimeDriver for BollardRuntimeDriver {
    async fn ensure_network(&self) -> Result<(), RuntimeError> {
        let inspected = self
            .docker
            .inspect_network(&self.network_name, None::<InspectNetworkOptions<String>>)
            .await;

        match inspected {
            Ok(_) => Ok(()),
            Err(e) if Self::is_not_found(&e) => {
                tracing::info!(network = %self.network_name, "creating agent bridge network");
                self.docker
                    .create_network(CreateNetworkOptions {
                        name: self.network_name.clone(),
                        driver: "bridge".to_string(),
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| RuntimeError::SpawnError(format!("create_network failed: {e}")))?;
                Ok(())
            }
            Err(e) => Err(RuntimeError::SpawnError(format!("inspect_network failed: {e}"))),
        }
    }

    async fn spawn(&self, request: SpawnRequest) -> Result<(), RuntimeError> {
        let image_inspect = self.docker.inspect_image(&request.image).await;
        if image_inspect.is_err() {
            tracing::info!(image = %request.image, "pulling agent image");
            let mut stream = self.docker.create_image(
                Some(CreateImageOptions {
                    from_image: request.image.clone(),
                    ..Default::default()
                }),
                None,
                None,
            );
            while let Some(chunk) = stream.next().await {
                if let Err(e) = chunk {
                    return Err(RuntimeError::ImageNotFound(format!(
                        "pull failed for {}: {e}",
                        request.image
                    )));
                }
            }
        }

        let container_name = format!("a4s-agent-{}", request.agent_id);

        let mut labels = HashMap::new();
        labels.insert(MANAGED_LABEL.to_string(), "true".to_string());
        labels.insert("a4s.agent_id".to_string(), request.agent_id.clone());
        labels.insert("a4s.name".to_string(), request.name.clone());
        labels.insert("a4s.description".to_string(), request.description.clone());
        labels.insert("a4s.version".to_string(), request.version.clone());

        let mut env = vec![
            format!("AGENT_NAME={}", request.name),
            format!("AGENT_ID={}", request.agent_id),
            format!("AGENT_HOST={container_name}"),
            format!(
                "AGENT_MODEL_PROVIDER={}",
                format!("{:?}", request.model.provider).to_lowercase()
            ),
            format!("AGENT_MODEL_ID={}", request.model.model_id),
            format!("AGENT_INSTRUCTION={}", request.instruction),
            format!("AGENT_TOOLS={}", request.tools.join(",")),
            format!("AGENT_MCP_TOOL_FILTER={}", request.mcp_tool_filter),
            format!("A4S_API_URL={}", self.api_base_url),
            format!(
                "A4S_AGENT_URL={}/agents/{}/",
                self.agent_gateway_url, request.agent_id
            ),
        ];

        for key in PASSTHROUGH_ENV_KEYS {
            if let Ok(value) = std::env::var(key) {
                env.push(format!("{key}={value}"));
            }
        }

        let mut endpoints = HashMap::new();
        endpoints.insert(
            self.network_name.clone(),
            EndpointSettings {
                ..Default::default()
            },
        );

        let config = Config {
            image: Some(request.image.clone()),
            labels: Some(labels),
            env: Some(env),
            exposed_ports: Some(HashMap::from([(
                format!("{}/tcp", request.port),
                HashMap::new(),
            )])),
            host_config: Some(HostConfig {
                network_mode: Some(self.network_name.clone()),
                ..Default::default()
            }),
            networking_config: Some(bollard::container::NetworkingConfig {
                endpoints_config: endpoints,
            }),
            ..Default::default()
        };

        self.docker
            .create_container(
                Some(CreateContainerOptions {
                    name: container_name.clone(),
                    platform: None,
                }),
                config,
            )
            .await
            .map_err(|e| RuntimeError::SpawnError(format!("create_container failed: {e}")))?;

        self.docker
            .start_container(&container_name, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::SpawnError(format!("start_container failed: {e}")))?;

        Ok(())
    }

    async fn stop(&self, container_name: &str) -> Result<(), RuntimeError> {
        self.docker
            .stop_container(container_name, None::<StopContainerOptions>)
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    RuntimeError::NotFound(container_name.to_string())
                } else {
                    RuntimeError::SpawnError(format!("stop_container failed: {e}"))
                }
            })?;

        self.docker
            .remove_container(container_name, None::<RemoveContainerOptions>)
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    RuntimeError::NotFound(container_name.to_string())
                } else {
                    RuntimeError::SpawnError(format!("remove_container failed: {e}"))
                }
            })?;

        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, RuntimeError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![MANAGED_LABEL.to_string()]);

        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all: true,
                filters,
                ..Default::default()
            }))
            .await
            .map_err(|e| RuntimeError::SpawnError(format!("list_containers failed: {e}")))?;

        Ok(containers
            .into_iter()
            .filter_map(|c| c.names.and_then(|names| names.into_iter().next()))
            .map(|name| name.trim_start_matches('/').to_string())
            .collect())
    }

    async fn status(&self, container_name: &str) -> Result<AgentStatus, RuntimeError> {
        let inspected = self
            .docker
            .inspect_container(container_name, None)
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    RuntimeError::NotFound(container_name.to_string())
                } else {
                    RuntimeError::SpawnError(format!("inspect_container failed: {e}"))
                }
            })?;

        let state = inspected
            .state
            .and_then(|s| s.status)
            .unwrap_or(ContainerStateStatusEnum::EMPTY);

        Ok(map_docker_status(&state.to_string().to_lowercase()))
    }
}
