// apps/a4s-core/src/server/proxy.rs
// Purpose: Transparent reverse proxy to agent containers, cold-start gated
// for serverless agents (C5).
// Architecture: Agent Proxy
// Dependencies: axum, reqwest

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::app_state::AppState;
use crate::error::AppError;
use crate::models::AgentMode;

pub const PROXY_TOTAL_TIMEOUT: Duration = Duration::from_secs(300);
pub const PROXY_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

const EXCLUDED_HEADERS: &[&str] = &["host", "content-length", "transfer-encoding", "content-encoding"];

fn is_excluded(name: &HeaderName) -> bool {
    EXCLUDED_HEADERS.iter().any(|h| name.as_str().eq_ignore_ascii_case(h))
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert("access-control-allow-methods", HeaderValue::from_static("*"));
    headers.insert("access-control-allow-headers", HeaderValue::from_static("*"));
    headers.insert("access-control-max-age", HeaderValue::from_static("1728000"));
    headers
}

pub async fn proxy_to_agent(
    State(state): State<Arc<AppState>>,
    Path((id, path)): Path<(String, String)>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    if method == Method::OPTIONS {
        return Ok((StatusCode::NO_CONTENT, cors_headers()).into_response());
    }

    let agent = state
        .agent_registry
        .get(&id)
        .await
        .map_err(|_| AppError::AgentNotRegistered(id.clone()))?;

    if agent.mode == AgentMode::Serverless {
        state.scheduler.ensure_running(&id).await?;
        state.scheduler.record_activity(&id);
    }

    let mut target = format!("{}/{}", agent.url.trim_end_matches('/'), path);
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut forward_headers = reqwest::header::HeaderMap::new();
    for (name, value) in headers.iter() {
        if is_excluded(name) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()),
            reqwest::header::HeaderValue::from_bytes(value.as_bytes()),
        ) {
            forward_headers.insert(name, value);
        }
    }

    let method = reqwest::Method::from_bytes(method.as_str().as_bytes()).unwrap_or(reqwest::Method::GET);

    let upstream = state
        .proxy_client
        .request(method, &target)
        .headers(forward_headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(resp) => resp,
        Err(e) if e.is_timeout() => return Ok((StatusCode::GATEWAY_TIMEOUT, cors_headers()).into_response()),
        Err(e) if e.is_connect() => return Ok((StatusCode::BAD_GATEWAY, cors_headers()).into_response()),
        Err(e) => return Err(AppError::SpawnError(e.to_string())),
    };

    let status = StatusCode::from_u16(upstream.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream.headers().iter() {
        if let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) {
            if is_excluded(&name) {
                continue;
            }
            if let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) {
                response_headers.append(name, value);
            }
        }
    }
    response_headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));

    let body = upstream.bytes().await.map_err(|e| AppError::SpawnError(e.to_string()))?;

    Ok((status, response_headers, body).into_response())
}
