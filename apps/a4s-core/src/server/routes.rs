// apps/a4s-core/src/server/routes.rs
// Purpose: Axum router assembly (C7).
// Architecture: Lifespan & surface
// Dependencies: axum, tower-http

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

use super::handlers::{agents, channels, health};
use super::proxy::proxy_to_agent;

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.cors_origins);

    let v1 = Router::new()
        .route("/agents", post(agents::register_agent).get(agents::list_agents))
        .route("/agents/search", get(agents::search_agents))
        .route(
            "/agents/:id",
            get(agents::get_agent).delete(agents::unregister_agent),
        )
        .route("/agents/:id/start", post(agents::start_agent))
        .route("/agents/:id/stop", post(agents::stop_agent))
        .route("/agents/:id/status", get(agents::get_agent_status))
        .route(
            "/agents/:id/ensure-running",
            get(agents::ensure_running).post(agents::ensure_running),
        )
        .route(
            "/agents/:id/proxy/*path",
            get(proxy_to_agent)
                .post(proxy_to_agent)
                .put(proxy_to_agent)
                .delete(proxy_to_agent)
                .patch(proxy_to_agent)
                .options(proxy_to_agent),
        )
        .route("/channels", post(channels::create_channel).get(channels::list_channels))
        .route(
            "/channels/:id",
            get(channels::get_channel)
                .put(channels::update_channel)
                .delete(channels::delete_channel),
        )
        .route(
            "/channels/:id/agents",
            post(channels::add_agents_to_channel).delete(channels::remove_agents_from_channel),
        )
        .route("/channels/:id/agents/search", get(channels::search_relevant_agents))
        .route("/channels/:id/chat", post(channels::channel_chat));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", v1)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
