//! API module for the AuditFlow Server
//!
//! Every route is served both at the root and under `/api`.

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

pub mod clients;
pub mod errors;
pub mod health;
pub mod workflows;

use crate::config::ServerConfig;
use crate::server::AuditFlowServer;

/// Build the router for API endpoints
pub fn build_router(server: Arc<AuditFlowServer>) -> Router {
    let cors = cors_layer(&server.config);

    let routes = Router::new()
        // Client registry
        .route("/clients", post(clients::create_client).get(clients::list_clients))
        .route("/clients/:id", get(clients::get_client))

        // Workflows
        .route("/workflows", get(workflows::list_workflows))
        .route("/workflows/generate", post(workflows::generate_workflow))
        .route("/workflows/:id", get(workflows::get_workflow))
        .route("/workflows/:id/steps/:key", patch(workflows::update_step_status))

        // Health check
        .route("/health", get(health::health_check));

    Router::new()
        .merge(routes.clone())
        .nest("/api", routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        // Shared state
        .with_state(server)
}

/// CORS policy from configuration
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS];

    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
}
