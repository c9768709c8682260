//! Composition root: wires the domain routers into one application

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use hackmate_matching::{MatchEngine, MatchingState};
use hackmate_notify::Notifier;
use hackmate_teams::api::AuthConfig;
use hackmate_teams::{Repositories, TeamsState};

/// Everything the router needs, built once at startup
pub struct AppComponents {
    pub repos: Repositories,
    pub notifier: Arc<dyn Notifier>,
    pub jwt_secret: String,
}

/// Build the full application router
pub fn create_app(components: AppComponents) -> Router {
    let auth = AuthConfig {
        jwt_secret: components.jwt_secret,
    };

    let teams = hackmate_teams::api::router().with_state(TeamsState {
        repos: components.repos.clone(),
        notifier: components.notifier,
        auth: auth.clone(),
    });

    let matching = hackmate_matching::api::router().with_state(MatchingState {
        engine: MatchEngine::new(components.repos),
        auth,
    });

    Router::new()
        .route("/health", get(health))
        .nest("/v1", teams.merge(matching))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
