//! Route table for the matching domain

use axum::{routing::get, Router};

use super::handlers;
use super::MatchingState;

pub fn router() -> Router<MatchingState> {
    Router::new()
        .route("/matching/teams/recommended", get(handlers::recommended_teams))
        .route(
            "/matching/users/recommended/{team_id}",
            get(handlers::recommended_users),
        )
        .route("/matching/teams/discover", get(handlers::discover_teams))
        .route("/matching/trending/domains", get(handlers::trending_domains))
        .route("/matching/popular/skills", get(handlers::popular_skills))
        .route("/matching/stats", get(handlers::matching_stats))
        .route("/matching/filters", get(handlers::discovery_filters))
}
