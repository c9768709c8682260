pub mod handlers;
pub mod routes;

use axum::extract::FromRef;

use hackmate_teams::api::AuthConfig;

use crate::engine::MatchEngine;

pub use routes::router;

/// State for the matching domain router
#[derive(Clone)]
pub struct MatchingState {
    pub engine: MatchEngine,
    pub auth: AuthConfig,
}

impl FromRef<MatchingState> for AuthConfig {
    fn from_ref(state: &MatchingState) -> Self {
        state.auth.clone()
    }
}
