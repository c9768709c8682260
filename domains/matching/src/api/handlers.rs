//! Matching engine handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hackmate_common::{Page, PaginationQuery, Result};
use hackmate_teams::api::handlers::teams::{TeamListQuery, TeamResponse};
use hackmate_teams::api::handlers::users::UserResponse;
use hackmate_teams::api::AuthUser;

use crate::engine::{DiscoveryFilters, MatchingStats, DEFAULT_LIMIT};

use super::MatchingState;

const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize, Default)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

impl LimitQuery {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct TeamMatchResponse {
    pub team: TeamResponse,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct UserMatchResponse {
    pub user: UserResponse,
    pub score: f64,
}

pub async fn recommended_teams(
    State(state): State<MatchingState>,
    auth: AuthUser,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<TeamMatchResponse>>> {
    let matches = state
        .engine
        .recommend_teams_for_user(auth.user_id, query.limit())
        .await?;
    tracing::info!(user = %auth.user_id, matches = matches.len(), "Team recommendations served");
    Ok(Json(
        matches
            .into_iter()
            .map(|m| TeamMatchResponse {
                team: m.team.into(),
                score: m.score,
            })
            .collect(),
    ))
}

pub async fn recommended_users(
    State(state): State<MatchingState>,
    _auth: AuthUser,
    Path(team_id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<UserMatchResponse>>> {
    let matches = state
        .engine
        .recommend_users_for_team(team_id, query.limit())
        .await?;
    tracing::info!(team_id = %team_id, matches = matches.len(), "User recommendations served");
    Ok(Json(
        matches
            .into_iter()
            .map(|m| UserMatchResponse {
                user: m.user.into(),
                score: m.score,
            })
            .collect(),
    ))
}

pub async fn discover_teams(
    State(state): State<MatchingState>,
    auth: AuthUser,
    Query(filter): Query<TeamListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Page<TeamResponse>>> {
    let page = state
        .engine
        .discover(
            auth.user_id,
            &filter.to_filter(),
            &pagination.to_page_request(),
        )
        .await?;
    Ok(Json(page.map(TeamResponse::from)))
}

pub async fn trending_domains(
    State(state): State<MatchingState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::engine::RankedTag>>> {
    Ok(Json(state.engine.trending_domains(query.limit()).await?))
}

pub async fn popular_skills(
    State(state): State<MatchingState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<crate::engine::RankedTag>>> {
    Ok(Json(state.engine.popular_skills(query.limit()).await?))
}

pub async fn matching_stats(
    State(state): State<MatchingState>,
    auth: AuthUser,
) -> Result<Json<MatchingStats>> {
    Ok(Json(state.engine.stats(auth.user_id).await?))
}

pub async fn discovery_filters(
    State(state): State<MatchingState>,
) -> Result<Json<DiscoveryFilters>> {
    Ok(Json(state.engine.discovery_filters().await?))
}
