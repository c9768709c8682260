//! User directory read surface

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hackmate_common::Result;

use crate::domain::UserProfile;
use crate::repository::UserDirectory;

use super::super::middleware::TeamsState;

const SEARCH_LIMIT: usize = 50;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        let mut skills: Vec<String> = profile.skills.into_iter().collect();
        skills.sort();
        let mut interests: Vec<String> = profile.interests.into_iter().collect();
        interests.sort();
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            skills,
            interests,
            created_at: profile.created_at,
        }
    }
}

pub async fn get_user(
    State(state): State<TeamsState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>> {
    let profile = state.repos.users.get(user_id).await?;
    Ok(Json(profile.into()))
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub q: String,
}

pub async fn search_users(
    State(state): State<TeamsState>,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Vec<UserResponse>>> {
    let users = state.repos.users.search(&query.q, SEARCH_LIMIT).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
