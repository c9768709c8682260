//! Team registry handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use hackmate_common::{Error, Page, PaginationQuery, Result, ValidatedJson};

use crate::domain::{MessageKind, Team, TeamStatus, UserProfile};
use crate::repository::{JoinPath, TeamFilter, TeamStore, UserDirectory};

use super::super::middleware::{AuthUser, TeamsState};
use super::messages;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub project_domain: String,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[validate(range(min = 2, max = 20))]
    pub max_members: u32,
    #[serde(default = "default_open")]
    pub is_open: bool,
}

fn default_open() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub project_domain: Option<String>,
    pub required_skills: Option<Vec<String>>,
    #[validate(range(min = 2, max = 20))]
    pub max_members: Option<u32>,
    pub is_open: Option<bool>,
    pub status: Option<TeamStatus>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TeamListQuery {
    pub domain: Option<String>,
    pub skill: Option<String>,
    pub q: Option<String>,
    pub open: Option<bool>,
}

impl TeamListQuery {
    pub fn to_filter(&self) -> TeamFilter {
        TeamFilter {
            domain: self.domain.clone(),
            skill: self.skill.clone(),
            search: self.q.clone(),
            open_only: self.open.unwrap_or(false),
            ..TeamFilter::discover()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub project_domain: String,
    pub required_skills: Vec<String>,
    pub creator_id: Uuid,
    pub member_count: usize,
    pub max_members: u32,
    pub is_open: bool,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        let mut required_skills: Vec<String> = team.required_skills.into_iter().collect();
        required_skills.sort();
        Self {
            id: team.id,
            name: team.name,
            description: team.description,
            project_domain: team.project_domain,
            required_skills,
            creator_id: team.creator_id,
            member_count: team.member_ids.len(),
            max_members: team.max_members,
            is_open: team.is_open,
            status: team.status,
            created_at: team.created_at,
            updated_at: team.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub is_creator: bool,
}

impl MemberResponse {
    fn new(profile: UserProfile, creator_id: Uuid) -> Self {
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
            is_creator: profile.id == creator_id,
        }
    }
}

pub async fn create_team(
    State(state): State<TeamsState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<CreateTeamRequest>,
) -> Result<(StatusCode, Json<TeamResponse>)> {
    let team = Team::new(
        auth.user_id,
        request.name,
        request.description,
        request.project_domain,
        request.required_skills.into_iter().collect(),
        request.max_members,
        request.is_open,
    )?;
    state.repos.teams.create(&team).await?;

    tracing::info!(team_id = %team.id, creator = %auth.user_id, "Team created");
    Ok((StatusCode::CREATED, Json(team.into())))
}

pub async fn list_teams(
    State(state): State<TeamsState>,
    Query(filter): Query<TeamListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Page<TeamResponse>>> {
    let page = state
        .repos
        .teams
        .list(&filter.to_filter(), &pagination.to_page_request())
        .await?;
    Ok(Json(page.map(TeamResponse::from)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

pub async fn search_teams(
    State(state): State<TeamsState>,
    Query(search): Query<SearchQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Page<TeamResponse>>> {
    let filter = TeamFilter {
        search: Some(search.q),
        ..TeamFilter::discover()
    };
    let page = state
        .repos
        .teams
        .list(&filter, &pagination.to_page_request())
        .await?;
    Ok(Json(page.map(TeamResponse::from)))
}

pub async fn available_teams(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Query(filter): Query<TeamListQuery>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Page<TeamResponse>>> {
    let page = state
        .repos
        .teams
        .joinable_for(
            auth.user_id,
            &filter.to_filter(),
            &pagination.to_page_request(),
        )
        .await?;
    Ok(Json(page.map(TeamResponse::from)))
}

pub async fn my_teams(
    State(state): State<TeamsState>,
    auth: AuthUser,
) -> Result<Json<Vec<TeamResponse>>> {
    let teams = state.repos.teams.find_by_member(auth.user_id).await?;
    Ok(Json(teams.into_iter().map(TeamResponse::from).collect()))
}

pub async fn created_teams(
    State(state): State<TeamsState>,
    auth: AuthUser,
) -> Result<Json<Vec<TeamResponse>>> {
    let teams = state.repos.teams.find_by_creator(auth.user_id).await?;
    Ok(Json(teams.into_iter().map(TeamResponse::from).collect()))
}

pub async fn get_team(
    State(state): State<TeamsState>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamResponse>> {
    let team = state.repos.teams.get(team_id).await?;
    Ok(Json(team.into()))
}

pub async fn update_team(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateTeamRequest>,
) -> Result<Json<TeamResponse>> {
    let mut team = state.repos.teams.get(team_id).await?;
    if team.creator_id != auth.user_id {
        return Err(Error::Authorization(
            "Only the team creator can update the team".to_string(),
        ));
    }

    // Partial update: only supplied fields change
    if let Some(name) = request.name {
        team.name = name;
    }
    if let Some(description) = request.description {
        team.description = description;
    }
    if let Some(project_domain) = request.project_domain {
        team.project_domain = project_domain;
    }
    if let Some(required_skills) = request.required_skills {
        team.required_skills = required_skills.into_iter().collect();
    }
    if let Some(max_members) = request.max_members {
        team.max_members = max_members;
    }
    if let Some(is_open) = request.is_open {
        team.is_open = is_open;
    }
    if let Some(status) = request.status {
        team.status = status;
    }
    team.updated_at = Utc::now();
    team.validate()?;

    state.repos.teams.update(&team).await?;
    Ok(Json(team.into()))
}

pub async fn delete_team(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<StatusCode> {
    let team = state.repos.teams.get(team_id).await?;
    if team.creator_id != auth.user_id {
        return Err(Error::Authorization(
            "Only the team creator can delete the team".to_string(),
        ));
    }

    state.repos.teams.delete(team_id).await?;
    tracing::info!(team_id = %team_id, "Team deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_team(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamResponse>> {
    let team = state
        .repos
        .teams
        .add_member(team_id, auth.user_id, JoinPath::OpenJoin)
        .await?;
    tracing::info!(team_id = %team_id, user = %auth.user_id, "Member joined");
    messages::record_membership_event(&state, team_id, auth.user_id, MessageKind::Join).await;
    Ok(Json(team.into()))
}

pub async fn leave_team(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Json<TeamResponse>> {
    let team = state.repos.teams.remove_member(team_id, auth.user_id).await?;
    tracing::info!(team_id = %team_id, user = %auth.user_id, "Member left");
    messages::record_membership_event(&state, team_id, auth.user_id, MessageKind::Leave).await;
    Ok(Json(team.into()))
}

pub async fn team_members(
    State(state): State<TeamsState>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<MemberResponse>>> {
    let team = state.repos.teams.get(team_id).await?;

    let mut members = Vec::with_capacity(team.member_ids.len());
    for member_id in &team.member_ids {
        match state.repos.users.get(*member_id).await {
            Ok(profile) => members.push(MemberResponse::new(profile, team.creator_id)),
            // Directory gaps are tolerated; membership is the source of truth
            Err(Error::NotFound(_)) => {
                tracing::warn!(user = %member_id, "Member missing from user directory");
            }
            Err(e) => return Err(e),
        }
    }
    members.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    Ok(Json(members))
}
