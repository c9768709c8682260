//! Team chat history handlers
//!
//! History is a member-only surface. Real-time fan-out is out of scope;
//! these endpoints persist and read the transcript.

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

use crate::domain::{ChatMessage, MessageKind, Team};
use crate::repository::{MessageStore, TeamStore, UserDirectory};

use super::super::middleware::{AuthUser, TeamsState};

const DEFAULT_RECENT_LIMIT: usize = 50;
const MAX_RECENT_LIMIT: usize = 200;

#[derive(Debug, Deserialize, Validate)]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 1000))]
    pub content: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessage> for MessageResponse {
    fn from(message: ChatMessage) -> Self {
        Self {
            id: message.id,
            team_id: message.team_id,
            sender_id: message.sender_id,
            content: message.content,
            kind: message.kind,
            created_at: message.created_at,
        }
    }
}

async fn member_team(state: &TeamsState, team_id: Uuid, user_id: Uuid) -> Result<Team> {
    let team = state.repos.teams.get(team_id).await?;
    if !team.is_member(user_id) {
        return Err(Error::Authorization(
            "Only team members can access team chat".to_string(),
        ));
    }
    Ok(team)
}

pub async fn post_message(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<PostMessageRequest>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let team = member_team(&state, team_id, auth.user_id).await?;

    let message = ChatMessage::new(team.id, auth.user_id, request.content, MessageKind::Chat)?;
    state.repos.messages.create(&message).await?;
    tracing::info!(team_id = %team.id, sender = %auth.user_id, "Chat message posted");
    Ok((StatusCode::CREATED, Json(message.into())))
}

pub async fn team_messages(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
    Query(pagination): Query<PaginationQuery>,
) -> Result<Json<Page<MessageResponse>>> {
    member_team(&state, team_id, auth.user_id).await?;

    // History order is fixed newest-first; only page and size apply
    let page = pagination.to_page_request();
    let messages = state.repos.messages.find_by_team(team_id, &page).await?;
    Ok(Json(messages.map(MessageResponse::from)))
}

pub async fn recent_messages(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<MessageResponse>>> {
    member_team(&state, team_id, auth.user_id).await?;

    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .clamp(1, MAX_RECENT_LIMIT);
    let messages = state.repos.messages.recent(team_id, limit).await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

/// Append a join/leave marker to the team transcript. Best effort: a failure
/// here never rolls back the membership change, it is only logged.
pub(crate) async fn record_membership_event(
    state: &TeamsState,
    team_id: Uuid,
    user_id: Uuid,
    kind: MessageKind,
) {
    let name = match state.repos.users.get(user_id).await {
        Ok(profile) => profile.name,
        Err(_) => "A member".to_string(),
    };
    let verb = match kind {
        MessageKind::Join => "joined",
        _ => "left",
    };
    let content = format!("{} {} the team", name, verb);
    let message = match ChatMessage::new(team_id, user_id, content, kind) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(team_id = %team_id, error = %e, "Membership event message invalid");
            return;
        }
    };
    if let Err(e) = state.repos.messages.create(&message).await {
        tracing::warn!(team_id = %team_id, error = %e, "Membership event message not recorded");
    }
}
