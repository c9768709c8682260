//! Invitation workflow handlers
//!
//! Workflow rules live here; state transitions live in the domain entity.
//! Expiry is lazy: any read or action that touches a stale Pending
//! invitation persists the Expired state as a side effect.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use hackmate_common::{Error, Result, ValidatedJson};
use hackmate_notify::{InvitationNotice, NoticeChannel, Notifier};

use crate::domain::{
    Invitation, InvitationStatus, InvitationTarget, InvitationType, MessageKind, Team,
};
use crate::repository::{InvitationStore, JoinPath, TeamStore, UserDirectory};

use super::super::middleware::{AuthUser, TeamsState};
use super::messages;

#[derive(Debug, Deserialize, Validate)]
pub struct SendInvitationRequest {
    pub team_id: Uuid,
    pub invitee_id: Option<Uuid>,
    #[validate(email)]
    pub invitee_email: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub invitee_phone: Option<String>,
}

impl SendInvitationRequest {
    /// Exactly one of the three target fields must be set
    fn target(&self) -> Result<InvitationTarget> {
        match (
            self.invitee_id,
            self.invitee_email.clone(),
            self.invitee_phone.clone(),
        ) {
            (Some(id), None, None) => Ok(InvitationTarget::User(id)),
            (None, Some(email), None) => Ok(InvitationTarget::Email(email)),
            (None, None, Some(phone)) => Ok(InvitationTarget::Phone(phone)),
            _ => Err(Error::Validation(
                "Exactly one of invitee_id, invitee_email, invitee_phone is required"
                    .to_string(),
            )),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvitationResponse {
    pub id: Uuid,
    pub team_id: Uuid,
    pub invited_by: Uuid,
    pub invitee_id: Option<Uuid>,
    pub invitee_email: Option<String>,
    pub invitee_phone: Option<String>,
    pub kind: InvitationType,
    pub status: InvitationStatus,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Invitation> for InvitationResponse {
    fn from(inv: Invitation) -> Self {
        Self {
            id: inv.id,
            team_id: inv.team_id,
            invited_by: inv.invited_by,
            invitee_id: inv.invitee_id,
            invitee_email: inv.invitee_email,
            invitee_phone: inv.invitee_phone,
            kind: inv.kind,
            status: inv.status,
            token: inv.token,
            expires_at: inv.expires_at,
            created_at: inv.created_at,
        }
    }
}

pub async fn send_invitation(
    State(state): State<TeamsState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<SendInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>)> {
    let target = request.target()?;
    let team = state.repos.teams.get(request.team_id).await?;

    if !team.is_member(auth.user_id) {
        return Err(Error::Authorization(
            "Only team members can send invitations".to_string(),
        ));
    }
    if !team.is_active() {
        return Err(Error::TeamNotOpen);
    }
    if team.is_full() {
        return Err(Error::TeamFull);
    }

    // Target-specific checks; phone targets are deliberately not
    // deduplicated because numbers are free-form
    match &target {
        InvitationTarget::User(invitee_id) => {
            state.repos.users.get(*invitee_id).await.map_err(|e| match e {
                Error::NotFound(_) => Error::NotFound("Invitee not found".to_string()),
                other => other,
            })?;
            if team.is_member(*invitee_id) {
                return Err(Error::AlreadyMember);
            }
            if state
                .repos
                .invitations
                .has_pending_for_user(team.id, *invitee_id)
                .await?
            {
                return Err(Error::DuplicatePending);
            }
        }
        InvitationTarget::Email(email) => {
            if state
                .repos
                .invitations
                .has_pending_for_email(team.id, email)
                .await?
            {
                return Err(Error::DuplicatePending);
            }
        }
        InvitationTarget::Phone(_) => {}
    }

    let invitation = Invitation::new(team.id, auth.user_id, target)?;
    state.repos.invitations.create(&invitation).await?;
    tracing::info!(
        invitation_id = %invitation.id,
        team_id = %team.id,
        kind = invitation.kind.as_str(),
        "Invitation sent"
    );

    dispatch_notice(&state, &team, auth.user_id, &invitation).await;

    Ok((StatusCode::CREATED, Json(invitation.into())))
}

/// Best-effort notification after the invitation is committed. Failures are
/// logged and never surfaced to the caller.
async fn dispatch_notice(
    state: &TeamsState,
    team: &Team,
    inviter_id: Uuid,
    invitation: &Invitation,
) {
    let channel = match invitation.target() {
        InvitationTarget::Email(email) => Some(NoticeChannel::Email(email)),
        InvitationTarget::Phone(phone) => Some(NoticeChannel::Phone(phone)),
        InvitationTarget::User(user_id) => match state.repos.users.get(user_id).await {
            Ok(profile) => Some(NoticeChannel::Email(profile.email)),
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "Invitee lookup failed for notice");
                None
            }
        },
    };
    let Some(channel) = channel else { return };

    let inviter_name = match state.repos.users.get(inviter_id).await {
        Ok(profile) => profile.name,
        Err(_) => "A team member".to_string(),
    };

    let notice = InvitationNotice {
        channel,
        team_name: team.name.clone(),
        inviter_name,
        token: invitation.token.clone(),
        expires_at: invitation.expires_at,
    };
    if let Err(e) = state.notifier.send_invitation(&notice).await {
        tracing::warn!(invitation_id = %invitation.id, error = %e, "Invitation notice failed");
    }
}

/// Apply lazy expiry to a batch of invitations, persisting any that lapse
async fn lapse_all(state: &TeamsState, invitations: &mut [Invitation]) -> Result<()> {
    let now = Utc::now();
    for invitation in invitations.iter_mut() {
        if invitation.lapse_if_expired(now) {
            state.repos.invitations.update(invitation).await?;
        }
    }
    Ok(())
}

pub async fn received_invitations(
    State(state): State<TeamsState>,
    auth: AuthUser,
) -> Result<Json<Vec<InvitationResponse>>> {
    let mut invitations = state.repos.invitations.find_by_invitee(auth.user_id).await?;
    lapse_all(&state, &mut invitations).await?;
    Ok(Json(
        invitations.into_iter().map(InvitationResponse::from).collect(),
    ))
}

pub async fn sent_invitations(
    State(state): State<TeamsState>,
    auth: AuthUser,
) -> Result<Json<Vec<InvitationResponse>>> {
    let mut invitations = state.repos.invitations.find_by_inviter(auth.user_id).await?;
    lapse_all(&state, &mut invitations).await?;
    Ok(Json(
        invitations.into_iter().map(InvitationResponse::from).collect(),
    ))
}

pub async fn team_invitations(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<InvitationResponse>>> {
    let team = state.repos.teams.get(team_id).await?;
    if !team.is_member(auth.user_id) {
        return Err(Error::Authorization(
            "Only team members can view team invitations".to_string(),
        ));
    }

    let mut invitations = state.repos.invitations.find_by_team(team_id).await?;
    lapse_all(&state, &mut invitations).await?;
    Ok(Json(
        invitations.into_iter().map(InvitationResponse::from).collect(),
    ))
}

pub async fn accept_invitation(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<InvitationResponse>> {
    let mut invitation = state.repos.invitations.get(invitation_id).await?;

    if invitation.invitee_id != Some(auth.user_id) {
        return Err(Error::Authorization(
            "Invitation is addressed to a different user".to_string(),
        ));
    }

    accept_and_join(&state, &mut invitation, auth.user_id).await?;
    Ok(Json(invitation.into()))
}

pub async fn decline_invitation(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(invitation_id): Path<Uuid>,
) -> Result<Json<InvitationResponse>> {
    let mut invitation = state.repos.invitations.get(invitation_id).await?;

    if invitation.invitee_id != Some(auth.user_id) {
        return Err(Error::Authorization(
            "Invitation is addressed to a different user".to_string(),
        ));
    }

    let now = Utc::now();
    if invitation.lapse_if_expired(now) {
        state.repos.invitations.update(&invitation).await?;
        return Err(Error::InvitationExpired);
    }

    invitation.decline(now)?;
    state.repos.invitations.update(&invitation).await?;
    tracing::info!(invitation_id = %invitation.id, "Invitation declined");
    Ok(Json(invitation.into()))
}

pub async fn get_by_token(
    State(state): State<TeamsState>,
    Path(token): Path<String>,
) -> Result<Json<InvitationResponse>> {
    let mut invitation = state.repos.invitations.get_by_token(&token).await?;

    if invitation.lapse_if_expired(Utc::now()) {
        state.repos.invitations.update(&invitation).await?;
        return Err(Error::InvitationExpired);
    }
    if invitation.status != InvitationStatus::Pending {
        return Err(Error::NotPending);
    }
    Ok(Json(invitation.into()))
}

pub async fn accept_by_token(
    State(state): State<TeamsState>,
    auth: AuthUser,
    Path(token): Path<String>,
) -> Result<Json<InvitationResponse>> {
    let mut invitation = state.repos.invitations.get_by_token(&token).await?;

    // Direct invitations stay bound to their invitee even via token
    if let Some(invitee_id) = invitation.invitee_id {
        if invitee_id != auth.user_id {
            return Err(Error::Authorization(
                "Invitation is addressed to a different user".to_string(),
            ));
        }
    } else {
        invitation.invitee_id = Some(auth.user_id);
    }

    accept_and_join(&state, &mut invitation, auth.user_id).await?;
    Ok(Json(invitation.into()))
}

/// Shared acceptance path: lazy expiry, state check, atomic membership add,
/// then the persisted transition. Membership is added before the status
/// flips so a capacity failure leaves the invitation Pending; an
/// AlreadyMember outcome still accepts (idempotent).
async fn accept_and_join(
    state: &TeamsState,
    invitation: &mut Invitation,
    user_id: Uuid,
) -> Result<()> {
    let now = Utc::now();
    if invitation.lapse_if_expired(now) {
        state.repos.invitations.update(invitation).await?;
        return Err(Error::InvitationExpired);
    }
    if invitation.status == InvitationStatus::Accepted {
        // Repeat accept by a current member short-circuits to success
        let team = state.repos.teams.get(invitation.team_id).await?;
        if team.is_member(user_id) {
            return Ok(());
        }
        return Err(Error::NotPending);
    }
    if invitation.status != InvitationStatus::Pending {
        return Err(Error::NotPending);
    }

    match state
        .repos
        .teams
        .add_member(invitation.team_id, user_id, JoinPath::InvitationAccept)
        .await
    {
        Ok(_) => {
            messages::record_membership_event(
                state,
                invitation.team_id,
                user_id,
                MessageKind::Join,
            )
            .await;
        }
        Err(Error::AlreadyMember) => {}
        Err(e) => return Err(e),
    }

    invitation.accept(now)?;
    state.repos.invitations.update(invitation).await?;
    tracing::info!(
        invitation_id = %invitation.id,
        team_id = %invitation.team_id,
        "Invitation accepted"
    );
    Ok(())
}
