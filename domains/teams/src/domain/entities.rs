//! Domain entities for the Hackmate teams domain
//!
//! Team is the aggregate that owns the member-id set; "teams a user belongs
//! to" is always a derived query, never a second mutable collection on the
//! user side. Each entity carries its own validation and invariant checks.

use std::collections::HashSet;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hackmate_common::{Error, Result};

pub use crate::domain::state::InvitationStatus;
use crate::domain::state::{
    InvitationEvent, InvitationGuardContext, InvitationStateMachine, StateError,
};

/// Smallest useful team: creator plus at least one slot
pub const MIN_TEAM_CAPACITY: u32 = 2;

/// Largest supported team
pub const MAX_TEAM_CAPACITY: u32 = 20;

/// Invitations lapse this long after being sent
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Longest allowed chat message
pub const MAX_MESSAGE_LENGTH: usize = 1000;

/// Read model of a user supplied by the identity store.
///
/// The core never mutates profiles; skills and interests feed the matching
/// engine and the invitation target resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub skills: HashSet<String>,
    pub interests: HashSet<String>,
    pub created_at: DateTime<Utc>,
}

/// Team lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TeamStatus {
    #[default]
    Active,
    Archived,
}

impl TeamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for TeamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Team aggregate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub project_domain: String,
    pub required_skills: HashSet<String>,
    pub creator_id: Uuid,
    pub member_ids: HashSet<Uuid>,
    pub max_members: u32,
    pub is_open: bool,
    pub status: TeamStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Create a new team with the creator seeded as its sole member
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        creator_id: Uuid,
        name: String,
        description: String,
        project_domain: String,
        required_skills: HashSet<String>,
        max_members: u32,
        is_open: bool,
    ) -> Result<Self> {
        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4(),
            name,
            description,
            project_domain,
            required_skills,
            creator_id,
            member_ids: HashSet::from([creator_id]),
            max_members,
            is_open,
            status: TeamStatus::Active,
            created_at: now,
            updated_at: now,
        };
        team.validate()?;
        Ok(team)
    }

    /// Validate field constraints and aggregate invariants
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.name.len() > 100 {
            return Err(Error::Validation(
                "Team name must be 1-100 characters".to_string(),
            ));
        }

        if self.description.len() > 1000 {
            return Err(Error::Validation(
                "Team description must be at most 1000 characters".to_string(),
            ));
        }

        if self.project_domain.is_empty() || self.project_domain.len() > 100 {
            return Err(Error::Validation(
                "Project domain must be 1-100 characters".to_string(),
            ));
        }

        if !(MIN_TEAM_CAPACITY..=MAX_TEAM_CAPACITY).contains(&self.max_members) {
            return Err(Error::Validation(format!(
                "Max members must be between {} and {}",
                MIN_TEAM_CAPACITY, MAX_TEAM_CAPACITY
            )));
        }

        // Aggregate invariants: capacity bound and creator membership
        if self.member_ids.len() as u32 > self.max_members {
            return Err(Error::Validation(
                "Member count exceeds team capacity".to_string(),
            ));
        }

        if !self.member_ids.contains(&self.creator_id) {
            return Err(Error::Validation(
                "Creator must always be a team member".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_full(&self) -> bool {
        self.member_ids.len() as u32 >= self.max_members
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }

    pub fn free_slots(&self) -> u32 {
        self.max_members.saturating_sub(self.member_ids.len() as u32)
    }

    /// Whole days since the team was created, clamped at zero
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days().max(0)
    }

    /// Whether the team accepts new members through any path at all
    pub fn is_active(&self) -> bool {
        self.status == TeamStatus::Active
    }
}

/// The exactly-one target of an invitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationTarget {
    /// Direct invitation to a known user
    User(Uuid),
    /// Email invitation, claimable via token
    Email(String),
    /// Phone invitation, claimable via token
    Phone(String),
}

impl InvitationTarget {
    pub fn kind(&self) -> InvitationType {
        match self {
            Self::User(_) => InvitationType::Direct,
            Self::Email(_) => InvitationType::Email,
            Self::Phone(_) => InvitationType::Phone,
        }
    }
}

/// Invitation type, derived from which target field is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationType {
    Direct,
    Email,
    Phone,
}

impl InvitationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(Self::Direct),
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }
}

/// Invitation entity
///
/// The inviter must be a team member at send time; this is not re-validated
/// later. Email/phone invitations start without an invitee id and bind the
/// accepting user on token-based acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invitation {
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
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    /// Create a new pending invitation with a fresh opaque token
    pub fn new(team_id: Uuid, invited_by: Uuid, target: InvitationTarget) -> Result<Self> {
        let kind = target.kind();
        let (invitee_id, invitee_email, invitee_phone) = match target {
            InvitationTarget::User(id) => (Some(id), None, None),
            InvitationTarget::Email(email) => {
                if !email.contains('@') || email.len() < 3 {
                    return Err(Error::Validation("Invalid email format".to_string()));
                }
                (None, Some(email.to_lowercase()), None)
            }
            InvitationTarget::Phone(phone) => {
                if phone.is_empty() {
                    return Err(Error::Validation(
                        "Phone number cannot be empty".to_string(),
                    ));
                }
                (None, None, Some(phone))
            }
        };

        let now = Utc::now();
        Ok(Invitation {
            id: Uuid::new_v4(),
            team_id,
            invited_by,
            invitee_id,
            invitee_email,
            invitee_phone,
            kind,
            status: InvitationStatus::Pending,
            token: Self::generate_token()?,
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
            created_at: now,
            updated_at: now,
        })
    }

    /// Generate a URL-safe opaque token: 32 random bytes, base64 encoded
    fn generate_token() -> Result<String> {
        let mut token_bytes = [0u8; 32];
        getrandom::getrandom(&mut token_bytes)
            .map_err(|e| Error::Internal(format!("Failed to generate random bytes: {}", e)))?;
        Ok(URL_SAFE_NO_PAD.encode(token_bytes))
    }

    /// Reconstruct the target enum from the stored fields
    pub fn target(&self) -> InvitationTarget {
        match self.kind {
            InvitationType::Direct => {
                InvitationTarget::User(self.invitee_id.unwrap_or_default())
            }
            InvitationType::Email => {
                InvitationTarget::Email(self.invitee_email.clone().unwrap_or_default())
            }
            InvitationType::Phone => {
                InvitationTarget::Phone(self.invitee_phone.clone().unwrap_or_default())
            }
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Lazy expiry: force the Expired transition if the deadline has passed.
    ///
    /// Returns true when the transition was applied; the caller is
    /// responsible for persisting the new state.
    pub fn lapse_if_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.status == InvitationStatus::Pending && self.is_expired(now) {
            self.status = InvitationStatus::Expired;
            self.updated_at = now;
            return true;
        }
        false
    }

    /// Accept the invitation
    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.apply_transition(InvitationEvent::Accept, now)?;
        self.status = InvitationStatus::Accepted;
        self.updated_at = now;
        Ok(())
    }

    /// Decline the invitation
    pub fn decline(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.apply_transition(InvitationEvent::Decline, now)?;
        self.status = InvitationStatus::Declined;
        self.updated_at = now;
        Ok(())
    }

    fn apply_transition(&self, event: InvitationEvent, now: DateTime<Utc>) -> Result<()> {
        let context = InvitationGuardContext {
            is_expired: self.is_expired(now),
        };
        InvitationStateMachine::transition(self.status, event, Some(&context))
            .map(|_| ())
            .map_err(|e| match e {
                StateError::GuardFailed(_) => Error::InvitationExpired,
                StateError::TerminalState(_) | StateError::InvalidTransition { .. } => {
                    Error::NotPending
                }
            })
    }
}

/// What a chat message records: user text or a membership event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Chat,
    Join,
    Leave,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Join => "join",
            Self::Leave => "leave",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "chat" => Some(Self::Chat),
            "join" => Some(Self::Join),
            "leave" => Some(Self::Leave),
            _ => None,
        }
    }
}

/// A message in a team's chat history.
///
/// History is append-only and lives exactly as long as its team; deleting
/// the team removes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub team_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub kind: MessageKind,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(team_id: Uuid, sender_id: Uuid, content: String, kind: MessageKind) -> Result<Self> {
        if content.trim().is_empty() || content.len() > MAX_MESSAGE_LENGTH {
            return Err(Error::Validation(format!(
                "Message content must be 1-{} characters",
                MAX_MESSAGE_LENGTH
            )));
        }
        Ok(ChatMessage {
            id: Uuid::new_v4(),
            team_id,
            sender_id,
            content,
            kind,
            created_at: Utc::now(),
        })
    }
}
