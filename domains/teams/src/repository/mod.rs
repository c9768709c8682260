//! Storage abstraction for the teams domain
//!
//! Handlers talk to these traits only. The Postgres implementation backs
//! deployments; the in-memory implementation backs local runs and the
//! integration suite. Both uphold the same atomicity contract on
//! `add_member`: the capacity check and the insert happen under one lock or
//! one row lock, so at most one caller wins the last slot.

pub mod memory;
pub mod postgres;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use hackmate_common::{Page, PageRequest, Result};

use crate::domain::{ChatMessage, Invitation, Team, TeamStatus, UserProfile};

/// Filter for team discovery queries. Empty filter matches every team.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamFilter {
    pub domain: Option<String>,
    pub skill: Option<String>,
    /// Free-text match over name, description, and domain
    pub search: Option<String>,
    pub open_only: bool,
    pub with_space_only: bool,
    pub status: Option<TeamStatus>,
}

impl TeamFilter {
    /// Filter used by the public discovery endpoint: active teams only,
    /// optionally narrowed further by the caller.
    pub fn discover() -> Self {
        Self {
            status: Some(TeamStatus::Active),
            ..Default::default()
        }
    }

    pub fn matches(&self, team: &Team) -> bool {
        if let Some(status) = self.status {
            if team.status != status {
                return false;
            }
        }
        if let Some(domain) = &self.domain {
            if !team.project_domain.eq_ignore_ascii_case(domain) {
                return false;
            }
        }
        if let Some(skill) = &self.skill {
            if !team
                .required_skills
                .iter()
                .any(|s| s.eq_ignore_ascii_case(skill))
            {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = team.name.to_lowercase().contains(&needle)
                || team.description.to_lowercase().contains(&needle)
                || team.project_domain.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if self.open_only && !team.is_open {
            return false;
        }
        if self.with_space_only && team.is_full() {
            return false;
        }
        true
    }
}

/// Aggregate snapshot used by the matching stats endpoint
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TeamStats {
    pub total_teams: u64,
    pub open_teams: u64,
    pub full_teams: u64,
    pub total_members: u64,
}

/// How a membership change was initiated. Open joins require the team to be
/// open; invitation acceptance bypasses that check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPath {
    OpenJoin,
    InvitationAccept,
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    async fn create(&self, team: &Team) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Team>;

    async fn update(&self, team: &Team) -> Result<()>;

    /// Delete the team and cascade to its invitations and chat history
    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn list(&self, filter: &TeamFilter, page: &PageRequest) -> Result<Page<Team>>;

    async fn find_by_member(&self, user_id: Uuid) -> Result<Vec<Team>>;

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Team>>;

    /// Atomically add a member, enforcing status, capacity, and membership
    /// invariants under a single lock or row lock.
    async fn add_member(&self, team_id: Uuid, user_id: Uuid, path: JoinPath) -> Result<Team>;

    /// Remove a member. The creator can never be removed.
    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<Team>;

    /// Active teams the user could be recommended into: not already a
    /// member, regardless of open flag or fullness. The matching engine
    /// applies its own availability weighting on top.
    async fn candidates_for(&self, user_id: Uuid) -> Result<Vec<Team>>;

    /// The joinable universe for a user: active, open, not full, not
    /// already a member, narrowed by the filter and paginated.
    async fn joinable_for(
        &self,
        user_id: Uuid,
        filter: &TeamFilter,
        page: &PageRequest,
    ) -> Result<Page<Team>>;

    /// Project domains of teams created since the cutoff, most frequent
    /// first, ties broken alphabetically.
    async fn trending_domains(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, u64)>>;

    /// Required skills across active teams by frequency, most frequent
    /// first, ties broken alphabetically.
    async fn popular_skills(&self, limit: usize) -> Result<Vec<(String, u64)>>;

    async fn stats(&self) -> Result<TeamStats>;
}

#[async_trait]
pub trait InvitationStore: Send + Sync {
    async fn create(&self, invitation: &Invitation) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Invitation>;

    async fn get_by_token(&self, token: &str) -> Result<Invitation>;

    async fn update(&self, invitation: &Invitation) -> Result<()>;

    /// Whether a pending invitation for this user already exists on the team
    async fn has_pending_for_user(&self, team_id: Uuid, user_id: Uuid) -> Result<bool>;

    /// Whether a pending invitation for this email already exists on the team
    async fn has_pending_for_email(&self, team_id: Uuid, email: &str) -> Result<bool>;

    async fn find_by_team(&self, team_id: Uuid) -> Result<Vec<Invitation>>;

    async fn find_by_invitee(&self, user_id: Uuid) -> Result<Vec<Invitation>>;

    async fn find_by_inviter(&self, user_id: Uuid) -> Result<Vec<Invitation>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<UserProfile>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>>;

    async fn upsert(&self, profile: &UserProfile) -> Result<()>;

    /// All profiles except the given ids, for candidate enumeration
    async fn all_excluding(&self, exclude: &HashSet<Uuid>) -> Result<Vec<UserProfile>>;

    /// Free-text match over name, email, skills, and interests
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<UserProfile>>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn create(&self, message: &ChatMessage) -> Result<()>;

    /// Team chat history, newest first
    async fn find_by_team(&self, team_id: Uuid, page: &PageRequest) -> Result<Page<ChatMessage>>;

    /// The newest `limit` messages in chronological order
    async fn recent(&self, team_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>>;
}

/// Bundle of the stores, cloned into application state
#[derive(Clone)]
pub struct Repositories {
    pub teams: Arc<dyn TeamStore>,
    pub invitations: Arc<dyn InvitationStore>,
    pub users: Arc<dyn UserDirectory>,
    pub messages: Arc<dyn MessageStore>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            teams: Arc::new(postgres::PgTeamStore::new(pool.clone())),
            invitations: Arc::new(postgres::PgInvitationStore::new(pool.clone())),
            users: Arc::new(postgres::PgUserDirectory::new(pool.clone())),
            messages: Arc::new(postgres::PgMessageStore::new(pool)),
        }
    }

    pub fn memory() -> Self {
        let backend = Arc::new(memory::MemoryBackend::new());
        Self {
            teams: backend.clone(),
            invitations: backend.clone(),
            users: backend.clone(),
            messages: backend,
        }
    }
}
