//! In-memory storage backend
//!
//! A single `RwLock` over all three collections. No await points while the
//! lock is held, so every operation is atomic with respect to every other;
//! `add_member` in particular checks capacity and inserts under one write
//! guard, which is what makes the last-slot race safe here.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use hackmate_common::{Error, Page, PageRequest, Result, SortDirection};

use crate::domain::{ChatMessage, Invitation, Team, UserProfile};
use crate::repository::{
    InvitationStore, JoinPath, MessageStore, TeamFilter, TeamStats, TeamStore, UserDirectory,
};

#[derive(Default)]
struct State {
    teams: HashMap<Uuid, Team>,
    invitations: HashMap<Uuid, Invitation>,
    users: HashMap<Uuid, UserProfile>,
    messages: HashMap<Uuid, ChatMessage>,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| Error::Internal("Storage lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| Error::Internal("Storage lock poisoned".to_string()))
    }
}

fn team_not_found() -> Error {
    Error::NotFound("Team not found".to_string())
}

fn invitation_not_found() -> Error {
    Error::NotFound("Invitation not found".to_string())
}

fn sort_teams(teams: &mut [Team], page: &PageRequest) {
    teams.sort_by(|a, b| {
        let ordering = match page.sort_by.as_str() {
            "name" => a.name.cmp(&b.name),
            "updated_at" => a.updated_at.cmp(&b.updated_at),
            _ => a.created_at.cmp(&b.created_at),
        };
        // Stable secondary key so pagination never shuffles equal rows
        let ordering = ordering.then(a.id.cmp(&b.id));
        match page.sort_dir {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[async_trait]
impl TeamStore for MemoryBackend {
    async fn create(&self, team: &Team) -> Result<()> {
        let mut state = self.write()?;
        state.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Team> {
        let state = self.read()?;
        state.teams.get(&id).cloned().ok_or_else(team_not_found)
    }

    async fn update(&self, team: &Team) -> Result<()> {
        let mut state = self.write()?;
        if !state.teams.contains_key(&team.id) {
            return Err(team_not_found());
        }
        state.teams.insert(team.id, team.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.write()?;
        if state.teams.remove(&id).is_none() {
            return Err(team_not_found());
        }
        state.invitations.retain(|_, inv| inv.team_id != id);
        state.messages.retain(|_, msg| msg.team_id != id);
        Ok(())
    }

    async fn list(&self, filter: &TeamFilter, page: &PageRequest) -> Result<Page<Team>> {
        let state = self.read()?;
        let mut matching: Vec<Team> = state
            .teams
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        let total = matching.len() as u64;
        sort_teams(&mut matching, page);

        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn find_by_member(&self, user_id: Uuid) -> Result<Vec<Team>> {
        let state = self.read()?;
        let mut teams: Vec<Team> = state
            .teams
            .values()
            .filter(|t| t.is_member(user_id))
            .cloned()
            .collect();
        teams.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(teams)
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Team>> {
        let state = self.read()?;
        let mut teams: Vec<Team> = state
            .teams
            .values()
            .filter(|t| t.creator_id == user_id)
            .cloned()
            .collect();
        teams.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(teams)
    }

    async fn add_member(&self, team_id: Uuid, user_id: Uuid, path: JoinPath) -> Result<Team> {
        let mut state = self.write()?;
        let team = state.teams.get_mut(&team_id).ok_or_else(team_not_found)?;

        if !team.is_active() {
            return Err(Error::TeamNotOpen);
        }
        if path == JoinPath::OpenJoin && !team.is_open {
            return Err(Error::TeamNotOpen);
        }
        if team.is_member(user_id) {
            return Err(Error::AlreadyMember);
        }
        if team.is_full() {
            return Err(Error::TeamFull);
        }

        team.member_ids.insert(user_id);
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<Team> {
        let mut state = self.write()?;
        let team = state.teams.get_mut(&team_id).ok_or_else(team_not_found)?;

        if team.creator_id == user_id {
            return Err(Error::CreatorCannotLeave);
        }
        if !team.member_ids.remove(&user_id) {
            return Err(Error::NotAMember);
        }
        team.updated_at = Utc::now();
        Ok(team.clone())
    }

    async fn candidates_for(&self, user_id: Uuid) -> Result<Vec<Team>> {
        let state = self.read()?;
        let mut teams: Vec<Team> = state
            .teams
            .values()
            .filter(|t| t.is_active() && !t.is_member(user_id))
            .cloned()
            .collect();
        teams.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(teams)
    }

    async fn joinable_for(
        &self,
        user_id: Uuid,
        filter: &TeamFilter,
        page: &PageRequest,
    ) -> Result<Page<Team>> {
        let state = self.read()?;
        let mut matching: Vec<Team> = state
            .teams
            .values()
            .filter(|t| {
                t.is_active()
                    && t.is_open
                    && !t.is_full()
                    && !t.is_member(user_id)
                    && filter.matches(t)
            })
            .cloned()
            .collect();
        let total = matching.len() as u64;
        sort_teams(&mut matching, page);

        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn trending_domains(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, u64)>> {
        let state = self.read()?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for team in state.teams.values() {
            if team.is_active() && team.created_at >= since {
                *counts.entry(team.project_domain.clone()).or_default() += 1;
            }
        }
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn popular_skills(&self, limit: usize) -> Result<Vec<(String, u64)>> {
        let state = self.read()?;
        let mut counts: HashMap<String, u64> = HashMap::new();
        for team in state.teams.values() {
            if team.is_active() {
                for skill in &team.required_skills {
                    *counts.entry(skill.clone()).or_default() += 1;
                }
            }
        }
        let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    async fn stats(&self) -> Result<TeamStats> {
        let state = self.read()?;
        let active: Vec<&Team> = state.teams.values().filter(|t| t.is_active()).collect();
        Ok(TeamStats {
            total_teams: active.len() as u64,
            open_teams: active.iter().filter(|t| t.is_open).count() as u64,
            full_teams: active.iter().filter(|t| t.is_full()).count() as u64,
            total_members: active.iter().map(|t| t.member_ids.len() as u64).sum(),
        })
    }
}

#[async_trait]
impl InvitationStore for MemoryBackend {
    async fn create(&self, invitation: &Invitation) -> Result<()> {
        let mut state = self.write()?;
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Invitation> {
        let state = self.read()?;
        state
            .invitations
            .get(&id)
            .cloned()
            .ok_or_else(invitation_not_found)
    }

    async fn get_by_token(&self, token: &str) -> Result<Invitation> {
        let state = self.read()?;
        state
            .invitations
            .values()
            .find(|inv| inv.token == token)
            .cloned()
            .ok_or_else(invitation_not_found)
    }

    async fn update(&self, invitation: &Invitation) -> Result<()> {
        let mut state = self.write()?;
        if !state.invitations.contains_key(&invitation.id) {
            return Err(invitation_not_found());
        }
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn has_pending_for_user(&self, team_id: Uuid, user_id: Uuid) -> Result<bool> {
        let now = Utc::now();
        let state = self.read()?;
        Ok(state.invitations.values().any(|inv| {
            inv.team_id == team_id
                && inv.invitee_id == Some(user_id)
                && inv.status == crate::domain::InvitationStatus::Pending
                && !inv.is_expired(now)
        }))
    }

    async fn has_pending_for_email(&self, team_id: Uuid, email: &str) -> Result<bool> {
        let now = Utc::now();
        let email = email.to_lowercase();
        let state = self.read()?;
        Ok(state.invitations.values().any(|inv| {
            inv.team_id == team_id
                && inv.invitee_email.as_deref() == Some(email.as_str())
                && inv.status == crate::domain::InvitationStatus::Pending
                && !inv.is_expired(now)
        }))
    }

    async fn find_by_team(&self, team_id: Uuid) -> Result<Vec<Invitation>> {
        let state = self.read()?;
        let mut found: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|inv| inv.team_id == team_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn find_by_invitee(&self, user_id: Uuid) -> Result<Vec<Invitation>> {
        let state = self.read()?;
        let mut found: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|inv| inv.invitee_id == Some(user_id))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn find_by_inviter(&self, user_id: Uuid) -> Result<Vec<Invitation>> {
        let state = self.read()?;
        let mut found: Vec<Invitation> = state
            .invitations
            .values()
            .filter(|inv| inv.invited_by == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(found)
    }
}

#[async_trait]
impl UserDirectory for MemoryBackend {
    async fn get(&self, id: Uuid) -> Result<UserProfile> {
        let state = self.read()?;
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound("User not found".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let state = self.read()?;
        Ok(state
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<()> {
        let mut state = self.write()?;
        state.users.insert(profile.id, profile.clone());
        Ok(())
    }

    async fn all_excluding(&self, exclude: &HashSet<Uuid>) -> Result<Vec<UserProfile>> {
        let state = self.read()?;
        let mut users: Vec<UserProfile> = state
            .users
            .values()
            .filter(|u| !exclude.contains(&u.id))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<UserProfile>> {
        let needle = query.to_lowercase();
        let state = self.read()?;
        let mut users: Vec<UserProfile> = state
            .users
            .values()
            .filter(|u| {
                u.name.to_lowercase().contains(&needle)
                    || u.email.to_lowercase().contains(&needle)
                    || u.skills.iter().any(|s| s.to_lowercase().contains(&needle))
                    || u.interests
                        .iter()
                        .any(|i| i.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        users.truncate(limit);
        Ok(users)
    }
}

#[async_trait]
impl MessageStore for MemoryBackend {
    async fn create(&self, message: &ChatMessage) -> Result<()> {
        let mut state = self.write()?;
        if !state.teams.contains_key(&message.team_id) {
            return Err(team_not_found());
        }
        state.messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn find_by_team(&self, team_id: Uuid, page: &PageRequest) -> Result<Page<ChatMessage>> {
        let state = self.read()?;
        let mut found: Vec<ChatMessage> = state
            .messages
            .values()
            .filter(|msg| msg.team_id == team_id)
            .cloned()
            .collect();
        let total = found.len() as u64;
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        let items = found
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn recent(&self, team_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>> {
        let state = self.read()?;
        let mut found: Vec<ChatMessage> = state
            .messages
            .values()
            .filter(|msg| msg.team_id == team_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        found.truncate(limit);
        found.reverse();
        Ok(found)
    }
}
