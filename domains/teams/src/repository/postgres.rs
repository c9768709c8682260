//! Postgres storage backend
//!
//! Runtime-checked queries over the schema in `migrations/`. Membership
//! writes go through `SELECT ... FOR UPDATE` so the capacity check and the
//! member-array update are serialized per team row.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use hackmate_common::{Error, Page, PageRequest, Result, SortDirection};

use crate::domain::{
    ChatMessage, Invitation, InvitationStatus, InvitationType, MessageKind, Team, TeamStatus,
    UserProfile,
};
use crate::repository::{
    InvitationStore, JoinPath, MessageStore, TeamFilter, TeamStats, TeamStore, UserDirectory,
};

const TEAM_COLUMNS: &str = "id, name, description, project_domain, required_skills, \
     creator_id, member_ids, max_members, is_open, status, created_at, updated_at";

const INVITATION_COLUMNS: &str = "id, team_id, invited_by, invitee_id, invitee_email, \
     invitee_phone, kind, status, token, expires_at, created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, team_id, sender_id, content, kind, created_at";

fn team_from_row(row: &PgRow) -> Result<Team> {
    let skills: Vec<String> = row.try_get("required_skills")?;
    let members: Vec<Uuid> = row.try_get("member_ids")?;
    let status: String = row.try_get("status")?;
    Ok(Team {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        project_domain: row.try_get("project_domain")?,
        required_skills: skills.into_iter().collect(),
        creator_id: row.try_get("creator_id")?,
        member_ids: members.into_iter().collect(),
        max_members: row.try_get::<i32, _>("max_members")? as u32,
        is_open: row.try_get("is_open")?,
        status: TeamStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("Unknown team status: {}", status)))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn invitation_from_row(row: &PgRow) -> Result<Invitation> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    Ok(Invitation {
        id: row.try_get("id")?,
        team_id: row.try_get("team_id")?,
        invited_by: row.try_get("invited_by")?,
        invitee_id: row.try_get("invitee_id")?,
        invitee_email: row.try_get("invitee_email")?,
        invitee_phone: row.try_get("invitee_phone")?,
        kind: InvitationType::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("Unknown invitation kind: {}", kind)))?,
        status: InvitationStatus::parse(&status)
            .ok_or_else(|| Error::Internal(format!("Unknown invitation status: {}", status)))?,
        token: row.try_get("token")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &PgRow) -> Result<UserProfile> {
    let skills: Vec<String> = row.try_get("skills")?;
    let interests: Vec<String> = row.try_get("interests")?;
    Ok(UserProfile {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        skills: skills.into_iter().collect(),
        interests: interests.into_iter().collect(),
        created_at: row.try_get("created_at")?,
    })
}

fn message_from_row(row: &PgRow) -> Result<ChatMessage> {
    let kind: String = row.try_get("kind")?;
    Ok(ChatMessage {
        id: row.try_get("id")?,
        team_id: row.try_get("team_id")?,
        sender_id: row.try_get("sender_id")?,
        content: row.try_get("content")?,
        kind: MessageKind::parse(&kind)
            .ok_or_else(|| Error::Internal(format!("Unknown message kind: {}", kind)))?,
        created_at: row.try_get("created_at")?,
    })
}

fn team_not_found() -> Error {
    Error::NotFound("Team not found".to_string())
}

fn invitation_not_found() -> Error {
    Error::NotFound("Invitation not found".to_string())
}

/// Append the filter's WHERE clauses to a query that already has `WHERE 1=1`
fn push_filter_clauses<'a>(builder: &mut QueryBuilder<'a, Postgres>, filter: &'a TeamFilter) {
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(domain) = &filter.domain {
        builder
            .push(" AND LOWER(project_domain) = LOWER(")
            .push_bind(domain)
            .push(")");
    }
    if let Some(skill) = &filter.skill {
        builder
            .push(" AND EXISTS (SELECT 1 FROM unnest(required_skills) AS rs WHERE LOWER(rs) = LOWER(")
            .push_bind(skill)
            .push("))");
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.to_lowercase());
        builder
            .push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(description) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(project_domain) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if filter.open_only {
        builder.push(" AND is_open = TRUE");
    }
    if filter.with_space_only {
        builder.push(" AND cardinality(member_ids) < max_members");
    }
}

pub struct PgTeamStore {
    pool: PgPool,
}

impl PgTeamStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TeamStore for PgTeamStore {
    async fn create(&self, team: &Team) -> Result<()> {
        sqlx::query(
            "INSERT INTO teams (id, name, description, project_domain, required_skills, \
             creator_id, member_ids, max_members, is_open, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(&team.project_domain)
        .bind(team.required_skills.iter().cloned().collect::<Vec<_>>())
        .bind(team.creator_id)
        .bind(team.member_ids.iter().copied().collect::<Vec<_>>())
        .bind(team.max_members as i32)
        .bind(team.is_open)
        .bind(team.status.as_str())
        .bind(team.created_at)
        .bind(team.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Team> {
        let row = sqlx::query(&format!("SELECT {} FROM teams WHERE id = $1", TEAM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(team_not_found)?;
        team_from_row(&row)
    }

    async fn update(&self, team: &Team) -> Result<()> {
        let result = sqlx::query(
            "UPDATE teams SET name = $2, description = $3, project_domain = $4, \
             required_skills = $5, member_ids = $6, max_members = $7, is_open = $8, \
             status = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(team.id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(&team.project_domain)
        .bind(team.required_skills.iter().cloned().collect::<Vec<_>>())
        .bind(team.member_ids.iter().copied().collect::<Vec<_>>())
        .bind(team.max_members as i32)
        .bind(team.is_open)
        .bind(team.status.as_str())
        .bind(team.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(team_not_found());
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM team_invitations WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_messages WHERE team_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(team_not_found());
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list(&self, filter: &TeamFilter, page: &PageRequest) -> Result<Page<Team>> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM teams WHERE 1=1");
        push_filter_clauses(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        // Sort field is whitelisted, never interpolated from raw input
        let sort_column = match page.sort_by.as_str() {
            "name" => "name",
            "updated_at" => "updated_at",
            _ => "created_at",
        };
        let direction = match page.sort_dir {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };

        let mut query =
            QueryBuilder::new(format!("SELECT {} FROM teams WHERE 1=1", TEAM_COLUMNS));
        push_filter_clauses(&mut query, filter);
        query.push(format!(
            " ORDER BY {} {}, id {} LIMIT ",
            sort_column, direction, direction
        ));
        query.push_bind(page.size as i64);
        query.push(" OFFSET ");
        query.push_bind(page.offset() as i64);

        let rows = query.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(team_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total as u64))
    }

    async fn find_by_member(&self, user_id: Uuid) -> Result<Vec<Team>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM teams WHERE $1 = ANY(member_ids) ORDER BY created_at DESC, id",
            TEAM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(team_from_row).collect()
    }

    async fn find_by_creator(&self, user_id: Uuid) -> Result<Vec<Team>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM teams WHERE creator_id = $1 ORDER BY created_at DESC, id",
            TEAM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(team_from_row).collect()
    }

    async fn add_member(&self, team_id: Uuid, user_id: Uuid, path: JoinPath) -> Result<Team> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent joins on the same team
        let row = sqlx::query(&format!(
            "SELECT {} FROM teams WHERE id = $1 FOR UPDATE",
            TEAM_COLUMNS
        ))
        .bind(team_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(team_not_found)?;
        let mut team = team_from_row(&row)?;

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

        sqlx::query("UPDATE teams SET member_ids = $2, updated_at = $3 WHERE id = $1")
            .bind(team.id)
            .bind(team.member_ids.iter().copied().collect::<Vec<_>>())
            .bind(team.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(team)
    }

    async fn remove_member(&self, team_id: Uuid, user_id: Uuid) -> Result<Team> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {} FROM teams WHERE id = $1 FOR UPDATE",
            TEAM_COLUMNS
        ))
        .bind(team_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(team_not_found)?;
        let mut team = team_from_row(&row)?;

        if team.creator_id == user_id {
            return Err(Error::CreatorCannotLeave);
        }
        if !team.member_ids.remove(&user_id) {
            return Err(Error::NotAMember);
        }
        team.updated_at = Utc::now();

        sqlx::query("UPDATE teams SET member_ids = $2, updated_at = $3 WHERE id = $1")
            .bind(team.id)
            .bind(team.member_ids.iter().copied().collect::<Vec<_>>())
            .bind(team.updated_at)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(team)
    }

    async fn candidates_for(&self, user_id: Uuid) -> Result<Vec<Team>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM teams WHERE status = 'active' AND NOT ($1 = ANY(member_ids)) \
             ORDER BY id",
            TEAM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(team_from_row).collect()
    }

    async fn joinable_for(
        &self,
        user_id: Uuid,
        filter: &TeamFilter,
        page: &PageRequest,
    ) -> Result<Page<Team>> {
        let joinable = " AND status = 'active' AND is_open = TRUE \
             AND cardinality(member_ids) < max_members AND NOT (";

        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM teams WHERE 1=1");
        count.push(joinable).push_bind(user_id).push(" = ANY(member_ids))");
        push_filter_clauses(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let sort_column = match page.sort_by.as_str() {
            "name" => "name",
            "updated_at" => "updated_at",
            _ => "created_at",
        };
        let direction = match page.sort_dir {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };

        let mut query =
            QueryBuilder::new(format!("SELECT {} FROM teams WHERE 1=1", TEAM_COLUMNS));
        query.push(joinable).push_bind(user_id).push(" = ANY(member_ids))");
        push_filter_clauses(&mut query, filter);
        query.push(format!(
            " ORDER BY {} {}, id {} LIMIT ",
            sort_column, direction, direction
        ));
        query.push_bind(page.size as i64);
        query.push(" OFFSET ");
        query.push_bind(page.offset() as i64);

        let rows = query.build().fetch_all(&self.pool).await?;
        let items = rows.iter().map(team_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total as u64))
    }

    async fn trending_domains(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<(String, u64)>> {
        let rows = sqlx::query(
            "SELECT project_domain, COUNT(*) AS occurrences FROM teams \
             WHERE status = 'active' AND created_at >= $1 \
             GROUP BY project_domain ORDER BY occurrences DESC, project_domain ASC LIMIT $2",
        )
        .bind(since)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get::<String, _>("project_domain")?,
                    row.try_get::<i64, _>("occurrences")? as u64,
                ))
            })
            .collect()
    }

    async fn popular_skills(&self, limit: usize) -> Result<Vec<(String, u64)>> {
        let rows = sqlx::query(
            "SELECT skill, COUNT(*) AS occurrences FROM teams, unnest(required_skills) AS skill \
             WHERE status = 'active' GROUP BY skill \
             ORDER BY occurrences DESC, skill ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| {
                Ok((
                    row.try_get::<String, _>("skill")?,
                    row.try_get::<i64, _>("occurrences")? as u64,
                ))
            })
            .collect()
    }

    async fn stats(&self) -> Result<TeamStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_teams, \
             COUNT(*) FILTER (WHERE is_open) AS open_teams, \
             COUNT(*) FILTER (WHERE cardinality(member_ids) >= max_members) AS full_teams, \
             COALESCE(SUM(cardinality(member_ids)), 0) AS total_members \
             FROM teams WHERE status = 'active'",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(TeamStats {
            total_teams: row.try_get::<i64, _>("total_teams")? as u64,
            open_teams: row.try_get::<i64, _>("open_teams")? as u64,
            full_teams: row.try_get::<i64, _>("full_teams")? as u64,
            total_members: row.try_get::<i64, _>("total_members")? as u64,
        })
    }
}

pub struct PgInvitationStore {
    pool: PgPool,
}

impl PgInvitationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvitationStore for PgInvitationStore {
    async fn create(&self, invitation: &Invitation) -> Result<()> {
        sqlx::query(
            "INSERT INTO team_invitations (id, team_id, invited_by, invitee_id, invitee_email, \
             invitee_phone, kind, status, token, expires_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(invitation.id)
        .bind(invitation.team_id)
        .bind(invitation.invited_by)
        .bind(invitation.invitee_id)
        .bind(&invitation.invitee_email)
        .bind(&invitation.invitee_phone)
        .bind(invitation.kind.as_str())
        .bind(invitation.status.as_str())
        .bind(&invitation.token)
        .bind(invitation.expires_at)
        .bind(invitation.created_at)
        .bind(invitation.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Invitation> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM team_invitations WHERE id = $1",
            INVITATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(invitation_not_found)?;
        invitation_from_row(&row)
    }

    async fn get_by_token(&self, token: &str) -> Result<Invitation> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM team_invitations WHERE token = $1",
            INVITATION_COLUMNS
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(invitation_not_found)?;
        invitation_from_row(&row)
    }

    async fn update(&self, invitation: &Invitation) -> Result<()> {
        let result = sqlx::query(
            "UPDATE team_invitations SET invitee_id = $2, status = $3, updated_at = $4 \
             WHERE id = $1",
        )
        .bind(invitation.id)
        .bind(invitation.invitee_id)
        .bind(invitation.status.as_str())
        .bind(invitation.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(invitation_not_found());
        }
        Ok(())
    }

    async fn has_pending_for_user(&self, team_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM team_invitations WHERE team_id = $1 \
             AND invitee_id = $2 AND status = 'pending' AND expires_at >= NOW())",
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn has_pending_for_email(&self, team_id: Uuid, email: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM team_invitations WHERE team_id = $1 \
             AND LOWER(invitee_email) = LOWER($2) AND status = 'pending' \
             AND expires_at >= NOW())",
        )
        .bind(team_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn find_by_team(&self, team_id: Uuid) -> Result<Vec<Invitation>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM team_invitations WHERE team_id = $1 ORDER BY created_at DESC, id",
            INVITATION_COLUMNS
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(invitation_from_row).collect()
    }

    async fn find_by_invitee(&self, user_id: Uuid) -> Result<Vec<Invitation>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM team_invitations WHERE invitee_id = $1 ORDER BY created_at DESC, id",
            INVITATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(invitation_from_row).collect()
    }

    async fn find_by_inviter(&self, user_id: Uuid) -> Result<Vec<Invitation>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM team_invitations WHERE invited_by = $1 ORDER BY created_at DESC, id",
            INVITATION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(invitation_from_row).collect()
    }
}

pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get(&self, id: Uuid) -> Result<UserProfile> {
        let row = sqlx::query(
            "SELECT id, name, email, skills, interests, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound("User not found".to_string()))?;
        user_from_row(&row)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT id, name, email, skills, interests, created_at FROM users \
             WHERE LOWER(email) = LOWER($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, name, email, skills, interests, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, email = EXCLUDED.email, \
             skills = EXCLUDED.skills, interests = EXCLUDED.interests",
        )
        .bind(profile.id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(profile.skills.iter().cloned().collect::<Vec<_>>())
        .bind(profile.interests.iter().cloned().collect::<Vec<_>>())
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn all_excluding(&self, exclude: &HashSet<Uuid>) -> Result<Vec<UserProfile>> {
        let excluded: Vec<Uuid> = exclude.iter().copied().collect();
        let rows = sqlx::query(
            "SELECT id, name, email, skills, interests, created_at FROM users \
             WHERE NOT (id = ANY($1)) ORDER BY id",
        )
        .bind(excluded)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<UserProfile>> {
        let pattern = format!("%{}%", query.to_lowercase());
        let rows = sqlx::query(
            "SELECT id, name, email, skills, interests, created_at FROM users \
             WHERE LOWER(name) LIKE $1 OR LOWER(email) LIKE $1 \
             OR EXISTS (SELECT 1 FROM unnest(skills) AS s WHERE LOWER(s) LIKE $1) \
             OR EXISTS (SELECT 1 FROM unnest(interests) AS i WHERE LOWER(i) LIKE $1) \
             ORDER BY name, id LIMIT $2",
        )
        .bind(pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }
}

pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn create(&self, message: &ChatMessage) -> Result<()> {
        // The team_id foreign key rejects messages for deleted teams
        let result = sqlx::query(
            "INSERT INTO chat_messages (id, team_id, sender_id, content, kind, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(message.id)
        .bind(message.team_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.kind.as_str())
        .bind(message.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => {
                Err(team_not_found())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_team(&self, team_id: Uuid, page: &PageRequest) -> Result<Page<ChatMessage>> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_messages WHERE team_id = $1")
                .bind(team_id)
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(&format!(
            "SELECT {} FROM chat_messages WHERE team_id = $1 \
             ORDER BY created_at DESC, id LIMIT $2 OFFSET $3",
            MESSAGE_COLUMNS
        ))
        .bind(team_id)
        .bind(page.size as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        let items = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total as u64))
    }

    async fn recent(&self, team_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(&format!(
            "SELECT * FROM (SELECT {} FROM chat_messages WHERE team_id = $1 \
             ORDER BY created_at DESC, id LIMIT $2) AS newest \
             ORDER BY created_at ASC, id",
            MESSAGE_COLUMNS
        ))
        .bind(team_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }
}
