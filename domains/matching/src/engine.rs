//! Recommendation and discovery engine
//!
//! Read-only over the team registry and user directory. Rankings are
//! deterministic: score descending, then id ascending.

use chrono::{Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use hackmate_common::{Page, PageRequest, Result};
use hackmate_teams::domain::{Team, UserProfile};
use hackmate_teams::repository::{
    Repositories, TeamFilter, TeamStats, TeamStore, UserDirectory,
};

use crate::scoring;

/// Trailing window for trending domains
const TRENDING_WINDOW_DAYS: i64 = 30;

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct TeamMatch {
    pub team: Team,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct UserMatch {
    pub user: UserProfile,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct RankedTag {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct MatchingStats {
    pub teams: TeamStats,
    pub recommendation_count: usize,
    pub has_recommendations: bool,
    pub trending_domains: Vec<RankedTag>,
    pub popular_skills: Vec<RankedTag>,
}

#[derive(Debug, Serialize)]
pub struct DiscoveryFilters {
    pub domains: Vec<String>,
    pub skills: Vec<String>,
}

#[derive(Clone)]
pub struct MatchEngine {
    repos: Repositories,
}

impl MatchEngine {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    /// Rank joinable teams for a user. Zero scores are dropped rather than
    /// padding the tail of the list.
    pub async fn recommend_teams_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<TeamMatch>> {
        let user = self.repos.users.get(user_id).await?;
        let now = Utc::now();

        let mut matches: Vec<TeamMatch> = self
            .repos
            .teams
            .candidates_for(user_id)
            .await?
            .into_iter()
            .filter(|team| team.is_open && !team.is_full())
            .map(|team| {
                let score = scoring::match_score(&team, &user.skills, &user.interests, now);
                TeamMatch { team, score }
            })
            .filter(|m| m.score > 0.0)
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.team.id.cmp(&b.team.id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    /// Rank directory users for a team, symmetric to team recommendations
    pub async fn recommend_users_for_team(
        &self,
        team_id: Uuid,
        limit: usize,
    ) -> Result<Vec<UserMatch>> {
        let team = self.repos.teams.get(team_id).await?;

        let mut matches: Vec<UserMatch> = self
            .repos
            .users
            .all_excluding(&team.member_ids)
            .await?
            .into_iter()
            .map(|user| {
                let score = scoring::user_match_score(
                    &user.skills,
                    &user.interests,
                    &team.required_skills,
                    &team.project_domain,
                );
                UserMatch { user, score }
            })
            .filter(|m| m.score > 0.0)
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.user.id.cmp(&b.user.id))
        });
        matches.truncate(limit);
        Ok(matches)
    }

    /// Filtered, paginated walk of the joinable universe. No score ranking;
    /// the caller picks the sort field.
    pub async fn discover(
        &self,
        user_id: Uuid,
        filter: &TeamFilter,
        page: &PageRequest,
    ) -> Result<Page<Team>> {
        self.repos.teams.joinable_for(user_id, filter, page).await
    }

    pub async fn trending_domains(&self, limit: usize) -> Result<Vec<RankedTag>> {
        let since = Utc::now() - Duration::days(TRENDING_WINDOW_DAYS);
        let ranked = self.repos.teams.trending_domains(since, limit).await?;
        Ok(ranked
            .into_iter()
            .map(|(name, count)| RankedTag { name, count })
            .collect())
    }

    pub async fn popular_skills(&self, limit: usize) -> Result<Vec<RankedTag>> {
        let ranked = self.repos.teams.popular_skills(limit).await?;
        Ok(ranked
            .into_iter()
            .map(|(name, count)| RankedTag { name, count })
            .collect())
    }

    /// Snapshot for the caller's matching dashboard
    pub async fn stats(&self, user_id: Uuid) -> Result<MatchingStats> {
        let teams = self.repos.teams.stats().await?;
        let recommendations = self
            .recommend_teams_for_user(user_id, DEFAULT_LIMIT)
            .await?;
        let trending_domains = self.trending_domains(DEFAULT_LIMIT).await?;
        let popular_skills = self.popular_skills(DEFAULT_LIMIT).await?;

        Ok(MatchingStats {
            teams,
            recommendation_count: recommendations.len(),
            has_recommendations: !recommendations.is_empty(),
            trending_domains,
            popular_skills,
        })
    }

    /// Every domain and required skill currently in use, for filter pickers
    pub async fn discovery_filters(&self) -> Result<DiscoveryFilters> {
        const FILTER_CAP: usize = 1000;

        let epoch = chrono::DateTime::<Utc>::UNIX_EPOCH;
        let mut domains: Vec<String> = self
            .repos
            .teams
            .trending_domains(epoch, FILTER_CAP)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        domains.sort();

        let mut skills: Vec<String> = self
            .repos
            .teams
            .popular_skills(FILTER_CAP)
            .await?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        skills.sort();

        Ok(DiscoveryFilters { domains, skills })
    }
}
