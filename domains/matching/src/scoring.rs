//! Pure scoring functions
//!
//! Every function here is deterministic over its inputs; the engine feeds
//! them a point-in-time snapshot. All scores stay within [0, 1].

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use hackmate_teams::domain::Team;

/// Team-for-user weights
pub const SKILL_WEIGHT: f64 = 0.7;
pub const DOMAIN_WEIGHT: f64 = 0.2;
pub const AVAILABILITY_WEIGHT: f64 = 0.1;

/// User-for-team weights
pub const USER_SKILL_WEIGHT: f64 = 0.8;
pub const USER_DOMAIN_WEIGHT: f64 = 0.2;

/// Availability sub-weights
pub const FREE_RATIO_WEIGHT: f64 = 0.7;
pub const FRESHNESS_WEIGHT: f64 = 0.3;

/// Teams older than this contribute zero freshness
pub const FRESHNESS_WINDOW_DAYS: f64 = 30.0;

/// Fraction of a requirement set covered by a skill set. Zero when nothing
/// is required: an empty requirement signals no fit, not a universal one.
pub fn skill_overlap_ratio(required: &HashSet<String>, skills: &HashSet<String>) -> f64 {
    if required.is_empty() {
        return 0.0;
    }
    let matched = required
        .iter()
        .filter(|r| skills.iter().any(|s| s.eq_ignore_ascii_case(r)))
        .count();
    matched as f64 / required.len() as f64
}

fn domain_interest(domain: &str, interests: &HashSet<String>) -> f64 {
    if interests.iter().any(|i| i.eq_ignore_ascii_case(domain)) {
        1.0
    } else {
        0.0
    }
}

/// How much room and momentum a team has. Full teams score zero outright;
/// otherwise free capacity dominates with a freshness bonus that decays to
/// zero over thirty days.
pub fn availability(team: &Team, now: DateTime<Utc>) -> f64 {
    if team.is_full() {
        return 0.0;
    }
    let free_ratio = f64::from(team.free_slots()) / f64::from(team.max_members);
    let freshness = (1.0 - team.age_days(now) as f64 / FRESHNESS_WINDOW_DAYS).max(0.0);
    FREE_RATIO_WEIGHT * free_ratio + FRESHNESS_WEIGHT * freshness
}

/// Score of a team for a user
pub fn match_score(
    team: &Team,
    user_skills: &HashSet<String>,
    user_interests: &HashSet<String>,
    now: DateTime<Utc>,
) -> f64 {
    SKILL_WEIGHT * skill_overlap_ratio(&team.required_skills, user_skills)
        + DOMAIN_WEIGHT * domain_interest(&team.project_domain, user_interests)
        + AVAILABILITY_WEIGHT * availability(team, now)
}

/// Score of a user for a team
pub fn user_match_score(
    user_skills: &HashSet<String>,
    user_interests: &HashSet<String>,
    required_skills: &HashSet<String>,
    project_domain: &str,
) -> f64 {
    USER_SKILL_WEIGHT * skill_overlap_ratio(required_skills, user_skills)
        + USER_DOMAIN_WEIGHT * domain_interest(project_domain, user_interests)
}
