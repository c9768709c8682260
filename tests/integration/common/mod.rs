//! Shared harness for integration tests
//!
//! Builds the full application router over the in-memory backend with a
//! capturing mock notifier, plus helpers for seeding users and issuing
//! bearer tokens.

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use hackmate_app::{create_app, AppComponents};
use hackmate_notify::MockNotifier;
use hackmate_teams::domain::UserProfile;
use hackmate_teams::repository::{Repositories, UserDirectory};

pub const JWT_SECRET: &str = "integration-secret";

pub struct TestApp {
    pub router: Router,
    pub repos: Repositories,
    pub notifier: MockNotifier,
}

pub fn spawn_app() -> TestApp {
    let repos = Repositories::memory();
    let notifier = MockNotifier::new();
    let router = create_app(AppComponents {
        repos: repos.clone(),
        notifier: Arc::new(notifier.clone()),
        jwt_secret: JWT_SECRET.to_string(),
    });
    TestApp {
        router,
        repos,
        notifier,
    }
}

impl TestApp {
    pub async fn seed_user(
        &self,
        name: &str,
        skills: &[&str],
        interests: &[&str],
    ) -> UserProfile {
        let profile = UserProfile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            skills: to_set(skills),
            interests: to_set(interests),
            created_at: Utc::now(),
        };
        self.repos.users.upsert(&profile).await.unwrap();
        profile
    }

    pub fn token_for(&self, user_id: Uuid) -> String {
        hackmate_teams::api::issue_token(JWT_SECRET, user_id, chrono::Duration::hours(1))
            .unwrap()
    }

    /// Fire one request at the app and parse the JSON response body.
    /// Non-JSON bodies come back as `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        actor: Option<Uuid>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = actor {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.token_for(user_id)),
            );
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn create_team(
        &self,
        creator: Uuid,
        name: &str,
        domain: &str,
        required_skills: &[&str],
        max_members: u32,
        is_open: bool,
    ) -> Value {
        let (status, body) = self
            .request(
                Method::POST,
                "/v1/teams",
                Some(creator),
                Some(serde_json::json!({
                    "name": name,
                    "project_domain": domain,
                    "required_skills": required_skills,
                    "max_members": max_members,
                    "is_open": is_open,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "team creation failed: {body}");
        body
    }
}

pub fn to_set(items: &[&str]) -> HashSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// The `code` field of an error response body
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or("")
}

pub fn id_of(body: &Value) -> Uuid {
    body["id"].as_str().and_then(|s| Uuid::parse_str(s).ok()).unwrap()
}
