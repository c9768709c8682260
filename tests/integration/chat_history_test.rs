//! Team chat history scenarios over the full router

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use hackmate_common::PageRequest;
use hackmate_teams::repository::MessageStore;

use common::{error_code, id_of, spawn_app};

#[tokio::test]
async fn test_members_post_and_read_history() {
    let app = spawn_app();
    let creator = app.seed_user("alice", &["rust"], &[]).await;
    let member = app.seed_user("bob", &["go"], &[]).await;
    let outsider = app.seed_user("mallory", &[], &[]).await;

    let team = app
        .create_team(creator.id, "Chat Team", "web", &["rust"], 4, true)
        .await;
    let team_id = id_of(&team);
    app.request(
        Method::POST,
        &format!("/v1/teams/{team_id}/join"),
        Some(member.id),
        None,
    )
    .await;

    for i in 0..3 {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/v1/teams/{team_id}/messages"),
                Some(creator.id),
                Some(json!({ "content": format!("standup note {i}") })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // Non-members can neither post nor read
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/messages"),
            Some(outsider.id),
            Some(json!({ "content": "let me in" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .request(
            Method::GET,
            &format!("/v1/teams/{team_id}/messages"),
            Some(outsider.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Newest first; the join marker for bob is part of the transcript
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/v1/teams/{team_id}/messages?page=0&size=10"),
            Some(member.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"].as_u64(), Some(4));
    let items = body["items"].as_array().unwrap();
    assert_eq!(items[0]["content"], "standup note 2");
    assert_eq!(items[0]["kind"], "chat");

    // Recent window comes back in chronological order
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/v1/teams/{team_id}/messages/recent?limit=2"),
            Some(member.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let recent = body.as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["content"], "standup note 1");
    assert_eq!(recent[1]["content"], "standup note 2");
}

#[tokio::test]
async fn test_membership_changes_are_recorded() {
    let app = spawn_app();
    let creator = app.seed_user("alice", &["rust"], &[]).await;
    let member = app.seed_user("bob", &["go"], &[]).await;

    let team = app
        .create_team(creator.id, "Event Team", "web", &[], 4, true)
        .await;
    let team_id = id_of(&team);

    app.request(
        Method::POST,
        &format!("/v1/teams/{team_id}/join"),
        Some(member.id),
        None,
    )
    .await;
    app.request(
        Method::POST,
        &format!("/v1/teams/{team_id}/leave"),
        Some(member.id),
        None,
    )
    .await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/v1/teams/{team_id}/messages"),
            Some(creator.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["kind"], "leave");
    assert_eq!(items[0]["content"], "bob left the team");
    assert_eq!(items[1]["kind"], "join");
    assert_eq!(items[1]["content"], "bob joined the team");
}

#[tokio::test]
async fn test_message_content_limits() {
    let app = spawn_app();
    let creator = app.seed_user("alice", &[], &[]).await;
    let team = app
        .create_team(creator.id, "Strict Team", "web", &[], 4, true)
        .await;
    let team_id = id_of(&team);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/messages"),
            Some(creator.id),
            Some(json!({ "content": "" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/messages"),
            Some(creator.id),
            Some(json!({ "content": "x".repeat(1001) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_team_delete_removes_history() {
    let app = spawn_app();
    let creator = app.seed_user("alice", &[], &[]).await;
    let team = app
        .create_team(creator.id, "Ephemeral Team", "web", &[], 4, true)
        .await;
    let team_id = id_of(&team);

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/messages"),
            Some(creator.id),
            Some(json!({ "content": "soon gone" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/v1/teams/{team_id}"),
            Some(creator.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let history = app
        .repos
        .messages
        .find_by_team(team_id, &PageRequest::new(0, 10))
        .await
        .unwrap();
    assert_eq!(history.total, 0);
}

#[tokio::test]
async fn test_history_requires_existing_team() {
    let app = spawn_app();
    let user = app.seed_user("alice", &[], &[]).await;

    let (status, body) = app
        .request(
            Method::GET,
            &format!("/v1/teams/{}/messages", Uuid::new_v4()),
            Some(user.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
}
