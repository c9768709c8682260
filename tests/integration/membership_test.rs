//! Membership lifecycle scenarios over the full router

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use common::{error_code, id_of, spawn_app};

#[tokio::test]
async fn test_join_until_full_then_team_full() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Duo", "web", &["rust"], 2, true)
        .await;
    let team_id = id_of(&team);

    // Second member fills the team
    let u2 = Uuid::new_v4();
    let (status, body) = app
        .request(Method::POST, &format!("/v1/teams/{team_id}/join"), Some(u2), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["member_count"], 2);

    // Third join bounces with the capacity code
    let u3 = Uuid::new_v4();
    let (status, body) = app
        .request(Method::POST, &format!("/v1/teams/{team_id}/join"), Some(u3), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "TEAM_FULL");
}

#[tokio::test]
async fn test_joining_twice_is_already_member() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Trio", "web", &[], 3, true)
        .await;
    let team_id = id_of(&team);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/join"),
            Some(creator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "ALREADY_MEMBER");
}

#[tokio::test]
async fn test_closed_team_rejects_unsolicited_join() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Closed", "web", &[], 4, false)
        .await;
    let team_id = id_of(&team);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/join"),
            Some(Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "TEAM_NOT_OPEN");
}

#[tokio::test]
async fn test_concurrent_joins_fill_exactly_free_slots() {
    let app = Arc::new(spawn_app());
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Race", "web", &[], 5, true)
        .await;
    let team_id = id_of(&team);

    // 12 contenders for 4 free slots
    let mut handles = Vec::new();
    for _ in 0..12 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (status, body) = app
                .request(
                    Method::POST,
                    &format!("/v1/teams/{team_id}/join"),
                    Some(Uuid::new_v4()),
                    None,
                )
                .await;
            (status, error_code(&body).to_string())
        }));
    }

    let mut successes = 0;
    let mut full = 0;
    for handle in handles {
        let (status, code) = handle.await.unwrap();
        match status {
            StatusCode::OK => successes += 1,
            StatusCode::CONFLICT => {
                assert_eq!(code, "TEAM_FULL");
                full += 1;
            }
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(successes, 4);
    assert_eq!(full, 8);

    let (_, body) = app
        .request(Method::GET, &format!("/v1/teams/{team_id}"), None, None)
        .await;
    assert_eq!(body["member_count"], 5);
}

#[tokio::test]
async fn test_creator_cannot_leave_but_can_delete() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Mine", "web", &[], 3, true)
        .await;
    let team_id = id_of(&team);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/leave"),
            Some(creator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CREATOR_CANNOT_LEAVE");

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/v1/teams/{team_id}"),
            Some(creator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(Method::GET, &format!("/v1/teams/{team_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_cascades_to_invitations() {
    let app = spawn_app();
    let creator = app.seed_user("Ana", &["rust"], &[]).await;
    let invitee = app.seed_user("Ben", &["go"], &[]).await;
    let team = app
        .create_team(creator.id, "Gone", "web", &[], 3, true)
        .await;
    let team_id = id_of(&team);

    let (status, invitation) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator.id),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let invitation_id = id_of(&invitation);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/v1/teams/{team_id}"),
            Some(creator.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/{invitation_id}/accept"),
            Some(invitee.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND, "{body}");
}

#[tokio::test]
async fn test_non_member_leave_is_not_a_member() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Solo", "web", &[], 3, true)
        .await;
    let team_id = id_of(&team);

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/teams/{team_id}/leave"),
            Some(Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "NOT_A_MEMBER");
}

#[tokio::test]
async fn test_update_is_partial_and_creator_only() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Before", "web", &["rust"], 4, true)
        .await;
    let team_id = id_of(&team);

    // Someone else cannot update
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/v1/teams/{team_id}"),
            Some(Uuid::new_v4()),
            Some(json!({ "name": "Hijacked" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Creator updates only the name; everything else is untouched
    let (status, body) = app
        .request(
            Method::PATCH,
            &format!("/v1/teams/{team_id}"),
            Some(creator),
            Some(json!({ "name": "After" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "After");
    assert_eq!(body["project_domain"], "web");
    assert_eq!(body["max_members"], 4);
    assert_eq!(body["required_skills"], json!(["rust"]));
}

#[tokio::test]
async fn test_capacity_cannot_shrink_below_member_count() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let team = app
        .create_team(creator, "Shrink", "web", &[], 4, true)
        .await;
    let team_id = id_of(&team);

    for _ in 0..2 {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/v1/teams/{team_id}/join"),
                Some(Uuid::new_v4()),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    // 3 members now; shrinking max below that must fail
    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/v1/teams/{team_id}"),
            Some(creator),
            Some(json!({ "max_members": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/v1/teams/{team_id}"),
            Some(creator),
            Some(json!({ "max_members": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_team_payload_is_rejected() {
    let app = spawn_app();
    let creator = Uuid::new_v4();

    for payload in [
        json!({ "name": "", "project_domain": "web", "max_members": 4 }),
        json!({ "name": "Ok", "project_domain": "web", "max_members": 1 }),
        json!({ "name": "Ok", "project_domain": "web", "max_members": 21 }),
        json!({ "name": "Ok", "project_domain": "", "max_members": 4 }),
    ] {
        let (status, _) = app
            .request(Method::POST, "/v1/teams", Some(creator), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_my_teams_and_created_views() {
    let app = spawn_app();
    let creator = Uuid::new_v4();
    let joiner = Uuid::new_v4();

    let team = app
        .create_team(creator, "Alpha", "web", &[], 3, true)
        .await;
    let team_id = id_of(&team);
    app.request(
        Method::POST,
        &format!("/v1/teams/{team_id}/join"),
        Some(joiner),
        None,
    )
    .await;

    let (_, mine) = app
        .request(Method::GET, "/v1/teams/mine", Some(joiner), None)
        .await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let (_, created) = app
        .request(Method::GET, "/v1/teams/created", Some(joiner), None)
        .await;
    assert!(created.as_array().unwrap().is_empty());

    let (_, created) = app
        .request(Method::GET, "/v1/teams/created", Some(creator), None)
        .await;
    assert_eq!(created.as_array().unwrap().len(), 1);
}
