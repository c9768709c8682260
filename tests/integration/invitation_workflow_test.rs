//! Invitation workflow scenarios over the full router

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use hackmate_teams::domain::{Invitation, InvitationTarget};
use hackmate_teams::repository::InvitationStore;

use common::{error_code, id_of, spawn_app, TestApp};

async fn team_with_creator(app: &TestApp, max_members: u32) -> (Uuid, Uuid) {
    let creator = app.seed_user("Ana", &["rust"], &["fintech"]).await;
    let team = app
        .create_team(creator.id, "Crew", "fintech", &["rust"], max_members, true)
        .await;
    (creator.id, id_of(&team))
}

#[tokio::test]
async fn test_direct_invitation_accept_joins_team() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &["go"], &[]).await;

    let (status, invitation) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invitation["status"], "pending");
    assert_eq!(invitation["kind"], "direct");
    let invitation_id = id_of(&invitation);

    // Delivery was attempted through the mock channel
    assert_eq!(app.notifier.sent_count(), 1);

    let (status, accepted) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/{invitation_id}/accept"),
            Some(invitee.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (_, team) = app
        .request(Method::GET, &format!("/v1/teams/{team_id}"), None, None)
        .await;
    assert_eq!(team["member_count"], 2);

    // Accepting again short-circuits: still accepted, count unchanged
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/{invitation_id}/accept"),
            Some(invitee.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");

    let (_, team) = app
        .request(Method::GET, &format!("/v1/teams/{team_id}"), None, None)
        .await;
    assert_eq!(team["member_count"], 2);
}

#[tokio::test]
async fn test_only_invitee_can_act_on_invitation() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;
    let stranger = app.seed_user("Cem", &[], &[]).await;

    let (_, invitation) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    let invitation_id = id_of(&invitation);

    for action in ["accept", "decline"] {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/v1/invitations/{invitation_id}/{action}"),
                Some(stranger.id),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_non_member_cannot_invite() {
    let app = spawn_app();
    let (_, team_id) = team_with_creator(&app, 3).await;
    let outsider = app.seed_user("Dot", &[], &[]).await;
    let invitee = app.seed_user("Eli", &[], &[]).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(outsider.id),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_declined_is_terminal() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;

    let (_, invitation) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    let invitation_id = id_of(&invitation);

    let (status, declined) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/{invitation_id}/decline"),
            Some(invitee.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(declined["status"], "declined");

    // Monotonic: declined never becomes accepted
    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/{invitation_id}/accept"),
            Some(invitee.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "NOT_PENDING");

    let (_, team) = app
        .request(Method::GET, &format!("/v1/teams/{team_id}"), None, None)
        .await;
    assert_eq!(team["member_count"], 1);
}

#[tokio::test]
async fn test_duplicate_pending_rules_per_target_kind() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 5).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;

    let direct = json!({ "team_id": team_id, "invitee_id": invitee.id });
    let (status, _) = app
        .request(Method::POST, "/v1/invitations", Some(creator), Some(direct.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .request(Method::POST, "/v1/invitations", Some(creator), Some(direct))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "DUPLICATE_PENDING");

    // Email dedup is case-insensitive
    let (status, _) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_email": "new@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_email": "NEW@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "DUPLICATE_PENDING");

    // Phone targets are not deduplicated
    for _ in 0..2 {
        let (status, _) = app
            .request(
                Method::POST,
                "/v1/invitations",
                Some(creator),
                Some(json!({ "team_id": team_id, "invitee_phone": "+15551234567" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn test_inviting_existing_member_conflicts() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_id": creator })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "ALREADY_MEMBER");
}

#[tokio::test]
async fn test_send_rejected_when_team_full() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 2).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;
    app.request(
        Method::POST,
        &format!("/v1/teams/{team_id}/join"),
        Some(Uuid::new_v4()),
        None,
    )
    .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "TEAM_FULL");
}

#[tokio::test]
async fn test_exactly_one_target_required() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;

    for payload in [
        json!({ "team_id": team_id }),
        json!({
            "team_id": team_id,
            "invitee_id": invitee.id,
            "invitee_email": "two@example.com",
        }),
    ] {
        let (status, _) = app
            .request(Method::POST, "/v1/invitations", Some(creator), Some(payload))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_lazy_expiry_persists_on_access() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;

    // Seed a stale invitation directly in storage
    let mut invitation =
        Invitation::new(team_id, creator, InvitationTarget::User(invitee.id)).unwrap();
    invitation.expires_at = Utc::now() - Duration::days(1);
    app.repos.invitations.create(&invitation).await.unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/{}/accept", invitation.id),
            Some(invitee.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "INVITATION_EXPIRED");

    // The expiry was persisted, not just reported
    let stored = app.repos.invitations.get(invitation.id).await.unwrap();
    assert_eq!(stored.status.as_str(), "expired");

    let (_, team) = app
        .request(Method::GET, &format!("/v1/teams/{team_id}"), None, None)
        .await;
    assert_eq!(team["member_count"], 1);
}

#[tokio::test]
async fn test_listing_lapses_expired_invitations() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;

    let mut stale =
        Invitation::new(team_id, creator, InvitationTarget::User(invitee.id)).unwrap();
    stale.expires_at = Utc::now() - Duration::hours(1);
    app.repos.invitations.create(&stale).await.unwrap();

    let (status, received) = app
        .request(Method::GET, "/v1/invitations/received", Some(invitee.id), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(received[0]["status"], "expired");
}

#[tokio::test]
async fn test_token_flow_binds_invitee_on_accept() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let claimer = app.seed_user("Fay", &[], &[]).await;

    let (_, invitation) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_email": "fay@example.com" })),
        )
        .await;
    let token = invitation["token"].as_str().unwrap().to_string();

    // Token resolution needs no auth
    let (status, resolved) = app
        .request(Method::GET, &format!("/v1/invitations/token/{token}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["status"], "pending");
    assert!(resolved["invitee_id"].is_null());

    let (status, accepted) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/token/{token}/accept"),
            Some(claimer.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");
    assert_eq!(accepted["invitee_id"], json!(claimer.id));

    let (_, team) = app
        .request(Method::GET, &format!("/v1/teams/{team_id}"), None, None)
        .await;
    assert_eq!(team["member_count"], 2);
}

#[tokio::test]
async fn test_token_accept_respects_direct_invitee() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;
    let stranger = app.seed_user("Cem", &[], &[]).await;

    let (_, invitation) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    let token = invitation["token"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/token/{token}/accept"),
            Some(stranger.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_accept_recheck_capacity_leaves_invitation_pending() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 2).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;

    let (_, invitation) = app
        .request(
            Method::POST,
            "/v1/invitations",
            Some(creator),
            Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
        )
        .await;
    let invitation_id = id_of(&invitation);

    // The last slot goes to someone else before the invitee accepts
    app.request(
        Method::POST,
        &format!("/v1/teams/{team_id}/join"),
        Some(Uuid::new_v4()),
        None,
    )
    .await;

    let (status, body) = app
        .request(
            Method::POST,
            &format!("/v1/invitations/{invitation_id}/accept"),
            Some(invitee.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "TEAM_FULL");

    let stored = app.repos.invitations.get(invitation_id).await.unwrap();
    assert_eq!(stored.status.as_str(), "pending");
}

#[tokio::test]
async fn test_team_invitation_list_is_member_only() {
    let app = spawn_app();
    let (creator, team_id) = team_with_creator(&app, 3).await;
    let invitee = app.seed_user("Ben", &[], &[]).await;
    let outsider = app.seed_user("Cem", &[], &[]).await;

    app.request(
        Method::POST,
        "/v1/invitations",
        Some(creator),
        Some(json!({ "team_id": team_id, "invitee_id": invitee.id })),
    )
    .await;

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/v1/teams/{team_id}/invitations"),
            Some(outsider.id),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = app
        .request(
            Method::GET,
            &format!("/v1/teams/{team_id}/invitations"),
            Some(creator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
}
