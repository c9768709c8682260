//! Route table for the teams domain

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{invitations, messages, teams, users};
use super::middleware::TeamsState;

pub fn router() -> Router<TeamsState> {
    Router::new()
        // Team registry
        .route("/teams", post(teams::create_team).get(teams::list_teams))
        .route("/teams/search", get(teams::search_teams))
        .route("/teams/available", get(teams::available_teams))
        .route("/teams/mine", get(teams::my_teams))
        .route("/teams/created", get(teams::created_teams))
        .route(
            "/teams/{id}",
            get(teams::get_team)
                .patch(teams::update_team)
                .delete(teams::delete_team),
        )
        .route("/teams/{id}/join", post(teams::join_team))
        .route("/teams/{id}/leave", post(teams::leave_team))
        .route("/teams/{id}/members", get(teams::team_members))
        .route("/teams/{id}/invitations", get(invitations::team_invitations))
        // Chat history
        .route(
            "/teams/{id}/messages",
            post(messages::post_message).get(messages::team_messages),
        )
        .route(
            "/teams/{id}/messages/recent",
            get(messages::recent_messages),
        )
        // Invitation workflow
        .route("/invitations", post(invitations::send_invitation))
        .route("/invitations/received", get(invitations::received_invitations))
        .route("/invitations/sent", get(invitations::sent_invitations))
        .route(
            "/invitations/{id}/accept",
            post(invitations::accept_invitation),
        )
        .route(
            "/invitations/{id}/decline",
            post(invitations::decline_invitation),
        )
        .route("/invitations/token/{token}", get(invitations::get_by_token))
        .route(
            "/invitations/token/{token}/accept",
            post(invitations::accept_by_token),
        )
        // User directory read surface
        .route("/users/search", get(users::search_users))
        .route("/users/{id}", get(users::get_user))
}
