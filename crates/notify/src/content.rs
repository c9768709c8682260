//! Message templates for outbound notices

use crate::InvitationNotice;

pub fn invitation_subject(notice: &InvitationNotice) -> String {
    format!("You're invited to join {}", notice.team_name)
}

pub fn invitation_body(notice: &InvitationNotice) -> String {
    format!(
        "{inviter} has invited you to join the team \"{team}\" on Hackmate.\n\n\
         Use this code to accept the invitation: {token}\n\n\
         The invitation expires on {expires}.",
        inviter = notice.inviter_name,
        team = notice.team_name,
        token = notice.token,
        expires = notice.expires_at.format("%Y-%m-%d %H:%M UTC"),
    )
}

/// Short form for SMS delivery
pub fn invitation_sms(notice: &InvitationNotice) -> String {
    format!(
        "{} invited you to join {} on Hackmate. Accept with code {}",
        notice.inviter_name, notice.team_name, notice.token
    )
}
