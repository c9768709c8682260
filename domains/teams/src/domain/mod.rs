pub mod entities;
pub mod state;

pub use entities::{
    ChatMessage, Invitation, InvitationTarget, InvitationType, MessageKind, Team, TeamStatus,
    UserProfile, INVITATION_TTL_DAYS, MAX_MESSAGE_LENGTH, MAX_TEAM_CAPACITY, MIN_TEAM_CAPACITY,
};
pub use state::{InvitationEvent, InvitationStateMachine, InvitationStatus, StateError};
