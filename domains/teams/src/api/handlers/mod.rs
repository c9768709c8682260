pub mod invitations;
pub mod messages;
pub mod teams;
pub mod users;
