pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::{issue_token, AuthConfig, AuthUser, TeamsState};
pub use routes::router;
