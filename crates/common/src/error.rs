//! Common error types and handling for Hackmate
//!
//! Every business-rule check in the registry and invitation workflow maps to
//! a distinct variant with its own outcome code, so API callers can render
//! precise messages. Only storage failures are treated as infrastructure
//! errors (500).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Hackmate application
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    // Conflict family — one variant per business-rule outcome
    #[error("User is already a member of this team")]
    AlreadyMember,

    #[error("Team is full")]
    TeamFull,

    #[error("Team is not open for new members")]
    TeamNotOpen,

    #[error("User is not a member of this team")]
    NotAMember,

    #[error("Team creator cannot leave the team; delete the team instead")]
    CreatorCannotLeave,

    #[error("A pending invitation already exists for this target")]
    DuplicatePending,

    #[error("Invitation is no longer pending")]
    NotPending,

    #[error("Invitation has expired")]
    InvitationExpired,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Authorization(_) => StatusCode::FORBIDDEN,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::AlreadyMember
            | Error::TeamFull
            | Error::TeamNotOpen
            | Error::NotAMember
            | Error::CreatorCannotLeave
            | Error::DuplicatePending
            | Error::NotPending
            | Error::InvitationExpired => StatusCode::CONFLICT,
            Error::Unexpected(_)
            | Error::Database(_)
            | Error::Serialization(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Authentication(_) => "AUTHENTICATION_ERROR",
            Error::Authorization(_) => "FORBIDDEN",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::AlreadyMember => "ALREADY_MEMBER",
            Error::TeamFull => "TEAM_FULL",
            Error::TeamNotOpen => "TEAM_NOT_OPEN",
            Error::NotAMember => "NOT_A_MEMBER",
            Error::CreatorCannotLeave => "CREATOR_CANNOT_LEAVE",
            Error::DuplicatePending => "DUPLICATE_PENDING",
            Error::NotPending => "NOT_PENDING",
            Error::InvitationExpired => "INVITATION_EXPIRED",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Log internal errors with full context
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "Internal server error");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
