//! Application state and the bearer-token auth extractor

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use hackmate_common::{Error, Result};
use hackmate_notify::Notifier;

use crate::repository::Repositories;

/// JWT verification settings shared with every auth-guarded route
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Issue an HS256 bearer token for a user id. The service itself only
/// verifies tokens; issuance exists for local seeding and tests.
pub fn issue_token(secret: &str, user_id: Uuid, ttl: chrono::Duration) -> Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| Error::Internal(format!("Failed to issue token: {}", e)))
}

/// State for the teams domain router
#[derive(Clone)]
pub struct TeamsState {
    pub repos: Repositories,
    pub notifier: Arc<dyn Notifier>,
    pub auth: AuthConfig,
}

impl FromRef<TeamsState> for AuthConfig {
    fn from_ref(state: &TeamsState) -> Self {
        state.auth.clone()
    }
}

/// The authenticated caller, extracted from the `Authorization` header
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AuthConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let auth = AuthConfig::from_ref(state);

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Authentication("Missing authorization header".to_string()))?;

        let token = header_value
            .strip_prefix("Bearer ")
            .ok_or_else(|| Error::Authentication("Expected bearer token".to_string()))?;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(auth.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| Error::Authentication(format!("Invalid token: {}", e)))?;

        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| Error::Authentication("Invalid subject claim".to_string()))?;

        Ok(AuthUser { user_id })
    }
}
