//! Team registry and invitation workflow for Hackmate
//!
//! `domain` holds the entities and the invitation state machine,
//! `repository` the storage traits with Postgres and in-memory backends,
//! `api` the axum surface.

pub mod api;
pub mod domain;
pub mod repository;

pub use api::{AuthConfig, TeamsState};
pub use repository::Repositories;
