//! Shared utilities, configuration, and error handling for Hackmate
//!
//! This crate provides common functionality used across the Hackmate
//! application:
//! - Configuration management following 12-factor principles
//! - Error types and handling
//! - Pagination types
//! - Custom axum extractors

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;

pub use config::Config;
pub use db::{Page, PageRequest, SortDirection};
pub use error::{Error, Result};
pub use extractors::{PaginationQuery, ValidatedJson};
