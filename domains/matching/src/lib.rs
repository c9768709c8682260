//! Matching engine for Hackmate
//!
//! Pure scoring in `scoring`, the read-only recommendation and discovery
//! engine in `engine`, and its HTTP surface in `api`.

pub mod api;
pub mod engine;
pub mod scoring;

pub use api::MatchingState;
pub use engine::MatchEngine;
