//! Shared utilities and common types for the Evently backend.
//!
//! This crate provides common functionality used across all other crates:
//! - JWT access token validation (and minting, for tooling and tests)
//! - Page-based pagination helpers
//! - Common validation logic

pub mod jwt;
pub mod pagination;
pub mod validation;
