//! Persistence layer for the Evently backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the Postgres registration store
//! - Demo event seeding

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
pub mod seed;
