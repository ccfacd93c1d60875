//! Domain layer for the Evently backend.
//!
//! This crate contains:
//! - Domain models (Event, Registration, User)
//! - The registration service and the store/notifier seams it runs against
//! - Domain error types

pub mod models;
pub mod services;
