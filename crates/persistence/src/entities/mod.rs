//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod event;
pub mod registration;
pub mod user;

pub use event::{EventEntity, EventWithCountsEntity};
pub use registration::RegistrationEntity;
pub use user::UserEntity;
