//! Domain models for Evently.

pub mod event;
pub mod registration;
pub mod user;

pub use event::{remaining_spots, Event};
pub use registration::{Registration, RegistrationConfirmation};
pub use user::User;
