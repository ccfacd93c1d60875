//! Custom Axum extractors.

pub mod event_form;
pub mod user_auth;

pub use event_form::EventForm;
pub use user_auth::{OptionalUserAuth, UserAuth};
