//! External service integrations.

pub mod email;
pub mod image_store;
pub mod registration_mailer;

pub use email::{EmailError, EmailMessage, EmailService};
pub use image_store::{ImageError, ImageStore, ImageUpload};
pub use registration_mailer::EmailRegistrationNotifier;
