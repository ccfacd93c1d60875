//! Domain services for Evently.
//!
//! Services contain business logic that operates on domain models.

pub mod in_memory;
pub mod notification;
pub mod registration;

pub use in_memory::InMemoryRegistrationStore;
pub use notification::{
    MockRegistrationNotifier, NotificationKind, NotificationResult, RegistrationNotice,
    RegistrationNotifier, SentNotification,
};
pub use registration::{
    AdmissionOutcome, RegistrationError, RegistrationService, RegistrationStore, StoreError,
};
