//! Capacity-safe event registration.
//!
//! Registration runs in three phases:
//!
//! 1. A lock-free fast path rejects users already registered for the event.
//! 2. The store admits the user inside an exclusive scope over the event
//!    (a row lock in Postgres), re-reading the limit and the attendee count
//!    before inserting. The scope has a bounded wait.
//! 3. After commit, both notifications are dispatched. Their outcome is
//!    reported but never undoes the registration.
//!
//! The (event, user) uniqueness constraint in the store backs up the fast
//! path: a duplicate that slips past it comes back as
//! [`AdmissionOutcome::Duplicate`].

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::notification::{NotificationResult, RegistrationNotice, RegistrationNotifier};
use crate::models::{Event, RegistrationConfirmation, User};

/// Storage-layer failures. Always retryable from the caller's point of view.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Timed out waiting for the event lock")]
    LockTimeout,

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// What happened inside the exclusive scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// The registration row was inserted and committed.
    Admitted {
        /// Attendee count including the new registration.
        attendee_count: i64,
        /// Capacity limit read under the lock.
        limit: i32,
    },
    /// The event was at capacity; nothing was written.
    Full,
    /// A registration for (event, user) already existed.
    Duplicate,
    /// The event vanished or was soft-deleted before the lock was taken.
    EventMissing,
}

/// Storage operations the registration flow relies on.
#[async_trait::async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Finds an event that is not soft-deleted.
    async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError>;

    /// Finds a user by ID.
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError>;

    /// Whether a registration exists for (event, user). Takes no lock.
    async fn is_registered(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, StoreError>;

    /// Atomically checks capacity and inserts the registration.
    ///
    /// Must serialize against concurrent calls for the same event, must not
    /// block calls for other events, and must give up with
    /// [`StoreError::LockTimeout`] after a bounded wait.
    async fn admit(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        registered_at: DateTime<Utc>,
    ) -> Result<AdmissionOutcome, StoreError>;
}

/// Registration failures.
///
/// Everything except [`RegistrationError::Storage`] is a business outcome to
/// show to the user, not a system error.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("You are already registered for this event.")]
    AlreadyRegistered,

    #[error("This event is already full.")]
    EventFull,

    #[error("Event not found")]
    EventNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl RegistrationError {
    /// Whether this is a user-facing business rejection rather than a
    /// storage failure.
    pub fn is_business_rejection(&self) -> bool {
        !matches!(self, RegistrationError::Storage(_))
    }

    /// Label used for metrics and logs.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            RegistrationError::AlreadyRegistered => "already_registered",
            RegistrationError::EventFull => "full",
            RegistrationError::EventNotFound => "not_found",
            RegistrationError::UserNotFound => "unknown_user",
            RegistrationError::Storage(StoreError::LockTimeout) => "lock_timeout",
            RegistrationError::Storage(StoreError::Unavailable(_)) => "storage_error",
        }
    }
}

/// Registers users for events without ever exceeding capacity.
pub struct RegistrationService<S, N> {
    store: S,
    notifier: N,
}

impl<S, N> RegistrationService<S, N>
where
    S: RegistrationStore,
    N: RegistrationNotifier,
{
    /// Creates a new service over the given store and notifier.
    pub fn new(store: S, notifier: N) -> Self {
        Self { store, notifier }
    }

    /// Registers `user_id` for `event_id`.
    pub async fn register(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<RegistrationConfirmation, RegistrationError> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(RegistrationError::EventNotFound)?;

        let attendee = self
            .store
            .find_user(user_id)
            .await?
            .ok_or(RegistrationError::UserNotFound)?;

        if self.store.is_registered(event_id, user_id).await? {
            info!(
                event_id = %event_id,
                user_id = %user_id,
                "Registration rejected: already registered"
            );
            return Err(RegistrationError::AlreadyRegistered);
        }

        let registered_at = Utc::now();
        let (attendee_count, limit) = match self
            .store
            .admit(event_id, user_id, registered_at)
            .await?
        {
            AdmissionOutcome::Admitted {
                attendee_count,
                limit,
            } => (attendee_count, limit),
            AdmissionOutcome::Full => {
                info!(
                    event_id = %event_id,
                    user_id = %user_id,
                    limit = event.limit,
                    "Registration rejected: event full"
                );
                return Err(RegistrationError::EventFull);
            }
            AdmissionOutcome::Duplicate => {
                info!(
                    event_id = %event_id,
                    user_id = %user_id,
                    "Registration rejected: duplicate caught by uniqueness constraint"
                );
                return Err(RegistrationError::AlreadyRegistered);
            }
            AdmissionOutcome::EventMissing => return Err(RegistrationError::EventNotFound),
        };

        info!(
            event_id = %event_id,
            user_id = %user_id,
            attendee_count = attendee_count,
            limit = limit,
            "User registered for event"
        );

        // Committed from here on; nothing below may turn this into a failure.
        let owner = match self.store.find_user(event.owner_id).await {
            Ok(owner) => owner,
            Err(e) => {
                warn!(
                    event_id = %event_id,
                    owner_id = %event.owner_id,
                    error = %e,
                    "Could not load event owner for notification"
                );
                None
            }
        };

        let notice = RegistrationNotice {
            event: Event { limit, ..event },
            attendee,
            owner,
            registered_at,
            attendee_count,
        };

        let confirmation = self.notifier.send_registration_confirmation(&notice).await;
        log_dispatch("registration_confirmation", &notice, &confirmation);

        let owner_alert = self.notifier.send_owner_alert(&notice).await;
        log_dispatch("owner_alert", &notice, &owner_alert);

        Ok(RegistrationConfirmation {
            event_id,
            user_id,
            registered_at,
            attendee_count,
            remaining_spots: notice.remaining_spots(),
            confirmation_sent: confirmation.is_sent(),
            owner_notified: owner_alert.is_sent(),
        })
    }
}

fn log_dispatch(kind: &str, notice: &RegistrationNotice, result: &NotificationResult) {
    match result {
        NotificationResult::Sent => {}
        NotificationResult::Skipped => {
            info!(
                kind = kind,
                event_id = %notice.event.id,
                "Notification skipped"
            );
        }
        NotificationResult::Failed(reason) => {
            warn!(
                kind = kind,
                event_id = %notice.event.id,
                user_id = %notice.attendee.id,
                reason = %reason,
                "Notification failed; registration stands"
            );
        }
    }
}
