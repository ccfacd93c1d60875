//! Registration notifications.
//!
//! A committed registration produces two messages: a confirmation to the
//! registrant and an alert to the event owner. Delivery is best-effort and
//! happens after the registration transaction has committed.

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

use crate::models::{Event, User};

/// Everything a notifier needs to render both registration messages.
#[derive(Debug, Clone)]
pub struct RegistrationNotice {
    pub event: Event,
    pub attendee: User,
    /// `None` when the owner record could not be resolved.
    pub owner: Option<User>,
    pub registered_at: DateTime<Utc>,
    /// Attendee count right after the registration was committed.
    pub attendee_count: i64,
}

impl RegistrationNotice {
    /// Spots left after this registration, `None` for unlimited events.
    pub fn remaining_spots(&self) -> Option<i64> {
        self.event.remaining_spots(self.attendee_count)
    }
}

/// Kind of registration notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    RegistrationConfirmation,
    OwnerAlert,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::RegistrationConfirmation => write!(f, "registration_confirmation"),
            NotificationKind::OwnerAlert => write!(f, "owner_alert"),
        }
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    /// Notification was handed to the transport.
    Sent,
    /// Sending failed. The registration stands regardless.
    Failed(String),
    /// Nothing to send (e.g. no owner to notify, or delivery disabled).
    Skipped,
}

impl NotificationResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationResult::Sent)
    }
}

/// Sends the two registration notifications.
#[async_trait::async_trait]
pub trait RegistrationNotifier: Send + Sync {
    /// Confirmation to the user who registered.
    async fn send_registration_confirmation(
        &self,
        notice: &RegistrationNotice,
    ) -> NotificationResult;

    /// Alert to the owner of the event.
    async fn send_owner_alert(&self, notice: &RegistrationNotice) -> NotificationResult;
}

/// A notification recorded by [`MockRegistrationNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentNotification {
    pub kind: NotificationKind,
    pub recipient: String,
    pub event_name: String,
    pub attendee_count: i64,
    pub remaining_spots: Option<i64>,
}

/// Mock notifier for development and testing.
///
/// Records notifications instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct MockRegistrationNotifier {
    /// Whether to simulate transport failures.
    pub simulate_failure: bool,
    sent: Arc<Mutex<Vec<SentNotification>>>,
}

impl MockRegistrationNotifier {
    /// Create a new recording notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a notifier whose every send fails.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Notifications recorded so far.
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }

    fn record(
        &self,
        kind: NotificationKind,
        recipient: &str,
        notice: &RegistrationNotice,
    ) -> NotificationResult {
        if self.simulate_failure {
            tracing::debug!(
                kind = %kind,
                recipient = %recipient,
                "Mock notifier: simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentNotification {
                kind,
                recipient: recipient.to_string(),
                event_name: notice.event.name.clone(),
                attendee_count: notice.attendee_count,
                remaining_spots: notice.remaining_spots(),
            });
        }
        NotificationResult::Sent
    }
}

#[async_trait::async_trait]
impl RegistrationNotifier for MockRegistrationNotifier {
    async fn send_registration_confirmation(
        &self,
        notice: &RegistrationNotice,
    ) -> NotificationResult {
        self.record(
            NotificationKind::RegistrationConfirmation,
            &notice.attendee.email,
            notice,
        )
    }

    async fn send_owner_alert(&self, notice: &RegistrationNotice) -> NotificationResult {
        match &notice.owner {
            Some(owner) => self.record(NotificationKind::OwnerAlert, &owner.email, notice),
            None => NotificationResult::Skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn notice(limit: i32, attendee_count: i64, with_owner: bool) -> RegistrationNotice {
        let now = Utc::now();
        let owner_id = Uuid::new_v4();
        RegistrationNotice {
            event: Event {
                id: Uuid::new_v4(),
                owner_id,
                name: "Web Development Workshop".to_string(),
                description: "Hands-on workshop".to_string(),
                date: now,
                image: None,
                limit,
                deleted_at: None,
                created_at: now,
                updated_at: now,
            },
            attendee: User {
                id: Uuid::new_v4(),
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
            },
            owner: with_owner.then(|| User {
                id: owner_id,
                name: "Grace".to_string(),
                email: "grace@example.com".to_string(),
            }),
            registered_at: now,
            attendee_count,
        }
    }

    #[test]
    fn test_notice_remaining_spots() {
        assert_eq!(notice(10, 4, true).remaining_spots(), Some(6));
        assert_eq!(notice(3, 5, true).remaining_spots(), Some(0));
        assert_eq!(notice(0, 5, true).remaining_spots(), None);
    }

    #[test]
    fn test_notification_kind_display() {
        assert_eq!(
            NotificationKind::RegistrationConfirmation.to_string(),
            "registration_confirmation"
        );
        assert_eq!(NotificationKind::OwnerAlert.to_string(), "owner_alert");
    }

    #[tokio::test]
    async fn test_mock_notifier_records_both_messages() {
        let notifier = MockRegistrationNotifier::new();
        let notice = notice(10, 1, true);

        assert!(notifier.send_registration_confirmation(&notice).await.is_sent());
        assert!(notifier.send_owner_alert(&notice).await.is_sent());

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].recipient, "ada@example.com");
        assert_eq!(sent[1].kind, NotificationKind::OwnerAlert);
        assert_eq!(sent[1].recipient, "grace@example.com");
        assert_eq!(sent[1].remaining_spots, Some(9));
    }

    #[tokio::test]
    async fn test_mock_notifier_skips_owner_alert_without_owner() {
        let notifier = MockRegistrationNotifier::new();
        let result = notifier.send_owner_alert(&notice(10, 1, false)).await;
        assert_eq!(result, NotificationResult::Skipped);
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_failing_mock_notifier() {
        let notifier = MockRegistrationNotifier::failing();
        let result = notifier
            .send_registration_confirmation(&notice(10, 1, true))
            .await;
        assert!(matches!(result, NotificationResult::Failed(_)));
        assert!(notifier.sent().is_empty());
    }
}
