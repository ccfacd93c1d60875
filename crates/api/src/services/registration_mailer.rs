//! Delivers registration notifications by email.

use async_trait::async_trait;
use domain::services::{NotificationResult, RegistrationNotice, RegistrationNotifier};

use super::email::{EmailMessage, EmailService};

/// [`RegistrationNotifier`] backed by the configured email provider.
#[derive(Clone)]
pub struct EmailRegistrationNotifier {
    email: EmailService,
}

impl EmailRegistrationNotifier {
    pub fn new(email: EmailService) -> Self {
        Self { email }
    }

    async fn deliver(&self, message: EmailMessage) -> NotificationResult {
        if !self.email.is_enabled() {
            return NotificationResult::Skipped;
        }

        match self.email.send(message).await {
            Ok(()) => NotificationResult::Sent,
            Err(e) => NotificationResult::Failed(e.to_string()),
        }
    }
}

#[async_trait]
impl RegistrationNotifier for EmailRegistrationNotifier {
    async fn send_registration_confirmation(
        &self,
        notice: &RegistrationNotice,
    ) -> NotificationResult {
        let message = self.email.registration_confirmation(notice);
        self.deliver(message).await
    }

    async fn send_owner_alert(&self, notice: &RegistrationNotice) -> NotificationResult {
        match self.email.owner_alert(notice) {
            Some(message) => self.deliver(message).await,
            None => NotificationResult::Skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmailConfig, EmailProvider};
    use chrono::Utc;
    use domain::models::{Event, User};
    use uuid::Uuid;

    fn notice(with_owner: bool) -> RegistrationNotice {
        let now = Utc::now();
        let owner_id = Uuid::new_v4();
        RegistrationNotice {
            event: Event {
                id: Uuid::new_v4(),
                owner_id,
                name: "Startup Pitch Night".to_string(),
                description: "Five-minute pitches".to_string(),
                date: now,
                image: None,
                limit: 30,
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
            attendee_count: 1,
        }
    }

    fn notifier(enabled: bool, provider: EmailProvider) -> EmailRegistrationNotifier {
        EmailRegistrationNotifier::new(EmailService::new(EmailConfig {
            enabled,
            provider,
            ..EmailConfig::default()
        }))
    }

    #[tokio::test]
    async fn test_console_delivery_is_sent() {
        let n = notifier(true, EmailProvider::Console);
        assert_eq!(
            n.send_registration_confirmation(&notice(true)).await,
            NotificationResult::Sent
        );
        assert_eq!(n.send_owner_alert(&notice(true)).await, NotificationResult::Sent);
    }

    #[tokio::test]
    async fn test_disabled_delivery_is_skipped() {
        let n = notifier(false, EmailProvider::Console);
        assert_eq!(
            n.send_registration_confirmation(&notice(true)).await,
            NotificationResult::Skipped
        );
    }

    #[test]
    fn test_missing_owner_is_skipped() {
        let n = notifier(true, EmailProvider::Console);
        let result = tokio_test::block_on(n.send_owner_alert(&notice(false)));
        assert_eq!(result, NotificationResult::Skipped);
    }

    #[tokio::test]
    async fn test_provider_failure_is_reported() {
        let n = notifier(true, EmailProvider::Smtp);
        let result = n.send_registration_confirmation(&notice(true)).await;
        assert!(matches!(result, NotificationResult::Failed(_)));
    }
}
