//! Event attendee entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the event_attendees table.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationEntity {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<RegistrationEntity> for domain::models::Registration {
    fn from(entity: RegistrationEntity) -> Self {
        Self {
            event_id: entity.event_id,
            user_id: entity.user_id,
            registered_at: entity.registered_at,
        }
    }
}
