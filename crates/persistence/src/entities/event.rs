//! Event entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the events table.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub image: Option<String>,
    pub attendee_limit: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventEntity> for domain::models::Event {
    fn from(entity: EventEntity) -> Self {
        Self {
            id: entity.id,
            owner_id: entity.user_id,
            name: entity.name,
            description: entity.description,
            date: entity.event_date,
            image: entity.image,
            limit: entity.attendee_limit,
            deleted_at: entity.deleted_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Event row with its attendee count, for listings.
#[derive(Debug, Clone, FromRow)]
pub struct EventWithCountsEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub event_date: DateTime<Utc>,
    pub image: Option<String>,
    pub attendee_limit: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attendees_count: i64,
    /// NULL when the listing was requested without a viewer.
    pub is_registered: Option<bool>,
}

impl From<EventWithCountsEntity> for domain::models::event::EventSummary {
    fn from(entity: EventWithCountsEntity) -> Self {
        Self {
            id: entity.id,
            owner_id: entity.user_id,
            remaining_spots: domain::models::remaining_spots(
                entity.attendee_limit,
                entity.attendees_count,
            ),
            name: entity.name,
            description: entity.description,
            date: entity.event_date,
            image: entity.image,
            limit: entity.attendee_limit,
            attendees_count: entity.attendees_count,
            is_registered: entity.is_registered,
        }
    }
}

impl From<EventWithCountsEntity> for domain::models::event::ManagedEventSummary {
    fn from(entity: EventWithCountsEntity) -> Self {
        Self {
            id: entity.id,
            remaining_spots: domain::models::remaining_spots(
                entity.attendee_limit,
                entity.attendees_count,
            ),
            name: entity.name,
            description: entity.description,
            date: entity.event_date,
            image: entity.image,
            limit: entity.attendee_limit,
            attendees_count: entity.attendees_count,
            deleted_at: entity.deleted_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::event::{EventSummary, ManagedEventSummary};
    use domain::models::Event;

    fn row(limit: i32, attendees: i64) -> EventWithCountsEntity {
        let now = Utc::now();
        EventWithCountsEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Tech Conference 2025".to_string(),
            description: "Keynotes".to_string(),
            event_date: now,
            image: Some("events/tech.png".to_string()),
            attendee_limit: limit,
            deleted_at: None,
            created_at: now,
            updated_at: now,
            attendees_count: attendees,
            is_registered: Some(true),
        }
    }

    #[test]
    fn test_entity_to_event() {
        let now = Utc::now();
        let entity = EventEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Art Gallery Opening".to_string(),
            description: "Opening night".to_string(),
            event_date: now,
            image: None,
            attendee_limit: 80,
            deleted_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        let owner = entity.user_id;

        let event: Event = entity.into();
        assert_eq!(event.owner_id, owner);
        assert_eq!(event.limit, 80);
        assert!(event.is_deleted());
    }

    #[test]
    fn test_row_to_summary() {
        let summary: EventSummary = row(10, 4).into();
        assert_eq!(summary.attendees_count, 4);
        assert_eq!(summary.remaining_spots, Some(6));
        assert_eq!(summary.is_registered, Some(true));
    }

    #[test]
    fn test_row_to_managed_summary_unlimited() {
        let managed: ManagedEventSummary = row(0, 12).into();
        assert_eq!(managed.remaining_spots, None);
        assert_eq!(managed.attendees_count, 12);
    }
}
