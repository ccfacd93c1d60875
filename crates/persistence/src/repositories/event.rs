//! Event repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{EventEntity, EventWithCountsEntity};
use crate::metrics::QueryTimer;

/// Repository for event-related database operations.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Creates a new EventRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event owned by `owner_id`.
    pub async fn create_event(
        &self,
        owner_id: Uuid,
        name: &str,
        description: &str,
        event_date: DateTime<Utc>,
        image: Option<&str>,
        attendee_limit: i32,
    ) -> Result<EventEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_event");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            INSERT INTO events (user_id, name, description, event_date, image, attendee_limit)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, name, description, event_date, image, attendee_limit,
                      deleted_at, created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .bind(description)
        .bind(event_date)
        .bind(image)
        .bind(attendee_limit)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a non-deleted event by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_event_by_id");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            SELECT id, user_id, name, description, event_date, image, attendee_limit,
                   deleted_at, created_at, updated_at
            FROM events
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find an event by ID, soft-deleted or not.
    pub async fn find_by_id_with_trashed(
        &self,
        id: Uuid,
    ) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_event_by_id_with_trashed");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            SELECT id, user_id, name, description, event_date, image, attendee_limit,
                   deleted_at, created_at, updated_at
            FROM events
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// List one page of non-deleted events, newest date first.
    ///
    /// `is_registered` is NULL unless a viewer is given.
    pub async fn list_public(
        &self,
        viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<EventWithCountsEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_public_events");
        let result = sqlx::query_as::<_, EventWithCountsEntity>(
            r#"
            SELECT
                e.id, e.user_id, e.name, e.description, e.event_date, e.image,
                e.attendee_limit, e.deleted_at, e.created_at, e.updated_at,
                (SELECT COUNT(*) FROM event_attendees ea WHERE ea.event_id = e.id) AS attendees_count,
                CASE WHEN $1::uuid IS NULL THEN NULL
                     ELSE EXISTS (
                         SELECT 1 FROM event_attendees ea
                         WHERE ea.event_id = e.id AND ea.user_id = $1
                     )
                END AS is_registered
            FROM events e
            WHERE e.deleted_at IS NULL
            ORDER BY e.event_date DESC, e.id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(viewer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count non-deleted events.
    pub async fn count_public(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_public_events");
        let result: Result<(i64,), sqlx::Error> =
            sqlx::query_as("SELECT COUNT(*) FROM events WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await;
        timer.record();
        result.map(|(count,)| count)
    }

    /// List every event owned by `owner_id`, soft-deleted ones included.
    pub async fn list_owned(
        &self,
        owner_id: Uuid,
    ) -> Result<Vec<EventWithCountsEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_owned_events");
        let result = sqlx::query_as::<_, EventWithCountsEntity>(
            r#"
            SELECT
                e.id, e.user_id, e.name, e.description, e.event_date, e.image,
                e.attendee_limit, e.deleted_at, e.created_at, e.updated_at,
                (SELECT COUNT(*) FROM event_attendees ea WHERE ea.event_id = e.id) AS attendees_count,
                NULL::boolean AS is_registered
            FROM events e
            WHERE e.user_id = $1
            ORDER BY e.event_date DESC, e.id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Update a non-deleted event. A `None` image keeps the stored one.
    ///
    /// Returns `None` if the event does not exist or is soft-deleted.
    pub async fn update_event(
        &self,
        id: Uuid,
        name: &str,
        description: &str,
        event_date: DateTime<Utc>,
        image: Option<&str>,
        attendee_limit: i32,
    ) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_event");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            UPDATE events
            SET name = $2,
                description = $3,
                event_date = $4,
                image = COALESCE($5, image),
                attendee_limit = $6,
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, user_id, name, description, event_date, image, attendee_limit,
                      deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(event_date)
        .bind(image)
        .bind(attendee_limit)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Soft-delete an event. Registrations are kept.
    ///
    /// Returns `None` if the event does not exist or is already deleted.
    pub async fn soft_delete(&self, id: Uuid) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("soft_delete_event");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            UPDATE events
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id, user_id, name, description, event_date, image, attendee_limit,
                      deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Clear the deletion marker. Restoring a live event is a no-op.
    pub async fn restore(&self, id: Uuid) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("restore_event");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            UPDATE events
            SET deleted_at = NULL,
                updated_at = CASE WHEN deleted_at IS NULL THEN updated_at ELSE NOW() END
            WHERE id = $1
            RETURNING id, user_id, name, description, event_date, image, attendee_limit,
                      deleted_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count registrations for an event.
    pub async fn count_attendees(&self, event_id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_event_attendees");
        let result: Result<(i64,), sqlx::Error> =
            sqlx::query_as("SELECT COUNT(*) FROM event_attendees WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&self.pool)
                .await;
        timer.record();
        result.map(|(count,)| count)
    }
}
