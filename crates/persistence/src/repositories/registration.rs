//! Postgres registration store.
//!
//! Admission runs in one transaction that row-locks the event, so
//! concurrent registrations for the same event queue up behind each other
//! while other events are unaffected. The wait for the row lock is bounded
//! with `SET LOCAL lock_timeout`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use domain::models::{Event, Registration, User};
use domain::services::{AdmissionOutcome, RegistrationStore, StoreError};

use crate::entities::{EventEntity, RegistrationEntity, UserEntity};
use crate::metrics::QueryTimer;

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// SQLSTATE for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// Registration store backed by Postgres.
#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
    lock_timeout: Duration,
}

impl RegistrationRepository {
    /// Creates a new RegistrationRepository with the given pool and lock wait bound.
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    /// Lists an event's registrations, earliest first.
    pub async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Registration>, sqlx::Error> {
        let timer = QueryTimer::new("list_event_registrations");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT event_id, user_id, registered_at, created_at, updated_at
            FROM event_attendees
            WHERE event_id = $1
            ORDER BY registered_at, user_id
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result.map(|rows| rows.into_iter().map(Into::into).collect())
    }

    async fn try_admit(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        registered_at: DateTime<Utc>,
    ) -> Result<AdmissionOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&lock_timeout_statement(self.lock_timeout))
            .execute(&mut *tx)
            .await?;

        let limit: Option<(i32,)> = sqlx::query_as(
            r#"
            SELECT attendee_limit
            FROM events
            WHERE id = $1 AND deleted_at IS NULL
            FOR UPDATE
            "#,
        )
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((limit,)) = limit else {
            tx.rollback().await?;
            return Ok(AdmissionOutcome::EventMissing);
        };

        let (current,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM event_attendees WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;

        if limit > 0 && current >= i64::from(limit) {
            tx.rollback().await?;
            return Ok(AdmissionOutcome::Full);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO event_attendees (event_id, user_id, registered_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (event_id, user_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .bind(registered_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(AdmissionOutcome::Duplicate);
        }

        tx.commit().await?;

        Ok(AdmissionOutcome::Admitted {
            attendee_count: current + 1,
            limit,
        })
    }
}

/// `SET LOCAL` takes no bind parameters, so the value is formatted in.
fn lock_timeout_statement(timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis().max(1))
}

fn store_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(LOCK_NOT_AVAILABLE) => {
            StoreError::LockTimeout
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

#[async_trait]
impl RegistrationStore for RegistrationRepository {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let timer = QueryTimer::new("registration_find_event");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            SELECT id, user_id, name, description, event_date, image, attendee_limit,
                   deleted_at, created_at, updated_at
            FROM events
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|e| e.map(Into::into)).map_err(store_error)
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let timer = QueryTimer::new("registration_find_user");
        let result = sqlx::query_as::<_, UserEntity>(
            r#"
            SELECT id, name, email, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map(|u| u.map(Into::into)).map_err(store_error)
    }

    async fn is_registered(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("registration_is_registered");
        let result: Result<(bool,), sqlx::Error> = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM event_attendees WHERE event_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(|(exists,)| exists).map_err(store_error)
    }

    async fn admit(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        registered_at: DateTime<Utc>,
    ) -> Result<AdmissionOutcome, StoreError> {
        let timer = QueryTimer::new("admit_registration");
        let result = self.try_admit(event_id, user_id, registered_at).await;
        timer.record();

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) if is_unique_violation(&e) => Ok(AdmissionOutcome::Duplicate),
            Err(e) => {
                debug!(event_id = %event_id, error = %e, "Admission transaction failed");
                Err(store_error(e))
            }
        }
    }
}
