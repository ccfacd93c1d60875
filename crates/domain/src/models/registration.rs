//! Registration (attendee link) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's registration for an event. Unique per (event, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Registration {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
}

/// Result of a successful registration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistrationConfirmation {
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub registered_at: DateTime<Utc>,
    /// Attendee count right after this registration was committed.
    pub attendee_count: i64,
    /// `None` for events without a capacity limit.
    pub remaining_spots: Option<i64>,
    pub confirmation_sent: bool,
    pub owner_notified: bool,
}

/// Response body for `POST /events/:id/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RegisterResponse {
    pub message: String,
    pub registration: RegistrationConfirmation,
}
