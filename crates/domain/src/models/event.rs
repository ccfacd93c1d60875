//! Event domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::pagination::PageMeta;
use uuid::Uuid;
use validator::Validate;

/// An event published by an organizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    pub id: Uuid,
    /// User who created the event; the only user allowed to change it.
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
    /// Maximum number of attendees. `0` means unlimited.
    pub limit: i32,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Whether the event has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether the event has a capacity ceiling.
    pub fn has_capacity_limit(&self) -> bool {
        self.limit > 0
    }

    /// Whether `user_id` owns this event.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    /// Whether another attendee fits given the current attendee count.
    pub fn has_room_for_another(&self, attendee_count: i64) -> bool {
        !self.has_capacity_limit() || attendee_count < i64::from(self.limit)
    }

    /// Spots left given the current attendee count, `None` when unlimited.
    pub fn remaining_spots(&self, attendee_count: i64) -> Option<i64> {
        remaining_spots(self.limit, attendee_count)
    }
}

/// Computes `max(0, limit - attendee_count)`, or `None` for unlimited events.
pub fn remaining_spots(limit: i32, attendee_count: i64) -> Option<i64> {
    if limit > 0 {
        Some((i64::from(limit) - attendee_count).max(0))
    } else {
        None
    }
}

/// Request payload for creating an event.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CreateEventRequest {
    #[validate(required(message = "The name field is required"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    #[validate(length(max = 255, message = "Name must be at most 255 characters"))]
    pub name: Option<String>,

    #[validate(required(message = "The description field is required"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    pub description: Option<String>,

    #[validate(required(message = "The date field is required"))]
    pub date: Option<DateTime<Utc>>,

    #[validate(custom(function = "shared::validation::validate_image_reference"))]
    pub image: Option<String>,

    #[validate(required(message = "The limit field is required"))]
    #[validate(range(min = 1, message = "Limit must be at least 1"))]
    pub limit: Option<i32>,
}

/// Request payload for updating an event.
///
/// An absent `image` keeps the image already stored.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct UpdateEventRequest {
    #[validate(required(message = "The name field is required"))]
    #[validate(custom(function = "shared::validation::validate_renamed_event_name"))]
    #[validate(length(max = 255, message = "Name must be 5-255 characters"))]
    pub name: Option<String>,

    #[validate(required(message = "The description field is required"))]
    #[validate(custom(function = "shared::validation::validate_not_blank"))]
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[validate(required(message = "The date field is required"))]
    pub date: Option<DateTime<Utc>>,

    #[validate(custom(function = "shared::validation::validate_image_reference"))]
    pub image: Option<String>,

    #[validate(required(message = "The limit field is required"))]
    #[validate(range(min = 1, message = "Limit must be at least 1"))]
    pub limit: Option<i32>,
}

/// Validated event fields, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFields {
    pub name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
    pub limit: i32,
}

impl CreateEventRequest {
    /// Extracts the fields once validation has passed.
    ///
    /// Returns `None` if a required field is missing, which cannot happen
    /// after a successful `validate()`.
    pub fn into_fields(self) -> Option<EventFields> {
        Some(EventFields {
            name: self.name?.trim().to_string(),
            description: self.description?,
            date: self.date?,
            image: self.image,
            limit: self.limit?,
        })
    }
}

impl UpdateEventRequest {
    /// Extracts the fields once validation has passed.
    pub fn into_fields(self) -> Option<EventFields> {
        Some(EventFields {
            name: self.name?.trim().to_string(),
            description: self.description?,
            date: self.date?,
            image: self.image,
            limit: self.limit?,
        })
    }
}

/// Query parameters for the public event listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ListEventsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Event as shown in the public listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventSummary {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
    pub limit: i32,
    pub attendees_count: i64,
    pub remaining_spots: Option<i64>,
    /// Present only when the viewer is authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_registered: Option<bool>,
}

/// Response for the public event listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ListEventsResponse {
    pub data: Vec<EventSummary>,
    pub pagination: PageMeta,
}

/// Event as shown to its owner in the management listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ManagedEventSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub image: Option<String>,
    pub limit: i32,
    pub attendees_count: i64,
    pub remaining_spots: Option<i64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response for the owner's management listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ManageEventsResponse {
    pub data: Vec<ManagedEventSummary>,
}

/// Single event detail.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventDetailResponse {
    pub event: Event,
    pub attendees_count: i64,
    pub remaining_spots: Option<i64>,
}

/// Response for create/update/delete/restore, carrying the user-facing message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EventMessageResponse {
    pub message: String,
    pub event: Event,
}
