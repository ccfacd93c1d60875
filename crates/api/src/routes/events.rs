//! Event listing, management, and registration routes.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use domain::models::event::{
    CreateEventRequest, EventDetailResponse, EventFields, EventMessageResponse, EventSummary,
    ListEventsQuery, ListEventsResponse, ManageEventsResponse, ManagedEventSummary,
    UpdateEventRequest,
};
use domain::models::registration::RegisterResponse;
use domain::models::{remaining_spots, Event};
use persistence::repositories::EventRepository;
use shared::pagination::{PageMeta, PageRequest};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{EventForm, OptionalUserAuth, UserAuth};
use crate::middleware::record_registration_outcome;
use crate::services::ImageUpload;

pub const MSG_CREATED: &str = "Event created successfully.";
pub const MSG_UPDATED: &str = "Event updated successfully.";
pub const MSG_DELETED: &str = "Event deleted successfully.";
pub const MSG_RESTORED: &str = "Event restored successfully.";
pub const MSG_REGISTERED: &str = "You have been registered for this event.";

/// SQLSTATE for foreign key violations. `events.user_id` is the only
/// foreign key an event write can break.
const FOREIGN_KEY_VIOLATION: &str = "23503";

fn missing_fields() -> ApiError {
    ApiError::validation("Required event fields are missing")
}

fn event_not_found() -> ApiError {
    ApiError::NotFound("Event not found".into())
}

/// An id that is not a UUID cannot name an event.
fn parse_event_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    path.map(|Path(id)| id).map_err(|_| event_not_found())
}

/// A valid token whose user row is gone gets the same answer as registration.
fn owner_write_error(err: sqlx::Error) -> ApiError {
    let unknown_owner = err
        .as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION);

    if unknown_owner {
        ApiError::Unauthorized("Unknown user for this token".into())
    } else {
        err.into()
    }
}

/// Stores an uploaded image, which then replaces any submitted reference.
async fn attach_upload(
    state: &AppState,
    fields: &mut EventFields,
    upload: Option<ImageUpload>,
) -> Result<(), ApiError> {
    if let Some(upload) = upload {
        fields.image = Some(state.images.store(&upload).await?);
    }
    Ok(())
}

/// Loads an event (soft-deleted included) and checks that `user_id` owns it.
async fn owned_event(
    repo: &EventRepository,
    event_id: Uuid,
    user_id: Uuid,
) -> Result<Event, ApiError> {
    let event: Event = repo
        .find_by_id_with_trashed(event_id)
        .await?
        .map(Event::from)
        .ok_or_else(event_not_found)?;

    if !event.is_owned_by(user_id) {
        info!(
            event_id = %event_id,
            user_id = %user_id,
            "Rejected change to event owned by another user"
        );
        return Err(ApiError::Forbidden(
            "You are not allowed to modify this event".into(),
        ));
    }

    Ok(event)
}

/// List events.
///
/// GET /events?page=&per_page=
///
/// Public. Soft-deleted events are excluded. With a valid Bearer token each
/// event also reports whether the caller is registered. Unparseable paging
/// parameters fall back to the first page at the default size.
pub async fn list_events(
    State(state): State<AppState>,
    viewer: OptionalUserAuth,
    query: Result<Query<ListEventsQuery>, QueryRejection>,
) -> Result<Json<ListEventsResponse>, ApiError> {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let repo = EventRepository::new(state.pool.clone());
    let page = PageRequest::new(query.page, query.per_page);

    let rows = repo
        .list_public(viewer.user_id(), page.limit(), page.offset())
        .await?;
    let total = repo.count_public().await?;

    let data: Vec<EventSummary> = rows.into_iter().map(Into::into).collect();
    let pagination = PageMeta::new(page, total, data.len());

    Ok(Json(ListEventsResponse { data, pagination }))
}

/// List the caller's own events, soft-deleted ones included.
///
/// GET /events/manage
pub async fn manage_events(
    State(state): State<AppState>,
    user_auth: UserAuth,
) -> Result<Json<ManageEventsResponse>, ApiError> {
    let repo = EventRepository::new(state.pool.clone());
    let rows = repo.list_owned(user_auth.user_id).await?;

    let data: Vec<ManagedEventSummary> = rows.into_iter().map(Into::into).collect();

    info!(
        user_id = %user_auth.user_id,
        event_count = data.len(),
        "Listed managed events"
    );

    Ok(Json(ManageEventsResponse { data }))
}

/// Get a single event.
///
/// GET /events/:event_id
pub async fn get_event(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EventDetailResponse>, ApiError> {
    let event_id = parse_event_id(path)?;
    let repo = EventRepository::new(state.pool.clone());

    let event: Event = repo
        .find_by_id(event_id)
        .await?
        .map(Event::from)
        .ok_or_else(event_not_found)?;
    let attendees_count = repo.count_attendees(event_id).await?;

    Ok(Json(EventDetailResponse {
        remaining_spots: remaining_spots(event.limit, attendees_count),
        event,
        attendees_count,
    }))
}

/// Create an event owned by the caller.
///
/// POST /events
///
/// Accepts JSON or `multipart/form-data`; an `image` file part is stored
/// under `events/`.
pub async fn create_event(
    State(state): State<AppState>,
    user_auth: UserAuth,
    form: EventForm<CreateEventRequest>,
) -> Result<(StatusCode, Json<EventMessageResponse>), ApiError> {
    let EventForm { request, image } = form;
    request.validate()?;
    let mut fields: EventFields = request.into_fields().ok_or_else(missing_fields)?;
    attach_upload(&state, &mut fields, image).await?;

    let repo = EventRepository::new(state.pool.clone());
    let event: Event = repo
        .create_event(
            user_auth.user_id,
            &fields.name,
            &fields.description,
            fields.date,
            fields.image.as_deref(),
            fields.limit,
        )
        .await
        .map_err(owner_write_error)?
        .into();

    info!(
        event_id = %event.id,
        user_id = %user_auth.user_id,
        limit = event.limit,
        "Event created"
    );

    Ok((
        StatusCode::CREATED,
        Json(EventMessageResponse {
            message: MSG_CREATED.to_string(),
            event,
        }),
    ))
}

/// Update an event. Owner only.
///
/// PUT /events/:event_id
///
/// Without a new image file or reference the stored image is kept.
pub async fn update_event(
    State(state): State<AppState>,
    user_auth: UserAuth,
    path: Result<Path<Uuid>, PathRejection>,
    form: EventForm<UpdateEventRequest>,
) -> Result<Json<EventMessageResponse>, ApiError> {
    let event_id = parse_event_id(path)?;
    let repo = EventRepository::new(state.pool.clone());
    let existing = owned_event(&repo, event_id, user_auth.user_id).await?;
    if existing.is_deleted() {
        return Err(event_not_found());
    }

    let EventForm { request, image } = form;
    request.validate()?;
    let mut fields = request.into_fields().ok_or_else(missing_fields)?;
    attach_upload(&state, &mut fields, image).await?;

    let event: Event = repo
        .update_event(
            event_id,
            &fields.name,
            &fields.description,
            fields.date,
            fields.image.as_deref(),
            fields.limit,
        )
        .await?
        .map(Event::from)
        .ok_or_else(event_not_found)?;

    info!(event_id = %event_id, user_id = %user_auth.user_id, "Event updated");

    Ok(Json(EventMessageResponse {
        message: MSG_UPDATED.to_string(),
        event,
    }))
}

/// Soft-delete an event. Owner only. Registrations are kept.
///
/// DELETE /events/:event_id
pub async fn delete_event(
    State(state): State<AppState>,
    user_auth: UserAuth,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EventMessageResponse>, ApiError> {
    let event_id = parse_event_id(path)?;
    let repo = EventRepository::new(state.pool.clone());
    let existing = owned_event(&repo, event_id, user_auth.user_id).await?;
    if existing.is_deleted() {
        return Err(event_not_found());
    }

    let event: Event = repo
        .soft_delete(event_id)
        .await?
        .map(Event::from)
        .ok_or_else(event_not_found)?;

    info!(event_id = %event_id, user_id = %user_auth.user_id, "Event soft-deleted");

    Ok(Json(EventMessageResponse {
        message: MSG_DELETED.to_string(),
        event,
    }))
}

/// Restore a soft-deleted event. Owner only.
///
/// POST /events/:event_id/restore
///
/// Restoring an event that is not deleted succeeds without changes.
pub async fn restore_event(
    State(state): State<AppState>,
    user_auth: UserAuth,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<EventMessageResponse>, ApiError> {
    let event_id = parse_event_id(path)?;
    let repo = EventRepository::new(state.pool.clone());
    owned_event(&repo, event_id, user_auth.user_id).await?;

    let event: Event = repo
        .restore(event_id)
        .await?
        .map(Event::from)
        .ok_or_else(event_not_found)?;

    info!(event_id = %event_id, user_id = %user_auth.user_id, "Event restored");

    Ok(Json(EventMessageResponse {
        message: MSG_RESTORED.to_string(),
        event,
    }))
}

/// Register the caller for an event.
///
/// POST /events/:event_id/register
///
/// "Full" and "already registered" come back as 409 with the user-facing
/// message; a lock wait past the configured bound comes back as 503.
pub async fn register_for_event(
    State(state): State<AppState>,
    user_auth: UserAuth,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let event_id = parse_event_id(path)?;
    match state.registrations.register(event_id, user_auth.user_id).await {
        Ok(registration) => {
            record_registration_outcome("registered");
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    message: MSG_REGISTERED.to_string(),
                    registration,
                }),
            ))
        }
        Err(e) => {
            record_registration_outcome(e.outcome_label());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    #[test]
    fn test_messages() {
        assert_eq!(MSG_CREATED, "Event created successfully.");
        assert_eq!(MSG_UPDATED, "Event updated successfully.");
        assert_eq!(MSG_DELETED, "Event deleted successfully.");
        assert_eq!(MSG_RESTORED, "Event restored successfully.");
        assert_eq!(MSG_REGISTERED, "You have been registered for this event.");
    }

    #[test]
    fn test_unparseable_event_id_is_not_found() {
        let response = event_not_found().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_non_database_write_errors_keep_their_mapping() {
        let response = owner_write_error(sqlx::Error::PoolTimedOut).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_missing_fields_is_bad_request() {
        let response = missing_fields().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
