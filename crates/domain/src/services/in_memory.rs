//! In-memory [`RegistrationStore`].
//!
//! Mirrors the Postgres semantics: one exclusive scope per event, acquired
//! with a bounded wait, and a uniqueness check on (event, user). Used by the
//! domain tests and handy for local experiments without a database.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::registration::{AdmissionOutcome, RegistrationStore, StoreError};
use crate::models::{Event, User};

/// Default bound on how long `admit` waits for an event's scope.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct State {
    events: RwLock<HashMap<Uuid, Event>>,
    users: RwLock<HashMap<Uuid, User>>,
    attendees: Mutex<HashMap<Uuid, HashMap<Uuid, DateTime<Utc>>>>,
    event_locks: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

/// Registration store kept in process memory.
#[derive(Clone)]
pub struct InMemoryRegistrationStore {
    state: Arc<State>,
    lock_timeout: Duration,
}

impl Default for InMemoryRegistrationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(State::default()),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets the bounded wait for an event's exclusive scope.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn insert_event(&self, event: Event) {
        if let Ok(mut events) = self.state.events.write() {
            events.insert(event.id, event);
        }
    }

    pub fn insert_user(&self, user: User) {
        if let Ok(mut users) = self.state.users.write() {
            users.insert(user.id, user);
        }
    }

    /// Marks an event as soft-deleted.
    pub fn soft_delete(&self, event_id: Uuid) {
        if let Ok(mut events) = self.state.events.write() {
            if let Some(event) = events.get_mut(&event_id) {
                event.deleted_at = Some(Utc::now());
            }
        }
    }

    /// Number of committed registrations for an event.
    pub fn attendee_count(&self, event_id: Uuid) -> i64 {
        self.state
            .attendees
            .lock()
            .map(|a| a.get(&event_id).map_or(0, |m| m.len() as i64))
            .unwrap_or(0)
    }

    /// Takes an event's exclusive scope and holds it until the guard drops.
    pub async fn hold_event_lock(&self, event_id: Uuid) -> OwnedMutexGuard<()> {
        self.event_lock(event_id).lock_owned().await
    }

    fn event_lock(&self, event_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut locks = match self.state.event_locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(event_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn poisoned(what: &str) -> StoreError {
        StoreError::Unavailable(format!("{} lock poisoned", what))
    }
}

#[async_trait::async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn find_event(&self, event_id: Uuid) -> Result<Option<Event>, StoreError> {
        let events = self.state.events.read().map_err(|_| Self::poisoned("events"))?;
        Ok(events.get(&event_id).filter(|e| !e.is_deleted()).cloned())
    }

    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.state.users.read().map_err(|_| Self::poisoned("users"))?;
        Ok(users.get(&user_id).cloned())
    }

    async fn is_registered(&self, event_id: Uuid, user_id: Uuid) -> Result<bool, StoreError> {
        let attendees = self
            .state
            .attendees
            .lock()
            .map_err(|_| Self::poisoned("attendees"))?;
        Ok(attendees
            .get(&event_id)
            .is_some_and(|m| m.contains_key(&user_id)))
    }

    async fn admit(
        &self,
        event_id: Uuid,
        user_id: Uuid,
        registered_at: DateTime<Utc>,
    ) -> Result<AdmissionOutcome, StoreError> {
        let lock = self.event_lock(event_id);
        let _scope = tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| StoreError::LockTimeout)?;

        let Some(event) = self.find_event(event_id).await? else {
            return Ok(AdmissionOutcome::EventMissing);
        };

        let current = self.attendee_count(event_id);

        // Let other tasks run between the read and the write; only the
        // event scope keeps this section consistent.
        tokio::task::yield_now().await;

        if !event.has_room_for_another(current) {
            return Ok(AdmissionOutcome::Full);
        }

        let mut attendees = self
            .state
            .attendees
            .lock()
            .map_err(|_| Self::poisoned("attendees"))?;
        let registered = attendees.entry(event_id).or_default();
        if registered.contains_key(&user_id) {
            return Ok(AdmissionOutcome::Duplicate);
        }
        registered.insert(user_id, registered_at);

        Ok(AdmissionOutcome::Admitted {
            attendee_count: registered.len() as i64,
            limit: event.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(limit: i32) -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Food & Wine Tasting".to_string(),
            description: "Local wineries".to_string(),
            date: now,
            image: None,
            limit,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_admit_until_full() {
        let store = InMemoryRegistrationStore::new();
        let e = event(2);
        store.insert_event(e.clone());

        let first = store.admit(e.id, Uuid::new_v4(), Utc::now()).await.unwrap();
        let second = store.admit(e.id, Uuid::new_v4(), Utc::now()).await.unwrap();
        let third = store.admit(e.id, Uuid::new_v4(), Utc::now()).await.unwrap();

        assert_eq!(
            first,
            AdmissionOutcome::Admitted {
                attendee_count: 1,
                limit: 2
            }
        );
        assert!(matches!(second, AdmissionOutcome::Admitted { attendee_count: 2, .. }));
        assert_eq!(third, AdmissionOutcome::Full);
    }

    #[tokio::test]
    async fn test_admit_duplicate() {
        let store = InMemoryRegistrationStore::new();
        let e = event(0);
        store.insert_event(e.clone());
        let user_id = Uuid::new_v4();

        store.admit(e.id, user_id, Utc::now()).await.unwrap();
        let again = store.admit(e.id, user_id, Utc::now()).await.unwrap();

        assert_eq!(again, AdmissionOutcome::Duplicate);
        assert!(store.is_registered(e.id, user_id).await.unwrap());
        assert_eq!(store.attendee_count(e.id), 1);
    }

    #[tokio::test]
    async fn test_admit_missing_or_deleted_event() {
        let store = InMemoryRegistrationStore::new();
        let outcome = store.admit(Uuid::new_v4(), Uuid::new_v4(), Utc::now()).await;
        assert_eq!(outcome.unwrap(), AdmissionOutcome::EventMissing);

        let e = event(3);
        store.insert_event(e.clone());
        store.soft_delete(e.id);
        assert!(store.find_event(e.id).await.unwrap().is_none());
        let outcome = store.admit(e.id, Uuid::new_v4(), Utc::now()).await;
        assert_eq!(outcome.unwrap(), AdmissionOutcome::EventMissing);
    }

    #[tokio::test]
    async fn test_admit_times_out_while_scope_is_held() {
        let store = InMemoryRegistrationStore::new().with_lock_timeout(Duration::from_millis(10));
        let e = event(3);
        store.insert_event(e.clone());

        let _guard = store.hold_event_lock(e.id).await;
        let result = store.admit(e.id, Uuid::new_v4(), Utc::now()).await;

        assert!(matches!(result, Err(StoreError::LockTimeout)));
        assert_eq!(store.attendee_count(e.id), 0);
    }
}
