//! Persisted entities: sessions and the events queued for them.
//!
//! Both entities are stored as JSON text in a [`Store`]. Keys are laid out as:
//!
//! | Entity | Key |
//! |--------|-----|
//! | [`Session`] | `session:{id}` |
//! | [`Event`] | `event:{len(session_id)}:{session_id}:{event_id}` |
//!
//! The length prefix on event keys keeps the `(session_id, event_id)` encoding
//! unambiguous, so two different pairs never share a key even when either
//! part contains `:`. An event is therefore only reachable through the
//! session that owns it.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{Store, StoreError};

/// An authenticated channel: an opaque identifier plus its shared secret.
///
/// Sessions are created and expired by an external flow; the server only
/// reads them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub key: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Session {
    /// Creates a session record.
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
        }
    }

    /// Returns the storage key for the session with the given id.
    pub fn storage_key(id: &str) -> String {
        format!("session:{id}")
    }

    /// Persists this session, replacing any record with the same id.
    pub fn save(&self, store: &dyn Store) -> Result<(), StoreError> {
        save_json(store, &Self::storage_key(&self.id), self)
    }

    /// Loads the session with the given id.
    pub fn load(store: &dyn Store, id: &str) -> Result<Option<Self>, StoreError> {
        load_json(store, &Self::storage_key(id))
    }
}

/// A named message queued for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Identifier, unique within the owning session only.
    pub id: String,
    /// Back-reference to the owning session.
    pub session_id: String,
    /// Event name.
    pub event: String,
    /// Opaque payload.
    pub data: String,
    /// Set once the client has acknowledged the event. Never reset.
    #[serde(default)]
    pub seen: bool,
}

/// Result of [`Event::mark_seen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeenOutcome {
    /// No event exists for the `(session, event)` pair.
    Absent,
    /// The event was already marked seen; nothing was written.
    AlreadySeen,
    /// The event was unseen and has now been persisted as seen.
    MarkedSeen,
}

impl SeenOutcome {
    /// Short label used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::AlreadySeen => "already_seen",
            Self::MarkedSeen => "marked_seen",
        }
    }
}

impl Event {
    /// Creates an unseen event owned by `session_id`.
    pub fn new(
        session_id: impl Into<String>,
        id: impl Into<String>,
        event: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            event: event.into(),
            data: data.into(),
            seen: false,
        }
    }

    /// Returns the key prefix shared by every event of a session.
    pub fn session_prefix(session_id: &str) -> String {
        format!("event:{}:{session_id}:", session_id.len())
    }

    /// Returns the storage key for an event of a session.
    pub fn storage_key(session_id: &str, event_id: &str) -> String {
        format!("{}{event_id}", Self::session_prefix(session_id))
    }

    /// Persists this event under its owning session.
    pub fn save(&self, store: &dyn Store) -> Result<(), StoreError> {
        save_json(store, &Self::storage_key(&self.session_id, &self.id), self)
    }

    /// Loads one event of a session.
    pub fn load(
        store: &dyn Store,
        session_id: &str,
        event_id: &str,
    ) -> Result<Option<Self>, StoreError> {
        load_json(store, &Self::storage_key(session_id, event_id))
    }

    /// Loads every event of a session, ordered by event id.
    pub fn load_all(store: &dyn Store, session_id: &str) -> Result<Vec<Self>, StoreError> {
        let keys = store.keys_with_prefix(&Self::session_prefix(session_id))?;
        let mut events = Vec::with_capacity(keys.len());
        for key in keys {
            // A record removed between listing and loading is skipped.
            if let Some(event) = load_json(store, &key)? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Marks an event of a session as seen.
    ///
    /// The transition only goes from unseen to seen, so repeated or
    /// concurrent calls converge on `seen == true`. A missing event is not an
    /// error and is reported as [`SeenOutcome::Absent`].
    pub fn mark_seen(
        store: &dyn Store,
        session_id: &str,
        event_id: &str,
    ) -> Result<SeenOutcome, StoreError> {
        let Some(mut event) = Self::load(store, session_id, event_id)? else {
            return Ok(SeenOutcome::Absent);
        };

        if event.seen {
            return Ok(SeenOutcome::AlreadySeen);
        }

        event.seen = true;
        event.save(store)?;
        debug!(session_id = %session_id, event_id = %event_id, "Event marked seen");
        Ok(SeenOutcome::MarkedSeen)
    }
}

fn save_json<T: Serialize>(store: &dyn Store, key: &str, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_string(value).map_err(|e| StoreError::Serialize(e.to_string()))?;
    store.save(key, &json)
}

fn load_json<T: DeserializeOwned>(store: &dyn Store, key: &str) -> Result<Option<T>, StoreError> {
    match store.load(key)? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StoreError::corrupt(key, e.to_string())),
        None => Ok(None),
    }
}
