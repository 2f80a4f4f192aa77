//! In-memory working copy of one session.

use crate::error::{SessionError, SessionResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Session data as key-value pairs.
pub type SessionData = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    Live(SessionData),
    Destroyed,
}

/// Working copy of a session's data.
///
/// Obtained from [`StoreEngine::get_session`](crate::StoreEngine::get_session)
/// and persisted explicitly with
/// [`StoreEngine::save_session`](crate::StoreEngine::save_session); there is
/// no autosave. Once [`destroy`](Session::destroy)ed, every accessor fails
/// with [`SessionError::Destroyed`].
///
/// # Examples
///
/// ```
/// use lapse_session::Session;
///
/// let mut session = Session::new("abc");
/// session.set("user_id", 123).unwrap();
///
/// let user_id: Option<i32> = session.get_as("user_id").unwrap();
/// assert_eq!(user_id, Some(123));
/// assert!(session.is_changed());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: String,
    state: SessionState,
    changed: bool,
}

impl Session {
    /// Create an empty session.
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_data(id, SessionData::new())
    }

    /// Create a session holding existing data, marked unchanged.
    pub fn with_data(id: impl Into<String>, data: SessionData) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Live(data),
            changed: false,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the data was modified since the session was loaded.
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Whether the session has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        matches!(self.state, SessionState::Destroyed)
    }

    fn live(&self) -> SessionResult<&SessionData> {
        match &self.state {
            SessionState::Live(data) => Ok(data),
            SessionState::Destroyed => Err(SessionError::Destroyed(self.id.clone())),
        }
    }

    fn live_mut(&mut self) -> SessionResult<&mut SessionData> {
        match &mut self.state {
            SessionState::Live(data) => Ok(data),
            SessionState::Destroyed => Err(SessionError::Destroyed(self.id.clone())),
        }
    }

    /// Borrow all session data.
    pub fn data(&self) -> SessionResult<&SessionData> {
        self.live()
    }

    /// Get a raw value.
    pub fn get(&self, key: &str) -> SessionResult<Option<&serde_json::Value>> {
        Ok(self.live()?.get(key))
    }

    /// Get a value converted to `T`.
    ///
    /// Returns `Ok(None)` for a missing key and a deserialization error when
    /// the stored value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> SessionResult<Option<T>> {
        self.live()?
            .get(key)
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| SessionError::Deserialization(e.to_string()))
            })
            .transpose()
    }

    /// Check if a key exists.
    pub fn has(&self, key: &str) -> SessionResult<bool> {
        Ok(self.live()?.contains_key(key))
    }

    /// All keys in the session.
    pub fn keys(&self) -> SessionResult<Vec<&String>> {
        Ok(self.live()?.keys().collect())
    }

    /// Number of stored keys.
    pub fn len(&self) -> SessionResult<usize> {
        Ok(self.live()?.len())
    }

    /// Whether the session holds no data.
    pub fn is_empty(&self) -> SessionResult<bool> {
        Ok(self.live()?.is_empty())
    }

    /// Insert or replace a value.
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> SessionResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.live_mut()?.insert(key.into(), value);
        self.changed = true;
        Ok(())
    }

    /// Remove a value, returning it if present.
    pub fn delete(&mut self, key: &str) -> SessionResult<Option<serde_json::Value>> {
        let removed = self.live_mut()?.remove(key);
        self.changed = true;
        Ok(removed)
    }

    /// Remove all values.
    pub fn clear(&mut self) -> SessionResult<()> {
        self.live_mut()?.clear();
        self.changed = true;
        Ok(())
    }

    /// Drop all data and mark the session destroyed for good.
    pub fn destroy(&mut self) {
        if !self.is_destroyed() {
            self.state = SessionState::Destroyed;
            self.changed = true;
        }
    }

    /// Data to persist: the live mapping, or nothing once destroyed.
    pub(crate) fn persisted_data(&self) -> SessionData {
        match &self.state {
            SessionState::Live(data) => data.clone(),
            SessionState::Destroyed => SessionData::new(),
        }
    }
}
