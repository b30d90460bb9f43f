//! Logged-in user tracking

use std::sync::Arc;
use tracing::info;

use super::storage::KeyValueStore;
use crate::error::StoreError;
use crate::events::{AppEvent, EventBus};

const USERNAME_KEY: &str = "username";

/// The identity per-user stores are keyed by
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
}

impl Session {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Storage key for one of this user's collections
    pub fn key(&self, collection: &str) -> String {
        format!("{}_{}", collection, self.username)
    }
}

/// Reads and writes the current user
pub struct SessionManager {
    storage: Arc<dyn KeyValueStore>,
    bus: EventBus,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn KeyValueStore>, bus: EventBus) -> Self {
        Self { storage, bus }
    }

    /// The logged-in user, if any
    pub fn current(&self) -> Result<Option<Session>, StoreError> {
        Ok(self
            .storage
            .get(USERNAME_KEY)?
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .map(Session::new))
    }

    pub fn login(&self, username: &str) -> Result<Session, StoreError> {
        let username = username.trim();
        self.storage.set(USERNAME_KEY, username)?;
        info!("Logged in as {}", username);
        Ok(Session::new(username))
    }

    /// Forget the current user. Per-user collections stay in storage.
    pub fn logout(&self) -> Result<(), StoreError> {
        self.storage.remove(USERNAME_KEY)?;
        self.bus.publish(AppEvent::LoggedOut);
        info!("Logged out");
        Ok(())
    }
}
