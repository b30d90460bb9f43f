//! Play history, most recent first

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::session::Session;
use super::storage::{decode_each, read_json, write_json, KeyValueStore};
use crate::catalog::Track;
use crate::error::StoreError;
use crate::events::{AppEvent, EventBus};

/// Maximum number of entries kept per user
pub const MAX_HISTORY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

pub struct HistoryStore {
    storage: Arc<dyn KeyValueStore>,
    session: Session,
    bus: EventBus,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, session: Session, bus: EventBus) -> Self {
        Self {
            storage,
            session,
            bus,
        }
    }

    fn key(&self) -> String {
        self.session.key("history")
    }

    /// Stored entries, skipping any that cannot be read
    pub fn entries(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let raw: Vec<serde_json::Value> = read_json(self.storage.as_ref(), &self.key())?;
        Ok(decode_each(raw))
    }

    /// Record a play now
    pub fn record(&self, track: &Track) -> Result<Vec<HistoryEntry>, StoreError> {
        self.record_at(track, Utc::now())
    }

    /// Put the track at the front, dropping any earlier entry with the same
    /// (title, artist) and anything past [`MAX_HISTORY`].
    pub fn record_at(
        &self,
        track: &Track,
        played_at: DateTime<Utc>,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut history = self.entries()?;

        history.retain(|e| e.track.title != track.title || e.track.artist != track.artist);
        history.insert(
            0,
            HistoryEntry {
                track: track.clone(),
                played_at,
            },
        );
        history.truncate(MAX_HISTORY);

        write_json(self.storage.as_ref(), &self.key(), &history)?;
        debug!("History for {} now has {} entries", self.session.username, history.len());

        self.bus.publish(AppEvent::HistoryChanged(history.clone()));
        Ok(history)
    }
}
