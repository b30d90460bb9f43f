//! Cross-view change notifications
//!
//! One [`EventBus`] is created per application session and handed to every
//! store and to the playback coordinator. Any view can subscribe; a write
//! made anywhere is seen everywhere.

use tokio::sync::broadcast;
use tracing::trace;

use crate::catalog::Track;
use crate::store::{FavoritesState, HistoryEntry};

const CHANNEL_CAPACITY: usize = 64;

/// Events published on the bus, each carrying the updated state
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Current track or play/pause flag changed
    TrackStateChanged {
        track: Option<Track>,
        is_playing: bool,
    },
    /// Liked or library collection changed
    FavoritesChanged(FavoritesState),
    /// Play history changed
    HistoryChanged(Vec<HistoryEntry>),
    /// The current user logged out
    LoggedOut,
}

/// Typed publish/subscribe channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: AppEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        trace!("Published event to {} subscribers", receivers);
    }

    /// Subscribe to all events published from now on. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_subscriber_sees_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.publish(AppEvent::LoggedOut);

        assert_eq!(a.recv().await.unwrap(), AppEvent::LoggedOut);
        assert_eq!(b.recv().await.unwrap(), AppEvent::LoggedOut);
    }

    #[test]
    fn test_publish_without_subscribers() {
        EventBus::new().publish(AppEvent::LoggedOut);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = EventBus::new();
        bus.publish(AppEvent::HistoryChanged(Vec::new()));
        let mut rx = bus.subscribe();
        bus.publish(AppEvent::LoggedOut);
        assert_eq!(rx.recv().await.unwrap(), AppEvent::LoggedOut);
    }
}
