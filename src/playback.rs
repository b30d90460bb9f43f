//! Shared "now playing" state
//!
//! The coordinator owns the current track and the play/pause flag. Every change
//! is published as [`AppEvent::TrackStateChanged`] so the song list and the
//! player bar render the same indicator without knowing about each other.

use std::sync::Mutex;
use tracing::{debug, warn};

use crate::catalog::Track;
use crate::error::PlaybackError;
use crate::events::{AppEvent, EventBus};
use crate::store::HistoryStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub current: Option<Track>,
    pub is_playing: bool,
}

pub struct PlaybackCoordinator {
    state: Mutex<PlaybackState>,
    bus: EventBus,
    /// Present only while a user is logged in
    history: Option<HistoryStore>,
}

impl PlaybackCoordinator {
    pub fn new(bus: EventBus, history: Option<HistoryStore>) -> Self {
        Self {
            state: Mutex::new(PlaybackState::default()),
            bus,
            history,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().clone()
    }

    /// Whether this specific track is the one currently sounding
    pub fn is_track_playing(&self, track: &Track) -> bool {
        let state = self.lock();
        state.is_playing
            && state
                .current
                .as_ref()
                .is_some_and(|current| current.same_source(track))
    }

    /// Play/pause on the current track toggles; any other track starts playing.
    ///
    /// Starting a different track requires a logged-in user and records a
    /// history entry.
    pub fn play(&self, track: &Track) -> Result<PlaybackState, PlaybackError> {
        let mut state = self.lock();
        let is_current = state
            .current
            .as_ref()
            .is_some_and(|current| current.same_source(track));

        if is_current {
            state.is_playing = !state.is_playing;
            debug!(
                "{} {}",
                if state.is_playing { "Resumed" } else { "Paused" },
                track.title
            );
        } else {
            let history = self.history.as_ref().ok_or(PlaybackError::LoginRequired)?;
            history.record(track)?;

            state.current = Some(track.clone());
            state.is_playing = true;
            debug!("Now playing {} - {}", track.artist, track.title);
        }

        let next = state.clone();
        self.broadcast(&next);
        Ok(next)
    }

    /// Clear the current track, e.g. after logout
    pub fn stop(&self) {
        let next = {
            let mut state = self.lock();
            *state = PlaybackState::default();
            state.clone()
        };
        self.broadcast(&next);
    }

    /// Handle an event from the bus; stops playback on logout
    pub fn on_event(&self, event: &AppEvent) {
        if matches!(event, AppEvent::LoggedOut) {
            self.stop();
        }
    }

    fn broadcast(&self, state: &PlaybackState) {
        self.bus.publish(AppEvent::TrackStateChanged {
            track: state.current.clone(),
            is_playing: state.is_playing,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Playback state lock poisoned, recovering");
            e.into_inner()
        })
    }
}
