//! Liked songs and personal library
//!
//! Both collections live in one record under `favorites_<user>`. Membership is
//! decided by title alone, so two different tracks sharing a title count as
//! the same entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::session::Session;
use super::storage::{lenient_vec, read_json, write_json, KeyValueStore};
use crate::catalog::{Album, Track};
use crate::error::StoreError;
use crate::events::{AppEvent, EventBus};

/// Which of the two collections an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Liked,
    Library,
}

/// A saved track with the album context it was saved from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteEntry {
    #[serde(flatten)]
    pub track: Track,
    #[serde(default)]
    pub album_id: String,
    #[serde(default)]
    pub album_cover: Option<String>,
    pub added_at: DateTime<Utc>,
}

impl FavoriteEntry {
    fn new(album: &Album, track: &Track) -> Self {
        Self {
            track: Track {
                artist: album.artist.clone(),
                ..track.clone()
            },
            album_id: album.id.clone(),
            album_cover: album.img.clone(),
            added_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FavoritesState {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub liked: Vec<FavoriteEntry>,
    /// Library entries
    #[serde(default, deserialize_with = "lenient_vec")]
    pub added: Vec<FavoriteEntry>,
}

impl FavoritesState {
    pub fn entries(&self, collection: Collection) -> &[FavoriteEntry] {
        match collection {
            Collection::Liked => &self.liked,
            Collection::Library => &self.added,
        }
    }

    fn entries_mut(&mut self, collection: Collection) -> &mut Vec<FavoriteEntry> {
        match collection {
            Collection::Liked => &mut self.liked,
            Collection::Library => &mut self.added,
        }
    }

    pub fn contains(&self, collection: Collection, title: &str) -> bool {
        self.entries(collection).iter().any(|e| e.track.title == title)
    }

    pub fn is_liked(&self, title: &str) -> bool {
        self.contains(Collection::Liked, title)
    }

    pub fn is_added(&self, title: &str) -> bool {
        self.contains(Collection::Library, title)
    }
}

/// Read-modify-write access to one user's favorites
pub struct FavoritesStore {
    storage: Arc<dyn KeyValueStore>,
    session: Session,
    bus: EventBus,
}

impl FavoritesStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, session: Session, bus: EventBus) -> Self {
        Self {
            storage,
            session,
            bus,
        }
    }

    fn key(&self) -> String {
        self.session.key("favorites")
    }

    pub fn load(&self) -> Result<FavoritesState, StoreError> {
        read_json(self.storage.as_ref(), &self.key())
    }

    /// Add the track if no entry with its title exists, otherwise remove every
    /// entry with that title. Returns whether the track is now in the collection.
    pub fn toggle(
        &self,
        collection: Collection,
        album: &Album,
        track: &Track,
    ) -> Result<bool, StoreError> {
        let mut state = self.load()?;

        let present = state.contains(collection, &track.title);
        let entries = state.entries_mut(collection);
        if present {
            entries.retain(|e| e.track.title != track.title);
        } else {
            entries.push(FavoriteEntry::new(album, track));
        }

        write_json(self.storage.as_ref(), &self.key(), &state)?;
        debug!(
            "{:?} {} for {}: {}",
            collection,
            if present { "removed" } else { "added" },
            self.session.username,
            track.title
        );

        self.bus.publish(AppEvent::FavoritesChanged(state));
        Ok(!present)
    }

    pub fn toggle_like(&self, album: &Album, track: &Track) -> Result<bool, StoreError> {
        self.toggle(Collection::Liked, album, track)
    }

    pub fn toggle_library(&self, album: &Album, track: &Track) -> Result<bool, StoreError> {
        self.toggle(Collection::Library, album, track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{album, track};

    fn store_for(storage: Arc<dyn KeyValueStore>, user: &str) -> FavoritesStore {
        FavoritesStore::new(storage, Session::new(user), EventBus::new())
    }

    fn sample_album() -> Album {
        album(
            "42",
            "Waves",
            "Tide",
            vec![
                track("Undertow", "https://cdn/undertow.mp3"),
                track("Riptide", "https://cdn/riptide.mp3"),
            ],
        )
    }

    #[test]
    fn test_like_records_album_context() {
        let store = store_for(Arc::new(MemoryStore::new()), "alice");
        let album = sample_album();

        assert!(store.toggle_like(&album, &album.songs[0]).unwrap());

        let state = store.load().unwrap();
        assert_eq!(state.liked.len(), 1);
        let entry = &state.liked[0];
        assert_eq!(entry.album_id, "42");
        assert_eq!(entry.album_cover.as_deref(), Some("https://cdn/covers/42.jpg"));
        assert_eq!(entry.track.artist, "Tide");
        assert!(state.added.is_empty());
    }

    #[test]
    fn test_like_then_unlike_restores_prior_content() {
        let store = store_for(Arc::new(MemoryStore::new()), "alice");
        let album = sample_album();
        store.toggle_like(&album, &album.songs[1]).unwrap();
        let before = store.load().unwrap();

        assert!(store.toggle_like(&album, &album.songs[0]).unwrap());
        assert!(!store.toggle_like(&album, &album.songs[0]).unwrap());

        assert_eq!(store.load().unwrap(), before);
    }

    #[test]
    fn test_same_title_is_same_entry() {
        let store = store_for(Arc::new(MemoryStore::new()), "alice");
        let album = sample_album();
        let other = track("Undertow", "https://cdn/another-undertow.mp3");

        store.toggle_library(&album, &album.songs[0]).unwrap();
        // Different source, same title: treated as already added, so it is removed
        assert!(!store.toggle_library(&album, &other).unwrap());
        assert!(store.load().unwrap().added.is_empty());
    }

    #[test]
    fn test_users_are_isolated() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let alice = store_for(storage.clone(), "alice");
        let bob = store_for(storage, "bob");
        let album = sample_album();

        alice.toggle_like(&album, &album.songs[0]).unwrap();

        assert!(alice.load().unwrap().is_liked("Undertow"));
        assert!(!bob.load().unwrap().is_liked("Undertow"));
    }

    #[test]
    fn test_reads_camel_case_blob() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage
            .set(
                "favorites_alice",
                r#"{"liked":[{"title":"Old","src":"https://cdn/old.mp3","albumId":"3",
                    "albumCover":"c.jpg","artist":"X","addedAt":"2024-05-01T10:00:00.000Z"}]}"#,
            )
            .unwrap();

        let state = store_for(storage, "alice").load().unwrap();
        assert!(state.is_liked("Old"));
        assert!(state.added.is_empty());
        assert_eq!(state.liked[0].album_id, "3");
    }

    #[test]
    fn test_unreadable_entry_does_not_cost_the_others() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage
            .set(
                "favorites_alice",
                r#"{"liked":[
                    {"title":"Keep1","src":"https://cdn/k1.mp3","addedAt":"2024-05-01T10:00:00Z"},
                    {"title":"Broken","addedAt":"2024-05-01T10:00:00Z"},
                    {"title":"Keep2","src":"https://cdn/k2.mp3","addedAt":"2024-05-01T10:00:00Z"}
                ]}"#,
            )
            .unwrap();
        let store = store_for(storage, "alice");
        let album = sample_album();

        store.toggle_library(&album, &album.songs[0]).unwrap();

        let state = store.load().unwrap();
        let liked: Vec<&str> = state.liked.iter().map(|e| e.track.title.as_str()).collect();
        assert_eq!(liked, vec!["Keep1", "Keep2"]);
        assert!(state.is_added("Undertow"));
    }

    #[test]
    fn test_unparseable_blob_is_not_overwritten() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set("favorites_alice", "{\"liked\": [").unwrap();
        let store = store_for(storage.clone(), "alice");
        let album = sample_album();

        let err = store.toggle_like(&album, &album.songs[0]).unwrap_err();

        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert_eq!(storage.get("favorites_alice").unwrap().as_deref(), Some("{\"liked\": ["));
    }

    #[tokio::test]
    async fn test_toggle_broadcasts_new_state() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let store = FavoritesStore::new(Arc::new(MemoryStore::new()), Session::new("dan"), bus);
        let album = sample_album();

        store.toggle_like(&album, &album.songs[0]).unwrap();

        match rx.recv().await.unwrap() {
            AppEvent::FavoritesChanged(state) => assert!(state.is_liked("Undertow")),
            other => panic!("unexpected event {:?}", other),
        }
    }
}
