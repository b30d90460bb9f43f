//! Per-run wiring of config, storage, event bus and HTTP client

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::catalog::{Album, ApiClient, Catalog, Track};
use crate::config::Config;
use crate::download::{DownloadOrchestrator, QualityDialog, SaveTarget, SizeEstimator};
use crate::events::EventBus;
use crate::playback::PlaybackCoordinator;
use crate::store::{FavoritesStore, FileStore, HistoryStore, KeyValueStore, Session, SessionManager};

/// Everything a command needs, scoped to one application session
pub struct AppContext {
    pub config: Config,
    pub storage: Arc<dyn KeyValueStore>,
    pub bus: EventBus,
    pub client: ApiClient,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(config.data_dir.clone()));
        let client = ApiClient::new(config.request_timeout())?;

        Ok(Self {
            config,
            storage,
            bus: EventBus::new(),
            client,
        })
    }

    pub fn sessions(&self) -> SessionManager {
        SessionManager::new(self.storage.clone(), self.bus.clone())
    }

    pub fn current_session(&self) -> Result<Option<Session>> {
        self.sessions()
            .current()
            .context("Failed to read the current user")
    }

    pub fn require_session(&self) -> Result<Session> {
        self.current_session()?
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run 'justvibe login' first."))
    }

    pub async fn catalog(&self) -> Catalog {
        Catalog::load(&self.client, &self.config.catalog_url).await
    }

    /// Load the catalog and resolve an album, failing with the catalog error if it did not load
    pub async fn album(&self, album_id: &str) -> Result<Album> {
        let catalog = self.catalog().await;
        if let Some(error) = catalog.error {
            anyhow::bail!("Could not load albums: {}", error);
        }
        catalog
            .album(album_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Album not found: {}", album_id))
    }

    /// Resolve an album and a 1-based track number
    pub async fn album_track(&self, album_id: &str, number: usize) -> Result<(Album, Track)> {
        let album = self.album(album_id).await?;
        let track = album.track(number).cloned().ok_or_else(|| {
            anyhow::anyhow!(
                "Album {} has {} songs, there is no track {}",
                album.title,
                album.songs.len(),
                number
            )
        })?;
        Ok((album, track))
    }

    pub fn favorites(&self, session: Session) -> FavoritesStore {
        FavoritesStore::new(self.storage.clone(), session, self.bus.clone())
    }

    pub fn history(&self, session: Session) -> HistoryStore {
        HistoryStore::new(self.storage.clone(), session, self.bus.clone())
    }

    /// Player for the current user; it refuses new tracks when nobody is logged in
    pub fn player(&self) -> Result<PlaybackCoordinator> {
        let history = self.current_session()?.map(|s| self.history(s));
        Ok(PlaybackCoordinator::new(self.bus.clone(), history))
    }

    pub fn dialog(&self) -> QualityDialog {
        let source = Arc::new(self.client.clone());
        let target = SaveTarget::new(self.config.download_dir.clone());
        QualityDialog::new(
            SizeEstimator::new(source.clone(), self.config.probe_parallelism),
            DownloadOrchestrator::new(source, target),
            self.config.completion_pause(),
        )
    }
}
