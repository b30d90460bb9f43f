//! Album catalog loaded once per run

use tracing::{debug, warn};

use super::client::ApiClient;
use super::models::{Album, Track};

/// The album list every view reads from
///
/// Loading never fails: any error leaves an empty catalog with `error` set
/// so callers can show it.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub albums: Vec<Album>,
    pub error: Option<String>,
}

/// A search hit
#[derive(Debug, Clone, PartialEq)]
pub enum SearchHit<'a> {
    Album(&'a Album),
    Track { album: &'a Album, number: usize, track: &'a Track },
}

impl Catalog {
    pub fn new(albums: Vec<Album>) -> Self {
        Self { albums, error: None }
    }

    /// Fetch the catalog, degrading to an empty one on failure
    pub async fn load(client: &ApiClient, url: &str) -> Self {
        match client.fetch_albums(url).await {
            Ok(albums) => Self::new(albums),
            Err(e) => {
                warn!("Could not load catalog: {}", e);
                Self {
                    albums: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    pub fn album(&self, id: &str) -> Option<&Album> {
        self.albums.iter().find(|a| a.id == id)
    }

    /// Case-insensitive match over album titles, album artists and track titles
    pub fn search(&self, query: &str) -> Vec<SearchHit<'_>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut hits = Vec::new();
        for album in &self.albums {
            if album.title.to_lowercase().contains(&needle)
                || album.artist.to_lowercase().contains(&needle)
            {
                hits.push(SearchHit::Album(album));
            }
            for (idx, track) in album.songs.iter().enumerate() {
                if track.title.to_lowercase().contains(&needle) {
                    hits.push(SearchHit::Track {
                        album,
                        number: idx + 1,
                        track,
                    });
                }
            }
        }

        debug!("Search {:?} matched {} items", query, hits.len());
        hits
    }
}
