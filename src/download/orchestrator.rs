//! Track and album downloads
//!
//! The saved bytes are always the source file as served. The quality tier only
//! changes the bitrate suffix in the file name; nothing is re-encoded.

use bytes::Bytes;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use super::archive::{build_zip_async, unique_name, ArchiveEntry};
use super::estimator::QualityTier;
use super::save::SaveTarget;
use super::source::AudioSource;
use crate::catalog::{Album, Track};
use crate::error::DownloadError;
use crate::utils::sanitize_filename;

/// Progress of an album download
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadProgress {
    TrackStarted {
        number: usize,
        total: usize,
        title: String,
    },
    TrackAdded {
        number: usize,
        total: usize,
        title: String,
        bytes: usize,
    },
    TrackSkipped {
        number: usize,
        total: usize,
        title: String,
        error: String,
    },
    Archiving,
    Saved {
        path: PathBuf,
    },
}

impl DownloadProgress {
    /// Overall completion, 0-100. Fetching spans 0-90, archiving is 95.
    pub fn percent(&self) -> u8 {
        let fraction = |done: usize, total: usize| {
            if total == 0 {
                90
            } else {
                (done * 90 / total) as u8
            }
        };

        match self {
            DownloadProgress::TrackStarted { number, total, .. } => {
                fraction(number.saturating_sub(1), *total)
            }
            DownloadProgress::TrackAdded { number, total, .. }
            | DownloadProgress::TrackSkipped { number, total, .. } => fraction(*number, *total),
            DownloadProgress::Archiving => 95,
            DownloadProgress::Saved { .. } => 100,
        }
    }
}

/// A saved single track
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDownload {
    pub path: PathBuf,
    pub filename: String,
    pub bytes: usize,
}

/// What happened to one album track
#[derive(Debug)]
pub struct TrackOutcome {
    pub number: usize,
    pub title: String,
    /// Name of the archive entry, or why the track was left out
    pub result: Result<String, DownloadError>,
}

/// A saved album archive and the per-track outcomes that went into it
#[derive(Debug)]
pub struct AlbumDownloadReport {
    pub path: PathBuf,
    pub outcomes: Vec<TrackOutcome>,
}

impl AlbumDownloadReport {
    /// Archive entry names, in album order
    pub fn added(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(String::as_str))
            .collect()
    }

    pub fn skipped(&self) -> Vec<&TrackOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err()).collect()
    }
}

/// Result of a confirmed download
#[derive(Debug)]
pub enum DownloadOutcome {
    Track(TrackDownload),
    Album(AlbumDownloadReport),
}

/// File extension from a declared content type; mp3 unless it says otherwise
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();
    if content_type.contains("wav") {
        "wav"
    } else if content_type.contains("m4a") {
        "m4a"
    } else if content_type.contains("flac") {
        "flac"
    } else {
        "mp3"
    }
}

/// `<title>_<bitrate>kbps.<ext>`
pub fn track_filename(title: &str, tier: QualityTier, extension: &str) -> String {
    format!(
        "{}_{}kbps.{}",
        sanitize_filename(title),
        tier.bitrate_kbps(),
        extension
    )
}

/// `<album>_<bitrate>kbps.zip`
pub fn album_archive_name(album_title: &str, tier: QualityTier) -> String {
    format!("{}_{}kbps.zip", sanitize_filename(album_title), tier.bitrate_kbps())
}

pub struct DownloadOrchestrator {
    source: Arc<dyn AudioSource>,
    target: SaveTarget,
}

impl DownloadOrchestrator {
    pub fn new(source: Arc<dyn AudioSource>, target: SaveTarget) -> Self {
        Self { source, target }
    }

    /// Fetch a track and name it for the tier
    async fn fetch_named(
        &self,
        track: &Track,
        tier: QualityTier,
    ) -> Result<(String, Bytes), DownloadError> {
        let audio = self.source.fetch(&track.src).await?;
        debug!(
            "Original size for {}: {:.2} MB",
            track.title,
            audio.data.len() as f64 / (1024.0 * 1024.0)
        );

        let extension = extension_for(audio.content_type.as_deref());
        Ok((track_filename(&track.title, tier, extension), audio.data))
    }

    /// Download one track and save it. Any fetch failure is returned as-is.
    pub async fn download_track(
        &self,
        track: &Track,
        tier: QualityTier,
    ) -> Result<TrackDownload, DownloadError> {
        info!("Downloading {} in {:?} quality", track.title, tier);

        let (filename, data) = self.fetch_named(track, tier).await.map_err(|e| {
            error!("Download of {} failed: {}", track.title, e);
            e
        })?;

        let path = self.target.save(&filename, &data).await?;
        Ok(TrackDownload {
            path,
            filename,
            bytes: data.len(),
        })
    }

    /// Download every track one after another into a single zip and save it.
    ///
    /// A track that cannot be fetched is logged and left out; the archive is
    /// still produced from whatever succeeded.
    pub async fn download_album(
        &self,
        album: &Album,
        tier: QualityTier,
        progress: Option<UnboundedSender<DownloadProgress>>,
    ) -> Result<AlbumDownloadReport, DownloadError> {
        let emit = |event: DownloadProgress| {
            if let Some(tx) = &progress {
                let _ = tx.send(event);
            }
        };

        info!("Downloading album {} in {:?} quality", album.title, tier);
        let total = album.songs.len();
        let mut entries = Vec::with_capacity(total);
        let mut outcomes = Vec::with_capacity(total);
        let mut taken = HashSet::new();

        for (idx, track) in album.songs.iter().enumerate() {
            let number = idx + 1;
            debug!("Downloading {}... ({}/{})", track.title, number, total);
            emit(DownloadProgress::TrackStarted {
                number,
                total,
                title: track.title.clone(),
            });

            match self.fetch_named(track, tier).await {
                Ok((filename, data)) => {
                    let name = unique_name(&mut taken, &filename);
                    emit(DownloadProgress::TrackAdded {
                        number,
                        total,
                        title: track.title.clone(),
                        bytes: data.len(),
                    });
                    entries.push(ArchiveEntry {
                        name: name.clone(),
                        data,
                    });
                    outcomes.push(TrackOutcome {
                        number,
                        title: track.title.clone(),
                        result: Ok(name),
                    });
                }
                Err(e) => {
                    warn!("Failed to add {} to archive: {}", track.title, e);
                    emit(DownloadProgress::TrackSkipped {
                        number,
                        total,
                        title: track.title.clone(),
                        error: e.to_string(),
                    });
                    outcomes.push(TrackOutcome {
                        number,
                        title: track.title.clone(),
                        result: Err(e),
                    });
                }
            }
        }

        emit(DownloadProgress::Archiving);
        let archive = build_zip_async(sanitize_filename(&album.title), entries)
            .await
            .map_err(|e| {
                error!("Album download of {} failed: {}", album.title, e);
                match e {
                    DownloadError::DownloadFailed(_) => e,
                    other => DownloadError::DownloadFailed(other.to_string()),
                }
            })?;

        let path = self
            .target
            .save(&album_archive_name(&album.title, tier), &archive)
            .await
            .map_err(|e| {
                error!("Saving album {} failed: {}", album.title, e);
                e
            })?;

        emit(DownloadProgress::Saved { path: path.clone() });
        info!(
            "Downloaded album {} ({} of {} tracks)",
            album.title,
            entries_added(&outcomes),
            total
        );

        Ok(AlbumDownloadReport { path, outcomes })
    }
}

fn entries_added(outcomes: &[TrackOutcome]) -> usize {
    outcomes.iter().filter(|o| o.result.is_ok()).count()
}
