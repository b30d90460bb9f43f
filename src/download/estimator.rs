//! File size estimation per quality tier
//!
//! The high tier is the size of the source file: measured with a HEAD probe
//! when the server reports a length, otherwise estimated from duration.
//! Low and medium are fixed fractions of that number. The estimate never
//! fails; when nothing usable is available the dialog gets fixed strings.

use clap::ValueEnum;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::source::AudioSource;
use crate::catalog::{Album, Track};

/// Average bitrate assumed when estimating from duration
pub const ESTIMATE_BITRATE_KBPS: f64 = 192.0;

/// Duration assumed when a track has none
pub const DEFAULT_DURATION_SECS: f64 = 210.0;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    High,
}

impl QualityTier {
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    /// Nominal bitrate used in file names
    pub fn bitrate_kbps(self) -> u32 {
        match self {
            QualityTier::Low => 128,
            QualityTier::Medium => 256,
            QualityTier::High => 320,
        }
    }

    /// Displayed size relative to the source file
    pub fn size_ratio(self) -> f64 {
        match self {
            QualityTier::Low => 0.4,
            QualityTier::Medium => 0.7,
            QualityTier::High => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Low => "Low Quality",
            QualityTier::Medium => "Medium Quality",
            QualityTier::High => "High Quality",
        }
    }

    pub fn description(self) -> String {
        let grade = match self {
            QualityTier::Low => "Standard",
            QualityTier::Medium => "High",
            QualityTier::High => "Premium",
        };
        format!("{} quality - {}kbps", grade, self.bitrate_kbps())
    }

    /// Accent color shown next to the option, as RGB
    pub fn color(self) -> (u8, u8, u8) {
        match self {
            QualityTier::Low => (255, 140, 0),
            QualityTier::Medium => (255, 123, 47),
            QualityTier::High => (255, 87, 34),
        }
    }

    fn fallback_size(self) -> &'static str {
        match self {
            QualityTier::Low => "~2.5 MB",
            QualityTier::Medium => "~5.0 MB",
            QualityTier::High => "~6.5 MB",
        }
    }
}

/// One selectable row of the quality dialog
#[derive(Debug, Clone, PartialEq)]
pub struct QualityOption {
    pub tier: QualityTier,
    pub label: &'static str,
    pub description: String,
    pub size: String,
    pub color: (u8, u8, u8),
}

/// High-tier size and how it was obtained
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeEstimate {
    /// Every byte count came from the server
    Measured { megabytes: f64 },
    /// At least part of the size was estimated from duration
    Estimated { megabytes: f64 },
    /// No usable number; fixed display strings are used
    Defaulted,
}

impl SizeEstimate {
    pub fn high_tier_mb(&self) -> Option<f64> {
        match *self {
            SizeEstimate::Measured { megabytes } | SizeEstimate::Estimated { megabytes } => {
                Some(megabytes)
            }
            SizeEstimate::Defaulted => None,
        }
    }

    /// Options in low, medium, high order
    pub fn options(&self) -> Vec<QualityOption> {
        QualityTier::ALL
            .iter()
            .map(|&tier| QualityOption {
                tier,
                label: tier.label(),
                description: tier.description(),
                size: match self.high_tier_mb() {
                    Some(mb) => format_file_size(mb * tier.size_ratio()),
                    None => tier.fallback_size().to_string(),
                },
                color: tier.color(),
            })
            .collect()
    }

    /// Demote to `Defaulted` if the number cannot be displayed
    fn checked(self) -> Self {
        match self.high_tier_mb() {
            Some(mb) if mb.is_finite() && mb >= 0.0 => self,
            _ => SizeEstimate::Defaulted,
        }
    }
}

/// Size in MB of `duration_secs` of audio at `bitrate_kbps`
pub fn calculate_file_size(duration_secs: f64, bitrate_kbps: f64) -> f64 {
    let size_kb = bitrate_kbps * duration_secs / 8.0;
    size_kb / 1024.0
}

/// Whole KB under 1 MB, one decimal under 10 MB, whole MB above
pub fn format_file_size(size_mb: f64) -> String {
    if size_mb < 1.0 {
        format!("{} KB", (size_mb * 1024.0).round())
    } else if size_mb < 10.0 {
        format!("{:.1} MB", size_mb)
    } else {
        format!("{} MB", size_mb.round())
    }
}

/// Duration to estimate from, defaulting when unknown or non-positive
fn effective_duration(track: &Track) -> f64 {
    track
        .duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or(DEFAULT_DURATION_SECS)
}

pub struct SizeEstimator {
    source: Arc<dyn AudioSource>,
    parallelism: usize,
}

impl SizeEstimator {
    pub fn new(source: Arc<dyn AudioSource>, parallelism: usize) -> Self {
        Self {
            source,
            parallelism: parallelism.max(1),
        }
    }

    /// Measured byte count of a track, if the probe yields one
    async fn probe_bytes(&self, src: &str, title: &str) -> Option<u64> {
        match self.source.probe_size(src).await {
            Ok(Some(bytes)) if bytes > 0 => {
                debug!(
                    "Actual file size for {}: {:.2} MB",
                    src,
                    bytes as f64 / BYTES_PER_MB
                );
                Some(bytes)
            }
            Ok(_) => {
                debug!("No content length for {}", src);
                None
            }
            Err(e) => {
                warn!("Could not get actual file size for {}: {}", title, e);
                None
            }
        }
    }

    pub async fn estimate_track(&self, track: &Track) -> SizeEstimate {
        let estimate = match self.probe_bytes(&track.src, &track.title).await {
            Some(bytes) => SizeEstimate::Measured {
                megabytes: bytes as f64 / BYTES_PER_MB,
            },
            None => {
                let duration = effective_duration(track);
                let megabytes = calculate_file_size(duration, ESTIMATE_BITRATE_KBPS);
                debug!(
                    "Estimated file size for {}: {:.2} MB ({}s duration)",
                    track.src, megabytes, duration
                );
                SizeEstimate::Estimated { megabytes }
            }
        };
        estimate.checked()
    }

    /// Probe every track concurrently and sum; unmeasured tracks contribute a duration estimate
    pub async fn estimate_album(&self, album: &Album) -> SizeEstimate {
        if album.songs.is_empty() {
            return SizeEstimate::Defaulted;
        }

        let jobs: Vec<(String, String, f64)> = album
            .songs
            .iter()
            .map(|track| (track.src.clone(), track.title.clone(), effective_duration(track)))
            .collect();

        let sizes: Vec<(f64, bool)> = stream::iter(jobs)
            .map(|(src, title, duration)| async move {
                match self.probe_bytes(&src, &title).await {
                    Some(bytes) => (bytes as f64 / BYTES_PER_MB, true),
                    None => (calculate_file_size(duration, ESTIMATE_BITRATE_KBPS), false),
                }
            })
            .buffer_unordered(self.parallelism)
            .collect()
            .await;

        let megabytes: f64 = sizes.iter().map(|(mb, _)| mb).sum();
        let all_measured = sizes.iter().all(|(_, measured)| *measured);
        debug!(
            "Total album size for {}: {:.2} MB ({})",
            album.title,
            megabytes,
            if all_measured { "measured" } else { "partly estimated" }
        );

        let estimate = if all_measured {
            SizeEstimate::Measured { megabytes }
        } else {
            SizeEstimate::Estimated { megabytes }
        };
        estimate.checked()
    }
}
