//! Quality selection dialog
//!
//! `Closed -> ComputingOptions -> Ready -> Downloading -> Closed`. A failed
//! download drops back to `Ready` with progress reset. Close requests are
//! ignored while a download is running. The state is published on a watch
//! channel so any front end can render it.
//!
//! Every transition is decided under the channel's write lock. Options
//! computed for an open that was closed in the meantime are discarded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info};

use super::estimator::{QualityOption, QualityTier, SizeEstimate, SizeEstimator};
use super::orchestrator::{DownloadOrchestrator, DownloadOutcome};
use crate::catalog::{Album, Track};
use crate::error::DialogError;

/// What the dialog was opened for
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadTarget {
    Track(Track),
    Album(Album),
}

impl DownloadTarget {
    pub fn title(&self) -> &str {
        match self {
            DownloadTarget::Track(track) => &track.title,
            DownloadTarget::Album(album) => &album.title,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogState {
    Closed,
    ComputingOptions,
    Ready {
        estimate: SizeEstimate,
        options: Vec<QualityOption>,
        selected: QualityTier,
    },
    Downloading {
        progress: u8,
    },
}

impl DialogState {
    fn name(&self) -> &'static str {
        match self {
            DialogState::Closed => "closed",
            DialogState::ComputingOptions => "computing options",
            DialogState::Ready { .. } => "ready",
            DialogState::Downloading { .. } => "downloading",
        }
    }
}

pub struct QualityDialog {
    estimator: SizeEstimator,
    orchestrator: DownloadOrchestrator,
    completion_pause: Duration,
    state: watch::Sender<DialogState>,
    /// Only touched while holding the state lock
    target: Mutex<Option<DownloadTarget>>,
    /// Bumped on every open and close
    generation: AtomicU64,
}

impl QualityDialog {
    pub fn new(
        estimator: SizeEstimator,
        orchestrator: DownloadOrchestrator,
        completion_pause: Duration,
    ) -> Self {
        let (state, _) = watch::channel(DialogState::Closed);
        Self {
            estimator,
            orchestrator,
            completion_pause,
            state,
            target: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> DialogState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DialogState> {
        self.state.subscribe()
    }

    /// Open for a track or album and compute the size options.
    /// The default selection is the high tier.
    pub async fn open(&self, target: DownloadTarget) -> Result<Vec<QualityOption>, DialogError> {
        let mut current = "closed";
        let mut generation = 0;
        let opened = self.state.send_if_modified(|state| {
            if !matches!(state, DialogState::Closed) {
                current = state.name();
                return false;
            }
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = DialogState::ComputingOptions;
            true
        });
        if !opened {
            return Err(DialogError::InvalidState(current, "closed"));
        }

        debug!("Computing quality options for {}", target.title());
        let estimate = match &target {
            DownloadTarget::Track(track) => self.estimator.estimate_track(track).await,
            DownloadTarget::Album(album) => self.estimator.estimate_album(album).await,
        };
        let options = estimate.options();
        let title = target.title().to_string();

        let mut current = "computing options";
        let ready = self.state.send_if_modified(|state| {
            let still_ours = matches!(state, DialogState::ComputingOptions)
                && self.generation.load(Ordering::SeqCst) == generation;
            if !still_ours {
                current = state.name();
                return false;
            }
            self.set_target(Some(target));
            *state = DialogState::Ready {
                estimate,
                options: options.clone(),
                selected: QualityTier::High,
            };
            true
        });

        if ready {
            Ok(options)
        } else {
            debug!("Dropping options for {}, the dialog was closed", title);
            Err(DialogError::InvalidState(current, "computing options"))
        }
    }

    pub fn select(&self, tier: QualityTier) -> Result<(), DialogError> {
        let mut applied = false;
        self.state.send_modify(|state| {
            if let DialogState::Ready { selected, .. } = state {
                *selected = tier;
                applied = true;
            }
        });

        if applied {
            Ok(())
        } else {
            Err(DialogError::InvalidState(self.state.borrow().name(), "ready"))
        }
    }

    /// Run the download for the selected tier
    pub async fn confirm(&self) -> Result<DownloadOutcome, DialogError> {
        let mut current = "ready";
        let mut claimed = None;
        self.state.send_if_modified(|state| {
            match std::mem::replace(state, DialogState::Downloading { progress: 0 }) {
                DialogState::Ready {
                    estimate,
                    options,
                    selected,
                } => match self.current_target() {
                    Some(target) => {
                        claimed = Some((target, estimate, options, selected));
                        true
                    }
                    None => {
                        current = "ready without a target";
                        *state = DialogState::Ready {
                            estimate,
                            options,
                            selected,
                        };
                        false
                    }
                },
                other => {
                    current = other.name();
                    *state = other;
                    false
                }
            }
        });
        let Some((target, estimate, options, selected)) = claimed else {
            return Err(DialogError::InvalidState(current, "ready"));
        };

        let result = match &target {
            DownloadTarget::Track(track) => self
                .orchestrator
                .download_track(track, selected)
                .await
                .map(DownloadOutcome::Track),
            DownloadTarget::Album(album) => self.download_album(album, selected).await,
        };

        match result {
            Ok(outcome) => {
                if matches!(target, DownloadTarget::Album(_)) {
                    self.raise_progress(100);
                    tokio::time::sleep(self.completion_pause).await;
                }
                info!("Download of {} complete", target.title());
                self.finish();
                Ok(outcome)
            }
            Err(e) => {
                error!("Download failed: {}", e);
                self.state.send_replace(DialogState::Ready {
                    estimate,
                    options,
                    selected,
                });
                Err(e.into())
            }
        }
    }

    /// Close the dialog. Returns false, and does nothing, while downloading.
    pub fn close(&self) -> bool {
        let mut closed = false;
        self.state.send_if_modified(|state| {
            if matches!(state, DialogState::Downloading { .. }) {
                return false;
            }
            self.generation.fetch_add(1, Ordering::SeqCst);
            self.set_target(None);
            closed = true;
            *state = DialogState::Closed;
            true
        });
        if !closed {
            debug!("Ignoring close request while downloading");
        }
        closed
    }

    async fn download_album(
        &self,
        album: &Album,
        tier: QualityTier,
    ) -> Result<DownloadOutcome, crate::error::DownloadError> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let download = self.orchestrator.download_album(album, tier, Some(tx));
        let forward = async {
            while let Some(event) = rx.recv().await {
                self.raise_progress(event.percent());
            }
        };

        let (result, ()) = tokio::join!(download, forward);
        result.map(DownloadOutcome::Album)
    }

    /// Progress only moves forward
    fn raise_progress(&self, percent: u8) {
        self.state.send_modify(|state| {
            if let DialogState::Downloading { progress } = state {
                *progress = (*progress).max(percent.min(100));
            }
        });
    }

    fn finish(&self) {
        self.state.send_modify(|state| {
            self.set_target(None);
            *state = DialogState::Closed;
        });
    }

    fn current_target(&self) -> Option<DownloadTarget> {
        self.target
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_target(&self, target: Option<DownloadTarget>) {
        *self.target.lock().unwrap_or_else(|e| e.into_inner()) = target;
    }
}
