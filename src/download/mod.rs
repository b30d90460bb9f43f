//! Download module: size estimation, fetching, zip bundling and the quality dialog

pub mod archive;
pub mod dialog;
pub mod estimator;
pub mod orchestrator;
pub mod save;
pub mod source;

pub use dialog::{DialogState, DownloadTarget, QualityDialog};
pub use estimator::{QualityOption, QualityTier, SizeEstimate, SizeEstimator};
pub use orchestrator::{DownloadOrchestrator, DownloadOutcome};
pub use save::SaveTarget;
pub use source::{AudioSource, FetchedAudio};
