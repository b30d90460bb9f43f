//! Where audio bytes come from

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DownloadError;

/// Bytes of one audio file plus its declared content type
#[derive(Debug, Clone)]
pub struct FetchedAudio {
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Remote audio access
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Metadata-only probe. `Ok(None)` means the server gave no usable length.
    async fn probe_size(&self, src: &str) -> Result<Option<u64>, DownloadError>;

    /// Fetch the complete, unmodified audio bytes
    async fn fetch(&self, src: &str) -> Result<FetchedAudio, DownloadError>;
}
