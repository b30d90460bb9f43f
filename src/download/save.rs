//! Writing finished downloads to disk

use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info};

use crate::error::DownloadError;

/// Directory that receives saved tracks and archives
#[derive(Debug, Clone)]
pub struct SaveTarget {
    root: PathBuf,
}

impl SaveTarget {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Write `data` as `filename`, never overwriting: an existing file turns
    /// the name into `stem (n).ext`. Returns the path written.
    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<PathBuf, DownloadError> {
        fs::create_dir_all(&self.root).await?;

        let path = self.free_path(filename).await;
        fs::write(&path, data).await?;

        info!("Saved {} ({} bytes)", path.display(), data.len());
        Ok(path)
    }

    async fn free_path(&self, filename: &str) -> PathBuf {
        let candidate = self.root.join(filename);
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }

        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) => (stem, format!(".{}", ext)),
            None => (filename, String::new()),
        };

        let mut n = 1;
        loop {
            let candidate = self.root.join(format!("{} ({}){}", stem, n, ext));
            if !fs::try_exists(&candidate).await.unwrap_or(false) {
                debug!("{} exists, saving as {}", filename, candidate.display());
                return candidate;
            }
            n += 1;
        }
    }
}
