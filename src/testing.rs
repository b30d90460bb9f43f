//! Test fixtures shared across modules

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::catalog::{Album, Track};
use crate::download::{AudioSource, FetchedAudio};
use crate::error::DownloadError;

pub fn track(title: &str, src: &str) -> Track {
    Track {
        title: title.to_string(),
        artist: "Test Artist".to_string(),
        src: src.to_string(),
        duration: None,
        img: None,
    }
}

pub fn album(id: &str, title: &str, artist: &str, songs: Vec<Track>) -> Album {
    Album {
        id: id.to_string(),
        title: title.to_string(),
        artist: artist.to_string(),
        img: Some(format!("https://cdn/covers/{}.jpg", id)),
        songs,
    }
}

/// Fresh, empty directory under the system temp dir
pub fn temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "justvibe_test_{}_{}_{}",
        label,
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Serve a single HTTP connection on loopback and return its base URL.
///
/// After the request head arrives, each chunk is written once its delay has
/// passed, then the connection is closed.
pub async fn serve_once(chunks: Vec<(Duration, Vec<u8>)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        let mut head: Vec<u8> = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }

        for (delay, chunk) in chunks {
            tokio::time::sleep(delay).await;
            if socket.write_all(&chunk).await.is_err() {
                return;
            }
        }
        let _ = socket.shutdown().await;
    });

    format!("http://{}", addr)
}

/// In-memory audio source.
///
/// Unknown URLs probe as "no length" and fetch as 404.
#[derive(Default)]
pub struct FakeSource {
    sizes: HashMap<String, u64>,
    probe_failures: HashSet<String>,
    audio: HashMap<String, (String, Bytes)>,
    statuses: HashMap<String, u16>,
    gate: Option<Arc<Notify>>,
    probe_gate: Option<Arc<Notify>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, src: &str, bytes: u64) -> Self {
        self.sizes.insert(src.to_string(), bytes);
        self
    }

    pub fn with_probe_failure(mut self, src: &str) -> Self {
        self.probe_failures.insert(src.to_string());
        self
    }

    pub fn with_audio(mut self, src: &str, content_type: &str, data: &[u8]) -> Self {
        self.audio.insert(
            src.to_string(),
            (content_type.to_string(), Bytes::copy_from_slice(data)),
        );
        self
    }

    pub fn with_status(mut self, src: &str, status: u16) -> Self {
        self.statuses.insert(src.to_string(), status);
        self
    }

    /// Every size probe waits for one notification before answering
    pub fn with_probe_gate(mut self, gate: Arc<Notify>) -> Self {
        self.probe_gate = Some(gate);
        self
    }

    /// Every fetch waits for one notification before answering
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl AudioSource for FakeSource {
    async fn probe_size(&self, src: &str) -> Result<Option<u64>, DownloadError> {
        if let Some(gate) = &self.probe_gate {
            gate.notified().await;
        }
        if self.probe_failures.contains(src) {
            return Err(DownloadError::Request("probe blocked".to_string()));
        }
        Ok(self.sizes.get(src).copied())
    }

    async fn fetch(&self, src: &str) -> Result<FetchedAudio, DownloadError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(status) = self.statuses.get(src) {
            return Err(DownloadError::NetworkFailure { status: *status });
        }
        match self.audio.get(src) {
            Some((content_type, data)) => Ok(FetchedAudio {
                content_type: Some(content_type.clone()),
                data: data.clone(),
            }),
            None => Err(DownloadError::NetworkFailure { status: 404 }),
        }
    }
}
