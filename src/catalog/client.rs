//! JustVibe HTTP client

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::models::Album;
use crate::download::{AudioSource, FetchedAudio};
use crate::error::{CatalogError, DownloadError};

/// HTTP client for the catalog endpoint and the audio sources it points at
#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    /// Total deadline for the catalog GET and size probes
    request_timeout: Duration,
}

impl ApiClient {
    /// Create a new client.
    ///
    /// `timeout` bounds connecting and each idle gap between reads. Only the
    /// catalog request and size probes also get it as a total deadline, so an
    /// audio body may stream for as long as bytes keep arriving.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("justvibe/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            request_timeout: timeout,
        })
    }

    /// Fetch the full album list
    pub async fn fetch_albums(&self, url: &str) -> Result<Vec<Album>, CatalogError> {
        debug!("Fetching albums from: {}", url);

        let response = self
            .http_client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CatalogError::Status(response.status().as_u16()));
        }

        let payload: serde_json::Value = response.json().await?;
        let albums = parse_albums(payload)?;

        debug!("Found {} albums", albums.len());
        Ok(albums)
    }
}

/// Decode a catalog payload, which must be a JSON array of albums
fn parse_albums(payload: serde_json::Value) -> Result<Vec<Album>, CatalogError> {
    if !payload.is_array() {
        return Err(CatalogError::InvalidPayload(
            "expected a list of albums".to_string(),
        ));
    }

    let albums: Vec<Album> = serde_json::from_value(payload)
        .map_err(|e| CatalogError::InvalidPayload(e.to_string()))?;

    Ok(albums.into_iter().map(Album::normalized).collect())
}

fn parse_source(src: &str) -> Result<Url, DownloadError> {
    Url::parse(src).map_err(|e| DownloadError::Request(format!("invalid source URL {src}: {e}")))
}

#[async_trait]
impl AudioSource for ApiClient {
    async fn probe_size(&self, src: &str) -> Result<Option<u64>, DownloadError> {
        let url = parse_source(src)?;
        debug!("Probing size of {}", url);

        let response = self
            .http_client
            .head(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DownloadError::NetworkFailure {
                status: response.status().as_u16(),
            });
        }

        // content_length() describes the empty HEAD body
        let length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        Ok(length)
    }

    async fn fetch(&self, src: &str) -> Result<FetchedAudio, DownloadError> {
        let url = parse_source(src)?;
        debug!("Downloading {}", url);

        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "audio/mpeg, audio/*")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DownloadError::NetworkFailure {
                status: response.status().as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let data = response.bytes().await?;

        Ok(FetchedAudio { content_type, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::serve_once;
    use serde_json::json;

    #[test]
    fn test_parse_albums_array() {
        let albums = parse_albums(json!([
            {"id": 1, "title": "First", "artist": "Band", "img": "cover.jpg",
             "songs": [{"title": "Intro", "src": "https://cdn/intro.mp3", "duration": 95}]}
        ]))
        .unwrap();

        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].id, "1");
        assert_eq!(albums[0].songs[0].artist, "Band");
        assert_eq!(albums[0].songs[0].duration, Some(95.0));
    }

    #[test]
    fn test_parse_albums_rejects_non_array() {
        let err = parse_albums(json!({"albums": []})).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_fetch_outlives_timeout_while_body_keeps_flowing() {
        let mut chunks = vec![(
            Duration::ZERO,
            b"HTTP/1.1 200 OK\r\nContent-Type: audio/mpeg\r\nContent-Length: 4\r\nConnection: close\r\n\r\n"
                .to_vec(),
        )];
        for byte in b"abcd" {
            chunks.push((Duration::from_millis(600), vec![*byte]));
        }
        let base = serve_once(chunks).await;
        let client = ApiClient::new(Duration::from_secs(1)).unwrap();

        // 2.4 s of streaming against a 1 s timeout
        let audio = client.fetch(&format!("{}/slow.mp3", base)).await.unwrap();

        assert_eq!(&audio.data[..], b"abcd");
        assert_eq!(audio.content_type.as_deref(), Some("audio/mpeg"));
    }

    #[tokio::test]
    async fn test_fetch_non_success_is_network_failure() {
        let base = serve_once(vec![(
            Duration::ZERO,
            b"HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec(),
        )])
        .await;
        let client = ApiClient::new(Duration::from_secs(2)).unwrap();

        let err = client.fetch(&format!("{}/a.mp3", base)).await.unwrap_err();
        assert!(matches!(err, DownloadError::NetworkFailure { status: 403 }));
    }

    #[test]
    fn test_parse_source_rejects_garbage() {
        assert!(parse_source("not a url").is_err());
        assert!(parse_source("https://cdn.example/song.mp3").is_ok());
    }
}
