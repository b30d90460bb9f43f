//! Catalog data model

use serde::{Deserialize, Deserializer, Serialize};

/// A playable track
///
/// Identity depends on the consumer: history de-duplicates by (title, artist),
/// the player compares source URLs, favorites compare titles only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// Source locator of the audio bytes
    #[serde(alias = "url")]
    pub src: String,
    /// Duration in seconds, when the catalog knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
}

impl Track {
    /// Whether both tracks point at the same audio source
    pub fn same_source(&self, other: &Track) -> bool {
        self.src == other.src
    }
}

/// An album and its ordered track list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub songs: Vec<Track>,
}

impl Album {
    /// Fill in per-track fields that the catalog only carries at album level
    pub fn normalized(mut self) -> Self {
        for track in &mut self.songs {
            if track.artist.is_empty() {
                track.artist = self.artist.clone();
            }
        }
        self
    }

    /// Look up a track by its 1-based position
    pub fn track(&self, number: usize) -> Option<&Track> {
        number.checked_sub(1).and_then(|idx| self.songs.get(idx))
    }
}

/// Album ids arrive as either JSON strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_album_id_accepts_number_and_string() {
        let a: Album = serde_json::from_str(r#"{"id": 7, "title": "A"}"#).unwrap();
        let b: Album = serde_json::from_str(r#"{"id": "7", "title": "A"}"#).unwrap();
        assert_eq!(a.id, "7");
        assert_eq!(b.id, "7");
        assert!(a.songs.is_empty());
    }

    #[test]
    fn test_track_accepts_url_alias() {
        let t: Track =
            serde_json::from_str(r#"{"title": "Song", "url": "https://cdn/song.mp3"}"#).unwrap();
        assert_eq!(t.src, "https://cdn/song.mp3");
        assert_eq!(t.duration, None);
    }

    #[test]
    fn test_normalized_inherits_album_artist() {
        let album: Album = serde_json::from_str(
            r#"{"id": "1", "title": "A", "artist": "Band", "songs": [
                {"title": "One", "src": "a"},
                {"title": "Two", "src": "b", "artist": "Guest"}
            ]}"#,
        )
        .unwrap();
        let album = album.normalized();
        assert_eq!(album.songs[0].artist, "Band");
        assert_eq!(album.songs[1].artist, "Guest");
    }

    #[test]
    fn test_track_lookup_is_one_based() {
        let album: Album = serde_json::from_str(
            r#"{"id": "1", "title": "A", "songs": [{"title": "One", "src": "a"}]}"#,
        )
        .unwrap();
        assert_eq!(album.track(1).map(|t| t.title.as_str()), Some("One"));
        assert!(album.track(0).is_none());
        assert!(album.track(2).is_none());
    }
}
