use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A resolved song as stored in both cache tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    /// Content id on the audio source (unique key)
    pub content_id: String,
    /// Id of the same track in the music catalog
    pub catalog_id: Option<String>,
    pub title: String,
    pub artists: Vec<String>,
    pub album: String,
    /// Genre hint supplied by the client
    pub genre: String,
    /// Genres of the primary artist according to the catalog
    #[serde(default)]
    pub catalog_genres: Vec<String>,
    /// Duration in seconds
    pub duration: u32,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub album_cover: String,
    pub audio_url: String,
    pub audio_format: Option<String>,
    pub expires_at: DateTime<Utc>,
    /// Content id of the prefetched successor, once one is ready
    pub next_content_id: Option<String>,
}

impl TrackRecord {
    /// Build a fresh record from client hints and a resolved audio URL.
    pub fn from_hints(
        content_id: &str,
        hints: &TrackHints,
        audio: ResolvedAudio,
        catalog_genres: Vec<String>,
        ttl: std::time::Duration,
    ) -> Self {
        let artists = if hints.artists.is_empty() {
            vec!["Unknown".to_string()]
        } else {
            hints.artists.clone()
        };

        Self {
            content_id: content_id.to_string(),
            catalog_id: hints.catalog_id.clone(),
            title: hints
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Unknown Title".to_string()),
            artists,
            album: hints.album.clone().unwrap_or_default(),
            genre: hints
                .genre
                .clone()
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            catalog_genres,
            duration: (hints.duration_ms.unwrap_or(0) / 1000) as u32,
            thumbnail: hints.thumbnail.clone().unwrap_or_default(),
            album_cover: hints.album_cover.clone().unwrap_or_default(),
            audio_url: audio.url,
            audio_format: Some(audio.format),
            expires_at: expiry_from_now(ttl),
            next_content_id: None,
        }
    }

    /// Replace the audio URL and push the expiry forward.
    pub fn refresh_audio(&mut self, audio: ResolvedAudio, ttl: std::time::Duration) {
        self.audio_url = audio.url;
        self.audio_format = Some(audio.format);
        self.expires_at = expiry_from_now(ttl);
    }
}

pub fn expiry_from_now(ttl: std::time::Duration) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(ttl.as_secs() as i64)
}

/// Descriptive metadata a client sends along with a content id.
///
/// Only used when no cached or stored record exists yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackHints {
    pub title: Option<String>,
    pub album: Option<String>,
    #[serde(default)]
    pub artists: Vec<String>,
    pub genre: Option<String>,
    pub duration_ms: Option<u64>,
    pub catalog_id: Option<String>,
    pub thumbnail: Option<String>,
    pub album_cover: Option<String>,
    pub release_year: Option<u16>,
}

impl TrackHints {
    /// Parse a comma separated artist string the way clients send it.
    pub fn with_artist_list(mut self, artists: &str) -> Self {
        self.artists = artists
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        self
    }
}

/// Input of [`crate::service::SongService::resolve_track`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolveParams {
    pub content_id: String,
    #[serde(default)]
    pub hints: TrackHints,
    /// Bearer token for the music catalog, if the caller has one
    pub catalog_token: Option<String>,
}

/// A playable URL together with the format that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAudio {
    pub url: String,
    pub format: String,
}

/// The prefetched successor of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NextTrackPayload {
    pub content_id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub album: String,
    pub audio: ResolvedAudio,
}

/// Answer to an up-next poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "payload", rename_all = "lowercase")]
pub enum UpNext {
    Pending,
    Ready(NextTrackPayload),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio() -> ResolvedAudio {
        ResolvedAudio {
            url: "https://rr1.googlevideo.com/videoplayback?id=1".to_string(),
            format: "140".to_string(),
        }
    }

    #[test]
    fn test_record_defaults_from_empty_hints() {
        let record = TrackRecord::from_hints(
            "abc123",
            &TrackHints::default(),
            audio(),
            Vec::new(),
            std::time::Duration::from_secs(60),
        );

        assert_eq!(record.title, "Unknown Title");
        assert_eq!(record.artists, vec!["Unknown".to_string()]);
        assert_eq!(record.genre, "Unknown");
        assert_eq!(record.audio_format.as_deref(), Some("140"));
        assert!(record.expires_at > Utc::now());
        assert!(record.next_content_id.is_none());
    }

    #[test]
    fn test_duration_is_converted_to_seconds() {
        let hints = TrackHints {
            duration_ms: Some(215_900),
            ..Default::default()
        };
        let record = TrackRecord::from_hints(
            "abc123",
            &hints,
            audio(),
            Vec::new(),
            std::time::Duration::from_secs(60),
        );
        assert_eq!(record.duration, 215);
    }

    #[test]
    fn test_artist_list_parsing() {
        let hints = TrackHints::default().with_artist_list("Reol, Kradness ,");
        assert_eq!(hints.artists, vec!["Reol".to_string(), "Kradness".to_string()]);
    }

    #[test]
    fn test_up_next_serialization() {
        let pending = serde_json::to_value(UpNext::Pending).unwrap();
        assert_eq!(pending["status"], "pending");

        let ready = UpNext::Ready(NextTrackPayload {
            content_id: "xyz".to_string(),
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            thumbnail: String::new(),
            genre: String::new(),
            album: String::new(),
            audio: audio(),
        });
        let value = serde_json::to_value(ready).unwrap();
        assert_eq!(value["status"], "ready");
        assert_eq!(value["payload"]["content_id"], "xyz");
    }
}
