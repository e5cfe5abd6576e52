use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

pub const SONG_CACHE_TTL_SECS: u64 = 6 * 60 * 60;
pub const RECORD_TTL_SECS: u64 = 6 * 60 * 60;
pub const UP_NEXT_TTL_SECS: u64 = 60 * 60;
pub const GENRE_CACHE_TTL_SECS: u64 = 24 * 60 * 60;
pub const FALLBACK_TRACKS_TTL_SECS: u64 = 24 * 60 * 60;
pub const FALLBACK_PLAYLIST_ID_TTL_SECS: u64 = 7 * 24 * 60 * 60;
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const EVICTION_INTERVAL_SECS: u64 = 10 * 60;

pub const PREFERRED_FORMATS: [&str; 4] = ["140", "251", "250", "249"];
pub const GENERIC_AUDIO_FORMAT: &str = "bestaudio";
pub const DEFAULT_DELIVERY_HOST: &str = "googlevideo.com";

pub const MAX_RECOMMENDATIONS: usize = 50;
pub const GENRE_LOOKUP_CONCURRENCY: usize = 5;

pub const HISTORY_KEY: &str = "song_history_global";
pub const HISTORY_CAPACITY: usize = 5;

pub const PLACEHOLDER_AUDIO_URL: &str = "https://placeholder.mp3";

pub const FALLBACK_TRACK_ID: &str = "dQw4w9WgXcQ";
pub const FALLBACK_TRACK_TITLE: &str = "No Recommendation Found";
pub const FALLBACK_TRACK_ARTIST: &str = "Unknown";

pub const REGIONAL_PLAYLIST_QUERY: &str = "Top 50 - India";
pub const REGIONAL_PLAYLIST_OWNER: &str = "spotify";
pub const FALLBACK_TRACKS_KEY: &str = "spotify:top50_india:tracks";
pub const FALLBACK_PLAYLIST_ID_KEY: &str = "spotify:top50_india:playlistId";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("encore")
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

pub fn get_default_database_url() -> String {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("encore");
    format!("sqlite://{}", dir.join("tracks.db").display())
}

/// Cache lifetimes, all in seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    pub song: u64,
    pub record: u64,
    pub up_next: u64,
    pub genres: u64,
    pub fallback_tracks: u64,
    pub fallback_playlist_id: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            song: SONG_CACHE_TTL_SECS,
            record: RECORD_TTL_SECS,
            up_next: UP_NEXT_TTL_SECS,
            genres: GENRE_CACHE_TTL_SECS,
            fallback_tracks: FALLBACK_TRACKS_TTL_SECS,
            fallback_playlist_id: FALLBACK_PLAYLIST_ID_TTL_SECS,
        }
    }
}

impl TtlConfig {
    pub fn song(&self) -> Duration {
        Duration::from_secs(self.song)
    }

    pub fn record(&self) -> Duration {
        Duration::from_secs(self.record)
    }

    pub fn up_next(&self) -> Duration {
        Duration::from_secs(self.up_next)
    }

    pub fn genres(&self) -> Duration {
        Duration::from_secs(self.genres)
    }

    pub fn fallback_tracks(&self) -> Duration {
        Duration::from_secs(self.fallback_tracks)
    }

    pub fn fallback_playlist_id(&self) -> Duration {
        Duration::from_secs(self.fallback_playlist_id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub preferred_formats: Vec<String>,
    pub generic_format: String,
    /// Accepted URLs must be served from this host or one of its subdomains
    pub delivery_host: String,
    pub ytdlp_path: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            preferred_formats: PREFERRED_FORMATS.iter().map(|f| f.to_string()).collect(),
            generic_format: GENERIC_AUDIO_FORMAT.to_string(),
            delivery_host: DEFAULT_DELIVERY_HOST.to_string(),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationConfig {
    pub max_results: usize,
    pub genre_concurrency: usize,
    pub regional_playlist_query: String,
    pub regional_playlist_owner: String,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            max_results: MAX_RECOMMENDATIONS,
            genre_concurrency: GENRE_LOOKUP_CONCURRENCY,
            regional_playlist_query: REGIONAL_PLAYLIST_QUERY.to_string(),
            regional_playlist_owner: REGIONAL_PLAYLIST_OWNER.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub database_url: String,
    pub redis_url: Option<String>,
    /// Search API keys, tried in order
    pub api_keys: Vec<String>,
    pub placeholder_url: String,
    pub history_capacity: usize,
    pub ttl: TtlConfig,
    pub audio: AudioConfig,
    pub recommendations: RecommendationConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: get_default_database_url(),
            redis_url: None,
            api_keys: Vec::new(),
            placeholder_url: PLACEHOLDER_AUDIO_URL.to_string(),
            history_capacity: HISTORY_CAPACITY,
            ttl: TtlConfig::default(),
            audio: AudioConfig::default(),
            recommendations: RecommendationConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Load the config file if present, then apply environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = get_config_file_path();
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)?;
            let parsed: ServiceConfig = serde_json::from_str(&content)?;
            log::info!("Loaded configuration from {:?}", path);
            parsed
        } else {
            log::debug!("No config file at {:?}, using defaults", path);
            ServiceConfig::default()
        };

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(keys) = lookup("YOUTUBE_API_KEY") {
            self.api_keys = parse_key_list(&keys);
        }
        if let Some(url) = lookup("ENCORE_DATABASE_URL").filter(|v| !v.trim().is_empty()) {
            self.database_url = url;
        }
        if let Some(url) = lookup("ENCORE_REDIS_URL").filter(|v| !v.trim().is_empty()) {
            self.redis_url = Some(url);
        }
        if let Some(host) = lookup("ENCORE_DELIVERY_HOST").filter(|v| !v.trim().is_empty()) {
            self.audio.delivery_host = host;
        }
    }
}

pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_constants() {
        let config = ServiceConfig::default();
        assert_eq!(config.ttl.song, 21_600);
        assert_eq!(config.ttl.up_next, 3_600);
        assert_eq!(config.ttl.fallback_playlist_id, 604_800);
        assert_eq!(config.audio.preferred_formats, vec!["140", "251", "250", "249"]);
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.recommendations.genre_concurrency, 5);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{ "ttl": { "song": 60 }, "history_capacity": 3 }"#).unwrap();
        assert_eq!(config.ttl.song, 60);
        assert_eq!(config.ttl.record, RECORD_TTL_SECS);
        assert_eq!(config.history_capacity, 3);
        assert_eq!(config.audio.generic_format, "bestaudio");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("YOUTUBE_API_KEY", " k1, k2 ,,k3 "),
            ("ENCORE_DATABASE_URL", "sqlite::memory:"),
            ("ENCORE_DELIVERY_HOST", ""),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_keys, vec!["k1", "k2", "k3"]);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.audio.delivery_host, DEFAULT_DELIVERY_HOST);
        assert!(config.redis_url.is_none());
    }
}
