use serde::Deserialize;

use crate::providers::PlaylistRef;
use crate::recommendations::types::RecommendationCandidate;

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtistRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<SpotifyImage>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    /// Local files in playlists have no id
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtistRef>,
    pub album: Option<SpotifyAlbum>,
    pub popularity: Option<u32>,
    pub duration_ms: Option<u32>,
}

impl SpotifyTrack {
    pub fn into_candidate(self) -> Option<RecommendationCandidate> {
        let id = self.id?;
        let artist = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        let (album, thumbnail, release_year) = match self.album {
            Some(album) => {
                let year = album
                    .release_date
                    .as_deref()
                    .and_then(|d| d.get(..4))
                    .and_then(|y| y.parse::<u16>().ok());
                let cover = album.images.into_iter().next().map(|i| i.url);
                (Some(album.name), cover, year)
            }
            None => (None, None, None),
        };

        Some(RecommendationCandidate {
            id,
            title: self.name,
            artist,
            album,
            thumbnail,
            popularity: self.popularity,
            genres: Vec::new(),
            release_year,
            duration_ms: self.duration_ms,
        })
    }
}

/// `GET /me/top/tracks`
#[derive(Debug, Clone, Deserialize)]
pub struct TopTracksResponse {
    #[serde(default)]
    pub items: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistoryItem {
    pub track: Option<SpotifyTrack>,
}

/// `GET /me/player/recently-played` and `GET /playlists/{id}/tracks`
#[derive(Debug, Clone, Deserialize)]
pub struct TrackItemsResponse {
    #[serde(default)]
    pub items: Vec<PlayHistoryItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyOwner {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub owner: SpotifyOwner,
}

impl From<SpotifyPlaylist> for PlaylistRef {
    fn from(p: SpotifyPlaylist) -> Self {
        PlaylistRef {
            id: p.id,
            name: p.name,
            owner: p.owner.display_name.unwrap_or(p.owner.id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paging<T> {
    // Spotify pads playlist search results with nulls
    #[serde(default)]
    pub items: Vec<Option<T>>,
}

/// `GET /search`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub artists: Option<Paging<SpotifyArtist>>,
    pub playlists: Option<Paging<SpotifyPlaylist>>,
}
