//! Spotify Web API payloads, limited to the fields we read.
//!
//! Every field the API may omit or null is an `Option` or carries a serde
//! default, so a response either deserializes into these types or fails as
//! [`ApiError::MalformedResponse`].

use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::dataset::TrackInfo;

/// Cursor-style page wrapper used by search and playlist listings.
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
    #[serde(default)]
    pub total: usize,
}

/// `GET /search?type=playlist`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSearch {
    /// Items can be null when a playlist was removed after indexing.
    pub playlists: Option<Paging<Option<PlaylistSummary>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One entry of `GET /playlists/{id}/tracks`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<ItemTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ItemTrack {
    /// Null for local files.
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// `GET /tracks/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub popularity: u32,
    pub duration_ms: u64,
    pub album: ApiAlbum,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub track_number: u32,
    #[serde(default)]
    pub disc_number: u32,
    #[serde(default)]
    pub available_markets: Vec<String>,
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAlbum {
    pub name: String,
    pub album_type: Option<String>,
    pub release_date: Option<String>,
    pub total_tracks: Option<u32>,
}

/// `GET /artists/{id}`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiArtist {
    #[serde(default)]
    pub popularity: u32,
    #[serde(default)]
    pub genres: Vec<String>,
    pub followers: Option<Followers>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
}

/// `GET /me`
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// `POST /users/{id}/playlists`
#[derive(Debug, Clone, Serialize)]
pub struct NewPlaylist<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub public: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedPlaylist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

impl CreatedPlaylist {
    pub fn url(&self) -> Option<&str> {
        self.external_urls.spotify.as_deref()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalUrls {
    pub spotify: Option<String>,
}

/// `POST /playlists/{id}/tracks`
#[derive(Debug, Clone, Serialize)]
pub struct AddItems<'a> {
    pub uris: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    pub snapshot_id: Option<String>,
}

impl ApiTrack {
    /// Flatten a track and its (optional) full artist record into a dataset row.
    ///
    /// A track without an id or without any credited artist cannot become a
    /// row and is rejected as malformed.
    pub fn into_track_info(self, artist: Option<&ApiArtist>) -> Result<TrackInfo, ApiError> {
        let id = self
            .id
            .ok_or_else(|| ApiError::MalformedResponse(format!("track '{}' has no id", self.name)))?;
        let primary = self
            .artists
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::MalformedResponse(format!("track {id} has no artists")))?;

        let release_date = self.album.release_date.unwrap_or_default();

        Ok(TrackInfo {
            id,
            name: self.name,
            artist: primary.name,
            popularity: self.popularity,
            duration_ms: self.duration_ms,
            album: self.album.name,
            release_date: release_date.clone(),
            explicit: self.explicit,
            track_number: self.track_number,
            disc_number: self.disc_number,
            available_markets: self.available_markets.len() as u32,
            is_local: self.is_local,
            album_type: self.album.album_type.unwrap_or_default(),
            album_release_date: release_date,
            album_total_tracks: self.album.total_tracks.unwrap_or(0),
            artist_popularity: artist.map(|a| a.popularity).unwrap_or(0),
            artist_genres: artist.map(|a| a.genres.clone()).unwrap_or_default(),
            artist_followers: artist
                .and_then(|a| a.followers.as_ref())
                .map(|f| f.total)
                .unwrap_or(0),
        })
    }
}
