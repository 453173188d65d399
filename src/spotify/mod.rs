//! Spotify Web API access.
//!
//! [`MusicApi`] is the seam the collector talks to; [`SpotifyClient`]
//! implements it over blocking `ureq` calls with an OAuth bearer token.

pub mod auth;
pub mod dto;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use self::auth::{Credentials, SpotifyAuth};
use self::dto::{
    AddItems, ApiArtist, ApiTrack, ApiUser, CreatedPlaylist, NewPlaylist, Paging, PlaylistItem,
    PlaylistSearch, Snapshot,
};
use crate::config::SpotifyConfig;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the error carries one of the given HTTP status codes.
    pub fn is_rate_limited(&self, statuses: &[u16]) -> bool {
        self.status().is_some_and(|s| statuses.contains(&s))
    }
}

/// Operations the collector needs from the music service.
///
/// `Ok(None)` means the entity does not exist; errors are reserved for
/// failed or malformed exchanges.
pub trait MusicApi {
    fn track(&mut self, track_id: &str) -> Result<Option<ApiTrack>, ApiError>;

    fn artist(&mut self, artist_id: &str) -> Result<Option<ApiArtist>, ApiError>;

    fn search_playlists(&mut self, query: &str, limit: usize) -> Result<PlaylistSearch, ApiError>;

    /// First page of a playlist's items.
    fn playlist_tracks(&mut self, playlist_id: &str) -> Result<Paging<PlaylistItem>, ApiError>;

    /// Follow a `next` link from a previous page.
    fn next_page(&mut self, next_url: &str) -> Result<Paging<PlaylistItem>, ApiError>;

    fn current_user(&mut self) -> Result<ApiUser, ApiError>;

    fn create_playlist(
        &mut self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<CreatedPlaylist, ApiError>;

    fn add_playlist_items(&mut self, playlist_id: &str, uris: &[String]) -> Result<(), ApiError>;
}

pub struct SpotifyClient {
    agent: ureq::Agent,
    api_base: String,
    auth: SpotifyAuth,
}

impl SpotifyClient {
    pub fn new(credentials: Credentials, settings: &SpotifyConfig) -> Self {
        // Non-2xx responses come back as values so their status and body
        // can be classified for retry.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            auth: SpotifyAuth::new(credentials, &settings.accounts_base, &settings.token_cache),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn bearer(&mut self) -> Result<String, ApiError> {
        let token = self.auth.access_token(&self.agent)?;
        Ok(format!("Bearer {token}"))
    }

    fn get<T: DeserializeOwned>(&mut self, url: &str, query: &[(&str, &str)]) -> Result<T, ApiError> {
        let bearer = self.bearer()?;
        log::debug!("GET {url}");
        let mut request = self.agent.get(url).header("Authorization", bearer);
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        read_response(request.call())
    }

    /// Like [`Self::get`], but a 404 is `Ok(None)`.
    fn get_optional<T: DeserializeOwned>(&mut self, url: &str) -> Result<Option<T>, ApiError> {
        match self.get(url, &[]) {
            Ok(value) => Ok(Some(value)),
            Err(ApiError::Http { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn post<T: DeserializeOwned, B: Serialize>(&mut self, url: &str, body: &B) -> Result<T, ApiError> {
        let bearer = self.bearer()?;
        log::debug!("POST {url}");
        let result = self
            .agent
            .post(url)
            .header("Authorization", bearer)
            .send_json(body);
        read_response(result)
    }
}

/// Turn a raw `ureq` result into a typed payload or a classified error.
fn read_response<T: DeserializeOwned>(
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<T, ApiError> {
    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;
    let status = response.status().as_u16();

    if !(200..300).contains(&status) {
        let body = response.body_mut().read_to_string().unwrap_or_default();
        if let Some(retry_after) = response.headers().get("retry-after") {
            log::debug!("Retry-After: {:?}", retry_after);
        }
        return Err(ApiError::Http { status, body });
    }

    response
        .body_mut()
        .read_json::<T>()
        .map_err(|e| ApiError::MalformedResponse(e.to_string()))
}

impl MusicApi for SpotifyClient {
    fn track(&mut self, track_id: &str) -> Result<Option<ApiTrack>, ApiError> {
        let url = self.url(&format!("/tracks/{track_id}"));
        self.get_optional(&url)
    }

    fn artist(&mut self, artist_id: &str) -> Result<Option<ApiArtist>, ApiError> {
        let url = self.url(&format!("/artists/{artist_id}"));
        self.get_optional(&url)
    }

    fn search_playlists(&mut self, query: &str, limit: usize) -> Result<PlaylistSearch, ApiError> {
        let url = self.url("/search");
        let limit = limit.to_string();
        self.get(&url, &[("q", query), ("type", "playlist"), ("limit", limit.as_str())])
    }

    fn playlist_tracks(&mut self, playlist_id: &str) -> Result<Paging<PlaylistItem>, ApiError> {
        let url = self.url(&format!("/playlists/{playlist_id}/tracks"));
        self.get(&url, &[])
    }

    fn next_page(&mut self, next_url: &str) -> Result<Paging<PlaylistItem>, ApiError> {
        self.get(next_url, &[])
    }

    fn current_user(&mut self) -> Result<ApiUser, ApiError> {
        let url = self.url("/me");
        self.get(&url, &[])
    }

    fn create_playlist(
        &mut self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<CreatedPlaylist, ApiError> {
        let url = self.url(&format!("/users/{user_id}/playlists"));
        self.post(&url, &NewPlaylist { name, description, public })
    }

    fn add_playlist_items(&mut self, playlist_id: &str, uris: &[String]) -> Result<(), ApiError> {
        let url = self.url(&format!("/playlists/{playlist_id}/tracks"));
        let snapshot: Snapshot = self.post(&url, &AddItems { uris })?;
        log::debug!(
            "Added {} items to {playlist_id} (snapshot {})",
            uris.len(),
            snapshot.snapshot_id.as_deref().unwrap_or("-")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        let statuses = [429, 403];
        let limited = ApiError::Http { status: 429, body: String::new() };
        let forbidden = ApiError::Http { status: 403, body: String::new() };
        let missing = ApiError::Http { status: 404, body: String::new() };
        let transport = ApiError::Transport("connection reset (429 in message)".into());

        assert!(limited.is_rate_limited(&statuses));
        assert!(forbidden.is_rate_limited(&statuses));
        assert!(!missing.is_rate_limited(&statuses));
        assert!(!transport.is_rate_limited(&statuses));
        assert!(!limited.is_rate_limited(&[]));
    }

    #[test]
    fn test_http_error_display_carries_status() {
        let err = ApiError::Http { status: 429, body: "Too Many Requests".into() };
        assert_eq!(err.to_string(), "HTTP 429: Too Many Requests");
    }

    #[test]
    fn test_client_url_join() {
        let settings = SpotifyConfig {
            api_base: "https://api.spotify.com/v1/".into(),
            ..SpotifyConfig::default()
        };
        let client = SpotifyClient::new(
            Credentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                redirect_uri: "http://127.0.0.1:8888/callback".into(),
            },
            &settings,
        );
        assert_eq!(client.url("/me"), "https://api.spotify.com/v1/me");
    }
}
