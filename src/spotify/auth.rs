//! Spotify authorization-code flow with a cached, refreshable token.
//!
//! The token lives in a small JSON file (`.spotify_cache` by default). A
//! valid cached token is reused; an expired one is refreshed; otherwise the
//! user authorizes in a browser and pastes the redirect URL back.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use url::Url;

use super::ApiError;

/// Scopes requested for reading catalog/library data and writing playlists.
pub const SCOPES: &str = "user-read-private user-read-email playlist-read-private \
    playlist-read-collaborative user-library-read user-top-read user-read-recently-played \
    playlist-modify-public playlist-modify-private";

/// Refresh this many seconds before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Application credentials registered with Spotify.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Token as persisted in the cache file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    /// Unix timestamp (seconds).
    pub expires_at: i64,
    pub refresh_token: Option<String>,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        self.expires_at - EXPIRY_MARGIN_SECS > now
    }
}

/// Accounts service token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    #[serde(default)]
    scope: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

pub struct SpotifyAuth {
    credentials: Credentials,
    accounts_base: String,
    cache_path: PathBuf,
    token: Option<CachedToken>,
}

impl SpotifyAuth {
    pub fn new(credentials: Credentials, accounts_base: &str, cache_path: &Path) -> Self {
        Self {
            credentials,
            accounts_base: accounts_base.trim_end_matches('/').to_string(),
            cache_path: cache_path.to_path_buf(),
            token: None,
        }
    }

    /// Return a usable access token, authorizing or refreshing as needed.
    pub fn access_token(&mut self, agent: &ureq::Agent) -> Result<String, ApiError> {
        let now = chrono::Utc::now().timestamp();

        if self.token.is_none() {
            self.token = load_cached_token(&self.cache_path);
        }

        if let Some(token) = &self.token {
            if token.is_fresh(now) {
                return Ok(token.access_token.clone());
            }
        }

        let refreshed = match self.token.as_ref().and_then(|t| t.refresh_token.clone()) {
            Some(refresh_token) => match self.refresh(agent, &refresh_token) {
                Ok(token) => Some(token),
                Err(e) => {
                    log::warn!("Token refresh failed, re-authorizing: {e}");
                    None
                }
            },
            None => None,
        };

        let token = match refreshed {
            Some(token) => token,
            None => self.authorize_interactively(agent)?,
        };

        log::info!("Token type: {}", token.token_type);
        log::info!("Token expires in: {} seconds", token.expires_at - now);
        if let Err(e) = save_cached_token(&self.cache_path, &token) {
            log::warn!("Failed to write token cache {}: {e}", self.cache_path.display());
        }

        let access = token.access_token.clone();
        self.token = Some(token);
        Ok(access)
    }

    /// Build the URL the user opens to grant access.
    pub fn authorize_url(&self) -> Result<Url, ApiError> {
        Url::parse_with_params(
            &format!("{}/authorize", self.accounts_base),
            &[
                ("client_id", self.credentials.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
                ("scope", SCOPES),
            ],
        )
        .map_err(|e| ApiError::Auth(format!("invalid accounts URL: {e}")))
    }

    fn authorize_interactively(&self, agent: &ureq::Agent) -> Result<CachedToken, ApiError> {
        let url = self.authorize_url()?;
        println!("Open this URL in your browser to authorize access:");
        println!();
        println!("  {url}");
        println!();
        print!("Paste the URL you were redirected to: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        let code = extract_code(line.trim())?;

        self.request_token(
            agent,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", self.credentials.redirect_uri.as_str()),
            ],
            None,
        )
    }

    fn refresh(&self, agent: &ureq::Agent, refresh_token: &str) -> Result<CachedToken, ApiError> {
        log::debug!("Refreshing access token");
        self.request_token(
            agent,
            &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
            Some(refresh_token),
        )
    }

    /// POST to the token endpoint. `previous_refresh` is kept when the
    /// response does not rotate the refresh token.
    fn request_token(
        &self,
        agent: &ureq::Agent,
        form: &[(&str, &str)],
        previous_refresh: Option<&str>,
    ) -> Result<CachedToken, ApiError> {
        let url = format!("{}/api/token", self.accounts_base);
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));

        let mut response = agent
            .post(&url)
            .header("Authorization", format!("Basic {basic}"))
            .send_form(form.iter().copied())
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let body = response.body_mut().read_to_string().unwrap_or_default();
            return Err(ApiError::Auth(format!("token endpoint returned {status}: {body}")));
        }

        let parsed: TokenResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| ApiError::MalformedResponse(format!("token response: {e}")))?;

        Ok(CachedToken {
            access_token: parsed.access_token,
            token_type: parsed.token_type,
            scope: parsed.scope,
            expires_at: chrono::Utc::now().timestamp() + parsed.expires_in,
            refresh_token: parsed
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
        })
    }
}

/// Pull the `code` parameter out of the redirect URL.
pub fn extract_code(redirected: &str) -> Result<String, ApiError> {
    let url = Url::parse(redirected)
        .map_err(|e| ApiError::Auth(format!("could not parse redirect URL: {e}")))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => return Err(ApiError::Auth(format!("authorization denied: {value}"))),
            _ => {}
        }
    }

    code.ok_or_else(|| ApiError::Auth("redirect URL has no code parameter".to_string()))
}

fn load_cached_token(path: &Path) -> Option<CachedToken> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(token) => Some(token),
        Err(e) => {
            log::warn!("Ignoring unreadable token cache {}: {e}", path.display());
            None
        }
    }
}

fn save_cached_token(path: &Path, token: &CachedToken) -> Result<(), ApiError> {
    let json = serde_json::to_string_pretty(token)
        .map_err(|e| ApiError::MalformedResponse(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}
