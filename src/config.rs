use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::spotify::auth::Credentials;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Spotify API credentials not found: set SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET")]
    MissingCredentials,
}

/// Application configuration loaded from TOML config file.
/// Every field has a default, so the config file is optional.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cached dataset written by `--update_data` and read otherwise.
    pub dataset_path: PathBuf,
    /// Where the generated playlist CSV goes.
    pub output_path: PathBuf,
    /// Moods to collect when refreshing the dataset.
    pub moods: Vec<String>,
    pub spotify: SpotifyConfig,
    pub retry: RetryConfig,
    pub collect: CollectConfig,
    pub model: ModelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(crate::DEFAULT_DATASET_PATH),
            output_path: PathBuf::from(crate::DEFAULT_OUTPUT_PATH),
            moods: crate::DEFAULT_MOODS.iter().map(|m| m.to_string()).collect(),
            spotify: SpotifyConfig::default(),
            retry: RetryConfig::default(),
            collect: CollectConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

/// Spotify application and endpoint settings.
/// Credentials may also come from `SPOTIFY_*` environment variables.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    /// OAuth token cache file.
    pub token_cache: PathBuf,
    pub api_base: String,
    pub accounts_base: String,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            token_cache: PathBuf::from(".spotify_cache"),
            api_base: "https://api.spotify.com/v1".to_string(),
            accounts_base: "https://accounts.spotify.com".to_string(),
        }
    }
}

/// Rate-limit handling for every API call.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before retry n (0-based) is `base_delay_ms * 2^n`.
    pub base_delay_ms: u64,
    /// Fixed pause before every call.
    pub throttle_ms: u64,
    /// HTTP statuses treated as rate limiting.
    pub retry_statuses: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 2000,
            throttle_ms: 1000,
            retry_statuses: vec![429, 403],
        }
    }
}

/// Data collection limits and courtesy delays.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    pub playlists_per_mood: usize,
    pub tracks_per_mood: usize,
    pub playlist_track_cap: usize,
    pub track_delay_ms: u64,
    pub page_delay_ms: u64,
    /// Spotify accepts at most 100 URIs per add-items call.
    pub batch_size: usize,
    pub batch_delay_ms: u64,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            playlists_per_mood: 5,
            tracks_per_mood: 20,
            playlist_track_cap: 50,
            track_delay_ms: 1500,
            page_delay_ms: 1000,
            batch_size: 100,
            batch_delay_ms: 1000,
        }
    }
}

impl CollectConfig {
    pub fn track_delay(&self) -> Duration {
        Duration::from_millis(self.track_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

/// Clustering parameters for the transition model.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub clusters: usize,
    pub seed: u64,
    /// Independent k-means restarts; the lowest-inertia run wins.
    pub n_init: usize,
    pub max_iter: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            clusters: 5,
            seed: 42,
            n_init: 10,
            max_iter: 300,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/moodpath/config.toml`.
    /// Returns default config if file doesn't exist.
    /// Logs a warning if the file exists but can't be parsed.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        match config_path {
            Some(path) if path.exists() => match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<AppConfig>(&contents) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                        Self::default()
                    }
                },
                Err(e) => {
                    log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                    Self::default()
                }
            },
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Resolve Spotify credentials: environment variables win over the
    /// config file. Client id and secret are required.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_from(|key| std::env::var(key).ok())
    }

    fn credentials_from(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Credentials, ConfigError> {
        let pick = |key: &str, fallback: &Option<String>| {
            env(key)
                .or_else(|| fallback.clone())
                .filter(|v| !v.trim().is_empty())
        };

        let client_id = pick("SPOTIFY_CLIENT_ID", &self.spotify.client_id);
        let client_secret = pick("SPOTIFY_CLIENT_SECRET", &self.spotify.client_secret);
        let (Some(client_id), Some(client_secret)) = (client_id, client_secret) else {
            return Err(ConfigError::MissingCredentials);
        };

        let redirect_uri = pick("SPOTIFY_REDIRECT_URI", &self.spotify.redirect_uri)
            .unwrap_or_else(|| {
                log::warn!(
                    "SPOTIFY_REDIRECT_URI not set, using {}",
                    crate::DEFAULT_REDIRECT_URI
                );
                crate::DEFAULT_REDIRECT_URI.to_string()
            });

        Ok(Credentials {
            client_id,
            client_secret,
            redirect_uri,
        })
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.moods.len(), 7);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.retry_statuses, vec![429, 403]);
        assert_eq!(config.collect.playlist_track_cap, 50);
        assert_eq!(config.model.clusters, 5);
        assert_eq!(config.model.seed, 42);
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            moods = ["happy", "sad"]

            [retry]
            max_attempts = 5

            [model]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.moods, vec!["happy", "sad"]);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 2000);
        assert_eq!(config.model.seed, 7);
        assert_eq!(config.model.clusters, 5);
        assert_eq!(config.dataset_path, PathBuf::from("data/emotional_music_dataset.csv"));
    }

    #[test]
    fn test_credentials_from_env() {
        let config = AppConfig::default();
        let creds = config
            .credentials_from(env_of(&[
                ("SPOTIFY_CLIENT_ID", "id"),
                ("SPOTIFY_CLIENT_SECRET", "secret"),
                ("SPOTIFY_REDIRECT_URI", "http://localhost:9000/cb"),
            ]))
            .unwrap();
        assert_eq!(creds.client_id, "id");
        assert_eq!(creds.redirect_uri, "http://localhost:9000/cb");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::default();
        config.spotify.client_id = Some("file-id".into());
        config.spotify.client_secret = Some("file-secret".into());

        let creds = config
            .credentials_from(env_of(&[("SPOTIFY_CLIENT_ID", "env-id")]))
            .unwrap();
        assert_eq!(creds.client_id, "env-id");
        assert_eq!(creds.client_secret, "file-secret");
        assert_eq!(creds.redirect_uri, crate::DEFAULT_REDIRECT_URI);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let config = AppConfig::default();
        let err = config
            .credentials_from(env_of(&[("SPOTIFY_CLIENT_ID", "id"), ("SPOTIFY_CLIENT_SECRET", "  ")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }
}
