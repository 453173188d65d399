//! Track rows and the CSV files they live in.
//!
//! The dataset (`emotional_music_dataset.csv`) and the generated playlist
//! (`generated_playlist.csv`) share one schema: a [`TrackRecord`] per row,
//! columns in field order.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset not found at {0}. Please run with --update_data first.")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Catalog metadata for a single track, as resolved from the API.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub popularity: u32,
    pub duration_ms: u64,
    pub album: String,
    pub release_date: String,
    pub explicit: bool,
    pub track_number: u32,
    pub disc_number: u32,
    pub available_markets: u32,
    pub is_local: bool,
    pub album_type: String,
    pub album_release_date: String,
    pub album_total_tracks: u32,
    pub artist_popularity: u32,
    pub artist_genres: Vec<String>,
    pub artist_followers: u64,
}

impl TrackInfo {
    /// Tag this track with the mood it was collected under.
    pub fn into_record(self, mood: &str) -> TrackRecord {
        TrackRecord {
            mood: mood.to_string(),
            id: self.id,
            name: self.name,
            artist: self.artist,
            popularity: self.popularity,
            duration_ms: self.duration_ms,
            album: self.album,
            release_date: self.release_date,
            explicit: self.explicit,
            track_number: self.track_number,
            disc_number: self.disc_number,
            available_markets: self.available_markets,
            is_local: self.is_local,
            album_type: self.album_type,
            album_release_date: self.album_release_date,
            album_total_tracks: self.album_total_tracks,
            artist_popularity: self.artist_popularity,
            artist_genres: self.artist_genres,
            artist_followers: self.artist_followers,
        }
    }
}

/// One row of the dataset: a track plus the mood it was collected under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub mood: String,
    pub id: String,
    pub name: String,
    pub artist: String,
    pub popularity: u32,
    pub duration_ms: u64,
    pub album: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(deserialize_with = "de_flag")]
    pub explicit: bool,
    pub track_number: u32,
    pub disc_number: u32,
    pub available_markets: u32,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_local: bool,
    pub album_type: String,
    #[serde(default)]
    pub album_release_date: String,
    pub album_total_tracks: u32,
    pub artist_popularity: u32,
    #[serde(default, serialize_with = "ser_genres", deserialize_with = "de_genres")]
    pub artist_genres: Vec<String>,
    pub artist_followers: u64,
}

/// Load the flat dataset table from CSV.
pub fn load_dataset(path: &Path) -> Result<Vec<TrackRecord>> {
    if !path.exists() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut tracks = Vec::new();
    for row in reader.deserialize() {
        let track: TrackRecord = row?;
        tracks.push(track);
    }

    log::info!("Loaded {} tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

/// Write tracks to CSV, creating the parent directory if needed.
pub fn save_tracks(path: &Path, tracks: &[TrackRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for track in tracks {
        writer.serialize(track)?;
    }
    writer.flush()?;

    log::info!("Data saved to {}", path.display());
    Ok(())
}

/// Accepts `true`/`false`, `True`/`False` and `1`/`0`.
fn de_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid boolean '{other}'"))),
    }
}

/// Genres are stored as a bracketed list: `['pop', 'dance pop']`.
fn ser_genres<S>(genres: &[String], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let quoted: Vec<String> = genres.iter().map(|g| format!("'{g}'")).collect();
    serializer.serialize_str(&format!("[{}]", quoted.join(", ")))
}

fn de_genres<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(parse_genres(&raw))
}

/// Parse either `['a', "b"]` or a bare `a;b` list.
fn parse_genres(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let (inner, sep) = match trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        Some(inner) => (inner, ','),
        None => (trimmed, ';'),
    };

    inner
        .split(sep)
        .map(|g| g.trim().trim_matches(|c| c == '\'' || c == '"').trim())
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) fn sample_track(mood: &str, id: &str, duration_ms: u64) -> TrackRecord {
    TrackRecord {
        mood: mood.to_string(),
        id: id.to_string(),
        name: format!("Song {id}"),
        artist: "Artist".to_string(),
        popularity: 50,
        duration_ms,
        album: "Album".to_string(),
        release_date: "2020-01-01".to_string(),
        explicit: false,
        track_number: 1,
        disc_number: 1,
        available_markets: 180,
        is_local: false,
        album_type: "album".to_string(),
        album_release_date: "2020-01-01".to_string(),
        album_total_tracks: 12,
        artist_popularity: 60,
        artist_genres: vec!["pop".to_string()],
        artist_followers: 10_000,
    }
}
