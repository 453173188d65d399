pub mod collector;
pub mod config;
pub mod dataset;
pub mod model;
pub mod spotify;

use chrono::{DateTime, TimeZone};

/// Application name for XDG paths
pub const APP_NAME: &str = "moodpath";

pub const DEFAULT_DATASET_PATH: &str = "data/emotional_music_dataset.csv";
pub const DEFAULT_OUTPUT_PATH: &str = "generated_playlist.csv";
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8888/callback";

/// Moods collected when refreshing the dataset
pub const DEFAULT_MOODS: &[&str] = &[
    "happy",
    "sad",
    "energetic",
    "calm",
    "angry",
    "romantic",
    "melancholic",
];

/// Uppercase the first letter of each whitespace-separated word and
/// lowercase the rest.
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

pub fn playlist_name(start: &str, end: &str) -> String {
    format!("Emotional Journey: {} to {}", title_case(start), title_case(end))
}

pub fn playlist_description<Tz>(start: &str, end: &str, generated_at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "An emotional journey from {start} to {end}, generated on {}",
        generated_at.format("%Y-%m-%d %H:%M")
    )
}
