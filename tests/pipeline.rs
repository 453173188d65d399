use std::fs;

use moodpath::config::ModelConfig;
use moodpath::dataset::{self, DatasetError, TrackRecord};
use moodpath::model::{ModelError, TransitionModel};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tempfile::TempDir;

fn track(mood: &str, i: u32) -> TrackRecord {
    TrackRecord {
        mood: mood.to_string(),
        id: format!("{mood}{i:02}"),
        name: format!("{mood} song {i}"),
        artist: format!("Artist {}", i % 4),
        popularity: 30 + i * 5,
        duration_ms: 180_000 + i as u64 * 12_000,
        album: "Album".to_string(),
        release_date: "2019-06-01".to_string(),
        explicit: i % 2 == 0,
        track_number: i % 12 + 1,
        disc_number: 1,
        available_markets: 170 + i,
        is_local: false,
        album_type: if i % 3 == 0 { "single" } else { "album" }.to_string(),
        album_release_date: "2019-06-01".to_string(),
        album_total_tracks: 12,
        artist_popularity: 40 + i * 3,
        artist_genres: vec!["indie".to_string(), "dream pop".to_string()],
        artist_followers: 5_000 * (i as u64 + 1),
    }
}

fn dataset_rows() -> Vec<TrackRecord> {
    ["calm", "energetic", "sad", "happy"]
        .iter()
        .flat_map(|mood| (0..12).map(move |i| track(mood, i)))
        .collect()
}

#[test]
fn test_dataset_to_playlist_csv() {
    let dir = TempDir::new().unwrap();
    let dataset_path = dir.path().join("data").join("emotional_music_dataset.csv");
    let output_path = dir.path().join("generated_playlist.csv");

    dataset::save_tracks(&dataset_path, &dataset_rows()).unwrap();
    let rows = dataset::load_dataset(&dataset_path).unwrap();
    assert_eq!(rows.len(), 48);
    assert_eq!(rows[5].artist_genres, vec!["indie", "dream pop"]);

    let mut model = TransitionModel::new(&ModelConfig::default());
    let summary = model.train(&rows).unwrap();
    assert!(summary.nodes >= 4 && summary.nodes <= 20);

    let mut rng = StdRng::seed_from_u64(42);
    let playlist = model
        .generate_playlist_with_rng("calm", "energetic", 15, &mut rng)
        .unwrap();
    assert!(!playlist.tracks.is_empty());
    assert!(playlist.path[0].starts_with("calm_"));
    assert!(playlist.path.last().unwrap().starts_with("energetic_"));

    dataset::save_tracks(&output_path, &playlist.tracks).unwrap();
    let saved = dataset::load_dataset(&output_path).unwrap();
    let ids = |t: &[TrackRecord]| t.iter().map(|r| r.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&saved), ids(&playlist.tracks));
}

#[test]
fn test_loads_csv_with_capitalised_flags_and_genre_lists() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dataset.csv");
    fs::write(
        &path,
        "mood,id,name,artist,popularity,duration_ms,album,release_date,explicit,track_number,disc_number,available_markets,is_local,album_type,album_release_date,album_total_tracks,artist_popularity,artist_genres,artist_followers\n\
         sad,t1,Rain,Someone,41,201000,Grey,2018-01-01,False,3,1,182,False,album,2018-01-01,10,55,\"['sad pop', 'indie']\",12000\n\
         happy,t2,Sun,Other,77,188000,Gold,2020-05-05,True,1,1,180,False,single,2020-05-05,1,80,[],990000\n",
    )
    .unwrap();

    let rows = dataset::load_dataset(&path).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(!rows[0].explicit);
    assert!(rows[1].explicit);
    assert_eq!(rows[0].artist_genres, vec!["sad pop", "indie"]);
    assert!(rows[1].artist_genres.is_empty());

    let mut model = TransitionModel::default();
    model.train(&rows).unwrap();
    let playlist = model.generate_playlist("sad", "happy", 3).unwrap();
    assert_eq!(playlist.tracks[0].id, "t1");
}

#[test]
fn test_missing_dataset() {
    let dir = TempDir::new().unwrap();
    let err = dataset::load_dataset(&dir.path().join("nope.csv")).unwrap_err();
    assert!(matches!(err, DatasetError::NotFound(_)));
}

#[test]
fn test_unknown_mood_after_training() {
    let mut model = TransitionModel::default();
    model.train(&dataset_rows()).unwrap();
    let err = model.generate_playlist("angry", "calm", 20).unwrap_err();
    assert!(matches!(err, ModelError::UnknownMood { .. }));
}
