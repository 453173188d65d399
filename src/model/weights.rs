use crate::dataset::TrackRecord;

/// Affinity for any mood pair missing from [`MOOD_AFFINITY`].
pub const DEFAULT_AFFINITY: f64 = 0.3;

/// Directed mood-to-mood transition preferences.
const MOOD_AFFINITY: &[(&str, &str, f64)] = &[
    ("sad", "happy", 0.8),
    ("happy", "sad", 0.6),
    ("calm", "energetic", 0.7),
    ("energetic", "calm", 0.7),
    ("angry", "calm", 0.8),
    ("calm", "angry", 0.5),
    ("romantic", "happy", 0.7),
    ("happy", "romantic", 0.7),
    ("melancholic", "happy", 0.6),
    ("happy", "melancholic", 0.5),
];

pub fn mood_affinity(from: &str, to: &str) -> f64 {
    MOOD_AFFINITY
        .iter()
        .find(|(f, t, _)| *f == from && *t == to)
        .map(|&(_, _, w)| w)
        .unwrap_or(DEFAULT_AFFINITY)
}

/// Mean of per-feature agreement scores in [0, 1].
///
/// Magnitudes contribute `1 - |a - b| / max(a, b)`, skipped when both are
/// zero. The explicit flag and album type contribute 1 on a match and 0
/// otherwise.
pub fn feature_similarity(a: &TrackRecord, b: &TrackRecord) -> f64 {
    let magnitudes = [
        (a.popularity as f64, b.popularity as f64),
        (a.duration_ms as f64, b.duration_ms as f64),
        (a.artist_popularity as f64, b.artist_popularity as f64),
        (a.artist_followers as f64, b.artist_followers as f64),
    ];

    let mut terms: Vec<f64> = magnitudes
        .iter()
        .filter_map(|&(x, y)| {
            let max = x.max(y);
            (max > 0.0).then(|| 1.0 - (x - y).abs() / max)
        })
        .collect();

    terms.push(if a.explicit == b.explicit { 1.0 } else { 0.0 });
    terms.push(if a.album_type == b.album_type { 1.0 } else { 0.0 });

    terms.iter().sum::<f64>() / terms.len() as f64
}

/// Edge weight from `from` to `to`: mood affinity scaled by how alike the
/// two songs are.
pub fn transition_weight(from: &TrackRecord, to: &TrackRecord) -> f64 {
    mood_affinity(&from.mood, &to.mood) * feature_similarity(from, to)
}
