//! Mood transition model: clusters songs within each mood, links the
//! (mood, cluster) groups into a weighted graph and walks it to build a
//! playlist that moves from one mood to another.

pub mod graph;
pub mod kmeans;
pub mod scaler;
pub mod weights;

use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::config::ModelConfig;
use crate::dataset::TrackRecord;

use graph::{MoodClusterNode, TransitionGraph};
use kmeans::KMeans;
use scaler::StandardScaler;

/// Numeric columns fed to the scaler and k-means, in order.
pub const FEATURE_COLUMNS: [&str; 9] = [
    "popularity",
    "duration_ms",
    "explicit",
    "track_number",
    "disc_number",
    "available_markets",
    "album_total_tracks",
    "artist_popularity",
    "artist_followers",
];

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("cannot train on an empty dataset")]
    EmptyDataset,
    #[error("no songs found for mood transition {start} -> {end}")]
    UnknownMood { start: String, end: String },
    #[error("no path found between {start} and {end}")]
    NoPath { start: String, end: String },
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// What `train` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainSummary {
    pub tracks: usize,
    pub nodes: usize,
    pub edges: usize,
}

/// A generated playlist.
#[derive(Debug, Clone)]
pub struct Playlist {
    /// Node ids visited, e.g. `["sad_1", "happy_0"]`.
    pub path: Vec<String>,
    pub tracks: Vec<TrackRecord>,
    pub total_duration_ms: u64,
}

pub fn feature_vector(track: &TrackRecord) -> Vec<f64> {
    vec![
        track.popularity as f64,
        track.duration_ms as f64,
        if track.explicit { 1.0 } else { 0.0 },
        track.track_number as f64,
        track.disc_number as f64,
        track.available_markets as f64,
        track.album_total_tracks as f64,
        track.artist_popularity as f64,
        track.artist_followers as f64,
    ]
}

#[derive(Debug, Clone)]
pub struct TransitionModel {
    scaler: StandardScaler,
    kmeans: KMeans,
    graph: TransitionGraph,
}

impl Default for TransitionModel {
    fn default() -> Self {
        Self::new(&ModelConfig::default())
    }
}

impl TransitionModel {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            scaler: StandardScaler::new(),
            kmeans: KMeans::new(config.clusters, config.seed)
                .with_n_init(config.n_init)
                .with_max_iter(config.max_iter),
            graph: TransitionGraph::default(),
        }
    }

    pub fn graph(&self) -> &TransitionGraph {
        &self.graph
    }

    /// Cluster `dataset` and rebuild the transition graph from scratch.
    pub fn train(&mut self, dataset: &[TrackRecord]) -> Result<TrainSummary> {
        if dataset.is_empty() {
            return Err(ModelError::EmptyDataset);
        }
        log::info!("Training transition model on {} tracks...", dataset.len());
        log::debug!("Clustering on {}", FEATURE_COLUMNS.join(", "));
        let features: Vec<Vec<f64>> = dataset.iter().map(feature_vector).collect();
        let scaled = self.scaler.fit_transform(&features);
        let labels = self.kmeans.fit_predict(&scaled);

        let mut groups: BTreeMap<(&str, usize), Vec<TrackRecord>> = BTreeMap::new();
        for (track, &cluster) in dataset.iter().zip(&labels) {
            groups
                .entry((track.mood.as_str(), cluster))
                .or_default()
                .push(track.clone());
        }

        let nodes: Vec<MoodClusterNode> = groups
            .into_iter()
            .map(|((mood, cluster), songs)| MoodClusterNode::new(mood, cluster, songs))
            .collect();
        for node in &nodes {
            log::debug!("{}: {} songs", node.id, node.songs.len());
        }

        self.graph = TransitionGraph::build(nodes);

        let summary = TrainSummary {
            tracks: dataset.len(),
            nodes: self.graph.nodes().len(),
            edges: self.graph.edge_count(),
        };
        log::info!(
            "Model training complete: {} nodes, {} edges",
            summary.nodes,
            summary.edges
        );
        Ok(summary)
    }

    pub fn generate_playlist(&self, start: &str, end: &str, duration_minutes: u32) -> Result<Playlist> {
        self.generate_playlist_with_rng(start, end, duration_minutes, &mut rand::thread_rng())
    }

    /// Pick the shortest path between `start` and `end` nodes whose total
    /// duration lands nearest the target, then draw one random song per node
    /// until the target is reached.
    pub fn generate_playlist_with_rng<R: Rng + ?Sized>(
        &self,
        start: &str,
        end: &str,
        duration_minutes: u32,
        rng: &mut R,
    ) -> Result<Playlist> {
        log::info!("Generating playlist from {start} to {end}...");

        let target_ms = duration_minutes as f64 * 60_000.0;
        let start_nodes = self.graph.nodes_with_prefix(start);
        let end_nodes = self.graph.nodes_with_prefix(end);

        if start_nodes.is_empty() || end_nodes.is_empty() {
            return Err(ModelError::UnknownMood {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        let mut best: Option<(Vec<usize>, f64)> = None;
        for &s in &start_nodes {
            for &e in &end_nodes {
                let Some(path) = self.graph.shortest_path(s, e) else {
                    log::debug!(
                        "No path from {} to {}",
                        self.graph.node(s).id,
                        self.graph.node(e).id
                    );
                    continue;
                };
                let duration = self.graph.path_duration_ms(&path);
                let closer = best
                    .as_ref()
                    .is_none_or(|(_, d)| (duration - target_ms).abs() < (d - target_ms).abs());
                if closer {
                    best = Some((path, duration));
                }
            }
        }

        let Some((path, path_duration)) = best else {
            return Err(ModelError::NoPath {
                start: start.to_string(),
                end: end.to_string(),
            });
        };
        log::debug!(
            "Chosen path {:?} ({:.1} min)",
            self.graph.path_ids(&path),
            path_duration / 60_000.0
        );

        let mut tracks = Vec::new();
        let mut total_duration_ms = 0u64;
        for &idx in &path {
            let Some(song) = self.graph.node(idx).songs.choose(rng) else {
                continue;
            };
            total_duration_ms += song.duration_ms;
            tracks.push(song.clone());
            if total_duration_ms as f64 >= target_ms {
                break;
            }
        }

        Ok(Playlist {
            path: self.graph.path_ids(&path),
            tracks,
            total_duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::sample_track;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Two moods, ten songs each, spread across popularity and duration.
    fn dataset() -> Vec<TrackRecord> {
        let mut rows = Vec::new();
        for mood in ["sad", "happy"] {
            for i in 0..10u32 {
                let mut t = sample_track(mood, &format!("{mood}-{i}"), 150_000 + i as u64 * 15_000);
                t.popularity = 20 + i * 7;
                t.artist_followers = 1_000 * (i as u64 + 1);
                t.explicit = i % 3 == 0;
                rows.push(t);
            }
        }
        rows
    }

    fn trained() -> TransitionModel {
        let mut model = TransitionModel::default();
        model.train(&dataset()).unwrap();
        model
    }

    #[test]
    fn test_feature_vector_order() {
        let mut t = sample_track("sad", "a", 200_000);
        t.explicit = true;
        let v = feature_vector(&t);
        assert_eq!(v.len(), FEATURE_COLUMNS.len());
        assert_eq!(v[0], 50.0);
        assert_eq!(v[1], 200_000.0);
        assert_eq!(v[2], 1.0);
        assert_eq!(v[8], 10_000.0);
    }

    #[test]
    fn test_train_empty_dataset() {
        let mut model = TransitionModel::default();
        assert!(matches!(model.train(&[]), Err(ModelError::EmptyDataset)));
    }

    #[test]
    fn test_train_node_bounds() {
        let mut model = TransitionModel::default();
        let summary = model.train(&dataset()).unwrap();

        assert_eq!(summary.tracks, 20);
        assert!(summary.nodes >= 2 && summary.nodes <= 10);
        let songs: usize = model.graph().nodes().iter().map(|n| n.songs.len()).sum();
        assert_eq!(songs, 20);
        for node in model.graph().nodes() {
            assert!(node.songs.iter().all(|s| s.mood == node.mood));
            assert_eq!(node.id, format!("{}_{}", node.mood, node.cluster));
        }
    }

    #[test]
    fn test_nodes_sorted_by_mood_then_cluster() {
        let model = trained();
        let keys: Vec<(String, usize)> = model
            .graph()
            .nodes()
            .iter()
            .map(|n| (n.mood.clone(), n.cluster))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys[0].0, "happy");
    }

    #[test]
    fn test_edge_weights_in_range() {
        let model = trained();
        let graph = model.graph();
        for i in 0..graph.nodes().len() {
            for edge in graph.edges_from(i) {
                assert!(edge.weight > 0.0 && edge.weight <= 0.8);
            }
        }
    }

    #[test]
    fn test_training_deterministic() {
        let a = trained();
        let b = trained();
        let ids = |m: &TransitionModel| -> Vec<(String, Vec<String>)> {
            m.graph()
                .nodes()
                .iter()
                .map(|n| (n.id.clone(), n.songs.iter().map(|s| s.id.clone()).collect()))
                .collect()
        };
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.graph().edge_count(), b.graph().edge_count());
        for i in 0..a.graph().nodes().len() {
            assert_eq!(a.graph().edges_from(i), b.graph().edges_from(i));
        }
    }

    #[test]
    fn test_retrain_replaces_graph() {
        let mut model = trained();
        let only_sad: Vec<TrackRecord> = dataset().into_iter().filter(|t| t.mood == "sad").collect();
        model.train(&only_sad).unwrap();
        assert!(model.graph().nodes_with_prefix("happy").is_empty());
    }

    #[test]
    fn test_zero_duration_gives_one_track() {
        let model = trained();
        let playlist = model.generate_playlist("sad", "happy", 0).unwrap();
        assert_eq!(playlist.tracks.len(), 1);
        assert!(playlist.path[0].starts_with("sad"));
        assert!(playlist.path.last().unwrap().starts_with("happy"));
    }

    #[test]
    fn test_unknown_mood() {
        let model = trained();
        let err = model.generate_playlist("angry", "happy", 10).unwrap_err();
        assert!(matches!(err, ModelError::UnknownMood { .. }));
        let err = model.generate_playlist("sad", "calm", 10).unwrap_err();
        assert!(matches!(err, ModelError::UnknownMood { .. }));
    }

    #[test]
    fn test_untrained_model_has_no_moods() {
        let model = TransitionModel::default();
        assert!(matches!(
            model.generate_playlist("sad", "happy", 5),
            Err(ModelError::UnknownMood { .. })
        ));
    }

    #[test]
    fn test_no_path() {
        let mut far = sample_track("sad", "far", 300_000);
        far.popularity = 100;
        far.artist_popularity = 100;
        far.artist_followers = 1_000_000;
        far.explicit = true;

        let mut near = sample_track("happy", "near", 0);
        near.popularity = 0;
        near.artist_popularity = 0;
        near.artist_followers = 0;
        near.album_type = "single".into();

        let mut model = TransitionModel::default();
        model.train(&[far, near]).unwrap();
        assert!(matches!(
            model.generate_playlist("sad", "happy", 5),
            Err(ModelError::NoPath { .. })
        ));
    }

    #[test]
    fn test_tracks_follow_path() {
        let model = trained();
        let mut rng = StdRng::seed_from_u64(7);
        let playlist = model.generate_playlist_with_rng("sad", "happy", 60, &mut rng).unwrap();

        assert!(!playlist.tracks.is_empty());
        assert!(playlist.tracks.len() <= playlist.path.len());
        for (track, node_id) in playlist.tracks.iter().zip(&playlist.path) {
            assert!(node_id.starts_with(&track.mood));
        }
        let total: u64 = playlist.tracks.iter().map(|t| t.duration_ms).sum();
        assert_eq!(total, playlist.total_duration_ms);
    }

    #[test]
    fn test_same_rng_same_playlist() {
        let model = trained();
        let a = model
            .generate_playlist_with_rng("sad", "happy", 10, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let b = model
            .generate_playlist_with_rng("sad", "happy", 10, &mut StdRng::seed_from_u64(1))
            .unwrap();
        let ids = |p: &Playlist| p.tracks.iter().map(|t| t.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
        assert_eq!(a.path, b.path);
    }

    fn hand_built() -> TransitionModel {
        let node = |mood: &str, cluster, d| {
            MoodClusterNode::new(mood, cluster, vec![sample_track(mood, &format!("{mood}{cluster}"), d)])
        };
        TransitionModel {
            graph: TransitionGraph::build(vec![
                node("happy", 0, 60_000),
                node("sad", 0, 60_000),
                node("sad", 1, 600_000),
            ]),
            ..TransitionModel::default()
        }
    }

    #[test]
    fn test_path_closest_to_target_wins() {
        let model = hand_built();

        // sad_0 -> happy_0 lasts exactly 2 minutes
        let short = model.generate_playlist("sad", "happy", 2).unwrap();
        assert_eq!(short.path, vec!["sad_0", "happy_0"]);
        assert_eq!(short.tracks.len(), 2);
        assert_eq!(short.total_duration_ms, 120_000);

        // sad_1 -> happy_0 lasts 11 minutes
        let long = model.generate_playlist("sad", "happy", 30).unwrap();
        assert_eq!(long.path, vec!["sad_1", "happy_0"]);
        assert_eq!(long.total_duration_ms, 660_000);
    }

    #[test]
    fn test_walk_stops_at_target() {
        let model = hand_built();
        // One sad_1 song already covers five minutes
        let playlist = model.generate_playlist("sad_1", "happy", 5).unwrap();
        assert_eq!(playlist.path, vec!["sad_1", "happy_0"]);
        assert_eq!(playlist.tracks.len(), 1);
        assert_eq!(playlist.tracks[0].id, "sad1");
    }
}
