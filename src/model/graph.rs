//! Directed graph of (mood, cluster) nodes and shortest-path search.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::dataset::TrackRecord;

use super::weights::transition_weight;

/// One (mood, cluster) group of songs.
#[derive(Debug, Clone)]
pub struct MoodClusterNode {
    /// `"{mood}_{cluster}"`.
    pub id: String,
    pub mood: String,
    pub cluster: usize,
    /// Rows in dataset order.
    pub songs: Vec<TrackRecord>,
}

impl MoodClusterNode {
    pub fn new(mood: &str, cluster: usize, songs: Vec<TrackRecord>) -> Self {
        Self {
            id: format!("{mood}_{cluster}"),
            mood: mood.to_string(),
            cluster,
            songs,
        }
    }

    /// The song edge weights are computed from.
    pub fn representative(&self) -> Option<&TrackRecord> {
        self.songs.first()
    }

    pub fn mean_duration_ms(&self) -> f64 {
        if self.songs.is_empty() {
            return 0.0;
        }
        self.songs.iter().map(|s| s.duration_ms as f64).sum::<f64>() / self.songs.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: usize,
    pub weight: f64,
}

#[derive(Debug, Clone, Default)]
pub struct TransitionGraph {
    nodes: Vec<MoodClusterNode>,
    adjacency: Vec<Vec<Edge>>,
}

impl TransitionGraph {
    /// Connect every ordered pair of nodes, self pairs included, whose
    /// representative songs give a positive transition weight.
    pub fn build(nodes: Vec<MoodClusterNode>) -> Self {
        let adjacency = nodes
            .iter()
            .map(|from| {
                let Some(a) = from.representative() else {
                    return Vec::new();
                };
                nodes
                    .iter()
                    .enumerate()
                    .filter_map(|(to, node)| {
                        let b = node.representative()?;
                        let weight = transition_weight(a, b);
                        (weight > 0.0).then_some(Edge { to, weight })
                    })
                    .collect()
            })
            .collect();

        Self { nodes, adjacency }
    }

    pub fn nodes(&self) -> &[MoodClusterNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &MoodClusterNode {
        &self.nodes[idx]
    }

    pub fn edges_from(&self, idx: usize) -> &[Edge] {
        &self.adjacency[idx]
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn weight(&self, from: usize, to: usize) -> Option<f64> {
        self.adjacency
            .get(from)?
            .iter()
            .find(|e| e.to == to)
            .map(|e| e.weight)
    }

    /// Indices of nodes whose id starts with `prefix`, in node order.
    pub fn nodes_with_prefix(&self, prefix: &str) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.id.starts_with(prefix))
            .map(|(i, _)| i)
            .collect()
    }

    /// Dijkstra: the path from `from` to `to` with the least summed edge
    /// weight, endpoints included.
    pub fn shortest_path(&self, from: usize, to: usize) -> Option<Vec<usize>> {
        let n = self.nodes.len();
        if from >= n || to >= n {
            return None;
        }
        if from == to {
            return Some(vec![from]);
        }

        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut heap = BinaryHeap::new();

        dist[from] = 0.0;
        heap.push(State { cost: 0.0, node: from });

        while let Some(State { cost, node }) = heap.pop() {
            if node == to {
                break;
            }
            if cost > dist[node] {
                continue;
            }
            for edge in &self.adjacency[node] {
                let next = cost + edge.weight;
                if next < dist[edge.to] {
                    dist[edge.to] = next;
                    prev[edge.to] = Some(node);
                    heap.push(State { cost: next, node: edge.to });
                }
            }
        }

        if dist[to].is_infinite() {
            return None;
        }

        let mut path = vec![to];
        let mut cur = to;
        while let Some(p) = prev[cur] {
            path.push(p);
            cur = p;
        }
        path.reverse();
        Some(path)
    }

    /// Sum of per-node mean song durations along `path`.
    pub fn path_duration_ms(&self, path: &[usize]) -> f64 {
        path.iter().map(|&i| self.nodes[i].mean_duration_ms()).sum()
    }

    pub fn path_ids(&self, path: &[usize]) -> Vec<String> {
        path.iter().map(|&i| self.nodes[i].id.clone()).collect()
    }
}

/// Min-heap entry ordered by cost, ties broken on node index.
#[derive(Debug, Clone, Copy)]
struct State {
    cost: f64,
    node: usize,
}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for State {}
