//! Lloyd's k-means with k-means++ seeding.
//!
//! All randomness comes from one `StdRng` seeded from `seed`, so the same
//! input and parameters always produce the same labels.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Relative convergence tolerance, scaled by the mean per-dimension variance.
const DEFAULT_TOL: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct KMeans {
    pub n_clusters: usize,
    pub seed: u64,
    pub n_init: usize,
    pub max_iter: usize,
    pub tol: f64,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
}

struct Run {
    labels: Vec<usize>,
    centroids: Vec<Vec<f64>>,
    inertia: f64,
}

impl KMeans {
    pub fn new(n_clusters: usize, seed: u64) -> Self {
        Self {
            n_clusters,
            seed,
            n_init: 10,
            max_iter: 300,
            tol: DEFAULT_TOL,
            centroids: Vec::new(),
            inertia: 0.0,
        }
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Fit on `data` and return each row's cluster index.
    ///
    /// When there are fewer rows than clusters, every row gets its own
    /// cluster.
    pub fn fit_predict(&mut self, data: &[Vec<f64>]) -> Vec<usize> {
        let n = data.len();
        if n == 0 || self.n_clusters == 0 {
            self.centroids.clear();
            self.inertia = 0.0;
            return vec![0; n];
        }

        let k = if n < self.n_clusters {
            log::warn!(
                "Only {n} samples for {} clusters, clustering into {n}",
                self.n_clusters
            );
            n
        } else {
            self.n_clusters
        };

        let tol = self.tol * mean_variance(data);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best: Option<Run> = None;
        for _ in 0..self.n_init.max(1) {
            let seeds = init_plus_plus(data, k, &mut rng);
            let run = lloyd(data, seeds, self.max_iter, tol);
            let better = best.as_ref().is_none_or(|b| run.inertia < b.inertia);
            if better {
                best = Some(run);
            }
        }

        match best {
            Some(run) => {
                log::debug!("k-means converged with inertia {:.4}", run.inertia);
                self.centroids = run.centroids;
                self.inertia = run.inertia;
                run.labels
            }
            None => vec![0; n],
        }
    }

    pub fn centroids(&self) -> &[Vec<f64>] {
        &self.centroids
    }

    /// Sum of squared distances from each row to its centroid.
    pub fn inertia(&self) -> f64 {
        self.inertia
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(point, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

fn mean_variance(data: &[Vec<f64>]) -> f64 {
    let n = data.len() as f64;
    let dim = data[0].len();
    if dim == 0 {
        return 0.0;
    }

    let mut total = 0.0;
    for d in 0..dim {
        let mean = data.iter().map(|r| r[d]).sum::<f64>() / n;
        total += data.iter().map(|r| (r[d] - mean).powi(2)).sum::<f64>() / n;
    }
    total / dim as f64
}

/// k-means++: first centre uniform, each next one drawn with probability
/// proportional to its squared distance from the nearest chosen centre.
fn init_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = data.len();
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..n)].clone());

    let mut dists: Vec<f64> = data
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let total: f64 = dists.iter().sum();
        let idx = if total > 0.0 {
            let mut target = rng.gen_range(0.0..total);
            let mut chosen = n - 1;
            for (i, &d) in dists.iter().enumerate() {
                if target < d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        } else {
            // All points coincide with a centre already
            rng.gen_range(0..n)
        };

        let centre = data[idx].clone();
        for (i, p) in data.iter().enumerate() {
            dists[i] = dists[i].min(squared_distance(p, &centre));
        }
        centroids.push(centre);
    }

    centroids
}

fn lloyd(data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, max_iter: usize, tol: f64) -> Run {
    let k = centroids.len();
    let dim = data[0].len();

    for _ in 0..max_iter {
        let mut sums = vec![vec![0.0_f64; dim]; k];
        let mut counts = vec![0usize; k];
        for p in data {
            let (c, _) = nearest(p, &centroids);
            counts[c] += 1;
            for (s, v) in sums[c].iter_mut().zip(p) {
                *s += v;
            }
        }

        let mut shift = 0.0;
        for c in 0..k {
            // Empty clusters keep their previous centre
            if counts[c] == 0 {
                continue;
            }
            let updated: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            shift += squared_distance(&updated, &centroids[c]);
            centroids[c] = updated;
        }

        if shift <= tol {
            break;
        }
    }

    let mut labels = Vec::with_capacity(data.len());
    let mut inertia = 0.0;
    for p in data {
        let (c, d) = nearest(p, &centroids);
        labels.push(c);
        inertia += d;
    }

    Run {
        labels,
        centroids,
        inertia,
    }
}
