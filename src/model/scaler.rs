/// Per-column z-score scaling: subtract the mean, divide by the population
/// standard deviation. Constant columns are left centred but unscaled.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute column means and deviations from `rows`.
    pub fn fit(&mut self, rows: &[Vec<f64>]) {
        let n = rows.len();
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);

        let mut means = vec![0.0_f64; dim];
        let mut vars = vec![0.0_f64; dim];

        if n == 0 {
            self.means = means;
            self.scales = Vec::new();
            return;
        }

        for row in rows {
            for (d, &val) in row.iter().enumerate() {
                means[d] += val;
            }
        }
        for m in &mut means {
            *m /= n as f64;
        }

        for row in rows {
            for (d, &val) in row.iter().enumerate() {
                let diff = val - means[d];
                vars[d] += diff * diff;
            }
        }

        self.scales = vars
            .iter()
            .map(|v| {
                let std = (v / n as f64).sqrt();
                if std < 1e-10 { 1.0 } else { std }
            })
            .collect();
        self.means = means;
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(d, &val)| (val - self.means[d]) / self.scales[d])
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(&mut self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        self.fit(rows);
        self.transform(rows)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }
}
