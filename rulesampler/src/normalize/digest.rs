//! Streaming quantile sketch backing the median and empirical-CDF
//! normalizations.
//!
//! Samples are kept as weighted centroids sorted by mean. While fewer than
//! `2 * compression` centroids exist every sample is its own centroid and
//! the sketch is exact; past that, every `compression` insertions the
//! neighbouring centroids are merged with a size limit proportional to
//! `q * (1 - q)`, so the tails stay finely resolved while the bulk of the
//! distribution is summarised.

#[derive(Debug, Clone, Copy, PartialEq)]
struct Centroid {
    mean: f64,
    weight: f64,
}

#[derive(Debug, Clone)]
pub struct QuantileDigest {
    compression: usize,
    centroids: Vec<Centroid>,
    total_weight: f64,
    pending: usize,
    min: f64,
    max: f64,
}

impl Default for QuantileDigest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl QuantileDigest {
    pub fn new(compression: usize) -> Self {
        let compression = compression.max(1);
        Self {
            compression,
            centroids: Vec::with_capacity(compression.min(1024) * 2 + 1),
            total_weight: 0.0,
            pending: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn add(&mut self, value: f64) {
        let pos = self.centroids.partition_point(|c| c.mean.total_cmp(&value).is_le());
        self.centroids.insert(pos, Centroid { mean: value, weight: 1.0 });
        self.total_weight += 1.0;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.pending += 1;

        if self.centroids.len() > self.compression.saturating_mul(2) && self.pending >= self.compression {
            self.compress();
            self.pending = 0;
        }
    }

    /// Number of samples added.
    pub fn count(&self) -> usize {
        self.total_weight as usize
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    /// Approximate fraction of samples below `value`, ties counted half.
    /// Returns 0 on an empty sketch.
    pub fn cdf(&self, value: f64) -> f64 {
        let (first, last) = match (self.centroids.first(), self.centroids.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        if value < self.min {
            return 0.0;
        }
        if value > self.max {
            return 1.0;
        }

        let total = self.total_weight;
        let mut cumulative = 0.0;
        for (idx, centroid) in self.centroids.iter().enumerate() {
            if value == centroid.mean {
                let tied: f64 = self.centroids[idx..]
                    .iter()
                    .take_while(|c| c.mean == value)
                    .map(|c| c.weight)
                    .sum();
                return (cumulative + tied / 2.0) / total;
            }
            if value < centroid.mean {
                let center = cumulative + centroid.weight / 2.0;
                if idx == 0 {
                    let span = first.mean - self.min;
                    return if span > 0.0 { (value - self.min) / span * center / total } else { 0.0 };
                }
                let prev = &self.centroids[idx - 1];
                let prev_center = cumulative - prev.weight / 2.0;
                let frac = (value - prev.mean) / (centroid.mean - prev.mean);
                return (prev_center + frac * (center - prev_center)) / total;
            }
            cumulative += centroid.weight;
        }

        // Between the last centroid and the observed maximum.
        let span = self.max - last.mean;
        let last_center = total - last.weight / 2.0;
        if span > 0.0 {
            (last_center + (value - last.mean) / span * last.weight / 2.0) / total
        } else {
            1.0
        }
    }

    /// Approximate `q`-quantile, interpolating between centroid centers.
    /// Returns 0 on an empty sketch.
    pub fn quantile(&self, q: f64) -> f64 {
        let (first, last) = match (self.centroids.first(), self.centroids.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0.0,
        };
        let target = q.clamp(0.0, 1.0) * self.total_weight;

        if target <= first.weight / 2.0 {
            return first.mean;
        }

        let mut cumulative = 0.0;
        for pair in self.centroids.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            let left_center = cumulative + left.weight / 2.0;
            let right_center = cumulative + left.weight + right.weight / 2.0;
            if target <= right_center {
                let frac = (target - left_center) / (right_center - left_center);
                return left.mean + frac * (right.mean - left.mean);
            }
            cumulative += left.weight;
        }
        last.mean
    }

    fn compress(&mut self) {
        let total = self.total_weight;
        let compression = self.compression as f64;
        let mut merged: Vec<Centroid> = Vec::with_capacity(self.centroids.len());
        // Weight strictly before the last merged centroid.
        let mut before = 0.0;

        for centroid in self.centroids.drain(..) {
            let mut absorbed = false;
            if let Some(last) = merged.last_mut() {
                let combined = last.weight + centroid.weight;
                let q = (before + combined / 2.0) / total;
                let limit = (4.0 * total * q * (1.0 - q) / compression).max(1.0);
                if combined <= limit {
                    last.mean = (last.mean * last.weight + centroid.mean * centroid.weight) / combined;
                    last.weight = combined;
                    absorbed = true;
                } else {
                    before += last.weight;
                }
            }
            if !absorbed {
                merged.push(centroid);
            }
        }
        self.centroids = merged;
    }
}
