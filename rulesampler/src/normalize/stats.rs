use super::digest::QuantileDigest;

/// Running aggregates of one vector coordinate.
///
/// Extrema only widen; nothing is ever windowed or decayed.
#[derive(Debug, Clone)]
pub struct CoordinateStats {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
    max_abs: f64,
    max_digits: i32,
    digest: QuantileDigest,
}

impl Default for CoordinateStats {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            max_abs: 0.0,
            max_digits: 0,
            digest: QuantileDigest::default(),
        }
    }
}

impl CoordinateStats {
    pub fn update(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.sum_sq += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.max_abs = self.max_abs.max(value.abs());
        self.max_digits = self.max_digits.max(count_digits(value));
        self.digest.add(value);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn max_abs(&self) -> f64 {
        self.max_abs
    }

    /// Decimal digits of the largest magnitude seen (0 before any sample).
    pub fn max_digits(&self) -> i32 {
        self.max_digits
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Population variance, clamped at zero against cancellation and
    /// exactly zero when every sample was equal.
    pub fn variance(&self) -> f64 {
        if self.count == 0 || self.min == self.max {
            return 0.0;
        }
        let n = self.count as f64;
        ((self.sum_sq - self.sum * self.sum / n) / n).max(0.0)
    }

    pub fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn median(&self) -> f64 {
        self.digest.quantile(0.5)
    }

    pub fn cdf(&self, value: f64) -> f64 {
        self.digest.cdf(value)
    }
}

fn count_digits(value: f64) -> i32 {
    let value = value.abs();
    if value == 0.0 {
        1
    } else {
        value.log10().floor() as i32 + 1
    }
}
