pub mod digest;
pub mod stats;


pub use digest::QuantileDigest;
pub use stats::CoordinateStats;

use crate::error::{Result, SamplerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rescaling applied to each coordinate of a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMethod {
    None,
    /// `(v - min) / (max - min)`
    #[default]
    MinMax,
    /// `(v - mean) / (max - min)`
    Mean,
    /// `v / max|v|`
    MaxAbs,
    /// `v / median`
    Median,
    /// `v / 10^digits`, digits of the largest magnitude seen
    Decimal,
    /// `0.5 * tanh(0.01 * (v - mean) / stddev) + 0.5`
    Tanh,
    /// `(v - mean) / stddev`
    ZScore,
    /// Empirical CDF estimated by the quantile sketch
    Ecdf,
}

impl NormalizationMethod {
    pub fn name(&self) -> &'static str {
        match self {
            NormalizationMethod::None => "none",
            NormalizationMethod::MinMax => "minmax",
            NormalizationMethod::Mean => "mean",
            NormalizationMethod::MaxAbs => "maxabs",
            NormalizationMethod::Median => "median",
            NormalizationMethod::Decimal => "decimal",
            NormalizationMethod::Tanh => "tanh",
            NormalizationMethod::ZScore => "zscore",
            NormalizationMethod::Ecdf => "ecdf",
        }
    }

    fn apply(&self, stats: &CoordinateStats, value: f64) -> f64 {
        match self {
            NormalizationMethod::None => value,
            // An empty coordinate has no extrema yet.
            _ if stats.count() == 0 => match self {
                NormalizationMethod::Tanh => 0.5,
                NormalizationMethod::Decimal => value,
                _ => 0.0,
            },
            NormalizationMethod::MinMax => {
                let (min, max) = (stats.min(), stats.max());
                if max != min {
                    (value - min) / (max - min)
                } else {
                    0.0
                }
            }
            NormalizationMethod::Mean => {
                let (min, max) = (stats.min(), stats.max());
                if max != min {
                    (value - stats.mean()) / (max - min)
                } else {
                    0.0
                }
            }
            NormalizationMethod::MaxAbs => {
                let max_abs = stats.max_abs();
                if max_abs != 0.0 {
                    value / max_abs
                } else {
                    0.0
                }
            }
            NormalizationMethod::Median => {
                let median = stats.median();
                if median != 0.0 {
                    value / median
                } else {
                    0.0
                }
            }
            NormalizationMethod::Decimal => value / 10f64.powi(stats.max_digits()),
            NormalizationMethod::Tanh => {
                let stddev = stats.stddev();
                if stddev != 0.0 {
                    0.5 * (0.01 * (value - stats.mean()) / stddev).tanh() + 0.5
                } else {
                    0.5
                }
            }
            NormalizationMethod::ZScore => {
                let stddev = stats.stddev();
                if stddev != 0.0 {
                    (value - stats.mean()) / stddev
                } else {
                    0.0
                }
            }
            NormalizationMethod::Ecdf => stats.cdf(value),
        }
    }
}

impl fmt::Display for NormalizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NormalizationMethod {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "none" | "nonormalization" => Ok(NormalizationMethod::None),
            "minmax" | "minmaxscaling" => Ok(NormalizationMethod::MinMax),
            "mean" | "meannormalization" => Ok(NormalizationMethod::Mean),
            "maxabs" | "maxabsolutescaling" => Ok(NormalizationMethod::MaxAbs),
            "median" | "mediannormalization" => Ok(NormalizationMethod::Median),
            "decimal" | "decimalscaling" => Ok(NormalizationMethod::Decimal),
            "tanh" | "tanhestimator" => Ok(NormalizationMethod::Tanh),
            "zscore" | "znormalization" => Ok(NormalizationMethod::ZScore),
            "ecdf" | "empiricalcdf" => Ok(NormalizationMethod::Ecdf),
            _ => Err(SamplerError::UnknownNormalization(s.to_string())),
        }
    }
}

/// Online per-coordinate statistics used to rescale measure vectors.
///
/// The first non-empty vector fixes the dimensionality; later vectors of a
/// different length are rejected. With `save = true` the statistics absorb
/// the vector before it is rescaled, so it is normalized against a history
/// that includes itself.
///
/// Not synchronized: callers that share one instance across threads must
/// serialize access themselves.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    dimensions: Option<usize>,
    stats: Vec<CoordinateStats>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, vector: &[f64], method: NormalizationMethod, save: bool) -> Result<Vec<f64>> {
        if vector.is_empty() && self.dimensions.is_none() {
            return Ok(Vec::new());
        }
        let expected = *self.dimensions.get_or_insert(vector.len());
        if vector.len() != expected {
            return Err(SamplerError::DimensionMismatch { expected, found: vector.len() });
        }
        if self.stats.len() < expected {
            self.stats.resize_with(expected, CoordinateStats::default);
        }

        let result = vector
            .iter()
            .zip(self.stats.iter_mut())
            .map(|(&value, stats)| {
                if save {
                    stats.update(value);
                }
                method.apply(stats, value)
            })
            .collect();
        Ok(result)
    }

    /// Absorbs `vector` into the statistics without rescaling it.
    pub fn observe(&mut self, vector: &[f64]) -> Result<()> {
        self.normalize(vector, NormalizationMethod::None, true).map(|_| ())
    }

    pub fn dimensions(&self) -> Option<usize> {
        self.dimensions
    }

    pub fn coordinate_stats(&self) -> &[CoordinateStats] {
        &self.stats
    }

    /// Samples absorbed so far (all coordinates share the count).
    pub fn sample_count(&self) -> usize {
        self.stats.first().map_or(0, CoordinateStats::count)
    }
}
