use crate::error::{Result, SamplerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Absolute slack allowed when checking a measure against its range.
/// Smoothed margins can shrink a denominator to a few times the smoothing
/// constant, which turns ULP-sized cancellation into visible overshoot.
const RANGE_TOLERANCE: f64 = 1.0;

/// Interestingness measures computed from a rule's contingency table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Measure {
    Confidence,
    Lift,
    Cosine,
    Phi,
    Kruskal,
    YuleQ,
    /// Added value, also known as Pavillon's measure.
    #[serde(rename = "pavillon", alias = "addedValue")]
    AddedValue,
    /// Certainty factor.
    Certainty,
    Support,
    /// `1 - support`, useful to reward rare rules.
    #[serde(rename = "revsup")]
    RevSupport,
}

impl Measure {
    pub const ALL: [Measure; 10] = [
        Measure::Confidence,
        Measure::Lift,
        Measure::Cosine,
        Measure::Phi,
        Measure::Kruskal,
        Measure::YuleQ,
        Measure::AddedValue,
        Measure::Certainty,
        Measure::Support,
        Measure::RevSupport,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Measure::Confidence => "confidence",
            Measure::Lift => "lift",
            Measure::Cosine => "cosine",
            Measure::Phi => "phi",
            Measure::Kruskal => "kruskal",
            Measure::YuleQ => "yuleQ",
            Measure::AddedValue => "pavillon",
            Measure::Certainty => "certainty",
            Measure::Support => "support",
            Measure::RevSupport => "revsup",
        }
    }

    /// Closed interval every finite value of the measure lies in.
    pub fn range(&self) -> (f64, f64) {
        match self {
            Measure::Confidence
            | Measure::Cosine
            | Measure::Kruskal
            | Measure::Support
            | Measure::RevSupport => (0.0, 1.0),
            Measure::Lift => (0.0, f64::INFINITY),
            Measure::Phi | Measure::YuleQ | Measure::AddedValue => (-1.0, 1.0),
            Measure::Certainty => (f64::NEG_INFINITY, 1.0),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Measure {
    type Err = SamplerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "confidence" => Ok(Measure::Confidence),
            "lift" => Ok(Measure::Lift),
            "cosine" => Ok(Measure::Cosine),
            "phi" => Ok(Measure::Phi),
            "kruskal" => Ok(Measure::Kruskal),
            "yuleq" => Ok(Measure::YuleQ),
            "pavillon" | "addedvalue" | "added_value" => Ok(Measure::AddedValue),
            "certainty" | "certaintyfactor" => Ok(Measure::Certainty),
            "support" => Ok(Measure::Support),
            "revsup" | "revsupport" => Ok(Measure::RevSupport),
            _ => Err(SamplerError::UnknownMeasure(s.to_string())),
        }
    }
}

/// Smoothed 2x2 contingency table of a rule X -> Y.
///
/// `n11` counts transactions with both X and Y, `n10` those with X but not
/// Y, and so on; `n1x`/`nx1` are the row/column margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contingency {
    pub n: f64,
    pub n11: f64,
    pub n10: f64,
    pub n01: f64,
    pub n00: f64,
    pub n1x: f64,
    pub nx1: f64,
    pub n0x: f64,
    pub nx0: f64,
}

impl Contingency {
    /// Adds `smooth` to every cell (and twice that to every margin) so that
    /// no ratio divides by zero when `smooth > 0`.
    pub fn new(freq_x: usize, freq_y: usize, freq_z: usize, transactions: usize, smooth: f64) -> Self {
        let n = transactions as f64;
        let n11 = freq_z as f64;
        let n1x = freq_x as f64;
        let nx1 = freq_y as f64;
        let n0x = n - n1x;
        let nx0 = n - nx1;
        let n10 = n1x - n11;
        let n01 = nx1 - n11;
        let n00 = n0x - n01;

        Self {
            n: n + 4.0 * smooth,
            n11: n11 + smooth,
            n10: n10 + smooth,
            n01: n01 + smooth,
            n00: n00 + smooth,
            n1x: n1x + 2.0 * smooth,
            nx1: nx1 + 2.0 * smooth,
            n0x: n0x + 2.0 * smooth,
            nx0: nx0 + 2.0 * smooth,
        }
    }

    pub fn value(&self, measure: Measure) -> f64 {
        let Contingency { n, n11, n10, n01, n00, n1x, nx1, n0x, nx0 } = *self;
        match measure {
            Measure::Confidence => n11 / n1x,
            Measure::Lift => n * n11 / (n1x * nx1),
            Measure::Cosine => n11 / (n1x * nx1).sqrt(),
            Measure::Phi => (n * n11 - n1x * nx1) / (n1x * nx1 * n0x * nx0).sqrt(),
            Measure::Kruskal => {
                let column_max = nx1.max(nx0);
                (n11.max(n10) + n01.max(n00) - column_max) / (n - column_max)
            }
            Measure::YuleQ => {
                let odds = n11 * n00 / (n10 * n01);
                (odds - 1.0) / (odds + 1.0)
            }
            Measure::AddedValue => n11 / n1x - nx1 / n,
            Measure::Certainty => {
                let forward = (n11 / n1x - nx1 / n) / (1.0 - nx1 / n);
                let backward = (n11 / nx1 - n1x / n) / (1.0 - n1x / n);
                forward.max(backward)
            }
            Measure::Support => n11 / n,
            Measure::RevSupport => 1.0 - n11 / n,
        }
    }

    /// Like [`Contingency::value`] but rejects non-finite results and
    /// results far outside the measure's range. Rounding overshoot is
    /// clamped back into the range.
    pub fn checked_value(&self, measure: Measure) -> Result<f64> {
        let value = self.value(measure);
        let (lower, upper) = measure.range();
        if !value.is_finite() || value < lower - RANGE_TOLERANCE || value > upper + RANGE_TOLERANCE {
            return Err(SamplerError::MeasureOutOfRange { measure: measure.name(), value, lower, upper });
        }
        Ok(value.clamp(lower, upper))
    }
}

/// Evaluates `measures` in order on the rule described by the frequencies.
pub fn compute_measures(
    measures: &[Measure],
    freq_x: usize,
    freq_y: usize,
    freq_z: usize,
    transactions: usize,
    smooth: f64,
) -> Result<Vec<f64>> {
    let table = Contingency::new(freq_x, freq_y, freq_z, transactions, smooth);
    measures.iter().map(|&m| table.checked_value(m)).collect()
}
