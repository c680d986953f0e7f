use thiserror::Error;

/// Errors raised by rule construction, normalization and sampling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    #[error("item {item:?} not found in the antecedent")]
    ItemNotInAntecedent { item: String },

    #[error("vector has {found} coordinates but the normalizer was initialized with {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("measure {measure} = {value} is outside its valid range [{lower}, {upper}]")]
    MeasureOutOfRange {
        measure: &'static str,
        value: f64,
        lower: f64,
        upper: f64,
    },

    #[error("inconsistent rule state: {0}")]
    InvalidState(String),

    #[error("unknown measure: {0}")]
    UnknownMeasure(String),

    #[error("unknown normalization method: {0}")]
    UnknownNormalization(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("dataset contains no transactions")]
    EmptyDataset,

    #[error("no valid seed rule found after {attempts} attempts")]
    NoValidSeed { attempts: usize },
}

pub type Result<T, E = SamplerError> = std::result::Result<T, E>;
