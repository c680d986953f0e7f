//! Stochastic local-search sampling of association rules.
//!
//! A [`Dataset`] encodes every item as a bitset cover of the transactions
//! containing it. A [`RuleState`] keeps the covers and interestingness
//! measures of a rule `X -> y` up to date under single-item flips, and the
//! [`LocalSearchSampler`] walks the space of rules, accepting flips with the
//! probability that the new rule outranks the old one.

pub mod config;
pub mod data;
pub mod error;
pub mod normalize;
pub mod rules;
pub mod sampling;
pub mod scoring;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use config::{HistoryConfig, MultivariateConfig, RejectionRule, SamplerConfig};
pub use data::{Cover, Dataset};
pub use error::{Result, SamplerError};
pub use normalize::{NormalizationMethod, Normalizer};
pub use rules::{DedupPolicy, ItemSet, Measure, RuleSettings, RuleSnapshot, RuleState};
pub use sampling::{
    run_independent, CancelToken, HalvingBatch, LocalSearchSampler, MultivariateSampler, RandomSampler,
    SampleOutcome, SingleFlip, StopReason,
};
pub use scoring::{
    BradleyTerry, CertaintyFunction, HistoryAggregator, LinearScore, Outranking, PairwiseCertainty,
    PairwiseUncertainty, ScoreDifference, ScoreFunction, Thurstone,
};
