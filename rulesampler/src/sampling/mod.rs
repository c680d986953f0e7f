pub mod local_search;
pub mod moves;
pub mod multivariate;
pub mod random;
pub mod run;

#[cfg(test)]
mod tests;

pub use local_search::LocalSearchSampler;
pub use moves::{valid_rule_score, HalvingBatch, MoveContext, MovePolicy, SingleFlip};
pub use multivariate::MultivariateSampler;
pub use random::RandomSampler;
pub use run::{run_independent, CancelToken, SampleOutcome, StopReason};

/// Per-run random source: seeded, cheap, and never shared between runs.
pub type SearchRng = rand_xoshiro::Xoshiro256PlusPlus;
