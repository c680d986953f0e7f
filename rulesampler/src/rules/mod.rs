pub mod measures;
pub mod reducer;
pub mod rule;

#[cfg(test)]
mod tests;

pub use measures::{compute_measures, Contingency, Measure};
pub use reducer::CoverReducer;
pub use rule::{DedupPolicy, ItemSet, RuleSettings, RuleSnapshot, RuleState};
