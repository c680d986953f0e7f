use super::*;
use crate::config::{MultivariateConfig, RejectionRule, SamplerConfig};
use crate::data::Dataset;
use crate::error::{Result, SamplerError};
use crate::normalize::{NormalizationMethod, Normalizer};
use crate::rules::{Measure, RuleSettings, RuleState};
use crate::scoring::{
    BradleyTerry, CertaintyFunction, LinearScore, Outranking, PairwiseUncertainty, ScoreFunction,
};
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

struct FixedCertainty(f64);

impl CertaintyFunction for FixedCertainty {
    fn name(&self) -> &str {
        "fixed"
    }

    fn certainty(&self, _score0: f64, _score1: f64) -> f64 {
        self.0
    }
}

struct PanickingScore;

impl ScoreFunction for PanickingScore {
    fn name(&self) -> &str {
        "panicking"
    }

    fn score(&self, _alternative: &[f64]) -> Result<f64> {
        panic!("scored an invalid rule");
    }
}

/// Two blocks of ten transactions: twelve `a*` items (consequent `y1` in
/// half of them) and twelve `b*` items (consequent `y2` everywhere).
fn block_dataset() -> Arc<Dataset> {
    let a_items: Vec<String> = (0..12).map(|i| format!("a{i}")).collect();
    let b_items: Vec<String> = (0..12).map(|i| format!("b{i}")).collect();

    let mut transactions = Vec::new();
    for t in 0..10 {
        let mut tx = a_items.clone();
        if t < 5 {
            tx.push("y1".to_string());
        }
        transactions.push(tx);
    }
    for _ in 0..10 {
        let mut tx = b_items.clone();
        tx.push("y2".to_string());
        transactions.push(tx);
    }
    let consequents = vec!["y1".to_string(), "y2".to_string()];
    Arc::new(Dataset::new(&transactions, &consequents).unwrap())
}

fn sampler(dataset: &Arc<Dataset>, config: SamplerConfig) -> LocalSearchSampler {
    LocalSearchSampler::new(Arc::clone(dataset), config, Arc::new(LinearScore::new())).unwrap()
}

fn item_sets(rule: &RuleState) -> (BTreeSet<String>, Option<String>) {
    (rule.antecedent().clone(), rule.consequent().map(str::to_string))
}

#[test]
fn test_zero_iterations_return_seed() {
    let dataset = block_dataset();
    let config = SamplerConfig::new(0, 1).with_seed(7);

    // Replay the sampler's random draws to find the seed it will use.
    let settings = config.rule_settings();
    let mut rng = SearchRng::seed_from_u64(7);
    dataset.random_valid_rules(&mut rng, config.warmup_rules, config.seed_attempts, &settings).unwrap();
    let expected = dataset.random_valid_rule(&mut rng, config.seed_attempts, &settings).unwrap().unwrap();

    let outcome = sampler(&dataset, config).sample().unwrap();

    assert_eq!(outcome.rules.len(), 1);
    assert_eq!(outcome.iterations, 0);
    assert!(outcome.score_history.is_empty());
    assert!(outcome.is_complete());
    let seed = &outcome.rules[0];
    assert_eq!(item_sets(seed), item_sets(&expected));
    assert_eq!(
        (seed.freq_x(), seed.freq_y(), seed.freq_z()),
        (expected.freq_x(), expected.freq_y(), expected.freq_z())
    );
    assert_eq!(seed.alternative(), expected.alternative());
}

#[test]
fn test_always_accepting_moves_the_rule() {
    let dataset = block_dataset();
    let config = SamplerConfig::new(20, 10).with_normalization(NormalizationMethod::None).with_seed(3);

    let outcome = sampler(&dataset, config).with_certainty(FixedCertainty(1.0)).sample().unwrap();

    assert_eq!(outcome.iterations, 20);
    assert!(outcome.rules.len() >= 2, "rule never left its seed");
    assert!(outcome.score_history.iter().all(|&s| s > 0.0));
}

#[test]
fn test_never_accepting_keeps_the_seed() {
    let dataset = block_dataset();
    let config = SamplerConfig::new(15, 5).with_seed(11);

    let outcome = sampler(&dataset, config).with_certainty(FixedCertainty(0.0)).sample().unwrap();

    // Every consequent swap is rejected.
    let consequent = outcome.rules[0].consequent();
    assert!(outcome.rules.iter().all(|rule| rule.consequent() == consequent));
    assert!(outcome.rules.iter().all(RuleState::is_valid));
}

#[test]
fn test_top_k_is_bounded_and_sorted() {
    let dataset = block_dataset();
    let config = SamplerConfig::new(200, 3).with_seed(5);

    let outcome = sampler(&dataset, config).with_policy(HalvingBatch).sample().unwrap();

    assert!(outcome.rules.len() <= 3);
    assert_eq!(outcome.rules.len(), outcome.scores.len());
    assert!(outcome.scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(outcome.rules.iter().all(RuleState::is_valid));
    assert_eq!(outcome.score_history.len(), 200);

    let distinct: BTreeSet<_> = outcome.rules.iter().map(item_sets).collect();
    assert_eq!(distinct.len(), outcome.rules.len());
}

#[test]
fn test_always_present_consequent_samples_all_measures() {
    // `y` is in every transaction; seeds start from `z`, moves may reach `y`.
    let transactions: Vec<Vec<String>> = (0..50usize)
        .map(|t| {
            let mut tx: Vec<String> = (0..6usize).filter(|k| (t + k) % 3 != 0).map(|k| format!("i{k}")).collect();
            tx.push("y".to_string());
            if t % 2 == 0 {
                tx.push("z".to_string());
            }
            tx
        })
        .collect();
    let dataset = Arc::new(Dataset::new(&transactions, &["y".to_string(), "z".to_string()]).unwrap());

    let always = RuleState::new(
        BTreeSet::from(["i0".to_string()]),
        Some("y".to_string()),
        Arc::clone(&dataset),
        RuleSettings { measures: Measure::ALL.to_vec(), ..RuleSettings::default() },
    )
    .unwrap();
    assert_eq!(always.freq_y(), 50);
    assert!(always.is_valid());

    for measures in [vec![Measure::Kruskal, Measure::Support], Measure::ALL.to_vec()] {
        for seed in 0..5 {
            let config = SamplerConfig::new(30, 5).with_measures(measures.clone()).with_seed(seed);
            let outcome = sampler(&dataset, config).sample().unwrap();

            assert_eq!(outcome.iterations, 30);
            assert!(outcome.rules.iter().all(|rule| rule.alternative().iter().all(|v| v.is_finite())));
        }
    }
}

#[test]
fn test_unbounded_limits_run() {
    let dataset = block_dataset();
    let config = SamplerConfig::new(5, usize::MAX).with_cache_sizes(usize::MAX, usize::MAX).with_seed(8);

    let outcome = sampler(&dataset, config).sample().unwrap();

    assert_eq!(outcome.iterations, 5);
    assert!(!outcome.rules.is_empty());
}

#[test]
fn test_same_seed_is_reproducible() {
    let dataset = block_dataset();
    let config = SamplerConfig::new(50, 5).with_seed(42);

    let first = sampler(&dataset, config.clone()).sample().unwrap();
    let second = sampler(&dataset, config).sample().unwrap();

    let a: Vec<_> = first.rules.iter().map(item_sets).collect();
    let b: Vec<_> = second.rules.iter().map(item_sets).collect();
    assert_eq!(a, b);
    assert_eq!(first.score_history, second.score_history);
}

#[test]
fn test_expired_deadline_returns_partial_result() {
    let dataset = block_dataset();
    let config = SamplerConfig::new(1_000, 5).with_time_limit(Duration::ZERO);

    let outcome = sampler(&dataset, config).sample().unwrap();

    assert_eq!(outcome.stop, StopReason::DeadlineExpired);
    assert!(!outcome.is_complete());
    assert_eq!(outcome.iterations, 0);
    assert_eq!(outcome.rules.len(), 1);
}

#[test]
fn test_cancelled_run_stops() {
    let dataset = block_dataset();
    let token = CancelToken::new();
    let mut sampler = sampler(&dataset, SamplerConfig::new(1_000, 5)).with_cancel_token(token.clone());

    token.cancel();
    let outcome = sampler.sample().unwrap();

    assert_eq!(outcome.stop, StopReason::Cancelled);
    assert_eq!(outcome.iterations, 0);
    assert!(sampler.cancel_token().is_cancelled());
}

#[test]
fn test_missing_seed_is_an_error() {
    let transactions = vec![vec!["a"], vec!["b"]];
    let dataset = Arc::new(Dataset::new(&transactions, &["y"]).unwrap());
    let config = SamplerConfig::new(10, 1).with_seed_attempts(20).with_warmup_rules(0);

    let err = sampler(&dataset, config).sample().unwrap_err();

    assert_eq!(err, SamplerError::NoValidSeed { attempts: 20 });
}

#[test]
fn test_invalid_config_is_rejected() {
    let dataset = block_dataset();
    let result = LocalSearchSampler::new(dataset, SamplerConfig::new(10, 0), Arc::new(LinearScore::new()));
    assert!(matches!(result, Err(SamplerError::InvalidConfig(_))));
}

#[test]
fn test_invalid_rules_score_zero_without_scoring() {
    let dataset = block_dataset();
    let rule = RuleState::new(
        BTreeSet::from(["a0".to_string(), "b0".to_string()]),
        Some("y1".to_string()),
        Arc::clone(&dataset),
        RuleSettings::default(),
    )
    .unwrap();
    assert_eq!(rule.freq_x(), 0);

    let mut normalizer = Normalizer::new();
    let score = valid_rule_score(&rule, &mut normalizer, NormalizationMethod::MinMax, &PanickingScore).unwrap();

    assert_eq!(score, 0.0);
}

fn halving_context<'s>(
    normalizer: &'s mut Normalizer,
    certainty: &'s dyn CertaintyFunction,
    scorer: &'s dyn ScoreFunction,
    rng: &'s mut SearchRng,
) -> MoveContext<'s> {
    MoveContext {
        normalizer,
        method: NormalizationMethod::None,
        rejection: RejectionRule::ZeroScore,
        scorer,
        certainty,
        rng,
    }
}

#[test]
fn test_halving_removes_half_of_antecedent() {
    let dataset = block_dataset();
    let antecedent: BTreeSet<String> = (0..5).map(|i| format!("a{i}")).collect();
    let mut rule =
        RuleState::new(antecedent, Some("y1".to_string()), Arc::clone(&dataset), RuleSettings::default())
            .unwrap();
    let mut normalizer = Normalizer::new();
    let mut rng = SearchRng::seed_from_u64(1);
    let accept = FixedCertainty(1.0);
    let scorer = LinearScore::new();

    let mut ctx = halving_context(&mut normalizer, &accept, &scorer, &mut rng);
    assert!(ctx.try_halve(&mut rule).unwrap());

    assert_eq!(rule.antecedent().len(), 3);
    assert!(rule.is_valid());
}

#[test]
fn test_rejected_halving_restores_antecedent() {
    let dataset = block_dataset();
    let antecedent: BTreeSet<String> = (0..4).map(|i| format!("b{i}")).collect();
    let mut rule =
        RuleState::new(antecedent.clone(), Some("y2".to_string()), Arc::clone(&dataset), RuleSettings::default())
            .unwrap();
    let before = rule.snapshot();
    let mut normalizer = Normalizer::new();
    let mut rng = SearchRng::seed_from_u64(2);
    let reject = FixedCertainty(0.0);
    let scorer = LinearScore::new();

    let mut ctx = halving_context(&mut normalizer, &reject, &scorer, &mut rng);
    assert!(!ctx.try_halve(&mut rule).unwrap());

    assert_eq!(rule.snapshot(), before);
}

#[test]
fn test_single_item_antecedent_is_not_halved() {
    let dataset = block_dataset();
    let mut rule = RuleState::new(
        BTreeSet::from(["a0".to_string()]),
        Some("y1".to_string()),
        Arc::clone(&dataset),
        RuleSettings::default(),
    )
    .unwrap();
    let mut normalizer = Normalizer::new();
    let mut rng = SearchRng::seed_from_u64(3);
    let accept = FixedCertainty(1.0);
    let scorer = LinearScore::new();

    let mut ctx = halving_context(&mut normalizer, &accept, &scorer, &mut rng);
    assert!(!ctx.try_halve(&mut rule).unwrap());
    assert_eq!(rule.antecedent().len(), 1);
}

#[test]
fn test_invalid_rule_rejection_consults_certainty() {
    let dataset = block_dataset();
    let rule = RuleState::new(
        BTreeSet::from(["a0".to_string()]),
        Some("y1".to_string()),
        Arc::clone(&dataset),
        RuleSettings::default(),
    )
    .unwrap();
    let mut normalizer = Normalizer::new();
    let mut rng = SearchRng::seed_from_u64(4);
    let accept = FixedCertainty(1.0);
    let scorer = LinearScore::new();

    let mut ctx = halving_context(&mut normalizer, &accept, &scorer, &mut rng);
    assert!(!ctx.accepts(&rule, 0.0, 1.0));

    ctx.rejection = RejectionRule::InvalidRule;
    assert!(ctx.accepts(&rule, 0.0, 1.0));
}

#[test]
fn test_run_independent() {
    let dataset = block_dataset();
    let seeds = [1, 2, 3, 4];

    let outcomes = run_independent(&seeds, |seed| {
        LocalSearchSampler::new(
            Arc::clone(&dataset),
            SamplerConfig::new(30, 3).with_seed(seed),
            Arc::new(LinearScore::new()),
        )
    });

    assert_eq!(outcomes.len(), 4);
    for outcome in outcomes {
        let outcome = outcome.unwrap();
        assert_eq!(outcome.iterations, 30);
        assert!(!outcome.rules.is_empty());
    }
}

/// Thirty transactions over eight items with overlapping, uneven covers.
fn mixed_dataset() -> Arc<Dataset> {
    let transactions: Vec<Vec<String>> = (0..30usize)
        .map(|t| {
            let mut tx: Vec<String> = (0..8usize)
                .filter(|&k| (t + k) % 3 != 0 || (t * k) % 4 == 1)
                .map(|k| format!("i{k}"))
                .collect();
            tx.push(format!("y{}", t % 3));
            tx
        })
        .collect();
    let consequents = vec!["y0".to_string(), "y1".to_string(), "y2".to_string()];
    Arc::new(Dataset::new(&transactions, &consequents).unwrap())
}

#[test]
fn test_multivariate_sampler_returns_pairs() {
    let dataset = mixed_dataset();
    let pairwise = PairwiseUncertainty::new(Outranking::new(LinearScore::new(), BradleyTerry));
    let config = MultivariateConfig::new(5, 3).with_seed(9);
    let sampler_config = SamplerConfig::default().with_warmup_rules(10);

    let mut sampler = MultivariateSampler::new(dataset, pairwise, sampler_config, config).unwrap();
    let pairs = sampler.sample().unwrap();

    assert!(pairs.len() <= 3);
    for (first, second) in &pairs {
        assert!(first.is_valid() && second.is_valid());
        assert_ne!(first, second);
    }
    assert!(sampler.aggregator().seen_len() >= 1);
    assert!(sampler.aggregator().normalized_samples() > 0);
}

#[test]
fn test_random_sampler_returns_distinct_valid_rules() {
    let dataset = mixed_dataset();
    let sampler = RandomSampler::new(Arc::clone(&dataset), RuleSettings::default()).with_max_antecedent(3);
    let mut rng = SearchRng::seed_from_u64(4);

    let rules = sampler.sample(&mut rng, 10).unwrap();

    assert!(!rules.is_empty());
    assert!(rules.len() <= 10);
    let mut keys = std::collections::HashSet::new();
    for rule in &rules {
        assert!(rule.is_valid());
        assert!((1..=3).contains(&rule.antecedent().len()));
        assert!(dataset.is_consequent_item(rule.consequent().unwrap()));
        assert!(keys.insert(crate::scoring::AlternativeKey::new(rule.alternative())));
    }
}

#[test]
fn test_random_sampler_stops_when_budget_runs_out() {
    // One antecedent item and one consequent leave a single distinct rule.
    let transactions = vec![vec!["a", "y"], vec!["a"], vec!["y"]];
    let dataset = Arc::new(Dataset::new(&transactions, &["y"]).unwrap());
    let sampler = RandomSampler::new(dataset, RuleSettings::default()).with_draws_per_rule(5);
    let mut rng = SearchRng::seed_from_u64(1);

    let rules = sampler.sample(&mut rng, 4).unwrap();

    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].antecedent().len(), 1);
}

#[test]
fn test_random_sampler_is_reproducible_and_parallel() {
    let dataset = mixed_dataset();
    let sampler = RandomSampler::new(Arc::clone(&dataset), RuleSettings::default());

    let first = sampler.sample(&mut SearchRng::seed_from_u64(6), 5).unwrap();
    let second = sampler.sample(&mut SearchRng::seed_from_u64(6), 5).unwrap();
    assert_eq!(
        first.iter().map(item_sets).collect::<Vec<_>>(),
        second.iter().map(item_sets).collect::<Vec<_>>()
    );

    let merged = sampler.sample_parallel(&[1, 2, 3], 8).unwrap();
    assert!(!merged.is_empty() && merged.len() <= 8);
    assert!(merged.iter().all(|rule| rule.is_valid()));
    assert!(sampler.sample_parallel(&[], 8).unwrap().is_empty());
}
