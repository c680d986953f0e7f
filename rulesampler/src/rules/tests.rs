use super::*;
use crate::data::{Cover, Dataset};
use crate::error::SamplerError;
use proptest::prelude::*;
use std::sync::Arc;

fn fixture(consequents: &[&str]) -> Arc<Dataset> {
    let transactions = vec![vec!["1", "2", "3", "4"], vec!["5", "2", "1"], vec!["1", "9"]];
    Arc::new(Dataset::new(&transactions, consequents).unwrap())
}

fn items(names: &[&str]) -> ItemSet {
    names.iter().map(|name| name.to_string()).collect()
}

fn rule(dataset: &Arc<Dataset>, x: &[&str], y: &str) -> RuleState {
    RuleState::new(items(x), Some(y.to_string()), Arc::clone(dataset), RuleSettings::default()).unwrap()
}

fn freqs(rule: &RuleState) -> (usize, usize, usize) {
    (rule.freq_x(), rule.freq_y(), rule.freq_z())
}

#[test]
fn test_frequencies_of_constructed_rule() {
    let dataset = fixture(&["4"]);
    let rule = rule(&dataset, &["1", "2"], "4");

    assert_eq!(freqs(&rule), (2, 1, 1));
    assert!(rule.is_valid());
    assert_eq!(rule.alternative().len(), 2);
}

#[test]
fn test_set_x_recomputes_covers() {
    let dataset = fixture(&["1"]);
    let mut rule = rule(&dataset, &["3", "2"], "1");
    assert_eq!(rule.freq_x(), 1);
    assert_eq!(rule.freq_z(), 1);

    rule.set_x(items(&["5", "2"])).unwrap();

    assert_eq!(rule.freq_x(), 1);
    assert_eq!(rule.freq_z(), 1);
    assert_eq!(rule.cover_x().iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_add_to_x_narrows_covers() {
    let dataset = fixture(&["1"]);
    let mut rule = rule(&dataset, &["2"], "1");
    assert_eq!(freqs(&rule), (2, 3, 2));

    rule.add_to_x("5").unwrap();

    assert_eq!(freqs(&rule), (1, 3, 1));
    assert_eq!(rule.cover_z().iter().collect::<Vec<_>>(), vec![1]);
}

#[test]
fn test_remove_from_x_widens_covers() {
    let dataset = fixture(&["1"]);
    let mut rule = rule(&dataset, &["2", "3", "4"], "1");
    assert_eq!(rule.freq_x(), 1);

    rule.remove_from_x("2").unwrap();

    assert_eq!(rule.antecedent(), &items(&["3", "4"]));
    assert_eq!(rule.freq_x(), 1);
    assert_eq!(rule.freq_z(), 1);

    rule.remove_from_x("3").unwrap();
    rule.remove_from_x("4").unwrap();
    assert_eq!(rule.freq_x(), 3);
    assert!(!rule.is_valid());
}

#[test]
fn test_remove_missing_item_fails() {
    let dataset = fixture(&["1"]);
    let mut rule = rule(&dataset, &["2"], "1");

    let err = rule.remove_from_x("9").unwrap_err();
    assert_eq!(err, SamplerError::ItemNotInAntecedent { item: "9".to_string() });
    assert_eq!(freqs(&rule), (2, 3, 2));
}

#[test]
fn test_set_y_switches_consequent() {
    let dataset = fixture(&["1", "2"]);
    let mut rule = rule(&dataset, &["3"], "1");
    assert_eq!(freqs(&rule), (1, 3, 1));

    rule.set_y(Some("2".to_string())).unwrap();
    assert_eq!(freqs(&rule), (1, 2, 1));

    rule.set_y(None).unwrap();
    assert_eq!(freqs(&rule), (1, 0, 0));
    assert!(!rule.is_valid());
    assert!(rule.alternative().iter().all(|&v| v == 0.0));
}

#[test]
fn test_empty_rule_is_degenerate() {
    let dataset = fixture(&["4"]);
    let rule = RuleState::empty(Arc::clone(&dataset), RuleSettings::default()).unwrap();

    assert_eq!(freqs(&rule), (3, 0, 0));
    assert!(!rule.is_valid());
    assert_eq!(rule.alternative(), &[0.0, 0.0]);
}

#[test]
fn test_unknown_item_empties_cover() {
    let dataset = fixture(&["1"]);
    let mut rule = rule(&dataset, &["2"], "1");

    rule.add_to_x("missing").unwrap();

    assert_eq!(freqs(&rule), (0, 3, 0));
    assert!(!rule.is_valid());
    assert!(rule.alternative().iter().all(|&v| v == 0.0));
}

#[test]
fn test_duplicate_add_is_noop() {
    let dataset = fixture(&["1"]);
    let mut rule = rule(&dataset, &["2", "5"], "1");
    let before = rule.snapshot();

    rule.add_to_x("2").unwrap();

    assert_eq!(rule.snapshot(), before);
}

#[test]
fn test_memoization_transparency() {
    let dataset = fixture(&["1"]);
    let uncached = RuleSettings { cache_size_x: 0, cache_size_z: 0, ..RuleSettings::default() };

    let mut once = rule(&dataset, &["2"], "1");
    once.add_to_x("3").unwrap();

    let mut cached = rule(&dataset, &["2"], "1");
    let mut plain =
        RuleState::new(items(&["2"]), Some("1".to_string()), Arc::clone(&dataset), uncached).unwrap();
    for r in [&mut cached, &mut plain] {
        r.add_to_x("3").unwrap();
        r.remove_from_x("3").unwrap();
        r.add_to_x("3").unwrap();

        assert_eq!(r.cover_x(), once.cover_x());
        assert_eq!(r.cover_z(), once.cover_z());
        assert_eq!(freqs(r), freqs(&once));
        assert_eq!(r.alternative(), once.alternative());
    }
    assert!(cached.memo_hit_rates().0 > 0.0);
}

#[test]
fn test_snapshot_expand_restores_rule() {
    let dataset = fixture(&["4"]);
    let seed = rule(&dataset, &["1"], "4");
    let original = rule(&dataset, &["1", "2"], "4");

    let restored = original.snapshot().expand(&seed).unwrap();

    assert_eq!(restored.antecedent(), original.antecedent());
    assert_eq!(restored.consequent(), Some("4"));
    assert_eq!(restored.cover_z(), original.cover_z());
    assert_eq!(restored.alternative(), original.alternative());
}

#[test]
fn test_dedup_policies() {
    let dataset = fixture(&["1"]);
    // {3} and {4} both only occur in transaction 0.
    let a = rule(&dataset, &["3"], "1");
    let b = rule(&dataset, &["4"], "1");
    let snapshot = a.snapshot();

    assert!(snapshot.same_rule(&a, DedupPolicy::ItemSets));
    assert!(!snapshot.same_rule(&b, DedupPolicy::ItemSets));
    assert!(snapshot.same_rule(&b, DedupPolicy::ItemSetsOrFrequencies));
}

#[test]
fn test_snapshot_display() {
    let dataset = fixture(&["4"]);
    let rule = rule(&dataset, &["2", "1"], "4");
    assert_eq!(rule.to_string(), "{1, 2} -> 4 (fx=2, fy=1, fz=1)");
}

#[test]
fn test_reducer_edge_cases() {
    let dataset = fixture(&["4"]);
    let reducer = CoverReducer::new(&dataset);

    assert_eq!(reducer.compute(&ItemSet::new()), Cover::all_ones(3));
    assert!(reducer.compute(&items(&["1", "nope"])).is_empty());
    assert_eq!(reducer.compute(&items(&["1", "2", "5"])).iter().collect::<Vec<_>>(), vec![1]);
}

fn sequential_cover(dataset: &Dataset, set: &ItemSet) -> Cover {
    let mut cover = Cover::all_ones(dataset.transaction_count());
    for item in set {
        match dataset.item_cover(item) {
            Some(other) => cover.and(other),
            None => return Cover::new(),
        }
    }
    cover
}

#[test]
fn test_failed_measure_keeps_previous_state() {
    let dataset = fixture(&["4"]);
    let settings = RuleSettings { smooth_counts: 0.0, measures: vec![Measure::Phi], ..RuleSettings::default() };
    let mut rule = RuleState::new(items(&["2"]), Some("4".to_string()), Arc::clone(&dataset), settings).unwrap();
    let before = (freqs(&rule), rule.alternative().to_vec());
    assert_eq!(before.0, (2, 1, 1));

    // Item 1 is in every transaction, so phi divides 0 by 0 without smoothing.
    let err = rule.set_x(items(&["1"])).unwrap_err();

    assert!(matches!(err, SamplerError::MeasureOutOfRange { measure: "phi", .. }));
    assert_eq!((freqs(&rule), rule.alternative().to_vec()), before);
}

fn dataset_strategy() -> impl Strategy<Value = Arc<Dataset>> {
    prop::collection::vec(prop::collection::btree_set(0u8..10, 0..7), 1..30).prop_map(|rows| {
        let transactions: Vec<Vec<String>> =
            rows.into_iter().map(|row| row.into_iter().map(|i| i.to_string()).collect()).collect();
        let consequents = vec!["0".to_string(), "1".to_string()];
        Arc::new(Dataset::new(&transactions, &consequents).unwrap())
    })
}

proptest! {
    #[test]
    fn reducer_matches_sequential_fold(
        dataset in dataset_strategy(),
        subset in prop::collection::btree_set(0u8..12, 0..9),
    ) {
        let set: ItemSet = subset.into_iter().map(|i| i.to_string()).collect();
        let reduced = CoverReducer::new(&dataset).compute(&set);
        prop_assert_eq!(reduced, sequential_cover(&dataset, &set));
    }

    #[test]
    fn frequency_invariant_holds_under_mutation(
        dataset in dataset_strategy(),
        ops in prop::collection::vec((0u8..4, 0u8..12), 0..40),
    ) {
        let n = dataset.transaction_count();
        let settings = RuleSettings { measures: Measure::ALL.to_vec(), ..RuleSettings::default() };
        let mut rule = RuleState::empty(Arc::clone(&dataset), settings).unwrap();

        for (op, item) in ops {
            let item = item.to_string();
            match op {
                0 | 1 => rule.add_to_x(&item).unwrap(),
                2 => {
                    if rule.antecedent().contains(&item) {
                        rule.remove_from_x(&item).unwrap();
                    }
                }
                _ => rule.set_y(Some(item)).unwrap(),
            }

            prop_assert!(rule.freq_z() <= rule.freq_x().min(rule.freq_y()));
            prop_assert!(rule.freq_x() <= n && rule.freq_y() <= n);
            prop_assert_eq!(rule.cover_x(), &sequential_cover(&dataset, rule.antecedent()));
            prop_assert_eq!(rule.alternative().len(), Measure::ALL.len());
            if !rule.is_valid() {
                prop_assert!(rule.alternative().iter().all(|&v| v == 0.0));
            }
            for (measure, &value) in Measure::ALL.iter().zip(rule.alternative()) {
                let (lower, upper) = measure.range();
                prop_assert!(value >= lower && value <= upper);
            }
        }
    }
}
