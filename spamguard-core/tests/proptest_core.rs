//! Property-based tests for core components using proptest.

use proptest::prelude::*;

use spamguard_core::data::ColumnSelection;
use spamguard_core::eval::{ConfusionMatrix, evaluate};
use spamguard_core::model::CountVectorizer;
use spamguard_core::{Label, TrainTestSplit, TrainingDataset};

fn label() -> impl Strategy<Value = Label> {
    prop_oneof![Just(Label::Ham), Just(Label::Spam)]
}

fn paired_labels() -> impl Strategy<Value = (Vec<Label>, Vec<Label>)> {
    (0usize..200).prop_flat_map(|n| {
        (
            prop::collection::vec(label(), n),
            prop::collection::vec(label(), n),
        )
    })
}

// --- Metric properties ---

proptest! {
    #[test]
    fn confusion_matrix_sums_to_sample_count((actual, predicted) in paired_labels()) {
        let m = ConfusionMatrix::from_labels(&actual, &predicted);
        prop_assert_eq!(m.total(), actual.len());
        prop_assert_eq!(
            m.support(Label::Ham) + m.support(Label::Spam),
            actual.len()
        );
    }

    #[test]
    fn scores_stay_in_unit_interval((actual, predicted) in paired_labels()) {
        let report = evaluate(&actual, &predicted).unwrap();
        prop_assert!((0.0..=1.0).contains(&report.accuracy));
        let cr = &report.classification_report;
        for scores in [cr.ham, cr.spam, cr.macro_avg, cr.weighted_avg] {
            prop_assert!((0.0..=1.0).contains(&scores.precision));
            prop_assert!((0.0..=1.0).contains(&scores.recall));
            prop_assert!((0.0..=1.0).contains(&scores.f1_score));
        }
    }

    #[test]
    fn perfect_predictions_score_one(actual in prop::collection::vec(label(), 1..100)) {
        let report = evaluate(&actual, &actual).unwrap();
        prop_assert_eq!(report.accuracy, 1.0);
        prop_assert_eq!(report.confusion_matrix.correct(), actual.len());
    }
}

// --- Split properties ---

proptest! {
    #[test]
    fn split_partitions_every_row(n in 2usize..500, seed in any::<u64>()) {
        let split = TrainTestSplit::new(n, 0.2, seed).unwrap();
        prop_assert_eq!(split.test.len(), (n as f64 * 0.2).ceil() as usize);
        let mut all: Vec<usize> = split.train.iter().chain(&split.test).copied().collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..n).collect::<Vec<_>>());
    }
}

// --- Vectorizer properties ---

proptest! {
    #[test]
    fn transform_width_matches_vocabulary(
        corpus in prop::collection::vec("[a-z]{2,6}( [a-z]{2,6}){0,8}", 1..20),
        sample in "[ -~]{0,40}",
        cap in prop::option::of(1usize..50),
    ) {
        let v = CountVectorizer::fit(&corpus, cap).unwrap();
        if let Some(cap) = cap {
            prop_assert!(v.vocabulary_size() <= cap);
        }
        let x = v.transform(&[sample]);
        prop_assert_eq!(x.shape(), &[1, v.vocabulary_size()]);
        prop_assert!(x.iter().all(|&c| c >= 0.0));
    }
}

// --- Dataset parsing properties ---

proptest! {
    #[test]
    fn csv_loader_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = TrainingDataset::from_csv_bytes(&bytes, &ColumnSelection::default());
    }
}
