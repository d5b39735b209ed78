/// Integration tests for the classification harness
///
/// These tests run the complete pipeline from CSV to report:
/// - Dataset build and feature selection
/// - Cross-validation bookkeeping
/// - Determinism for a fixed seed
/// - Cost sweeps and their effect on recall
/// - Learner edge cases inside cross-validation
mod common;

use common::{synthetic_calls, write_csv};
use dispatch_eval::{
    dataset::{self, Dataset, DatasetBuilder},
    ml::{
        evaluate, BaggingConfig, ClassificationHarness, CostMatrix, CostStrategy,
        CrossValidation, EvaluationResult, LearnerConfig, LearnerKind,
    },
    report::{self, ReportFormat},
};

const SELECTION: [&str; 4] = [
    "SERVICE_TIME_AT_CALL",
    "DISPATCHER_PRIORITY",
    "TRUE_PRIORITY",
    "CLASS",
];

fn dataset_with(n: usize, features: &[&str]) -> Dataset {
    let (_dir, path) = write_csv(&synthetic_calls(n));
    let full = DatasetBuilder::default().build_from_path(&path).unwrap();
    dataset::select(&full, features).unwrap()
}

fn selected_dataset(n: usize) -> Dataset {
    dataset_with(n, &SELECTION)
}

fn assert_recall_never_drops(results: &[EvaluationResult], context: &str) {
    let recalls: Vec<f64> = results.iter().map(|r| r.recall(1)).collect();
    for pair in recalls.windows(2) {
        assert!(pair[1] >= pair[0], "{context}: recall of class 1 decreased: {recalls:?}");
    }
}

fn sweep() -> Vec<CostMatrix> {
    ["[0 1; 1 0]", "[0 1; 2 0]", "[0 1; 4.2 0]"]
        .iter()
        .map(|literal| CostMatrix::parse(literal).unwrap())
        .collect()
}

#[test]
fn test_every_record_is_tested_exactly_once() {
    let dataset = selected_dataset(48);
    let learner = LearnerConfig::new(LearnerKind::DecisionTree);

    for folds in [2, 5, 10] {
        for stratify in [true, false] {
            let cv = CrossValidation::new(folds, 3).with_stratify(stratify);
            let result = evaluate(&dataset, &learner, &CostMatrix::uniform(2), &cv).unwrap();
            assert_eq!(result.confusion_matrix.total(), 48, "folds={folds}");
            assert_eq!(result.per_class[0].support + result.per_class[1].support, 48);
        }
    }
}

#[test]
fn test_default_svm_pipeline() {
    let dataset = selected_dataset(60);
    let harness = ClassificationHarness::new(LearnerConfig::default(), CrossValidation::new(10, 1));

    let results = harness.sweep(&dataset, &sweep()).unwrap();
    assert_eq!(results.len(), 3);

    for result in &results {
        assert_eq!(result.confusion_matrix.total(), 60);
        assert_eq!(result.learner, "Support Vector Machine");
        for metrics in &result.per_class {
            assert!((0.0..=1.0).contains(&metrics.precision));
            assert!((0.0..=1.0).contains(&metrics.recall));
            assert!((0.0..=1.0).contains(&metrics.f_measure));
        }
    }

    let text = report::render(&dataset.relation, &results, ReportFormat::Text).unwrap();
    assert_eq!(text.matches("Cost matrix:").count(), 3);
    assert_eq!(text.matches("Class: 0; Precision: ").count(), 3);
    assert_eq!(text.matches("Class: 1; Precision: ").count(), 3);
}

#[test]
fn test_fixed_seed_is_reproducible() {
    let dataset = selected_dataset(40);
    let learner = LearnerConfig::new(LearnerKind::LogisticRegression).with_bagging(BaggingConfig {
        size: 3,
        bag_size_percent: 80,
    });
    let cv = CrossValidation::new(4, 17);
    let cost = CostMatrix::parse("[0 1; 2 0]").unwrap();

    let first = evaluate(&dataset, &learner, &cost, &cv).unwrap();
    let second = evaluate(&dataset, &learner, &cost, &cv).unwrap();

    assert_eq!(first.confusion_matrix, second.confusion_matrix);
    assert_eq!(first.per_class, second.per_class);
}

#[test]
fn test_raising_false_negative_cost_never_lowers_recall() {
    let dataset = selected_dataset(60);
    let learner = LearnerConfig::new(LearnerKind::DecisionTree)
        .with_bagging(BaggingConfig {
            size: 7,
            bag_size_percent: 100,
        })
        .with_cost_strategy(CostStrategy::MinimizeExpectedCost);
    let harness = ClassificationHarness::new(learner, CrossValidation::new(5, 2));

    let results = harness.sweep(&dataset, &sweep()).unwrap();
    assert_recall_never_drops(&results, "bagged trees");
}

#[test]
fn test_default_strategy_recall_never_drops_across_seeds() {
    let dataset = dataset_with(60, &["TRAVEL_TIME_TO_CALL", "QUEUE_TIME", "CLASS"]);
    let mut costs = sweep();
    costs.insert(2, CostMatrix::parse("[0 1; 3 0]").unwrap());

    let learners = [
        LearnerConfig::default(),
        LearnerConfig::new(LearnerKind::DecisionTree),
        LearnerConfig::new(LearnerKind::LogisticRegression),
    ];
    for learner in learners {
        assert_eq!(learner.cost_strategy, CostStrategy::Reweight);
        for seed in 1..=5 {
            let harness = ClassificationHarness::new(learner.clone(), CrossValidation::new(10, seed));
            let results = harness.sweep(&dataset, &costs).unwrap();
            assert_recall_never_drops(&results, &format!("{} seed {seed}", learner.describe()));
        }
    }
}

#[test]
fn test_expected_cost_applies_without_bagging() {
    // Travel time says little about the label, so class 1 stays near its
    // 25% share and only the costs move the decision.
    let dataset = dataset_with(80, &["TRAVEL_TIME_TO_CALL", "CLASS"]);
    let learner = LearnerConfig::new(LearnerKind::LogisticRegression)
        .with_cost_strategy(CostStrategy::MinimizeExpectedCost);
    let harness = ClassificationHarness::new(learner, CrossValidation::new(5, 3));

    let costs = [
        CostMatrix::uniform(2),
        CostMatrix::parse("[0 1; 50 0]").unwrap(),
    ];
    let results = harness.sweep(&dataset, &costs).unwrap();

    assert_ne!(results[0].confusion_matrix, results[1].confusion_matrix);
    assert!(results[1].recall(1) > results[0].recall(1));
}

#[test]
fn test_naive_bayes_survives_constant_feature_within_class() {
    // Every mis-prioritized call has zero queue time
    let dataset = dataset_with(80, &["TRAVEL_TIME_TO_CALL", "QUEUE_TIME", "CLASS"]);
    let learner = LearnerConfig::new(LearnerKind::NaiveBayes)
        .with_cost_strategy(CostStrategy::MinimizeExpectedCost);

    let results = ClassificationHarness::new(learner, CrossValidation::new(10, 1))
        .sweep(&dataset, &sweep())
        .unwrap();

    for result in &results {
        assert_eq!(result.confusion_matrix.total(), 80);
        assert!(result.accuracy.is_finite());
    }
    assert_recall_never_drops(&results, "naive bayes");
}

#[test]
fn test_cost_matrix_size_must_match_classes() {
    let dataset = selected_dataset(20);
    let cost = CostMatrix::parse("[0 1 1; 1 0 1; 1 1 0]").unwrap();

    let err = ClassificationHarness::default()
        .evaluate(&dataset, &cost)
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_COST_MATRIX");
}

#[test]
fn test_more_folds_than_records() {
    let dataset = selected_dataset(6);
    let err = evaluate(
        &dataset,
        &LearnerConfig::new(LearnerKind::DecisionTree),
        &CostMatrix::uniform(2),
        &CrossValidation::new(10, 1),
    )
    .unwrap_err();
    assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
}

#[test]
fn test_json_report_round_trips_results() {
    let dataset = selected_dataset(24);
    let harness = ClassificationHarness::new(
        LearnerConfig::new(LearnerKind::DecisionTree),
        CrossValidation::new(3, 5),
    );
    let results = harness.sweep(&dataset, &sweep()[..1]).unwrap();

    let json = report::render(&dataset.relation, &results, ReportFormat::Json).unwrap();
    let parsed: report::SweepReport = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.relation, "one-county-data");
    assert_eq!(parsed.results.len(), 1);
    assert_eq!(parsed.results[0].confusion_matrix, results[0].confusion_matrix);
    assert_eq!(parsed.results[0].cost_matrix, results[0].cost_matrix);
    assert!((parsed.results[0].accuracy - results[0].accuracy).abs() < 1e-12);
}
