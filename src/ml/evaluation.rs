//! K-fold cross-validation of a cost-sensitive learner chain.
//!
//! Predictions from every held-out fold are pooled into one confusion
//! matrix; precision, recall and F-measure are derived from the pooled
//! counts, never averaged per fold.

use crate::dataset::Dataset;
use crate::error::{AppError, Result};
use crate::ml::cost::CostMatrix;
use crate::ml::ensemble::build_classifier;
use crate::ml::models::{ConfusionMatrix, EvaluationResult, LearnerConfig, TrainingData};
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use validator::Validate;

/// Fold count and partitioning seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CrossValidation {
    #[validate(range(min = 2))]
    pub folds: usize,

    pub seed: u64,

    /// Spread each class evenly over the folds
    #[serde(default = "default_stratify")]
    pub stratify: bool,
}

impl CrossValidation {
    pub fn new(folds: usize, seed: u64) -> Self {
        Self {
            folds,
            seed,
            stratify: true,
        }
    }

    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    /// Partition `labels.len()` records into disjoint test folds.
    ///
    /// Every record lands in exactly one fold. The assignment depends only on
    /// the seed, the fold count and (when stratified) the labels.
    pub fn fold_assignments(&self, labels: &[usize]) -> Result<Vec<Vec<usize>>> {
        if self.folds < 2 {
            return Err(AppError::Validation(format!(
                "cross-validation needs at least 2 folds, got {}",
                self.folds
            )));
        }

        let n = labels.len();
        if n == 0 {
            return Err(AppError::InsufficientData(
                "dataset has no records".to_string(),
            ));
        }
        if self.folds > n {
            return Err(AppError::InsufficientData(format!(
                "{} folds requested for {} records",
                self.folds, n
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut rng);

        let mut folds = vec![Vec::new(); self.folds];
        if self.stratify {
            order.sort_by_key(|&i| labels[i]);
            for (position, index) in order.into_iter().enumerate() {
                folds[position % self.folds].push(index);
            }
        } else {
            let base = n / self.folds;
            let extra = n % self.folds;
            let mut start = 0;
            for (fold, members) in folds.iter_mut().enumerate() {
                let len = base + usize::from(fold < extra);
                members.extend_from_slice(&order[start..start + len]);
                start += len;
            }
        }

        Ok(folds)
    }

    /// Learner seed for each fold, derived from the run seed
    fn fold_seeds(&self) -> Vec<u64> {
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.folds as u64));
        (0..self.folds).map(|_| rng.gen()).collect()
    }
}

impl Default for CrossValidation {
    fn default() -> Self {
        Self::new(10, 1)
    }
}

/// Evaluates one learner chain under any number of cost matrices
#[derive(Debug, Clone, Default)]
pub struct ClassificationHarness {
    learner: LearnerConfig,
    cross_validation: CrossValidation,
}

impl ClassificationHarness {
    pub fn new(learner: LearnerConfig, cross_validation: CrossValidation) -> Self {
        Self {
            learner,
            cross_validation,
        }
    }

    pub fn learner(&self) -> &LearnerConfig {
        &self.learner
    }

    pub fn cross_validation(&self) -> &CrossValidation {
        &self.cross_validation
    }

    /// Cross-validate the learner chain under `cost`
    pub fn evaluate(&self, dataset: &Dataset, cost: &CostMatrix) -> Result<EvaluationResult> {
        let cv = &self.cross_validation;
        cv.validate()?;

        let data = TrainingData::from_dataset(dataset)?;
        if cost.size() != data.n_classes() {
            return Err(AppError::InvalidCostMatrix(format!(
                "cost matrix is {0}x{0} but {1} has {2} classes",
                cost.size(),
                dataset.label().map(|l| l.name.as_str()).unwrap_or("the label"),
                data.n_classes()
            )));
        }

        let folds = cv.fold_assignments(&data.labels)?;
        let seeds = cv.fold_seeds();

        if !self.learner.is_cost_sensitive() {
            warn!(
                learner = %self.learner.describe(),
                "Learner outputs hard labels only; costs change nothing without bagging"
            );
        }

        info!(
            relation = %dataset.relation,
            records = data.n_samples,
            features = data.n_features,
            folds = cv.folds,
            seed = cv.seed,
            learner = %self.learner.describe(),
            cost_matrix = %cost,
            "Starting cross-validation"
        );

        let mut confusion = ConfusionMatrix::new(data.n_classes());
        let mut in_test = vec![false; data.n_samples];

        for (fold, (test_indices, seed)) in folds.iter().zip(seeds).enumerate() {
            for &i in test_indices {
                in_test[i] = true;
            }
            let train_indices: Vec<usize> = (0..data.n_samples).filter(|&i| !in_test[i]).collect();
            for &i in test_indices {
                in_test[i] = false;
            }

            let train = data.subset(&train_indices);
            let counts = train.class_counts();
            if let Some(missing) = counts.iter().position(|&count| count == 0) {
                return Err(AppError::InsufficientData(format!(
                    "training set of fold {} has no examples of class {}",
                    fold + 1,
                    data.class_names[missing]
                )));
            }

            let test = data.subset(test_indices);
            let mut classifier = build_classifier(&self.learner, data.n_classes(), cost, seed);
            classifier.train(&train)?;
            let predictions = classifier.predict(&test.features)?;

            for (&actual, &predicted) in test.labels.iter().zip(&predictions) {
                confusion.record(actual, predicted);
            }

            debug!(
                fold = fold + 1,
                train = train.n_samples,
                test = test.n_samples,
                class_counts = ?counts,
                "Fold evaluated"
            );
        }

        let result = EvaluationResult::from_confusion(
            self.learner.describe(),
            cost.clone(),
            cv.folds,
            cv.seed,
            &data.class_names,
            confusion,
        );

        info!(
            cost_matrix = %cost,
            accuracy = result.accuracy,
            total_cost = result.total_cost,
            "Cross-validation complete"
        );
        Ok(result)
    }

    /// Evaluate each cost matrix in turn
    pub fn sweep(&self, dataset: &Dataset, costs: &[CostMatrix]) -> Result<Vec<EvaluationResult>> {
        if costs.is_empty() {
            return Err(AppError::Validation(
                "cost sweep needs at least one matrix".to_string(),
            ));
        }
        costs.iter().map(|cost| self.evaluate(dataset, cost)).collect()
    }
}

/// Cross-validate `learner` on `dataset` under `cost`
pub fn evaluate(
    dataset: &Dataset,
    learner: &LearnerConfig,
    cost: &CostMatrix,
    cross_validation: &CrossValidation,
) -> Result<EvaluationResult> {
    ClassificationHarness::new(learner.clone(), cross_validation.clone()).evaluate(dataset, cost)
}

fn default_stratify() -> bool {
    true
}
