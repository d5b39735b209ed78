//! Meta-learners wrapped around a base classifier: bootstrap aggregation and
//! cost-sensitive training/decision.

use crate::error::{AppError, Result};
use crate::ml::classifier::{
    argmax_rows, Classifier, DecisionTreeClassifierWrapper, LogisticRegressionClassifier,
    NaiveBayesClassifier, DEFAULT_TREE_DEPTH,
};
use crate::ml::cost::CostMatrix;
use crate::ml::models::{
    BaggingConfig, CostStrategy, LearnerConfig, LearnerKind, SvmConfig, TrainingData,
};
use crate::ml::svm::SvmClassifier;
use ndarray::Array2;
use rand::prelude::*;
use rand::rngs::StdRng;
use tracing::debug;

/// Instantiate an untrained base learner
pub fn base_learner(kind: LearnerKind, n_classes: usize, svm: &SvmConfig) -> Box<dyn Classifier> {
    match kind {
        LearnerKind::Svm => Box::new(SvmClassifier::new(n_classes, svm.clone())),
        LearnerKind::LogisticRegression => Box::new(LogisticRegressionClassifier::new(n_classes)),
        LearnerKind::DecisionTree => {
            Box::new(DecisionTreeClassifierWrapper::new(n_classes, DEFAULT_TREE_DEPTH))
        }
        LearnerKind::NaiveBayes => Box::new(NaiveBayesClassifier::new(n_classes)),
    }
}

/// Build the full learner chain: base learner, optional bagging, cost-sensitive wrapper
pub fn build_classifier(
    config: &LearnerConfig,
    n_classes: usize,
    cost: &CostMatrix,
    seed: u64,
) -> Box<dyn Classifier> {
    let inner: Box<dyn Classifier> = match &config.bagging {
        Some(bagging) => Box::new(BaggingClassifier::new(
            config.kind,
            config.svm.clone(),
            n_classes,
            bagging.clone(),
            seed,
        )),
        None => base_learner(config.kind, n_classes, &config.svm),
    };

    Box::new(CostSensitiveClassifier::new(
        inner,
        cost.clone(),
        config.cost_strategy,
    ))
}

/// Bootstrap-aggregated ensemble of identical base learners
pub struct BaggingClassifier {
    kind: LearnerKind,
    svm: SvmConfig,
    n_classes: usize,
    config: BaggingConfig,
    seed: u64,
    members: Vec<Box<dyn Classifier>>,
}

impl BaggingClassifier {
    pub fn new(
        kind: LearnerKind,
        svm: SvmConfig,
        n_classes: usize,
        config: BaggingConfig,
        seed: u64,
    ) -> Self {
        Self {
            kind,
            svm,
            n_classes,
            config,
            seed,
            members: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.config.size
    }

    /// Bootstrap sample size for a training set of `n_samples`
    fn bag_size(&self, n_samples: usize) -> usize {
        let size = (n_samples as f64 * self.config.bag_size_percent as f64 / 100.0).round();
        (size as usize).max(1)
    }
}

impl Classifier for BaggingClassifier {
    fn train(&mut self, data: &TrainingData) -> Result<()> {
        if data.n_samples == 0 {
            return Err(AppError::InsufficientData(
                "cannot bag an empty training set".to_string(),
            ));
        }
        if self.config.size == 0 {
            return Err(AppError::Validation(
                "bagging size must be at least 1".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let bag_size = self.bag_size(data.n_samples);
        let mut members = Vec::with_capacity(self.config.size);

        for member in 0..self.config.size {
            let indices: Vec<usize> = (0..bag_size)
                .map(|_| rng.gen_range(0..data.n_samples))
                .collect();
            let sample = data.subset(&indices);

            let mut learner = base_learner(self.kind, self.n_classes, &self.svm);
            learner.train(&sample)?;
            debug!(member = member, samples = bag_size, "Bagging member trained");
            members.push(learner);
        }

        self.members = members;
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(features)?;
        Ok(argmax_rows(&proba))
    }

    /// Fraction of member votes per class
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        if self.members.is_empty() {
            return Err(AppError::Learner("Bagging ensemble not trained".to_string()));
        }

        let share = 1.0 / self.members.len() as f64;
        let mut proba = Array2::zeros((features.nrows(), self.n_classes));
        for member in &self.members {
            for (i, class) in member.predict(features)?.into_iter().enumerate() {
                if class < self.n_classes {
                    proba[[i, class]] += share;
                }
            }
        }
        Ok(proba)
    }

    fn name(&self) -> String {
        match self.members.first() {
            Some(member) => format!("Bagging({} x {})", self.config.size, member.name()),
            None => format!("Bagging({} x {})", self.config.size, self.kind.label()),
        }
    }

    fn is_trained(&self) -> bool {
        !self.members.is_empty()
    }
}

/// Makes an inner classifier sensitive to a misclassification-cost matrix.
///
/// Both strategies act on the inner classifier's class probabilities. The
/// inner model is trained the same way whatever the costs, so raising the
/// cost of missing a class only ever moves predictions toward that class.
pub struct CostSensitiveClassifier {
    inner: Box<dyn Classifier>,
    cost: CostMatrix,
    strategy: CostStrategy,
    trained: bool,
}

impl CostSensitiveClassifier {
    pub fn new(inner: Box<dyn Classifier>, cost: CostMatrix, strategy: CostStrategy) -> Self {
        Self {
            inner,
            cost,
            strategy,
            trained: false,
        }
    }

    pub fn cost_matrix(&self) -> &CostMatrix {
        &self.cost
    }

    /// Rescale class probabilities by the per-class cost weights.
    ///
    /// Weighting every training instance of class `i` by `w_i` shifts the
    /// class prior by the same factor, which is what this applies to the
    /// posterior.
    fn reweight(&self, proba: &Array2<f64>) -> Array2<f64> {
        let weights = self.cost.class_weights();
        let mut shifted = proba.clone();
        for mut row in shifted.rows_mut() {
            for (p, w) in row.iter_mut().zip(&weights) {
                *p *= w;
            }
            let total = row.sum();
            if total > 0.0 {
                row.mapv_inplace(|p| p / total);
            }
        }
        shifted
    }
}

impl Classifier for CostSensitiveClassifier {
    fn train(&mut self, data: &TrainingData) -> Result<()> {
        if self.cost.size() != data.n_classes() {
            return Err(AppError::InvalidCostMatrix(format!(
                "cost matrix is {0}x{0} but the label has {1} classes",
                self.cost.size(),
                data.n_classes()
            )));
        }

        self.inner.train(data)?;
        debug!(
            strategy = %self.strategy,
            class_weights = ?self.cost.class_weights(),
            "Cost-sensitive learner trained"
        );

        self.trained = true;
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        let proba = self.inner.predict_proba(features)?;
        match self.strategy {
            CostStrategy::Reweight => Ok(argmax_rows(&self.reweight(&proba))),
            CostStrategy::MinimizeExpectedCost => Ok(proba
                .rows()
                .into_iter()
                .map(|row| self.cost.min_expected_cost_class(&row.to_vec()))
                .collect()),
        }
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        let proba = self.inner.predict_proba(features)?;
        match self.strategy {
            CostStrategy::Reweight => Ok(self.reweight(&proba)),
            CostStrategy::MinimizeExpectedCost => Ok(proba),
        }
    }

    fn name(&self) -> String {
        format!("CostSensitive({}, {})", self.strategy, self.inner.name())
    }

    fn is_trained(&self) -> bool {
        self.trained && self.inner.is_trained()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::classifier::tests::separable_data;

    /// Class 1 is a minority that overlaps class 0 on every feature
    fn overlapping_data() -> TrainingData {
        let n = 40;
        let mut features = Array2::zeros((n, 1));
        let mut labels = Vec::with_capacity(n);
        for i in 0..n {
            features[[i, 0]] = (i % 4) as f64;
            labels.push(usize::from(i % 5 == 0));
        }
        TrainingData {
            features,
            labels,
            class_names: vec!["Correct".to_string(), "Incorrect".to_string()],
            n_samples: n,
            n_features: 1,
        }
    }

    fn recall(predictions: &[usize], labels: &[usize], class: usize) -> f64 {
        let actual = labels.iter().filter(|&&l| l == class).count();
        let hit = predictions
            .iter()
            .zip(labels)
            .filter(|(p, l)| **p == class && **l == class)
            .count();
        hit as f64 / actual as f64
    }

    #[test]
    fn test_bagging_probabilities_are_vote_fractions() {
        let data = separable_data(40);
        let mut bagging = BaggingClassifier::new(
            LearnerKind::DecisionTree,
            SvmConfig::default(),
            2,
            BaggingConfig {
                size: 5,
                bag_size_percent: 100,
            },
            7,
        );

        bagging.train(&data).unwrap();
        assert!(bagging.is_trained());

        let proba = bagging.predict_proba(&data.features).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
            for &p in row.iter() {
                let votes = p * 5.0;
                assert!((votes - votes.round()).abs() < 1e-9);
            }
        }
        assert_eq!(bagging.predict(&data.features).unwrap(), data.labels);
    }

    #[test]
    fn test_bagging_is_deterministic_for_a_seed() {
        let data = overlapping_data();
        let run = || {
            let mut bagging = BaggingClassifier::new(
                LearnerKind::DecisionTree,
                SvmConfig::default(),
                2,
                BaggingConfig {
                    size: 4,
                    bag_size_percent: 50,
                },
                11,
            );
            bagging.train(&data).unwrap();
            bagging.predict_proba(&data.features).unwrap()
        };
        assert_eq!(run(), run());
    }

    fn recalls_for(config: &LearnerConfig, data: &TrainingData, literals: &[&str]) -> Vec<f64> {
        literals
            .iter()
            .map(|literal| {
                let cost = CostMatrix::parse(literal).unwrap();
                let mut classifier = build_classifier(config, 2, &cost, 5);
                classifier.train(data).unwrap();
                let predictions = classifier.predict(&data.features).unwrap();
                recall(&predictions, &data.labels, 1)
            })
            .collect()
    }

    const SWEEP: [&str; 5] = ["[0 1; 1 0]", "[0 1; 2 0]", "[0 1; 3 0]", "[0 1; 4.2 0]", "[0 1; 50 0]"];

    #[test]
    fn test_reweighting_shifts_probability_toward_costly_class() {
        let data = overlapping_data();
        let mut plain = CostSensitiveClassifier::new(
            base_learner(LearnerKind::NaiveBayes, 2, &SvmConfig::default()),
            CostMatrix::uniform(2),
            CostStrategy::Reweight,
        );
        let mut costly = CostSensitiveClassifier::new(
            base_learner(LearnerKind::NaiveBayes, 2, &SvmConfig::default()),
            CostMatrix::parse("[0 1; 10 0]").unwrap(),
            CostStrategy::Reweight,
        );
        plain.train(&data).unwrap();
        costly.train(&data).unwrap();

        let before = plain.predict_proba(&data.features).unwrap();
        let after = costly.predict_proba(&data.features).unwrap();
        for (b, a) in before.rows().into_iter().zip(after.rows()) {
            assert!((a.sum() - 1.0).abs() < 1e-9);
            assert!(a[1] >= b[1], "class 1 probability fell from {} to {}", b[1], a[1]);
        }
    }

    #[test]
    fn test_reweight_recall_is_monotone_for_every_learner() {
        let data = overlapping_data();
        let bagged_tree = LearnerConfig::new(LearnerKind::DecisionTree).with_bagging(BaggingConfig {
            size: 5,
            bag_size_percent: 100,
        });
        let configs = [
            LearnerConfig::default(),
            LearnerConfig::new(LearnerKind::LogisticRegression),
            LearnerConfig::new(LearnerKind::NaiveBayes),
            LearnerConfig::new(LearnerKind::DecisionTree),
            bagged_tree,
        ];

        for config in &configs {
            let recalls = recalls_for(config, &data, &SWEEP);
            for pair in recalls.windows(2) {
                assert!(
                    pair[1] >= pair[0],
                    "{}: recall decreased {recalls:?}",
                    config.describe()
                );
            }
        }
    }

    #[test]
    fn test_reweight_changes_decisions_of_probabilistic_learner() {
        // Naive Bayes puts class 1 near its 0.2 prior everywhere
        let data = overlapping_data();
        let recalls = recalls_for(&LearnerConfig::new(LearnerKind::NaiveBayes), &data, &SWEEP);
        assert_eq!(recalls.first(), Some(&0.0));
        assert_eq!(recalls.last(), Some(&1.0));
    }

    #[test]
    fn test_expected_cost_without_bagging_uses_probabilities() {
        let data = overlapping_data();
        let config = LearnerConfig::new(LearnerKind::NaiveBayes)
            .with_cost_strategy(CostStrategy::MinimizeExpectedCost);

        let recalls = recalls_for(&config, &data, &["[0 1; 1 0]", "[0 1; 50 0]"]);
        assert!(recalls[1] > recalls[0], "costs had no effect: {recalls:?}");
    }

    #[test]
    fn test_cost_matrix_must_match_class_count() {
        let data = separable_data(10);
        let cost = CostMatrix::parse("[0 1 1; 1 0 1; 1 1 0]").unwrap();
        let mut classifier = build_classifier(&LearnerConfig::default(), 2, &cost, 1);
        let err = classifier.train(&data).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_COST_MATRIX");
    }

    #[test]
    fn test_chain_name() {
        let data = separable_data(20);
        let config = LearnerConfig::new(LearnerKind::NaiveBayes).with_bagging(BaggingConfig {
            size: 2,
            bag_size_percent: 100,
        });
        let mut classifier = build_classifier(&config, 2, &CostMatrix::uniform(2), 1);
        classifier.train(&data).unwrap();
        assert_eq!(
            classifier.name(),
            "CostSensitive(reweight, Bagging(2 x Naive Bayes))"
        );
    }
}
