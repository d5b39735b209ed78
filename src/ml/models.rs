use crate::dataset::Dataset;
use crate::error::{AppError, Result};
use crate::ml::cost::CostMatrix;
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

/// Base learning algorithm
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LearnerKind {
    /// Kernel support vector machine
    #[default]
    Svm,

    /// Logistic regression
    LogisticRegression,

    /// CART decision tree
    DecisionTree,

    /// Gaussian naive Bayes
    NaiveBayes,
}

impl LearnerKind {
    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            LearnerKind::Svm => "Support Vector Machine",
            LearnerKind::LogisticRegression => "Logistic Regression",
            LearnerKind::DecisionTree => "Decision Tree",
            LearnerKind::NaiveBayes => "Naive Bayes",
        }
    }

    /// Whether the learner outputs graded class probabilities rather than
    /// hard labels
    pub fn estimates_probabilities(&self) -> bool {
        !matches!(self, LearnerKind::DecisionTree)
    }
}

/// SVM kernel family
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SvmKernel {
    #[default]
    Gaussian,
    Linear,
    Polynomial,
}

/// SVM hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SvmConfig {
    /// Kernel family
    #[serde(default)]
    pub kernel: SvmKernel,

    /// Soft-margin penalty, applied to both classes
    #[serde(default = "default_c")]
    #[validate(range(exclusive_min = 0.0))]
    pub c: f64,

    /// Gaussian kernel width; defaults to the number of input features
    #[serde(default)]
    pub width: Option<f64>,

    /// Polynomial kernel degree
    #[serde(default = "default_degree")]
    #[validate(range(min = 1))]
    pub degree: u32,
}

impl Default for SvmConfig {
    fn default() -> Self {
        Self {
            kernel: SvmKernel::Gaussian,
            c: default_c(),
            width: None,
            degree: default_degree(),
        }
    }
}

/// Bootstrap-aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BaggingConfig {
    /// Number of ensemble members
    #[serde(default = "default_bagging_size")]
    #[validate(range(min = 1))]
    pub size: usize,

    /// Bootstrap sample size as a percentage of the training fold
    #[serde(default = "default_bag_size_percent")]
    #[validate(range(min = 1, max = 100))]
    pub bag_size_percent: u32,
}

impl Default for BaggingConfig {
    fn default() -> Self {
        Self {
            size: default_bagging_size(),
            bag_size_percent: default_bag_size_percent(),
        }
    }
}

/// How the cost matrix influences the classifier
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CostStrategy {
    /// Scale class probabilities by per-class misclassification cost
    #[default]
    Reweight,

    /// Predict the class with the lowest expected cost
    MinimizeExpectedCost,
}

/// Learner → optional bagging → cost-sensitive wrapper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    pub kind: LearnerKind,

    #[serde(default)]
    pub svm: SvmConfig,

    #[serde(default)]
    pub bagging: Option<BaggingConfig>,

    #[serde(default)]
    pub cost_strategy: CostStrategy,
}

impl LearnerConfig {
    pub fn new(kind: LearnerKind) -> Self {
        Self {
            kind,
            svm: SvmConfig::default(),
            bagging: None,
            cost_strategy: CostStrategy::default(),
        }
    }

    pub fn with_bagging(mut self, bagging: BaggingConfig) -> Self {
        self.bagging = Some(bagging);
        self
    }

    pub fn with_cost_strategy(mut self, strategy: CostStrategy) -> Self {
        self.cost_strategy = strategy;
        self
    }

    pub fn with_svm(mut self, svm: SvmConfig) -> Self {
        self.svm = svm;
        self
    }

    /// Short description, e.g. `Bagging(10 x Support Vector Machine)`
    /// Costs only act on graded probabilities: a hard-label learner needs
    /// bagging for its vote fractions
    pub fn is_cost_sensitive(&self) -> bool {
        self.bagging.is_some() || self.kind.estimates_probabilities()
    }

    pub fn describe(&self) -> String {
        match &self.bagging {
            Some(bagging) => format!("Bagging({} x {})", bagging.size, self.kind.label()),
            None => self.kind.label().to_string(),
        }
    }
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self::new(LearnerKind::default())
    }
}

/// Input matrix and label vector extracted from a [`Dataset`]
#[derive(Debug, Clone)]
pub struct TrainingData {
    /// Feature matrix (n_samples × n_features), label column excluded
    pub features: Array2<f64>,

    /// Class index per sample
    pub labels: Vec<usize>,

    /// Label value names, indexed by class
    pub class_names: Vec<String>,

    /// Number of samples
    pub n_samples: usize,

    /// Number of input features
    pub n_features: usize,
}

impl TrainingData {
    /// Split a dataset into inputs and the trailing label column
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        let label = dataset
            .label()
            .ok_or_else(|| AppError::Validation("dataset has no features".to_string()))?;
        if !label.is_categorical() {
            return Err(AppError::Validation(format!(
                "label feature {} is not categorical",
                label.name
            )));
        }

        let class_names = label.values().to_vec();
        let n_samples = dataset.len();
        let n_features = dataset.num_features() - 1;

        let mut features = Array2::zeros((n_samples, n_features));
        let mut labels = Vec::with_capacity(n_samples);

        for (i, record) in dataset.records().iter().enumerate() {
            for (j, &value) in record.values[..n_features].iter().enumerate() {
                features[[i, j]] = value;
            }

            let class = record.values[n_features];
            if class < 0.0 || class as usize >= class_names.len() {
                return Err(AppError::Validation(format!(
                    "record {} has label index {} outside {} classes",
                    i,
                    class,
                    class_names.len()
                )));
            }
            labels.push(class as usize);
        }

        Ok(Self {
            features,
            labels,
            class_names,
            n_samples,
            n_features,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Rows at `indices` (repeats allowed, as in bootstrap samples)
    pub fn subset(&self, indices: &[usize]) -> TrainingData {
        TrainingData {
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            class_names: self.class_names.clone(),
            n_samples: indices.len(),
            n_features: self.n_features,
        }
    }

    /// Number of samples per class
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

/// Row-major confusion matrix: rows are true classes, columns predicted classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: Vec<Vec<u64>>,
}

impl ConfusionMatrix {
    pub fn new(n_classes: usize) -> Self {
        Self {
            counts: vec![vec![0; n_classes]; n_classes],
        }
    }

    /// Count one prediction
    pub fn record(&mut self, actual: usize, predicted: usize) {
        self.counts[actual][predicted] += 1;
    }

    pub fn get(&self, actual: usize, predicted: usize) -> u64 {
        self.counts[actual][predicted]
    }

    pub fn n_classes(&self) -> usize {
        self.counts.len()
    }

    pub fn rows(&self) -> &[Vec<u64>] {
        &self.counts
    }

    /// Total number of counted predictions
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Samples whose true class is `class`
    pub fn support(&self, class: usize) -> u64 {
        self.counts[class].iter().sum()
    }

    /// `TP / (TP + FP)`, 0 when nothing was predicted as `class`
    pub fn precision(&self, class: usize) -> f64 {
        let predicted: u64 = self.counts.iter().map(|row| row[class]).sum();
        if predicted == 0 {
            0.0
        } else {
            self.get(class, class) as f64 / predicted as f64
        }
    }

    /// `TP / (TP + FN)`, 0 when `class` never occurs
    pub fn recall(&self, class: usize) -> f64 {
        let actual = self.support(class);
        if actual == 0 {
            0.0
        } else {
            self.get(class, class) as f64 / actual as f64
        }
    }

    /// Harmonic mean of precision and recall
    pub fn f_measure(&self, class: usize) -> f64 {
        let precision = self.precision(class);
        let recall = self.recall(class);
        if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        }
    }

    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.n_classes()).map(|c| self.get(c, c)).sum();
        correct as f64 / total as f64
    }
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub class_index: usize,
    pub class_name: String,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    pub support: u64,
}

/// Cross-validated evaluation of one learner under one cost matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// Learner description
    pub learner: String,

    /// Cost matrix the run used
    pub cost_matrix: CostMatrix,

    /// Number of folds
    pub folds: usize,

    /// Partitioning seed
    pub seed: u64,

    /// Metrics per class, indexed by class
    pub per_class: Vec<ClassMetrics>,

    /// Predictions aggregated over all folds
    pub confusion_matrix: ConfusionMatrix,

    /// Fraction of correct predictions
    pub accuracy: f64,

    /// Sum of costs over every prediction
    pub total_cost: f64,
}

impl EvaluationResult {
    /// Derive all metrics from aggregated counts
    pub fn from_confusion(
        learner: String,
        cost_matrix: CostMatrix,
        folds: usize,
        seed: u64,
        class_names: &[String],
        confusion_matrix: ConfusionMatrix,
    ) -> Self {
        let per_class = (0..confusion_matrix.n_classes())
            .map(|class| ClassMetrics {
                class_index: class,
                class_name: class_names
                    .get(class)
                    .cloned()
                    .unwrap_or_else(|| format!("class_{}", class)),
                precision: confusion_matrix.precision(class),
                recall: confusion_matrix.recall(class),
                f_measure: confusion_matrix.f_measure(class),
                support: confusion_matrix.support(class),
            })
            .collect();

        let mut total_cost = 0.0;
        for (actual, row) in confusion_matrix.rows().iter().enumerate() {
            for (predicted, &count) in row.iter().enumerate() {
                total_cost += count as f64 * cost_matrix.get(actual, predicted);
            }
        }

        Self {
            learner,
            accuracy: confusion_matrix.accuracy(),
            cost_matrix,
            folds,
            seed,
            per_class,
            confusion_matrix,
            total_cost,
        }
    }

    pub fn precision(&self, class: usize) -> f64 {
        self.per_class[class].precision
    }

    pub fn recall(&self, class: usize) -> f64 {
        self.per_class[class].recall
    }

    pub fn f_measure(&self, class: usize) -> f64 {
        self.per_class[class].f_measure
    }
}

fn default_c() -> f64 {
    1.0
}

fn default_degree() -> u32 {
    3
}

fn default_bagging_size() -> usize {
    10
}

fn default_bag_size_percent() -> u32 {
    100
}
