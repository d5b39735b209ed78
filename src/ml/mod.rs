/// Cost-sensitive classification of dispatch datasets
///
/// This module provides:
/// - Base learners (SVM, logistic regression, decision tree, naive Bayes)
/// - Bagging and cost-sensitive meta-learners
/// - Cost matrix parsing
/// - K-fold cross-validation with pooled metrics

pub mod classifier;
pub mod cost;
pub mod ensemble;
pub mod evaluation;
pub mod models;
pub mod svm;

pub use classifier::{
    Classifier, DecisionTreeClassifierWrapper, LogisticRegressionClassifier, NaiveBayesClassifier,
};
pub use cost::CostMatrix;
pub use ensemble::{base_learner, build_classifier, BaggingClassifier, CostSensitiveClassifier};
pub use evaluation::{evaluate, ClassificationHarness, CrossValidation};
pub use models::{
    BaggingConfig, ClassMetrics, ConfusionMatrix, CostStrategy, EvaluationResult, LearnerConfig,
    LearnerKind, SvmConfig, SvmKernel, TrainingData,
};
pub use svm::SvmClassifier;
