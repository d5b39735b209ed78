use crate::error::{AppError, Result};
use crate::ml::models::TrainingData;
use ndarray::{Array2, Axis};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use smartcore::naive_bayes::gaussian::GaussianNB;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};
use tracing::debug;

/// Maximum depth used for decision trees
pub const DEFAULT_TREE_DEPTH: u16 = 10;

/// Share of the largest feature variance added to every Naive Bayes variance
pub const VAR_SMOOTHING: f64 = 1e-9;

/// Trait for classifiers
pub trait Classifier {
    /// Train the classifier
    fn train(&mut self, data: &TrainingData) -> Result<()>;

    /// Predict class indices
    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>>;

    /// Predict class probabilities (n_samples × n_classes)
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>>;

    /// Human-readable model name
    fn name(&self) -> String;

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

/// A trained model, or a constant predictor when the training set held one class
pub(crate) enum Fitted<M> {
    Model(M),
    Constant(usize),
}

impl<M> Fitted<M> {
    /// Resolve a single-class training set to a constant predictor
    pub(crate) fn constant_for(data: &TrainingData) -> Option<Self> {
        let first = *data.labels.first()?;
        if data.labels.iter().all(|&label| label == first) {
            debug!(class = first, "Single-class training set, using constant predictor");
            Some(Fitted::Constant(first))
        } else {
            None
        }
    }
}

pub(crate) fn not_trained(name: &str) -> AppError {
    AppError::Learner(format!("{} model not trained", name))
}

pub(crate) fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().copied().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}

fn labels_to_i32(labels: &[usize]) -> Vec<i32> {
    labels.iter().map(|&x| x as i32).collect()
}

/// Probability 1 for the predicted class, 0 elsewhere
pub(crate) fn one_hot(predictions: &[usize], n_classes: usize) -> Array2<f64> {
    let mut proba = Array2::zeros((predictions.len(), n_classes));
    for (i, &pred) in predictions.iter().enumerate() {
        if pred < n_classes {
            proba[[i, pred]] = 1.0;
        }
    }
    proba
}

/// Index of the largest probability in each row; ties go to the lower index
pub(crate) fn argmax_rows(proba: &Array2<f64>) -> Vec<usize> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = 0;
            for (j, &p) in row.iter().enumerate().skip(1) {
                if p > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Normalize each row of log scores into probabilities
fn softmax_rows(scores: &Array2<f64>) -> Array2<f64> {
    let mut proba = scores.clone();
    for mut row in proba.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let total = row.sum();
        row.mapv_inplace(|v| v / total);
    }
    proba
}

/// Place per-model-class columns at their label positions
fn scatter_columns(proba: &Array2<f64>, classes: &[usize], n_classes: usize) -> Array2<f64> {
    let mut out = Array2::zeros((proba.nrows(), n_classes));
    for (k, &class) in classes.iter().enumerate() {
        if class < n_classes {
            out.column_mut(class).assign(&proba.column(k));
        }
    }
    out
}

type LogisticModel = LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Logistic Regression Classifier
pub struct LogisticRegressionClassifier {
    model: Option<Fitted<LogisticModel>>,
    n_classes: usize,
}

impl LogisticRegressionClassifier {
    pub fn new(n_classes: usize) -> Self {
        Self {
            model: None,
            n_classes,
        }
    }

    /// Sigmoid of the linear score for two classes, softmax otherwise
    fn probabilities(&self, model: &LogisticModel, features: &Array2<f64>) -> Array2<f64> {
        let coefficients = model.coefficients();
        let intercept = model.intercept();
        let (n_scores, n_features) = coefficients.shape();

        let mut scores = Array2::zeros((features.nrows(), n_scores));
        for (i, x) in features.rows().into_iter().enumerate() {
            for k in 0..n_scores {
                let mut z = *intercept.get((k, 0));
                for j in 0..n_features.min(x.len()) {
                    z += *coefficients.get((k, j)) * x[j];
                }
                scores[[i, k]] = z;
            }
        }

        let proba = if n_scores == 1 {
            let mut binary = Array2::zeros((features.nrows(), 2));
            for (i, &z) in scores.column(0).iter().enumerate() {
                let positive = sigmoid(z);
                binary[[i, 0]] = 1.0 - positive;
                binary[[i, 1]] = positive;
            }
            binary
        } else {
            softmax_rows(&scores)
        };

        let classes: Vec<usize> = model.classes().iter().map(|&c| c as usize).collect();
        scatter_columns(&proba, &classes, self.n_classes)
    }
}

impl Classifier for LogisticRegressionClassifier {
    fn train(&mut self, data: &TrainingData) -> Result<()> {
        if let Some(constant) = Fitted::constant_for(data) {
            self.model = Some(constant);
            return Ok(());
        }

        let x = ndarray_to_densematrix(&data.features);
        let y = labels_to_i32(&data.labels);

        let params = LogisticRegressionParameters::default();
        let model = LogisticRegression::fit(&x, &y, params).map_err(|e| {
            AppError::Learner(format!("Failed to train logistic regression: {}", e))
        })?;

        self.model = Some(Fitted::Model(model));
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.predict_proba(features)?))
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        match self.model.as_ref().ok_or_else(|| not_trained("Logistic regression"))? {
            Fitted::Constant(class) => Ok(one_hot(&vec![*class; features.nrows()], self.n_classes)),
            Fitted::Model(model) => Ok(self.probabilities(model, features)),
        }
    }

    fn name(&self) -> String {
        "Logistic Regression".to_string()
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

/// Decision Tree Classifier
///
/// smartcore trees expose hard labels only, so `predict_proba` is one-hot.
pub struct DecisionTreeClassifierWrapper {
    model: Option<Fitted<DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>>>,
    n_classes: usize,
    max_depth: u16,
}

impl DecisionTreeClassifierWrapper {
    pub fn new(n_classes: usize, max_depth: u16) -> Self {
        Self {
            model: None,
            n_classes,
            max_depth,
        }
    }
}

impl Classifier for DecisionTreeClassifierWrapper {
    fn train(&mut self, data: &TrainingData) -> Result<()> {
        if let Some(constant) = Fitted::constant_for(data) {
            self.model = Some(constant);
            return Ok(());
        }

        let x = ndarray_to_densematrix(&data.features);
        let y = labels_to_i32(&data.labels);

        let params = DecisionTreeClassifierParameters::default()
            .with_max_depth(self.max_depth)
            .with_criterion(SplitCriterion::Gini);

        let model = DecisionTreeClassifier::fit(&x, &y, params)
            .map_err(|e| AppError::Learner(format!("Failed to train decision tree: {}", e)))?;

        self.model = Some(Fitted::Model(model));
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        match self.model.as_ref().ok_or_else(|| not_trained("Decision tree"))? {
            Fitted::Constant(class) => Ok(vec![*class; features.nrows()]),
            Fitted::Model(model) => {
                let x = ndarray_to_densematrix(features);
                let predictions = model
                    .predict(&x)
                    .map_err(|e| AppError::Learner(format!("Prediction failed: {}", e)))?;
                Ok(predictions.iter().map(|&p| p as usize).collect())
            }
        }
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        let predictions = self.predict(features)?;
        Ok(one_hot(&predictions, self.n_classes))
    }

    fn name(&self) -> String {
        format!("Decision Tree (max depth {})", self.max_depth)
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

/// Gaussian Naive Bayes fit plus the variance floor applied at prediction
pub(crate) struct GaussianModel {
    nb: GaussianNB<f64, usize, DenseMatrix<f64>, Vec<usize>>,
    smoothing: f64,
}

/// Naive Bayes Classifier
///
/// Posteriors are computed from the fitted means, variances and priors with
/// every variance raised by `VAR_SMOOTHING` times the largest feature
/// variance, so a feature that is constant within a class stays finite.
pub struct NaiveBayesClassifier {
    model: Option<Fitted<GaussianModel>>,
    n_classes: usize,
}

impl NaiveBayesClassifier {
    pub fn new(n_classes: usize) -> Self {
        Self {
            model: None,
            n_classes,
        }
    }

    fn probabilities(&self, model: &GaussianModel, features: &Array2<f64>) -> Result<Array2<f64>> {
        let nb = &model.nb;
        let priors = nb.class_priors();
        let means = nb.theta();
        let variances = nb.var();

        let mut scores = Array2::zeros((features.nrows(), priors.len()));
        for (i, x) in features.rows().into_iter().enumerate() {
            for (k, prior) in priors.iter().enumerate() {
                let mut log_joint = prior.ln();
                for (j, &value) in x.iter().enumerate() {
                    let variance = variances[k][j] + model.smoothing;
                    let diff = value - means[k][j];
                    log_joint -= diff * diff / (2.0 * variance)
                        + 0.5 * (2.0 * std::f64::consts::PI * variance).ln();
                }
                if !log_joint.is_finite() {
                    return Err(AppError::Learner(format!(
                        "Naive Bayes likelihood of row {} is not finite",
                        i
                    )));
                }
                scores[[i, k]] = log_joint;
            }
        }

        Ok(scatter_columns(&softmax_rows(&scores), nb.classes(), self.n_classes))
    }
}

impl Classifier for NaiveBayesClassifier {
    fn train(&mut self, data: &TrainingData) -> Result<()> {
        if let Some(constant) = Fitted::constant_for(data) {
            self.model = Some(constant);
            return Ok(());
        }

        let x = ndarray_to_densematrix(&data.features);
        let y = data.labels.clone();

        let nb = GaussianNB::fit(&x, &y, Default::default())
            .map_err(|e| AppError::Learner(format!("Failed to train Naive Bayes: {}", e)))?;

        let largest = data
            .features
            .var_axis(Axis(0), 0.0)
            .fold(0.0_f64, |acc, &v| acc.max(v));
        let smoothing = if largest > 0.0 {
            VAR_SMOOTHING * largest
        } else {
            VAR_SMOOTHING
        };

        self.model = Some(Fitted::Model(GaussianModel { nb, smoothing }));
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.predict_proba(features)?))
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        match self.model.as_ref().ok_or_else(|| not_trained("Naive Bayes"))? {
            Fitted::Constant(class) => Ok(one_hot(&vec![*class; features.nrows()], self.n_classes)),
            Fitted::Model(model) => self.probabilities(model, features),
        }
    }

    fn name(&self) -> String {
        "Naive Bayes".to_string()
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two well-separated clusters on the first feature
    pub(crate) fn separable_data(n_samples: usize) -> TrainingData {
        let mut features = Array2::zeros((n_samples, 2));
        let mut labels = Vec::with_capacity(n_samples);
        for i in 0..n_samples {
            let class = i % 2;
            let offset = if class == 0 { 0.0 } else { 10.0 };
            features[[i, 0]] = offset + (i % 5) as f64 * 0.1;
            features[[i, 1]] = (i % 3) as f64;
            labels.push(class);
        }
        TrainingData {
            features,
            labels,
            class_names: vec!["Correct".to_string(), "Incorrect".to_string()],
            n_samples,
            n_features: 2,
        }
    }

    #[test]
    fn test_logistic_regression_classifier() {
        let data = separable_data(60);
        let mut classifier = LogisticRegressionClassifier::new(2);

        assert!(!classifier.is_trained());
        classifier.train(&data).unwrap();
        assert!(classifier.is_trained());

        let predictions = classifier.predict(&data.features).unwrap();
        assert_eq!(predictions.len(), 60);
        assert!(predictions.iter().all(|&p| p < 2));
    }

    #[test]
    fn test_decision_tree_classifier() {
        let data = separable_data(40);
        let mut classifier = DecisionTreeClassifierWrapper::new(2, DEFAULT_TREE_DEPTH);

        classifier.train(&data).unwrap();

        let predictions = classifier.predict(&data.features).unwrap();
        assert_eq!(predictions, data.labels);
    }

    #[test]
    fn test_naive_bayes_classifier() {
        let data = separable_data(40);
        let mut classifier = NaiveBayesClassifier::new(2);

        classifier.train(&data).unwrap();

        let proba = classifier.predict_proba(&data.features).unwrap();
        assert_eq!(proba.shape(), &[40, 2]);
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-12);
        }
        assert_eq!(classifier.predict(&data.features).unwrap(), data.labels);
    }

    #[test]
    fn test_naive_bayes_with_constant_feature_in_one_class() {
        let mut data = separable_data(40);
        for (i, &label) in data.labels.iter().enumerate() {
            data.features[[i, 1]] = if label == 1 { 0.0 } else { (i % 3) as f64 };
        }
        let mut classifier = NaiveBayesClassifier::new(2);
        classifier.train(&data).unwrap();

        let mut shifted = data.features.clone();
        shifted[[0, 1]] = 2.0;
        let proba = classifier.predict_proba(&shifted).unwrap();
        assert!(proba.iter().all(|p| p.is_finite()));
        assert_eq!(classifier.predict(&shifted).unwrap().len(), 40);
    }

    #[test]
    fn test_naive_bayes_rejects_non_finite_input() {
        let data = separable_data(20);
        let mut classifier = NaiveBayesClassifier::new(2);
        classifier.train(&data).unwrap();

        let mut features = data.features.clone();
        features[[3, 0]] = f64::NAN;
        let err = classifier.predict(&features).unwrap_err();
        assert_eq!(err.error_code(), "LEARNER_ERROR");
    }

    #[test]
    fn test_logistic_regression_probabilities() {
        let data = separable_data(60);
        let mut classifier = LogisticRegressionClassifier::new(2);
        classifier.train(&data).unwrap();

        let proba = classifier.predict_proba(&data.features).unwrap();
        let predictions = classifier.predict(&data.features).unwrap();
        for (row, predicted) in proba.rows().into_iter().zip(predictions) {
            assert!((row.sum() - 1.0).abs() < 1e-12);
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
            assert_eq!(predicted, usize::from(row[1] > row[0]));
        }
    }

    #[test]
    fn test_single_class_training_set_predicts_constant() {
        let data = separable_data(10);
        let odd: Vec<usize> = (0..10).filter(|i| i % 2 == 1).collect();
        let only_incorrect = data.subset(&odd);

        let mut classifier = LogisticRegressionClassifier::new(2);
        classifier.train(&only_incorrect).unwrap();
        assert_eq!(classifier.predict(&data.features).unwrap(), vec![1; 10]);
    }

    #[test]
    fn test_predict_before_training_fails() {
        let classifier = DecisionTreeClassifierWrapper::new(2, 3);
        let err = classifier.predict(&Array2::zeros((1, 2))).unwrap_err();
        assert_eq!(err.error_code(), "LEARNER_ERROR");
    }

    #[test]
    fn test_softmax_rows_normalizes_log_scores() {
        let proba = softmax_rows(&ndarray::arr2(&[[0.0, 0.0], [-1000.0, -1001.0]]));
        assert_eq!(proba[[0, 0]], 0.5);
        assert!((proba[[1, 0]] - sigmoid(1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_argmax_rows_prefers_lower_index_on_tie() {
        let proba = ndarray::arr2(&[[0.5, 0.5], [0.2, 0.8], [0.9, 0.1]]);
        assert_eq!(argmax_rows(&proba), vec![0, 1, 0]);
    }
}
