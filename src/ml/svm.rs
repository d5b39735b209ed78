//! Kernel support vector machine backed by `linfa-svm`.
//!
//! The SVM solver is binary: class 1 maps to the positive side. Class
//! probabilities are the logistic of the decision value, so a sample on the
//! separating surface scores 0.5.

use crate::error::{AppError, Result};
use crate::ml::classifier::{argmax_rows, not_trained, one_hot, sigmoid, Classifier, Fitted};
use crate::ml::models::{SvmConfig, SvmKernel, TrainingData};
use linfa::prelude::{Dataset, Fit};
use linfa_svm::Svm;
use ndarray::{Array1, Array2};
use tracing::debug;

/// Support Vector Machine Classifier
pub struct SvmClassifier {
    config: SvmConfig,
    model: Option<Fitted<Svm<f64, bool>>>,
    n_classes: usize,
}

impl SvmClassifier {
    pub fn new(n_classes: usize, config: SvmConfig) -> Self {
        Self {
            config,
            model: None,
            n_classes,
        }
    }

    pub fn config(&self) -> &SvmConfig {
        &self.config
    }

    fn fit(&self, data: &TrainingData) -> Result<Svm<f64, bool>> {
        let targets: Array1<bool> = data.labels.iter().map(|&label| label == 1).collect();
        let dataset = Dataset::new(data.features.clone(), targets);

        let c = self.config.c;
        let params = Svm::<f64, bool>::params().pos_neg_weights(c, c);
        let params = match self.config.kernel {
            SvmKernel::Gaussian => {
                let width = self
                    .config
                    .width
                    .unwrap_or_else(|| data.n_features.max(1) as f64);
                params.gaussian_kernel(width)
            }
            SvmKernel::Linear => params.linear_kernel(),
            SvmKernel::Polynomial => params.polynomial_kernel(1.0, self.config.degree as f64),
        };

        debug!(
            kernel = %self.config.kernel,
            c = c,
            samples = data.n_samples,
            "Training SVM"
        );

        params
            .fit(&dataset)
            .map_err(|e| AppError::Learner(format!("Failed to train SVM: {}", e)))
    }
}

impl Classifier for SvmClassifier {
    fn train(&mut self, data: &TrainingData) -> Result<()> {
        if data.n_classes() != 2 {
            return Err(AppError::Learner(format!(
                "SVM supports exactly 2 classes, got {}",
                data.n_classes()
            )));
        }

        if let Some(constant) = Fitted::constant_for(data) {
            self.model = Some(constant);
            return Ok(());
        }

        let model = self.fit(data)?;
        self.model = Some(Fitted::Model(model));
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>> {
        Ok(argmax_rows(&self.predict_proba(features)?))
    }

    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        match self.model.as_ref().ok_or_else(|| not_trained("SVM"))? {
            Fitted::Constant(class) => Ok(one_hot(&vec![*class; features.nrows()], self.n_classes)),
            Fitted::Model(model) => {
                let mut proba = Array2::zeros((features.nrows(), self.n_classes));
                for (i, sample) in features.rows().into_iter().enumerate() {
                    let positive = sigmoid(model.weighted_sum(&sample) - model.rho);
                    proba[[i, 0]] = 1.0 - positive;
                    proba[[i, 1]] = positive;
                }
                Ok(proba)
            }
        }
    }

    fn name(&self) -> String {
        "Support Vector Machine".to_string()
    }

    fn is_trained(&self) -> bool {
        self.model.is_some()
    }
}
