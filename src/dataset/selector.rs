use crate::dataset::models::{Dataset, Record};
use crate::error::{AppError, Result};
use tracing::info;

/// Narrows a dataset to a named subset of its features.
///
/// Retained features keep their relative order and the label (the source
/// dataset's last feature) stays last. Values are projected, never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSelector {
    features: Vec<String>,
}

impl FeatureSelector {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
        }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Produce a new dataset holding only the retained features
    pub fn apply(&self, dataset: &Dataset) -> Result<Dataset> {
        let label_index = dataset.label_index().ok_or_else(|| {
            AppError::Validation("cannot select features from an empty schema".to_string())
        })?;

        for name in &self.features {
            if dataset.feature_index(name).is_none() {
                return Err(AppError::UnknownFeature(name.clone()));
            }
        }

        let label_name = &dataset.schema()[label_index].name;
        if !self.features.iter().any(|f| f == label_name) {
            return Err(AppError::Validation(format!(
                "label feature {} must be retained",
                label_name
            )));
        }

        let mut keep: Vec<usize> = dataset
            .schema()
            .iter()
            .enumerate()
            .filter(|(i, f)| *i != label_index && self.features.contains(&f.name))
            .map(|(i, _)| i)
            .collect();
        keep.push(label_index);

        let schema = keep.iter().map(|&i| dataset.schema()[i].clone()).collect();
        let records = dataset
            .records()
            .iter()
            .map(|record| Record {
                values: keep.iter().map(|&i| record.values[i]).collect(),
                weight: record.weight,
            })
            .collect();

        info!(
            retained = keep.len(),
            dropped = dataset.num_features() - keep.len(),
            "Features selected"
        );

        Ok(Dataset::from_parts(dataset.relation.clone(), schema, records))
    }
}

/// Convenience wrapper around [`FeatureSelector::apply`]
pub fn select<S: AsRef<str>>(dataset: &Dataset, features: &[S]) -> Result<Dataset> {
    FeatureSelector::new(features.iter().map(|f| f.as_ref().to_string())).apply(dataset)
}
