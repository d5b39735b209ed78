use crate::dataset::models::{Dataset, Record};
use crate::dataset::schema::{
    FeatureDescriptor, FeatureKind, FeatureSource, Schema, LABEL_CORRECT, LABEL_INCORRECT,
};
use crate::error::{AppError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Default relation name for built datasets
pub const DEFAULT_RELATION: &str = "one-county-data";

/// Builds a [`Dataset`] from a dispatch call CSV.
///
/// The builder holds only configuration; each build call returns a fresh
/// dataset.
#[derive(Debug, Clone)]
pub struct DatasetBuilder {
    schema: Schema,
    relation: String,
}

/// How to produce one feature value from a CSV row, with header positions resolved
enum Extractor {
    Categorical { column: usize, name: String },
    Numeric { column: usize, name: String },
    Agreement {
        truth: usize,
        dispatched: usize,
        correct: f64,
        incorrect: f64,
    },
}

impl DatasetBuilder {
    /// Create a builder for the given schema
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            relation: DEFAULT_RELATION.to_string(),
        }
    }

    pub fn with_relation(mut self, relation: impl Into<String>) -> Self {
        self.relation = relation.into();
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Build a dataset from a CSV file. The file is closed when this returns,
    /// on success and on error.
    pub fn build_from_path(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let path = path.as_ref();
        info!("Building dataset from {}", path.display());
        let file = File::open(path)?;
        self.build_from_reader(file)
    }

    /// Build a dataset from any CSV byte stream with a header row
    pub fn build_from_reader<R: Read>(&self, reader: R) -> Result<Dataset> {
        let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let extractors = self.resolve(&headers)?;

        let mut dataset = Dataset::new(
            self.relation.clone(),
            self.schema.features().to_vec(),
        );

        for row in csv_reader.records() {
            let row = row?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let values = self.extract(&extractors, &row, line)?;
            dataset.push(Record::new(values))?;
        }

        info!(
            records = dataset.len(),
            features = dataset.num_features(),
            "Dataset built"
        );

        Ok(dataset)
    }

    /// Map every schema feature to header positions; fails if a source column is absent
    fn resolve(&self, headers: &StringRecord) -> Result<Vec<Extractor>> {
        let position = |column: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| AppError::MissingColumn {
                    column: column.to_string(),
                })
        };

        self.schema
            .features()
            .iter()
            .map(|descriptor| match (&descriptor.source, &descriptor.kind) {
                (FeatureSource::Column(column), FeatureKind::Categorical { .. }) => {
                    Ok(Extractor::Categorical {
                        column: position(column)?,
                        name: descriptor.name.clone(),
                    })
                }
                (FeatureSource::Column(column), FeatureKind::Numeric) => Ok(Extractor::Numeric {
                    column: position(column)?,
                    name: descriptor.name.clone(),
                }),
                (FeatureSource::PriorityAgreement { truth, dispatched }, _) => {
                    Ok(Extractor::Agreement {
                        truth: position(truth)?,
                        dispatched: position(dispatched)?,
                        correct: label_index(descriptor, LABEL_CORRECT)?,
                        incorrect: label_index(descriptor, LABEL_INCORRECT)?,
                    })
                }
            })
            .collect()
    }

    fn extract(&self, extractors: &[Extractor], row: &StringRecord, line: u64) -> Result<Vec<f64>> {
        let mut values = Vec::with_capacity(extractors.len());

        for (descriptor, extractor) in self.schema.features().iter().zip(extractors) {
            let value = match extractor {
                Extractor::Categorical { column, name } => {
                    let raw = cell(row, *column);
                    descriptor
                        .index_of(raw)
                        .ok_or_else(|| AppError::UnknownCategory {
                            row: line,
                            feature: name.clone(),
                            value: raw.to_string(),
                        })? as f64
                }
                Extractor::Numeric { column, name } => {
                    let raw = cell(row, *column);
                    raw.trim()
                        .parse::<f64>()
                        .map_err(|_| AppError::MalformedNumber {
                            row: line,
                            feature: name.clone(),
                            column: column_name(descriptor),
                            value: raw.to_string(),
                        })?
                }
                Extractor::Agreement {
                    truth,
                    dispatched,
                    correct,
                    incorrect,
                } => {
                    if cell(row, *truth) == cell(row, *dispatched) {
                        *correct
                    } else {
                        *incorrect
                    }
                }
            };
            values.push(value);
        }

        debug!(line, "Row converted");
        Ok(values)
    }
}

impl Default for DatasetBuilder {
    fn default() -> Self {
        Self::new(Schema::full())
    }
}

fn cell(row: &StringRecord, column: usize) -> &str {
    row.get(column).unwrap_or("")
}

fn column_name(descriptor: &FeatureDescriptor) -> String {
    descriptor.source.columns().join(", ")
}

fn label_index(descriptor: &FeatureDescriptor, label: &str) -> Result<f64> {
    descriptor
        .index_of(label)
        .map(|i| i as f64)
        .ok_or_else(|| AppError::UnknownCategory {
            row: 0,
            feature: descriptor.name.clone(),
            value: label.to_string(),
        })
}
