use crate::dataset::schema::FeatureDescriptor;
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// One data row: a value per schema feature plus an instance weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Feature values in schema order; categorical values are value-set indices
    pub values: Vec<f64>,

    /// Instance weight (always 1.0 for records built from CSV)
    pub weight: f64,
}

impl Record {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            weight: 1.0,
        }
    }
}

/// Typed tabular dataset. The last feature is the label by convention.
///
/// Every record holds exactly one value per schema feature; deserialized
/// datasets are checked on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetFile")]
pub struct Dataset {
    /// Relation name written to dataset files
    pub relation: String,

    /// Feature descriptors in column order
    schema: Vec<FeatureDescriptor>,

    /// Records in insertion order
    records: Vec<Record>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new(relation: impl Into<String>, schema: Vec<FeatureDescriptor>) -> Self {
        Self {
            relation: relation.into(),
            schema,
            records: Vec::new(),
        }
    }

    /// Append a record; its width must match the schema
    pub fn push(&mut self, record: Record) -> Result<()> {
        if record.values.len() != self.schema.len() {
            return Err(AppError::Validation(format!(
                "record has {} values but the schema has {} features",
                record.values.len(),
                self.schema.len()
            )));
        }
        self.records.push(record);
        Ok(())
    }

    pub fn schema(&self) -> &[FeatureDescriptor] {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn num_features(&self) -> usize {
        self.schema.len()
    }

    /// Column position of a named feature
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.schema.iter().position(|f| f.name == name)
    }

    /// Column position of the label (the last feature)
    pub fn label_index(&self) -> Option<usize> {
        self.schema.len().checked_sub(1)
    }

    pub fn label(&self) -> Option<&FeatureDescriptor> {
        self.schema.last()
    }

    /// All values of one column, in record order
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.schema.len() {
            return None;
        }
        self.records.iter().map(|r| r.values.get(index).copied()).collect()
    }

    /// Human-readable value of a cell: the category label for categorical
    /// features, the number otherwise
    pub fn display_value(&self, record: usize, feature: usize) -> Option<String> {
        let value = *self.records.get(record)?.values.get(feature)?;
        let descriptor = self.schema.get(feature)?;
        if descriptor.is_categorical() {
            descriptor.values().get(value as usize).cloned()
        } else {
            Some(value.to_string())
        }
    }

    pub(crate) fn from_parts(
        relation: String,
        schema: Vec<FeatureDescriptor>,
        records: Vec<Record>,
    ) -> Self {
        Self {
            relation,
            schema,
            records,
        }
    }
}

/// Serialized form of a dataset, validated into [`Dataset`]
#[derive(Deserialize)]
struct DatasetFile {
    relation: String,
    schema: Vec<FeatureDescriptor>,
    records: Vec<Record>,
}

impl TryFrom<DatasetFile> for Dataset {
    type Error = AppError;

    fn try_from(file: DatasetFile) -> Result<Self> {
        let mut dataset = Dataset::new(file.relation, file.schema);
        for (i, record) in file.records.into_iter().enumerate() {
            dataset
                .push(record)
                .map_err(|e| AppError::Serialization(format!("record {}: {}", i, e)))?;
        }
        Ok(dataset)
    }
}
