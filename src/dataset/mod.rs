/// Dataset construction for dispatch call records
///
/// This module covers everything up to the in-memory labeled dataset:
/// - Feature registry and schema variants
/// - CSV ingestion with fail-fast validation
/// - Feature selection
/// - ARFF / JSON persistence

pub mod builder;
pub mod models;
pub mod schema;
pub mod selector;
pub mod writer;

pub use builder::{DatasetBuilder, DEFAULT_RELATION};
pub use models::{Dataset, Record};
pub use schema::{
    Feature, FeatureDescriptor, FeatureKind, FeatureSource, Schema, SchemaKind, LABEL_CORRECT,
    LABEL_INCORRECT,
};
pub use selector::{select, FeatureSelector};
pub use writer::{write, write_arff, DatasetFormat};
