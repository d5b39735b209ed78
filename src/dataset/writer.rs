//! Dataset persistence.
//!
//! ARFF is the default interchange format; JSON mirrors the in-memory model.

use crate::dataset::models::Dataset;
use crate::dataset::schema::FeatureKind;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use strum::{Display, EnumString};
use tracing::info;

/// On-disk dataset formats
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetFormat {
    #[default]
    Arff,
    Json,
}

/// Write a dataset to `path`
pub fn write(dataset: &Dataset, path: impl AsRef<Path>, format: DatasetFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        DatasetFormat::Arff => write_arff(dataset, &mut writer)?,
        DatasetFormat::Json => serde_json::to_writer_pretty(&mut writer, dataset)?,
    }
    writer.flush()?;

    info!(
        path = %path.display(),
        format = %format,
        records = dataset.len(),
        "Dataset written"
    );
    Ok(())
}

/// Serialize a dataset as ARFF
pub fn write_arff<W: Write>(dataset: &Dataset, writer: &mut W) -> Result<()> {
    writeln!(writer, "@relation {}", quote(&dataset.relation))?;
    writeln!(writer)?;

    for feature in dataset.schema() {
        match &feature.kind {
            FeatureKind::Categorical { values } => {
                let values: Vec<String> = values.iter().map(|v| quote(v)).collect();
                writeln!(
                    writer,
                    "@attribute {} {{{}}}",
                    quote(&feature.name),
                    values.join(",")
                )?;
            }
            FeatureKind::Numeric => {
                writeln!(writer, "@attribute {} numeric", quote(&feature.name))?;
            }
        }
    }

    writeln!(writer)?;
    writeln!(writer, "@data")?;

    for record in dataset.records() {
        let cells: Vec<String> = dataset
            .schema()
            .iter()
            .zip(&record.values)
            .map(|(feature, &value)| match &feature.kind {
                FeatureKind::Categorical { values } => values
                    .get(value as usize)
                    .map(|v| quote(v))
                    .unwrap_or_else(|| "?".to_string()),
                FeatureKind::Numeric => format_number(value),
            })
            .collect();
        writeln!(writer, "{}", cells.join(","))?;
    }

    Ok(())
}

/// Quote a name or nominal value when ARFF readers would otherwise split it
fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value == "?"
        || value
            .chars()
            .any(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | ',' | '\'' | '"' | '{' | '}' | '%'));

    if !needs_quotes {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out.push('\'');
    out
}

/// At most six fractional digits, trailing zeros trimmed
fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "?".to_string();
    }
    let fixed = format!("{:.6}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}
