//! Evaluation report formatting.

use crate::error::Result;
use crate::ml::EvaluationResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Report output formats
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// A cost sweep as written in JSON reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepReport {
    pub generated_at: DateTime<Utc>,
    pub relation: String,
    pub results: Vec<EvaluationResult>,
}

impl SweepReport {
    pub fn new(relation: impl Into<String>, results: Vec<EvaluationResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            relation: relation.into(),
            results,
        }
    }
}

/// Per-class metric lines followed by the confusion matrix rows
pub fn format_result(result: &EvaluationResult) -> String {
    let mut out = String::new();
    for metrics in &result.per_class {
        out.push_str(&format!(
            "Class: {}; Precision: {:?}; Recall: {:?}; F-measure: {:?}\n",
            metrics.class_index, metrics.precision, metrics.recall, metrics.f_measure
        ));
    }
    for row in result.confusion_matrix.rows() {
        let cells: Vec<String> = row.iter().map(u64::to_string).collect();
        out.push_str(&cells.join(", "));
        out.push('\n');
    }
    out
}

/// Every result prefixed by the cost matrix it was run with
pub fn format_sweep(results: &[EvaluationResult]) -> String {
    let blocks: Vec<String> = results
        .iter()
        .map(|result| format!("Cost matrix: {}\n{}", result.cost_matrix, format_result(result)))
        .collect();
    blocks.join("\n")
}

/// Render a sweep in the requested format
pub fn render(relation: &str, results: &[EvaluationResult], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(format_sweep(results)),
        ReportFormat::Json => {
            let report = SweepReport::new(relation, results.to_vec());
            let mut json = serde_json::to_string_pretty(&report)?;
            json.push('\n');
            Ok(json)
        }
    }
}
