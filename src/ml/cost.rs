use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Square misclassification-cost matrix.
///
/// Entry `(i, j)` is the cost of predicting class `j` when the true class is `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostMatrix {
    rows: Vec<Vec<f64>>,
}

impl CostMatrix {
    /// Build from explicit rows
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let size = rows.len();
        if size == 0 {
            return Err(AppError::InvalidCostMatrix("matrix is empty".to_string()));
        }
        if let Some(row) = rows.iter().position(|r| r.len() != size) {
            return Err(AppError::InvalidCostMatrix(format!(
                "matrix is not square: row {} has {} entries, expected {}",
                row,
                rows[row].len(),
                size
            )));
        }
        if rows.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(AppError::InvalidCostMatrix(
                "costs must be finite and non-negative".to_string(),
            ));
        }
        let any_error_cost = rows
            .iter()
            .enumerate()
            .any(|(i, row)| row.iter().enumerate().any(|(j, v)| i != j && *v > 0.0));
        if !any_error_cost {
            return Err(AppError::InvalidCostMatrix(
                "off-diagonal costs are all zero".to_string(),
            ));
        }
        Ok(Self { rows })
    }

    /// Zero diagonal, unit cost for every error
    pub fn uniform(size: usize) -> Self {
        let rows = (0..size)
            .map(|i| (0..size).map(|j| if i == j { 0.0 } else { 1.0 }).collect())
            .collect();
        Self { rows }
    }

    /// Parse a matrix literal such as `[0 1; 2 0]`.
    ///
    /// Rows are separated by `;`, values by whitespace or commas; the
    /// surrounding brackets are optional.
    pub fn parse(literal: &str) -> Result<Self> {
        let trimmed = literal.trim();
        let body = trimmed
            .strip_prefix('[')
            .map(|rest| rest.strip_suffix(']'))
            .unwrap_or(Some(trimmed))
            .ok_or_else(|| {
                AppError::InvalidCostMatrix(format!("unbalanced brackets in {:?}", literal))
            })?;

        let rows = body
            .split(';')
            .map(|row| {
                row.split(|c: char| c.is_whitespace() || c == ',')
                    .filter(|token| !token.is_empty())
                    .map(|token| {
                        token.parse::<f64>().map_err(|_| {
                            AppError::InvalidCostMatrix(format!(
                                "{:?} is not a number in {:?}",
                                token, literal
                            ))
                        })
                    })
                    .collect::<Result<Vec<f64>>>()
            })
            .collect::<Result<Vec<Vec<f64>>>>()?;

        // Tolerate a trailing separator such as "[0 1; 1 0;]"
        let rows: Vec<Vec<f64>> = rows.into_iter().filter(|r| !r.is_empty()).collect();
        Self::new(rows)
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Cost of predicting `predicted` when the truth is `actual`
    pub fn get(&self, actual: usize, predicted: usize) -> f64 {
        self.rows[actual][predicted]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Per-class instance weight factor: total cost of misclassifying the class
    pub fn class_weights(&self) -> Vec<f64> {
        self.rows.iter().map(|row| row.iter().sum()).collect()
    }

    /// Expected cost of predicting each class given class probabilities
    pub fn expected_costs(&self, probabilities: &[f64]) -> Vec<f64> {
        (0..self.size())
            .map(|j| {
                probabilities
                    .iter()
                    .enumerate()
                    .map(|(i, p)| p * self.get(i, j))
                    .sum()
            })
            .collect()
    }

    /// Class with the lowest expected cost; ties go to the lower index
    pub fn min_expected_cost_class(&self, probabilities: &[f64]) -> usize {
        let costs = self.expected_costs(probabilities);
        let mut best = 0;
        for (j, cost) in costs.iter().enumerate().skip(1) {
            if *cost < costs[best] {
                best = j;
            }
        }
        best
    }
}

impl FromStr for CostMatrix {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CostMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        write!(f, "[{}]", rows.join("; "))
    }
}
