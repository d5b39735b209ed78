//! Dispatch priority evaluation.
//!
//! Turns emergency-dispatch call records (CSV) into a labeled dataset whose
//! class says whether the dispatcher's priority matched the true priority,
//! then cross-validates cost-sensitive classifiers on it.
//!
//! ```no_run
//! use dispatch_eval::dataset::{select, DatasetBuilder};
//! use dispatch_eval::ml::{ClassificationHarness, CostMatrix, CrossValidation, LearnerConfig};
//!
//! # fn main() -> dispatch_eval::Result<()> {
//! let dataset = DatasetBuilder::default().build_from_path("calls.csv")?;
//! let dataset = select(&dataset, &["SERVICE_TIME_AT_CALL", "TRUE_PRIORITY", "CLASS"])?;
//!
//! let harness = ClassificationHarness::new(LearnerConfig::default(), CrossValidation::new(10, 1));
//! let result = harness.evaluate(&dataset, &CostMatrix::parse("[0 1; 2 0]")?)?;
//! println!("{}", dispatch_eval::report::format_result(&result));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dataset;
pub mod error;
pub mod ml;
pub mod report;

pub use error::{AppError, Result};
