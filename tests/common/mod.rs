//! Shared fixtures for integration tests
//!
//! Call-record CSVs are generated in memory and written to temporary
//! directories so each test owns its input file.

#![allow(dead_code)]

use std::path::PathBuf;
use tempfile::TempDir;

/// Header row of the county call-record export
pub const HEADER: &str = "Ambulance Type (1 for ALS 2 for BLS),Service Time At Call,Travel Time To Call,Travel Time to Hospital,Travel Time Hospital to Home,Queued? (1=yes 0=no),Queue Time,\"Call \"\"symptoms\"\"\",Dispatched Priority,True Priority,Dispatched-Based Survival Probability,True-Based Survival Probability";

const SYMPTOMS: [&str; 6] = [
    "Heart Problems",
    "Falls",
    "Sick, non-specific",
    "Stroke",
    "Car accident",
    "Unknown",
];

/// One call record, every cell kept as raw text
#[derive(Debug, Clone)]
pub struct CallRow {
    pub ambulance_type: String,
    pub service_time: String,
    pub travel_to_call: String,
    pub travel_to_hospital: String,
    pub travel_hospital_to_home: String,
    pub queued: String,
    pub queue_time: String,
    pub symptoms: String,
    pub dispatched_priority: String,
    pub true_priority: String,
    pub dispatched_survival: String,
    pub true_survival: String,
}

impl CallRow {
    /// A valid row whose priorities agree
    pub fn correct() -> Self {
        Self {
            ambulance_type: "1".to_string(),
            service_time: "6.5".to_string(),
            travel_to_call: "8.25".to_string(),
            travel_to_hospital: "14".to_string(),
            travel_hospital_to_home: "9.5".to_string(),
            queued: "0".to_string(),
            queue_time: "0".to_string(),
            symptoms: "Heart Problems".to_string(),
            dispatched_priority: "1".to_string(),
            true_priority: "1".to_string(),
            dispatched_survival: "0.82".to_string(),
            true_survival: "0.82".to_string(),
        }
    }

    /// A valid row whose priorities disagree
    pub fn incorrect() -> Self {
        Self {
            dispatched_priority: "2".to_string(),
            true_priority: "1".to_string(),
            true_survival: "0.91".to_string(),
            ..Self::correct()
        }
    }

    pub fn to_csv_line(&self) -> String {
        [
            &self.ambulance_type,
            &self.service_time,
            &self.travel_to_call,
            &self.travel_to_hospital,
            &self.travel_hospital_to_home,
            &self.queued,
            &self.queue_time,
            &self.symptoms,
            &self.dispatched_priority,
            &self.true_priority,
            &self.dispatched_survival,
            &self.true_survival,
        ]
        .iter()
        .map(|cell| quote(cell))
        .collect::<Vec<_>>()
        .join(",")
    }
}

fn quote(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

/// Full CSV text for `rows`
pub fn csv_text(rows: &[CallRow]) -> String {
    let mut out = format!("{HEADER}\n");
    for row in rows {
        out.push_str(&row.to_csv_line());
        out.push('\n');
    }
    out
}

/// Write rows to `calls.csv` inside a fresh temporary directory
pub fn write_csv(rows: &[CallRow]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("calls.csv");
    std::fs::write(&path, csv_text(rows)).expect("write csv");
    (dir, path)
}

/// Deterministic synthetic calls; every fourth call is mis-prioritized and
/// has a markedly longer service time.
pub fn synthetic_calls(n: usize) -> Vec<CallRow> {
    (0..n)
        .map(|i| {
            let incorrect = i % 4 == 0;
            let true_priority = 1 + i % 3;
            let dispatched_priority = if incorrect {
                1 + (i + 1) % 3
            } else {
                true_priority
            };
            let service_time = if incorrect {
                18.0 + (i % 5) as f64
            } else {
                4.0 + (i % 7) as f64 * 0.5
            };

            CallRow {
                ambulance_type: (1 + i % 2).to_string(),
                service_time: format!("{service_time}"),
                travel_to_call: format!("{}", 5 + i % 9),
                travel_to_hospital: format!("{}", 10 + i % 11),
                travel_hospital_to_home: format!("{}", 7 + i % 6),
                queued: (i % 2).to_string(),
                queue_time: format!("{}", (i % 2) * (i % 4)),
                symptoms: SYMPTOMS[i % SYMPTOMS.len()].to_string(),
                dispatched_priority: dispatched_priority.to_string(),
                true_priority: true_priority.to_string(),
                dispatched_survival: format!("0.{}", 50 + i % 40),
                true_survival: format!("0.{}", 50 + (i + 3) % 40),
            }
        })
        .collect()
}
