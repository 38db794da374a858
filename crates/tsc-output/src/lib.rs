//! `tsc-output`: run output writers.
//!
//! | Item                      | Files created                                       |
//! |---------------------------|-----------------------------------------------------|
//! | [`CsvWriter`]             | `step_metrics.csv`, `intersection_metrics.csv`      |
//! | [`write_report_json`]     | the `RunReport` at a given path                     |
//! | [`write_comparison_json`] | the `ComparisonMetrics` at a given path             |
//!
//! Per-tick writers implement [`OutputWriter`] and are driven by
//! [`RunOutputObserver`], which implements `tsc_orchestrator::RunObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tsc_output::{CsvWriter, RunOutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let mut obs = RunOutputObserver::new(writer).with_report("./output/report.json");
//! orchestrator.run(&mut obs)?;
//! if let Some(e) = obs.take_error() {
//!     eprintln!("output error: {e}");
//! }
//! ```

pub mod csv;
pub mod error;
pub mod json;
pub mod observer;
pub mod row;
pub mod writer;


pub use crate::csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use json::{write_comparison_json, write_report_json};
pub use observer::RunOutputObserver;
pub use row::{IntersectionRow, StepRow};
pub use writer::OutputWriter;
