//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `step_metrics.csv`
//! - `intersection_metrics.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{IntersectionRow, OutputResult, StepRow};

pub const STEP_FILE: &str = "step_metrics.csv";
pub const INTERSECTION_FILE: &str = "intersection_metrics.csv";

/// Writes per-tick metrics of every strategy to two CSV files.
pub struct CsvWriter {
    steps:         Writer<File>,
    intersections: Writer<File>,
    finished:      bool,
}

impl CsvWriter {
    /// Create the two CSV files in `dir` and write their header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut steps = Writer::from_path(dir.join(STEP_FILE))?;
        steps.write_record(["tick", "strategy", "waiting_time", "queue_length", "throughput"])?;

        let mut intersections = Writer::from_path(dir.join(INTERSECTION_FILE))?;
        intersections.write_record([
            "tick", "strategy", "intersection", "phase", "is_yellow", "waiting_time", "queue_length", "emergency",
        ])?;

        Ok(Self { steps, intersections, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_step(&mut self, row: &StepRow) -> OutputResult<()> {
        self.steps.write_record(&[
            row.tick.to_string(),
            row.strategy.to_owned(),
            format!("{:.3}", row.waiting_time),
            row.queue_length.to_string(),
            row.throughput.to_string(),
        ])?;
        Ok(())
    }

    fn write_intersections(&mut self, rows: &[IntersectionRow]) -> OutputResult<()> {
        for row in rows {
            self.intersections.write_record(&[
                row.tick.to_string(),
                row.strategy.to_owned(),
                row.intersection.clone(),
                row.phase.to_string(),
                (row.is_yellow as u8).to_string(),
                format!("{:.3}", row.waiting_time),
                row.queue_length.to_string(),
                (row.emergency as u8).to_string(),
            ])?;
        }
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.steps.flush()?;
        self.intersections.flush()?;
        Ok(())
    }
}
