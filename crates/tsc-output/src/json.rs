//! Whole-run JSON documents.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tsc_metrics::ComparisonMetrics;
use tsc_orchestrator::RunReport;

use crate::OutputResult;

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> OutputResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

pub fn write_report_json(path: &Path, report: &RunReport) -> OutputResult<()> {
    write_pretty(path, report)
}

pub fn write_comparison_json(path: &Path, comparison: &ComparisonMetrics) -> OutputResult<()> {
    write_pretty(path, comparison)
}
